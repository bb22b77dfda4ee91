//! Metric descriptions for everything the engine emits
//!
//! The business crates record through the `metrics` facade; this module
//! attaches units and help text so the Prometheus endpoint is
//! self-describing.

use metrics::{describe_counter, Unit};

/// Resolver metrics
pub const RESOLUTIONS_TOTAL: &str = "resolver_resolutions_total";
pub const CACHE_HITS_TOTAL: &str = "resolver_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "resolver_cache_misses_total";

/// Session metrics
pub const LOGOUTS_TOTAL: &str = "session_logouts_total";
pub const RECONNECTS_TOTAL: &str = "session_reconnects_total";

/// Fan-out metrics
pub const DELIVERIES_TOTAL: &str = "fanout_deliveries_total";
pub const DELIVERY_FAILURES_TOTAL: &str = "fanout_delivery_failures_total";
pub const TARGETS_PRUNED_TOTAL: &str = "fanout_targets_pruned_total";

/// Worker metrics
pub const WORKERS_STARTED_TOTAL: &str = "workers_started_total";
pub const WORKERS_STOPPED_TOTAL: &str = "workers_stopped_total";
pub const WORKER_CYCLES_TOTAL: &str = "worker_cycles_total";
pub const SWEEPS_TOTAL: &str = "supervisor_sweeps_total";

/// Register help text for every engine metric
pub fn describe_engine_metrics() {
    describe_counter!(
        RESOLUTIONS_TOTAL,
        Unit::Count,
        "Target resolution attempts (cached or not)"
    );
    describe_counter!(
        CACHE_HITS_TOTAL,
        Unit::Count,
        "Resolutions served from the entity cache"
    );
    describe_counter!(
        CACHE_MISSES_TOTAL,
        Unit::Count,
        "Resolutions that had to reach the platform"
    );
    describe_counter!(LOGOUTS_TOTAL, Unit::Count, "Forced session teardowns");
    describe_counter!(
        RECONNECTS_TOTAL,
        Unit::Count,
        "Successful transport reconnections"
    );
    describe_counter!(DELIVERIES_TOTAL, Unit::Count, "Messages delivered to targets");
    describe_counter!(
        DELIVERY_FAILURES_TOTAL,
        Unit::Count,
        "Deliveries that failed after any retry"
    );
    describe_counter!(
        TARGETS_PRUNED_TOTAL,
        Unit::Count,
        "Targets removed from principal target lists"
    );
    describe_counter!(WORKERS_STARTED_TOTAL, Unit::Count, "Dispatch workers started");
    describe_counter!(WORKERS_STOPPED_TOTAL, Unit::Count, "Dispatch workers stopped");
    describe_counter!(WORKER_CYCLES_TOTAL, Unit::Count, "Dispatch cycles executed");
    describe_counter!(SWEEPS_TOTAL, Unit::Count, "License sweeps executed");
}
