//! Engine wiring
//!
//! Assembles the registries, guardian, fan-out sender and supervisor into
//! one runnable unit. The binary runs against the in-memory transport and
//! store; a deployment swaps those two constructors for real ones.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use contracts::{EngineConfig, Notifier, PrincipalId};
use fanout::FanoutSender;
use session::SessionGuardian;
use store::{CachedStore, MemoryStore};
use tracing::{info, instrument};
use transport::{MockTransport, TransportRegistry, WorkerRegistry};
use worker::WorkerSupervisor;

/// Notifier that writes principal notifications to the log
///
/// Stands in for a platform direct-message channel when running without
/// real credentials.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, principal: PrincipalId, text: &str) {
        info!(principal, text, "principal notification");
    }
}

type Store = CachedStore<MemoryStore>;

/// The assembled dispatch engine
pub struct Engine {
    supervisor: Arc<WorkerSupervisor<MockTransport, Store, LogNotifier>>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let transports = Arc::new(TransportRegistry::new());
        let workers = Arc::new(WorkerRegistry::new());
        let store = Arc::new(CachedStore::new(
            MemoryStore::new(),
            Duration::from_secs(config.store_cache_ttl_secs),
        ));
        let notifier = Arc::new(LogNotifier);

        let guardian = Arc::new(SessionGuardian::new(
            transports.clone(),
            workers.clone(),
            store.clone(),
            notifier.clone(),
            config.clone(),
        ));
        let fanout = Arc::new(FanoutSender::new(
            guardian.clone(),
            store.clone(),
            notifier.clone(),
            config.clone(),
        ));
        let supervisor = Arc::new(WorkerSupervisor::new(
            transports,
            workers,
            guardian,
            fanout,
            store,
            notifier,
            config.clone(),
        ));

        Self { supervisor, config }
    }

    /// Run until cancelled: reconcile once, then sweep on the configured
    /// interval
    #[instrument(name = "engine_run", skip(self))]
    pub async fn run(&self) -> Result<()> {
        self.supervisor.reconcile_all().await?;
        info!(
            sweep_interval_secs = self.config.license_sweep_interval_secs,
            "engine running"
        );

        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.license_sweep_interval_secs));
        // The first tick fires immediately and would double the initial pass
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.supervisor.sweep().await?;
        }
    }

    /// Abort every running worker
    pub fn shutdown(&self) {
        self.supervisor.shutdown();
        info!("engine stopped");
    }
}
