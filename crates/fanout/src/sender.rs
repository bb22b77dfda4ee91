//! Fan-out sender
//!
//! One dispatch = one payload delivered to every resolved target of a
//! principal. Targets that fail resolution are pruned up front; targets
//! that turn out fundamentally inaccessible during delivery are pruned
//! at the end; permission failures are counted but retained. Delivery
//! runs in paced batches with a single retry after a flood wait.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use contracts::{EngineConfig, Notifier, PeerId, PrincipalId, StateStore, TransportError};
use metrics::counter;
use resolver::TargetResolver;
use session::{SessionError, SessionGuardian};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use transport::Transport;

use crate::error::FanoutError;

/// Outcome of one dispatch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Resolved targets the dispatch attempted
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Identifiers removed during the resolution pass
    pub pruned_unresolved: Vec<String>,
    /// Identifiers removed after fundamental-access failures
    pub pruned_forbidden: Vec<String>,
    /// Per-target failure descriptions
    pub failures: Vec<String>,
}

/// Batched per-principal sender
pub struct FanoutSender<T: Transport, S: StateStore, N: Notifier> {
    guardian: Arc<SessionGuardian<T, S, N>>,
    store: Arc<S>,
    notifier: Arc<N>,
    config: EngineConfig,
}

impl<T: Transport, S: StateStore, N: Notifier> FanoutSender<T, S, N> {
    pub fn new(
        guardian: Arc<SessionGuardian<T, S, N>>,
        store: Arc<S>,
        notifier: Arc<N>,
        config: EngineConfig,
    ) -> Self {
        Self {
            guardian,
            store,
            notifier,
            config,
        }
    }

    /// Deliver one payload to every target of a principal
    ///
    /// `send` performs the actual platform call for one resolved peer; it
    /// is invoked strictly sequentially. With no stored targets this is a
    /// no-op that touches neither the resolver nor the platform.
    ///
    /// # Errors
    /// - `SessionLost` when the session died mid-dispatch (the remaining
    ///   targets are skipped; the caller decides what happens to the mode)
    /// - `Store` on persistence failures
    #[instrument(name = "fanout_dispatch", skip(self, resolver, send), fields(principal))]
    pub async fn dispatch<F, Fut>(
        &self,
        principal: PrincipalId,
        resolver: &TargetResolver<T>,
        send: F,
    ) -> Result<DispatchReport, FanoutError>
    where
        F: Fn(Arc<T>, PeerId) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), TransportError>> + Send,
    {
        let transport = match self.guardian.ensure_connected(principal).await {
            Ok(t) => t,
            Err(SessionError::Store(e)) => return Err(e.into()),
            Err(e) => {
                warn!(principal, error = %e, "no usable session for dispatch");
                return Err(FanoutError::SessionLost);
            }
        };

        let mut state = self.store.load(principal).await?;
        if state.targets.is_empty() {
            debug!(principal, "no targets, skipping dispatch");
            return Ok(DispatchReport::default());
        }

        let mut report = DispatchReport::default();

        // Resolution pass: every identifier either yields a peer id or is
        // pruned before any delivery starts.
        let mut resolved: Vec<(String, PeerId)> = Vec::new();
        for identifier in &state.targets {
            match resolver.resolve(identifier).await {
                Ok(entity) => resolved.push((identifier.clone(), entity.peer_id)),
                Err(e) => {
                    debug!(principal, identifier, error = %e, "target failed resolution");
                    report.pruned_unresolved.push(identifier.clone());
                }
            }
        }

        if !report.pruned_unresolved.is_empty() {
            let pruned = &report.pruned_unresolved;
            state.targets.retain(|t| !pruned.contains(t));
            self.store.save(principal, &state).await?;
            counter!("fanout_targets_pruned_total").increment(pruned.len() as u64);
            self.notifier
                .notify(
                    principal,
                    &format!(
                        "Removed {} unreachable target(s): {}",
                        pruned.len(),
                        list_preview(pruned, 3)
                    ),
                )
                .await;
        }

        report.attempted = resolved.len();
        let total_batches = resolved.len().div_ceil(self.config.batch_size.max(1));

        for (batch_idx, batch) in resolved.chunks(self.config.batch_size.max(1)).enumerate() {
            if batch_idx > 0 {
                sleep(Duration::from_secs(self.config.batch_delay_secs)).await;
            }
            self.notifier
                .notify(
                    principal,
                    &format!(
                        "Dispatching batch {}/{} ({} targets)",
                        batch_idx + 1,
                        total_batches,
                        batch.len()
                    ),
                )
                .await;

            for (identifier, peer) in batch {
                if !transport.is_connected().await && !self.session_ok(principal).await? {
                    return Err(FanoutError::SessionLost);
                }

                match self.send_one(principal, &transport, *peer, &send).await {
                    Ok(()) => {
                        counter!("fanout_deliveries_total").increment(1);
                        report.delivered += 1;
                    }
                    Err(TransportError::AccessForbidden { reason, .. }) => {
                        counter!("fanout_delivery_failures_total").increment(1);
                        report.failed += 1;
                        report.failures.push(format!("{identifier}: {reason}"));
                        report.pruned_forbidden.push(identifier.clone());
                        self.notifier
                            .notify(
                                principal,
                                &format!("Lost access to {identifier}: {reason}"),
                            )
                            .await;
                    }
                    Err(TransportError::PermissionDenied { reason, .. }) => {
                        counter!("fanout_delivery_failures_total").increment(1);
                        report.failed += 1;
                        report.failures.push(format!("{identifier}: {reason}"));
                        self.notifier
                            .notify(
                                principal,
                                &format!("Could not deliver to {identifier}: {reason}"),
                            )
                            .await;
                    }
                    Err(e @ TransportError::SessionRevoked { .. }) => {
                        warn!(principal, error = %e, "session revoked mid-dispatch");
                        // Triggers the guardian's teardown
                        self.session_ok(principal).await?;
                        return Err(FanoutError::SessionLost);
                    }
                    Err(TransportError::Connection { reason }) => {
                        if !self.session_ok(principal).await? {
                            return Err(FanoutError::SessionLost);
                        }
                        counter!("fanout_delivery_failures_total").increment(1);
                        report.failed += 1;
                        report.failures.push(format!("{identifier}: {reason}"));
                    }
                    Err(e) => {
                        counter!("fanout_delivery_failures_total").increment(1);
                        report.failed += 1;
                        report.failures.push(format!("{identifier}: {e}"));
                    }
                }

                sleep(Duration::from_millis(self.config.per_send_delay_ms)).await;
            }
        }

        if !report.pruned_forbidden.is_empty() {
            // Reload: the record may have changed during the batches
            let mut state = self.store.load(principal).await?;
            let pruned = &report.pruned_forbidden;
            state.targets.retain(|t| !pruned.contains(t));
            self.store.save(principal, &state).await?;
            counter!("fanout_targets_pruned_total").increment(pruned.len() as u64);
            self.notifier
                .notify(
                    principal,
                    &format!(
                        "Removed {} inaccessible target(s): {}",
                        pruned.len(),
                        list_preview(pruned, 5)
                    ),
                )
                .await;
        }

        self.notifier
            .notify(principal, &summary(&report))
            .await;

        Ok(report)
    }

    /// One delivery attempt, with a single retry after a flood wait
    async fn send_one<F, Fut>(
        &self,
        principal: PrincipalId,
        transport: &Arc<T>,
        peer: PeerId,
        send: &F,
    ) -> Result<(), TransportError>
    where
        F: Fn(Arc<T>, PeerId) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), TransportError>> + Send,
    {
        match send(transport.clone(), peer).await {
            Err(TransportError::RateLimited { retry_after_secs }) => {
                // Wait half again as long as requested, then retry once
                let wait = Duration::from_millis(retry_after_secs.saturating_mul(1500));
                warn!(peer, retry_after_secs, "flood wait, sleeping before retry");
                self.notifier
                    .notify(
                        principal,
                        &format!("Rate limited, pausing {}s before retrying.", wait.as_secs()),
                    )
                    .await;
                sleep(wait).await;
                send(transport.clone(), peer).await
            }
            outcome => outcome,
        }
    }

    async fn session_ok(&self, principal: PrincipalId) -> Result<bool, FanoutError> {
        match self.guardian.verify_session(principal).await {
            Ok(ok) => Ok(ok),
            Err(SessionError::Store(e)) => Err(e.into()),
            Err(_) => Ok(false),
        }
    }
}

fn list_preview(items: &[String], max: usize) -> String {
    let shown = items
        .iter()
        .take(max)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > max {
        format!("{shown} and {} more", items.len() - max)
    } else {
        shown
    }
}

fn summary(report: &DispatchReport) -> String {
    let mut text = format!(
        "Dispatch complete: {} delivered, {} failed.",
        report.delivered, report.failed
    );
    for failure in report.failures.iter().take(3) {
        text.push_str("\n- ");
        text.push_str(failure);
    }
    if report.failures.len() > 3 {
        text.push_str(&format!("\n({} more)", report.failures.len() - 3));
    }
    text
}
