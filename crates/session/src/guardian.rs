//! Session guardian
//!
//! Keeps per-principal transport sessions healthy: verifies connectivity
//! and authorization, reconnects with bounded exponential backoff, counts
//! consecutive transient failures, and tears sessions down when the
//! platform declares them dead or the failure budget is spent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{EngineConfig, Notifier, PrincipalId, StateStore, TransportError};
use metrics::counter;
use tracing::{debug, info, instrument, warn};
use transport::{Transport, TransportRegistry, WorkerRegistry};

use crate::error::SessionError;

/// Why a session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// Platform declared the credential dead
    Fatal,
    /// Consecutive transient failures exhausted the warning budget
    WarningsExhausted,
    /// License expired or was revoked
    LicenseExpired,
    /// Explicit request
    Manual,
}

impl LogoutReason {
    fn notification(&self) -> &'static str {
        match self {
            LogoutReason::Fatal => {
                "Your session was revoked by the platform. Please register again."
            }
            LogoutReason::WarningsExhausted => {
                "Your session kept failing and has been closed. Please register again."
            }
            LogoutReason::LicenseExpired => {
                "Your access period has ended. Your session has been closed."
            }
            LogoutReason::Manual => "Your session has been closed.",
        }
    }

    /// License survives every teardown except its own expiry
    fn preserves_license(&self) -> bool {
        !matches!(self, LogoutReason::LicenseExpired)
    }
}

/// Per-principal session guardian
pub struct SessionGuardian<T: Transport, S: StateStore, N: Notifier> {
    transports: Arc<TransportRegistry<T>>,
    workers: Arc<WorkerRegistry>,
    store: Arc<S>,
    notifier: Arc<N>,
    config: EngineConfig,
    /// Consecutive transient-failure counts
    warnings: Mutex<HashMap<PrincipalId, u32>>,
}

impl<T: Transport, S: StateStore, N: Notifier> SessionGuardian<T, S, N> {
    pub fn new(
        transports: Arc<TransportRegistry<T>>,
        workers: Arc<WorkerRegistry>,
        store: Arc<S>,
        notifier: Arc<N>,
        config: EngineConfig,
    ) -> Self {
        Self {
            transports,
            workers,
            store,
            notifier,
            config,
            warnings: Mutex::new(HashMap::new()),
        }
    }

    /// Transport for a principal, reconnected if necessary
    ///
    /// # Errors
    /// - `NotRegistered` when no session exists
    /// - `Unrecoverable` when reconnection failed or authorization is gone
    ///   (the session has already been torn down in the latter case)
    #[instrument(name = "ensure_connected", skip(self), fields(principal))]
    pub async fn ensure_connected(&self, principal: PrincipalId) -> Result<Arc<T>, SessionError> {
        let transport = self
            .transports
            .get(principal)
            .ok_or(SessionError::NotRegistered { principal })?;

        if transport.is_connected().await {
            return Ok(transport);
        }

        self.reconnect(principal, transport.as_ref()).await?;
        Ok(transport)
    }

    /// Verify a principal's session end to end
    ///
    /// Returns Ok(true) when connected and authorized (and resets the
    /// transient-failure counter). Any failure returns Ok(false); fatal
    /// faults and an exhausted warning budget additionally tear the
    /// session down. Store failures are the only hard error.
    #[instrument(name = "verify_session", skip(self), fields(principal))]
    pub async fn verify_session(&self, principal: PrincipalId) -> Result<bool, SessionError> {
        let Some(transport) = self.transports.get(principal) else {
            return Ok(false);
        };

        match self.check_health(principal, transport.as_ref()).await {
            Ok(()) => {
                self.warnings.lock().unwrap().remove(&principal);
                Ok(true)
            }
            Err(e) if e.is_fatal_session() => {
                warn!(principal, error = %e, "fatal session fault");
                self.force_logout(principal, LogoutReason::Fatal).await?;
                Ok(false)
            }
            Err(e) => {
                let count = {
                    let mut warnings = self.warnings.lock().unwrap();
                    let count = warnings.entry(principal).or_insert(0);
                    *count += 1;
                    *count
                };
                warn!(
                    principal,
                    error = %e,
                    count,
                    max = self.config.max_warnings,
                    "session verification failed"
                );
                if count >= self.config.max_warnings {
                    self.force_logout(principal, LogoutReason::WarningsExhausted)
                        .await?;
                }
                Ok(false)
            }
        }
    }

    /// Tear down a principal's session: abort its worker, disconnect and
    /// deregister the transport, reset the persisted record (license
    /// preserved unless the reason is expiry) and notify the principal.
    #[instrument(name = "force_logout", skip(self), fields(principal, ?reason))]
    pub async fn force_logout(
        &self,
        principal: PrincipalId,
        reason: LogoutReason,
    ) -> Result<(), SessionError> {
        counter!("session_logouts_total").increment(1);
        info!(principal, ?reason, "forcing logout");

        self.workers.abort(principal);
        self.warnings.lock().unwrap().remove(&principal);

        if let Some(transport) = self.transports.remove(principal) {
            if let Err(e) = transport.disconnect().await {
                debug!(principal, error = %e, "disconnect during logout failed");
            }
        }

        let state = self.store.load(principal).await?;
        let fresh = state.reset_session(reason.preserves_license());
        self.store.save(principal, &fresh).await?;

        self.notifier.notify(principal, reason.notification()).await;
        Ok(())
    }

    /// Current transient-failure count for a principal
    pub fn warning_count(&self, principal: PrincipalId) -> u32 {
        self.warnings
            .lock()
            .unwrap()
            .get(&principal)
            .copied()
            .unwrap_or(0)
    }

    /// Connected and authorized, reconnecting when the link is down
    async fn check_health(
        &self,
        principal: PrincipalId,
        transport: &T,
    ) -> Result<(), TransportError> {
        if !transport.is_connected().await {
            self.reconnect(principal, transport)
                .await
                .map_err(|e| TransportError::connection(e.to_string()))?;
            // A reconnect that comes back unauthorized cannot recover
            if !transport.is_authorized().await? {
                return Err(TransportError::session_revoked(
                    "unauthorized after reconnect",
                ));
            }
            return Ok(());
        }

        if !transport.is_authorized().await? {
            return Err(TransportError::session_revoked("authorization lost"));
        }
        Ok(())
    }

    /// Bounded reconnect with exponential backoff
    async fn reconnect(&self, principal: PrincipalId, transport: &T) -> Result<(), SessionError> {
        let max_attempts = self.config.reconnect_max_attempts;
        for attempt in 1..=max_attempts {
            match transport.connect().await {
                Ok(()) => {
                    counter!("session_reconnects_total").increment(1);
                    info!(principal, attempt, "reconnected");
                    return Ok(());
                }
                Err(e) if e.is_fatal_session() => {
                    self.force_logout(principal, LogoutReason::Fatal).await?;
                    return Err(SessionError::Unrecoverable {
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(principal, attempt, max_attempts, error = %e, "reconnect failed");
                    if attempt < max_attempts {
                        let backoff = Duration::from_secs(
                            2u64.saturating_pow(attempt)
                                .min(self.config.reconnect_backoff_cap_secs),
                        );
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
        Err(SessionError::Unrecoverable {
            reason: format!("reconnect failed after {max_attempts} attempts"),
        })
    }
}
