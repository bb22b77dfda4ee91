//! Worker supervisor
//!
//! Reconciles desired state (per-principal records) against running
//! worker tasks: starts a worker when a registered principal has an
//! active mode and a usable license, stops it when any precondition
//! disappears. Also runs the periodic license sweep.

use std::sync::Arc;

use contracts::{unix_now, EngineConfig, Notifier, PrincipalId, StateStore};
use fanout::FanoutSender;
use metrics::counter;
use session::{LogoutReason, SessionError, SessionGuardian};
use tracing::{info, instrument, warn};
use transport::{Transport, TransportRegistry, WorkerRegistry};

use crate::error::WorkerError;
use crate::worker::DispatchWorker;

/// Supervisor over all dispatch workers
pub struct WorkerSupervisor<T: Transport, S: StateStore, N: Notifier> {
    transports: Arc<TransportRegistry<T>>,
    workers: Arc<WorkerRegistry>,
    guardian: Arc<SessionGuardian<T, S, N>>,
    fanout: Arc<FanoutSender<T, S, N>>,
    store: Arc<S>,
    notifier: Arc<N>,
    config: EngineConfig,
}

impl<T, S, N> WorkerSupervisor<T, S, N>
where
    T: Transport + 'static,
    S: StateStore + Sync + 'static,
    N: Notifier + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transports: Arc<TransportRegistry<T>>,
        workers: Arc<WorkerRegistry>,
        guardian: Arc<SessionGuardian<T, S, N>>,
        fanout: Arc<FanoutSender<T, S, N>>,
        store: Arc<S>,
        notifier: Arc<N>,
        config: EngineConfig,
    ) -> Self {
        Self {
            transports,
            workers,
            guardian,
            fanout,
            store,
            notifier,
            config,
        }
    }

    /// Bring one principal's worker in line with its desired state
    ///
    /// Returns whether a worker should be (and now is) running. Calling
    /// this any number of times converges on at most one worker per
    /// principal.
    #[instrument(name = "reconcile", skip(self), fields(principal))]
    pub async fn reconcile(&self, principal: PrincipalId) -> Result<bool, WorkerError> {
        let should_run = self.should_run(principal).await?;
        let running = self.workers.is_running(principal);

        if should_run && !running {
            self.spawn_worker(principal)?;
        } else if !should_run && running {
            info!(principal, "stopping worker, preconditions no longer hold");
            self.workers.abort(principal);
        }
        Ok(should_run)
    }

    /// Reconcile every principal with a stored record
    pub async fn reconcile_all(&self) -> Result<(), WorkerError> {
        for principal in self.store.principal_ids().await? {
            self.reconcile(principal).await?;
        }
        Ok(())
    }

    /// Worker currently running for a principal
    pub fn is_running(&self, principal: PrincipalId) -> bool {
        self.workers.is_running(principal)
    }

    /// License sweep: log out principals whose license has lapsed
    /// (admins exempt), then reconcile everyone
    #[instrument(name = "license_sweep", skip(self))]
    pub async fn sweep(&self) -> Result<(), WorkerError> {
        counter!("supervisor_sweeps_total").increment(1);
        let now = unix_now();
        for principal in self.store.principal_ids().await? {
            let admin = self.config.is_admin(principal);
            let state = self.store.load(principal).await?;
            if state.license.valid && !state.license.valid_at(now, admin) {
                info!(principal, "license lapsed, forcing logout");
                match self
                    .guardian
                    .force_logout(principal, LogoutReason::LicenseExpired)
                    .await
                {
                    Ok(()) => {}
                    Err(SessionError::Store(e)) => return Err(e.into()),
                    Err(e) => warn!(principal, error = %e, "logout during sweep failed"),
                }
            }
            self.reconcile(principal).await?;
        }
        Ok(())
    }

    /// Abort every worker (process shutdown)
    pub fn shutdown(&self) {
        self.workers.abort_all();
    }

    /// Worker preconditions: registered, session present, an active mode
    /// and a license that is still (or permanently, for admins) valid
    async fn should_run(&self, principal: PrincipalId) -> Result<bool, WorkerError> {
        let now = unix_now();
        let state = self.store.load(principal).await?;
        let admin = self.config.is_admin(principal);
        Ok(state.registered
            && self.transports.contains(principal)
            && state.any_mode_active(now)
            && state.license.valid_at(now, admin))
    }

    fn spawn_worker(&self, principal: PrincipalId) -> Result<(), WorkerError> {
        let transport = self
            .transports
            .get(principal)
            .ok_or(WorkerError::NotRegistered { principal })?;
        let worker = DispatchWorker::new(
            principal,
            transport,
            self.guardian.clone(),
            self.fanout.clone(),
            self.store.clone(),
            self.notifier.clone(),
            self.config.clone(),
        );
        info!(principal, "starting worker");
        self.workers.insert(principal, tokio::spawn(worker.run()));
        Ok(())
    }
}
