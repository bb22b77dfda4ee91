//! Per-principal dispatch worker
//!
//! One tokio task per principal. Each cycle verifies the session, expires
//! elapsed modes, delivers the principal's forward specs and saved copy
//! to every target, then sleeps the pacing interval. The worker exits on
//! its own when no mode remains active or the session cannot be kept
//! alive; the supervisor aborts it when preconditions disappear.

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    parse_message_link, unix_now, EngineConfig, MessageLink, ModeState, Notifier, PrincipalId,
    PrincipalState, StateStore,
};
use fanout::{FanoutError, FanoutSender};
use metrics::counter;
use resolver::TargetResolver;
use session::{SessionError, SessionGuardian};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use transport::Transport;

use crate::error::WorkerError;
use crate::watermark::{prepare_copy, select_watermark};

#[derive(PartialEq, Eq)]
enum CycleOutcome {
    Continue,
    SessionLost,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Forwarding,
    Copying,
}

impl Mode {
    fn label(&self) -> &'static str {
        match self {
            Mode::Forwarding => "Forward",
            Mode::Copying => "Copy",
        }
    }
}

/// The dispatch loop of one principal
pub struct DispatchWorker<T: Transport, S: StateStore, N: Notifier> {
    principal: PrincipalId,
    admin: bool,
    guardian: Arc<SessionGuardian<T, S, N>>,
    fanout: Arc<FanoutSender<T, S, N>>,
    resolver: TargetResolver<T>,
    store: Arc<S>,
    notifier: Arc<N>,
    config: EngineConfig,
}

impl<T: Transport, S: StateStore, N: Notifier> DispatchWorker<T, S, N> {
    pub fn new(
        principal: PrincipalId,
        transport: Arc<T>,
        guardian: Arc<SessionGuardian<T, S, N>>,
        fanout: Arc<FanoutSender<T, S, N>>,
        store: Arc<S>,
        notifier: Arc<N>,
        config: EngineConfig,
    ) -> Self {
        let resolver = TargetResolver::new(
            transport,
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        );
        Self {
            principal,
            admin: config.is_admin(principal),
            guardian,
            fanout,
            resolver,
            store,
            notifier,
            config,
        }
    }

    /// Run until no mode remains active or the session dies
    ///
    /// Never panics the task: an unrecoverable error notifies the
    /// principal (truncated) and clears both modes before exiting.
    #[instrument(name = "dispatch_worker", skip(self), fields(principal = self.principal))]
    pub async fn run(self) {
        counter!("workers_started_total").increment(1);
        match self.run_loop().await {
            Ok(()) => debug!(principal = self.principal, "worker exited"),
            Err(e) => {
                error!(principal = self.principal, error = %e, "worker stopped by error");
                self.handle_critical(&e).await;
            }
        }
        counter!("workers_stopped_total").increment(1);
    }

    async fn run_loop(&self) -> Result<(), WorkerError> {
        loop {
            counter!("worker_cycles_total").increment(1);

            let healthy = match self.guardian.verify_session(self.principal).await {
                Ok(healthy) => healthy,
                Err(SessionError::Store(e)) => return Err(e.into()),
                Err(e) => {
                    warn!(principal = self.principal, error = %e, "session verification error");
                    false
                }
            };
            if !healthy {
                self.stop_modes("Dispatch stopped: session unavailable.")
                    .await?;
                return Ok(());
            }

            let now = unix_now();
            let mut state = self.store.load(self.principal).await?;
            self.expire_modes(&mut state, now).await?;

            if !state.any_mode_active(now) {
                debug!(principal = self.principal, "no active mode");
                return Ok(());
            }

            let pacing = Duration::from_secs(if state.pacing_secs == 0 {
                self.config.default_pacing_secs
            } else {
                state.pacing_secs
            });

            if state.targets.is_empty() {
                debug!(principal = self.principal, "no targets this cycle");
                sleep(pacing).await;
                continue;
            }

            // A dispatch losing the session disables only its own mode;
            // the next iteration's health check decides whether the
            // worker survives.
            if state.forwarding.is_active(now)
                && self.process_forward_specs(&state).await? == CycleOutcome::SessionLost
            {
                self.disable_mode(Mode::Forwarding).await?;
            }

            if state.copying.is_active(now)
                && self.process_copy(&state).await? == CycleOutcome::SessionLost
            {
                self.disable_mode(Mode::Copying).await?;
            }

            sleep(pacing).await;
        }
    }

    /// Clear elapsed modes, persist, then notify
    async fn expire_modes(&self, state: &mut PrincipalState, now: u64) -> Result<(), WorkerError> {
        let mut ended: Vec<(&str, Option<u64>)> = Vec::new();
        if state.forwarding.expired(now) {
            ended.push(("Forward", state.forwarding.expires_at()));
            state.forwarding = ModeState::Inactive;
        }
        if state.copying.expired(now) {
            ended.push(("Copy", state.copying.expires_at()));
            state.copying = ModeState::Inactive;
        }
        if ended.is_empty() {
            return Ok(());
        }

        self.store.save(self.principal, state).await?;
        for (mode, expired_at) in ended {
            info!(principal = self.principal, mode, "mode period ended");
            self.notifier
                .notify(self.principal, &mode_ended_message(mode, expired_at))
                .await;
        }
        Ok(())
    }

    async fn process_forward_specs(
        &self,
        state: &PrincipalState,
    ) -> Result<CycleOutcome, WorkerError> {
        for (idx, spec) in state.forward_specs.iter().enumerate() {
            if idx > 0 {
                sleep(Duration::from_secs(self.config.inter_spec_delay_secs)).await;
            }
            match spec {
                contracts::ForwardSpec::Single { link, .. } => {
                    if self.forward_link(link).await? == CycleOutcome::SessionLost {
                        return Ok(CycleOutcome::SessionLost);
                    }
                }
                contracts::ForwardSpec::Dual {
                    first_link,
                    second_link,
                    inter_link_delay_secs,
                    ..
                } => {
                    if self
                        .forward_pair(first_link, second_link, *inter_link_delay_secs)
                        .await?
                        == CycleOutcome::SessionLost
                    {
                        return Ok(CycleOutcome::SessionLost);
                    }
                }
            }
        }
        Ok(CycleOutcome::Continue)
    }

    /// Parse a stored link, notifying and returning None when invalid
    async fn parse_link(&self, link: &str) -> Option<MessageLink> {
        match parse_message_link(link) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(principal = self.principal, link, error = %e, "skipping bad link");
                self.notifier
                    .notify(
                        self.principal,
                        &format!("Skipped an invalid message link: {link}"),
                    )
                    .await;
                None
            }
        }
    }

    /// Fan one linked message out to every target
    async fn forward_link(&self, link: &str) -> Result<CycleOutcome, WorkerError> {
        let Some(parsed) = self.parse_link(link).await else {
            return Ok(CycleOutcome::Continue);
        };

        let source_chat = parsed.source_chat;
        let message_id = parsed.message_id;
        let result = self
            .fanout
            .dispatch(self.principal, &self.resolver, move |transport, peer| {
                let chat = source_chat.clone();
                async move { transport.forward_message(peer, &chat, message_id).await }
            })
            .await;
        self.finish_dispatch(result)
    }

    /// Fan a pair of linked messages out to every target
    ///
    /// One dispatch: each destination receives the first message, then
    /// after the configured delay the second, before the run moves on to
    /// the next destination.
    async fn forward_pair(
        &self,
        first_link: &str,
        second_link: &str,
        inter_link_delay_secs: u64,
    ) -> Result<CycleOutcome, WorkerError> {
        let Some(first) = self.parse_link(first_link).await else {
            return Ok(CycleOutcome::Continue);
        };
        let Some(second) = self.parse_link(second_link).await else {
            return Ok(CycleOutcome::Continue);
        };

        let delay = Duration::from_secs(inter_link_delay_secs);
        let result = self
            .fanout
            .dispatch(self.principal, &self.resolver, move |transport, peer| {
                let first_chat = first.source_chat.clone();
                let first_id = first.message_id;
                let second_chat = second.source_chat.clone();
                let second_id = second.message_id;
                async move {
                    transport.forward_message(peer, &first_chat, first_id).await?;
                    sleep(delay).await;
                    transport
                        .forward_message(peer, &second_chat, second_id)
                        .await
                }
            })
            .await;
        self.finish_dispatch(result)
    }

    /// Fan the first saved content item out to every target
    async fn process_copy(&self, state: &PrincipalState) -> Result<CycleOutcome, WorkerError> {
        let Some(item) = state.content_items.first() else {
            debug!(principal = self.principal, "copy mode active but nothing saved");
            return Ok(CycleOutcome::Continue);
        };

        let watermark = select_watermark(state, self.admin);
        let (text, formatting) = prepare_copy(item, watermark.as_deref());
        let media = item.media;

        let result = self
            .fanout
            .dispatch(self.principal, &self.resolver, move |transport, peer| {
                let text = text.clone();
                let formatting = formatting.clone();
                async move {
                    match media {
                        Some(media) => {
                            transport
                                .send_media(peer, &media, &text, formatting.as_ref())
                                .await
                        }
                        None => transport.send_text(peer, &text, formatting.as_ref()).await,
                    }
                }
            })
            .await;
        self.finish_dispatch(result)
    }

    fn finish_dispatch(
        &self,
        result: Result<fanout::DispatchReport, FanoutError>,
    ) -> Result<CycleOutcome, WorkerError> {
        match result {
            Ok(report) => {
                debug!(
                    principal = self.principal,
                    delivered = report.delivered,
                    failed = report.failed,
                    "dispatch finished"
                );
                Ok(CycleOutcome::Continue)
            }
            Err(FanoutError::SessionLost) => Ok(CycleOutcome::SessionLost),
            Err(FanoutError::Store(e)) => Err(e.into()),
        }
    }

    /// Clear one mode after its dispatch lost the session
    async fn disable_mode(&self, mode: Mode) -> Result<(), WorkerError> {
        let mut state = self.store.load(self.principal).await?;
        match mode {
            Mode::Forwarding => state.forwarding = ModeState::Inactive,
            Mode::Copying => state.copying = ModeState::Inactive,
        }
        self.store.save(self.principal, &state).await?;
        self.notifier
            .notify(
                self.principal,
                &format!("{} dispatch stopped: session unavailable.", mode.label()),
            )
            .await;
        Ok(())
    }

    /// Clear both modes, persist and tell the principal why
    async fn stop_modes(&self, message: &str) -> Result<(), WorkerError> {
        let mut state = self.store.load(self.principal).await?;
        if state.forwarding != ModeState::Inactive || state.copying != ModeState::Inactive {
            state.forwarding = ModeState::Inactive;
            state.copying = ModeState::Inactive;
            self.store.save(self.principal, &state).await?;
        }
        self.notifier.notify(self.principal, message).await;
        Ok(())
    }

    /// Last-resort cleanup after an unrecoverable loop error
    async fn handle_critical(&self, error: &WorkerError) {
        let reason = truncate_chars(&error.to_string(), 100);
        self.notifier
            .notify(
                self.principal,
                &format!("Dispatch stopped by an error: {reason}"),
            )
            .await;

        match self.store.load(self.principal).await {
            Ok(mut state) => {
                state.forwarding = ModeState::Inactive;
                state.copying = ModeState::Inactive;
                if let Err(e) = self.store.save(self.principal, &state).await {
                    warn!(principal = self.principal, error = %e, "mode cleanup save failed");
                }
            }
            Err(e) => {
                warn!(principal = self.principal, error = %e, "mode cleanup load failed");
            }
        }
    }
}

fn mode_ended_message(mode: &str, expired_at: Option<u64>) -> String {
    match expired_at.and_then(|t| chrono::DateTime::from_timestamp(t as i64, 0)) {
        Some(when) => format!(
            "{mode} mode period ended at {}.",
            when.format("%Y-%m-%d %H:%M UTC")
        ),
        None => format!("{mode} mode period has ended."),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
