//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Contract smoke checks
//! - Supervisor -> worker -> fan-out flows against the mock transport
//! - Configuration feeding the assembled engine

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ModeState::Inactive;
        let _ = contracts::EngineConfig::default();
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ContentItem, EngineConfig, Entity, EntityKind, ForwardSpec, LicenseTier, ModeState,
        Notifier, PrincipalId, PrincipalState, StateStore,
    };
    use fanout::FanoutSender;
    use session::SessionGuardian;
    use store::{CachedStore, MemoryStore};
    use transport::{MockTransport, SentMessage, TransportRegistry, WorkerRegistry};
    use worker::WorkerSupervisor;

    struct NullNotifier;

    impl Notifier for NullNotifier {
        async fn notify(&self, _principal: PrincipalId, _text: &str) {}
    }

    const PRINCIPAL: PrincipalId = 1;
    const FAR_FUTURE: u64 = u64::MAX / 2;

    type Store = CachedStore<MemoryStore>;

    struct Harness {
        transport: Arc<MockTransport>,
        transports: Arc<TransportRegistry<MockTransport>>,
        store: Arc<Store>,
        supervisor: WorkerSupervisor<MockTransport, Store, NullNotifier>,
    }

    /// Full engine wiring over the mock transport, one registered session
    async fn harness(config: EngineConfig, state: PrincipalState) -> Harness {
        let transport = Arc::new(MockTransport::new());
        let transports = Arc::new(TransportRegistry::new());
        transports.insert(PRINCIPAL, transport.clone());

        let workers = Arc::new(WorkerRegistry::new());
        let store = Arc::new(CachedStore::new(
            MemoryStore::new(),
            Duration::from_secs(config.store_cache_ttl_secs),
        ));
        store.save(PRINCIPAL, &state).await.unwrap();

        let notifier = Arc::new(NullNotifier);
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
        let supervisor = WorkerSupervisor::new(
            transports.clone(),
            workers,
            guardian,
            fanout,
            store.clone(),
            notifier,
            config,
        );

        Harness {
            transport,
            transports,
            store,
            supervisor,
        }
    }

    fn licensed_state() -> PrincipalState {
        let mut state = PrincipalState::default();
        state.registered = true;
        state.license.valid = true;
        state.license.tier = Some(LicenseTier::Basic);
        state.license.expires_at = Some(FAR_FUTURE);
        state
    }

    fn group(peer_id: i64) -> Entity {
        Entity {
            peer_id,
            kind: EntityKind::Group,
            title: None,
            handle: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervisor_spawns_worker_that_forwards() {
        let mut state = licensed_state();
        state.forwarding = ModeState::ActiveForever;
        state.targets = vec!["@a".into(), "@b".into()];
        state.forward_specs.push(ForwardSpec::Single {
            id: "s1".into(),
            link: "https://t.me/c/777/42".into(),
        });

        let h = harness(EngineConfig::default(), state).await;
        h.transport.register_entity("@a", group(10));
        h.transport.register_entity("@b", group(11));

        assert!(h.supervisor.reconcile(PRINCIPAL).await.unwrap());
        tokio::time::sleep(Duration::from_secs(60)).await;
        h.supervisor.shutdown();

        let sent = h.transport.sent_messages();
        assert_eq!(
            sent,
            vec![
                SentMessage::Forward {
                    peer: 10,
                    source_chat: "777".into(),
                    message_id: 42
                },
                SentMessage::Forward {
                    peer: 11,
                    source_chat: "777".into(),
                    message_id: 42
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dual_spec_sends_both_links_in_order() {
        let mut state = licensed_state();
        state.forwarding = ModeState::ActiveForever;
        state.targets = vec!["@grp".into(), "@other".into()];
        state.forward_specs.push(ForwardSpec::Dual {
            id: "d1".into(),
            first_link: "https://t.me/c/500/1".into(),
            second_link: "https://t.me/c/600/2".into(),
            inter_link_delay_secs: 3,
        });

        let h = harness(EngineConfig::default(), state).await;
        h.transport.register_entity("@grp", group(10));
        h.transport.register_entity("@other", group(11));

        h.supervisor.reconcile(PRINCIPAL).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        h.supervisor.shutdown();

        // Each target gets its full pair before the next target starts
        let sent = h.transport.sent_messages();
        assert_eq!(
            sent,
            vec![
                SentMessage::Forward {
                    peer: 10,
                    source_chat: "500".into(),
                    message_id: 1
                },
                SentMessage::Forward {
                    peer: 10,
                    source_chat: "600".into(),
                    message_id: 2
                },
                SentMessage::Forward {
                    peer: 11,
                    source_chat: "500".into(),
                    message_id: 1
                },
                SentMessage::Forward {
                    peer: 11,
                    source_chat: "600".into(),
                    message_id: 2
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_mode_delivers_saved_content() {
        let mut state = licensed_state();
        state.copying = ModeState::ActiveForever;
        state.targets = vec!["@grp".into()];
        state.content_items.push(ContentItem {
            id: "c1".into(),
            text: "restock tomorrow".into(),
            entities: Vec::new(),
            media: None,
            created_at: 0,
        });
        state.watermark.assigned_basic_text = Some("via relaycast".into());

        let h = harness(EngineConfig::default(), state).await;
        h.transport.register_entity("@grp", group(10));

        h.supervisor.reconcile(PRINCIPAL).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        h.supervisor.shutdown();

        let sent = h.transport.sent_messages();
        assert_eq!(
            sent,
            vec![SentMessage::Text {
                peer: 10,
                text: "restock tomorrow\n\nvia relaycast".into()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_tears_down_lapsed_license_end_to_end() {
        let mut state = licensed_state();
        state.forwarding = ModeState::ActiveForever;
        state.license.expires_at = Some(1);

        let h = harness(EngineConfig::default(), state).await;

        h.supervisor.sweep().await.unwrap();

        assert!(!h.transports.contains(PRINCIPAL));
        assert!(!h.supervisor.is_running(PRINCIPAL));
        let saved = h.store.load(PRINCIPAL).await.unwrap();
        assert!(!saved.license.valid);
        assert_eq!(saved.forwarding, ModeState::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loaded_config_drives_batching() {
        // Two batches of one: the run still delivers to every target
        let config = ConfigLoader::load_from_str(
            "batch_size = 1\nbatch_delay_secs = 5",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.batch_size, 1);

        let mut state = licensed_state();
        state.forwarding = ModeState::ActiveForever;
        state.targets = vec!["@a".into(), "@b".into()];
        state.forward_specs.push(ForwardSpec::Single {
            id: "s1".into(),
            link: "https://t.me/c/777/42".into(),
        });

        let h = harness(config, state).await;
        h.transport.register_entity("@a", group(10));
        h.transport.register_entity("@b", group(11));

        h.supervisor.reconcile(PRINCIPAL).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        h.supervisor.shutdown();

        assert_eq!(h.transport.sent_messages().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pruned_target_stays_gone_through_store_cache() {
        let mut state = licensed_state();
        state.forwarding = ModeState::ActiveForever;
        state.targets = vec!["@alive".into(), "@dead".into()];
        state.forward_specs.push(ForwardSpec::Single {
            id: "s1".into(),
            link: "https://t.me/c/777/42".into(),
        });

        let h = harness(EngineConfig::default(), state).await;
        // "@dead" never registered: it fails resolution and gets pruned
        h.transport.register_entity("@alive", group(10));

        h.supervisor.reconcile(PRINCIPAL).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        h.supervisor.shutdown();

        let saved = h.store.load(PRINCIPAL).await.unwrap();
        assert_eq!(saved.targets, vec!["@alive".to_string()]);
    }
}
