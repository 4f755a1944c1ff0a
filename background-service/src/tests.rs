#[cfg(test)]
mod tests {
    use crate::{persist_quota_flag, BackgroundService, DEFAULT_SWEEP_INTERVAL_HOURS};
    use chrono::{Duration as ChronoDuration, Utc};
    use cleaner_core::{FailureKind, Message, MessageBus, RecordingErrorSink};
    use database::state::{is_quota_exceeded, load_registry, save_registry};
    use database::{BlockRegistry, MemoryStore, StateKey, StateStore};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    struct Fixture {
        service: BackgroundService,
        store: Arc<MemoryStore>,
        bus: MessageBus,
        sink: Arc<RecordingErrorSink>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let bus = MessageBus::new();
        let sink = Arc::new(RecordingErrorSink::new());
        let service = BackgroundService::new(
            DEFAULT_SWEEP_INTERVAL_HOURS,
            store.clone(),
            bus.clone(),
            sink.clone(),
        );
        Fixture {
            service,
            store,
            bus,
            sink,
        }
    }

    async fn seed_registry(store: &MemoryStore) {
        let now = Utc::now();
        let mut registry = BlockRegistry::new();
        registry.upsert("UCrecent", now - ChronoDuration::days(1));
        registry.upsert("UCstale", now - ChronoDuration::days(8));
        save_registry(store, &registry).await.unwrap();
    }

    #[test]
    fn test_default_interval() {
        let f = fixture();
        assert_eq!(f.service.sweep_interval(), Duration::from_secs(24 * 60 * 60));
    }

    #[tokio::test]
    async fn test_install_writes_missing_defaults() {
        let f = fixture();
        f.store
            .set(StateKey::ApiKey, json!("existing"))
            .await
            .unwrap();

        let written = f.service.install().await.unwrap();
        assert!(!written.contains(&StateKey::ApiKey));
        assert_eq!(f.store.get(StateKey::Enabled).await.unwrap(), Some(json!(true)));
        assert_eq!(
            f.store.get(StateKey::ApiKey).await.unwrap(),
            Some(json!("existing"))
        );
    }

    #[tokio::test]
    async fn test_sweep_once_prunes_expired_entries() {
        let f = fixture();
        seed_registry(&f.store).await;

        assert_eq!(f.service.run_sweep_once().await.unwrap(), 1);
        let registry = load_registry(f.store.as_ref()).await.unwrap();
        assert!(registry.get("UCrecent").is_some());
        assert!(registry.get("UCstale").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep_runs_after_interval() {
        let f = fixture();
        seed_registry(&f.store).await;
        f.service.start().await.unwrap();

        sleep(Duration::from_secs(60)).await;
        assert_eq!(load_registry(f.store.as_ref()).await.unwrap().len(), 2);

        sleep(Duration::from_secs(24 * 60 * 60)).await;
        assert_eq!(load_registry(f.store.as_ref()).await.unwrap().len(), 1);

        f.service.stop().await.unwrap();
        assert!(!f.service.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_notification_persists_flag_with_key() {
        let f = fixture();
        f.store.set(StateKey::ApiKey, json!("key")).await.unwrap();
        f.service.start().await.unwrap();

        f.bus.publish(Message::QuotaExceeded);
        sleep(Duration::from_millis(10)).await;
        assert!(is_quota_exceeded(f.store.as_ref()).await.unwrap());

        f.service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_quota_flag_requires_key() {
        let f = fixture();
        assert!(!persist_quota_flag(f.store.as_ref()).await.unwrap());
        assert!(!is_quota_exceeded(f.store.as_ref()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_failure_is_reported() {
        let f = fixture();
        seed_registry(&f.store).await;
        f.store.set_reject_writes(true);
        f.service.start().await.unwrap();

        sleep(Duration::from_secs(24 * 60 * 60 + 1)).await;
        assert_eq!(f.sink.count(FailureKind::PersistenceFailure), 1);

        f.service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let f = fixture();
        f.service.start().await.unwrap();
        assert!(f.service.start().await.is_err());
        f.service.stop().await.unwrap();
        f.service.stop().await.unwrap();
    }
}
