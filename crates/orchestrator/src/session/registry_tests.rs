use super::*;
use crate::event::EventBus;
use crate::ssh::{HostKeyPolicy, SshAuth};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn target() -> ConnectTarget {
    ConnectTarget {
        host: "127.0.0.1".into(),
        port: 1,
        username: "root".into(),
        auth: SshAuth::Password("x".into()),
        host_key_policy: HostKeyPolicy::TrustOnFirstUse,
    }
}

async fn registry_deps() -> (Arc<EventBus>, huntd_store::AsyncStore, CancellationToken) {
    let bus = Arc::new(EventBus::new(64));
    let store = huntd_store::AsyncStore::open_in_memory().unwrap();
    (bus, store, CancellationToken::new())
}

#[tokio::test]
async fn same_analyst_and_asset_reuses_the_existing_session() {
    let registry = SessionRegistry::new();
    let (bus, store, None, shutdown) = registry_deps().await;

    let a = registry
        .get_or_create("analyst-1", "asset-1", target(), None, bus.clone(), store.clone(), None, shutdown.clone())
        .await;
    let b = registry
        .get_or_create("analyst-1", "asset-1", target(), None, bus.clone(), store.clone(), None, shutdown.clone())
        .await;

    assert_eq!(a.meta.id, b.meta.id);
    assert_eq!(registry.list().len(), 1);
}

#[tokio::test]
async fn different_asset_gets_a_distinct_session() {
    let registry = SessionRegistry::new();
    let (bus, store, None, shutdown) = registry_deps().await;

    let a = registry
        .get_or_create("analyst-1", "asset-1", target(), None, bus.clone(), store.clone(), None, shutdown.clone())
        .await;
    let b = registry
        .get_or_create("analyst-1", "asset-2", target(), None, bus.clone(), store.clone(), None, shutdown.clone())
        .await;

    assert_ne!(a.meta.id, b.meta.id);
    assert_eq!(registry.list().len(), 2);
}

#[tokio::test]
async fn different_analyst_gets_a_distinct_session_for_the_same_asset() {
    let registry = SessionRegistry::new();
    let (bus, store, None, shutdown) = registry_deps().await;

    let a = registry
        .get_or_create("analyst-1", "asset-1", target(), None, bus.clone(), store.clone(), None, shutdown.clone())
        .await;
    let b = registry
        .get_or_create("analyst-2", "asset-1", target(), None, bus.clone(), store.clone(), None, shutdown.clone())
        .await;

    assert_ne!(a.meta.id, b.meta.id);
}

#[tokio::test]
async fn get_finds_a_session_by_id() {
    let registry = SessionRegistry::new();
    let (bus, store, None, shutdown) = registry_deps().await;

    let a = registry.get_or_create("analyst-1", "asset-1", target(), None, bus, store, None, shutdown).await;
    let found = registry.get(&a.meta.id).unwrap();
    assert_eq!(found.meta.id, a.meta.id);
    assert!(registry.get("does-not-exist").is_none());
}
