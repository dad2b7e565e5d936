//! References given by API group only, resolved when `kreference.group.enabled` is on.

mod common;

use std::sync::Arc;

use common::*;
use fanout_config::{FeatureFlag, FeatureFlags, KREFERENCE_GROUP_FLAG, ReconcilerConfig};
use fanout_db_memory::InMemoryStore;
use fanout_reconciler::{Reconciler, StaticGroupResolver, reasons};
use serde_json::{Value, json};

fn groups() -> Arc<StaticGroupResolver> {
    Arc::new(
        StaticGroupResolver::new()
            .with_version("messaging.knative.dev", "InMemoryChannel", "v1")
            .with_version("serving.knative.dev", "Service", "v1"),
    )
}

fn group_subscription() -> Value {
    json!({
        "apiVersion": "messaging.knative.dev/v1",
        "kind": "Subscription",
        "metadata": {"name": "sub", "namespace": NS},
        "spec": {
            "channel": {"group": "messaging.knative.dev", "kind": "InMemoryChannel", "name": "orders"},
            "subscriber": {"ref": {"group": "serving.knative.dev", "kind": "Service", "name": "handler"}}
        }
    })
}

fn harness(customize: impl FnOnce(Reconciler) -> Reconciler) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    Harness::build(store.clone(), store, customize)
}

async fn seed(h: &Harness) {
    h.create(in_memory_channel("orders")).await;
    h.create(service("handler")).await;
    h.create(group_subscription()).await;
}

#[test]
fn test_config_enabled_group_references_resolve() {
    let config = ReconcilerConfig::from_toml_str(
        r#"
        [[features]]
        name = "kreference.group.enabled"
        enabled = true
        "#,
    )
    .expect("valid config");
    let h = harness(|r| r.with_config(&config).with_group_resolver(groups()));

    tokio_test::block_on(async {
        seed(&h).await;
        h.controller.reconcile(NS, "sub").await.expect("first pass");

        let sub = h.subscription("sub").await.expect("exists");
        assert_eq!(
            sub.status
                .physical_subscription
                .subscriber_uri
                .as_ref()
                .map(|u| u.as_str()),
            Some("http://handler.default.example.com/")
        );
        let channel = h.channelable("InMemoryChannel", "orders").await;
        assert_eq!(channel.spec.subscribers.len(), 1);
        assert_eq!(channel.spec.subscribers[0].uid, sub.uid());
    });
}

#[tokio::test]
async fn test_flag_off_leaves_group_reference_unresolvable() {
    let h = harness(|r| r.with_group_resolver(groups()));
    seed(&h).await;

    let err = h.controller.reconcile(NS, "sub").await.unwrap_err();
    assert_eq!(err.reason(), reasons::CHANNEL_REFERENCE_FAILED);
    assert!(err.message().contains("has no apiVersion"));
    assert!(h.channelable("InMemoryChannel", "orders").await.spec.subscribers.is_empty());
}

#[tokio::test]
async fn test_flag_scoped_to_other_namespace() {
    let mut features = FeatureFlags::with_defaults();
    features.set(FeatureFlag::namespace_based(
        KREFERENCE_GROUP_FLAG,
        vec!["staging".to_string()],
    ));
    let h = harness(|r| r.with_features(features).with_group_resolver(groups()));
    seed(&h).await;

    let err = h.controller.reconcile(NS, "sub").await.unwrap_err();
    assert_eq!(err.reason(), reasons::CHANNEL_REFERENCE_FAILED);
}

#[tokio::test]
async fn test_unknown_subscriber_group_fails_resolution() {
    let mut features = FeatureFlags::with_defaults();
    features.set(FeatureFlag::boolean(KREFERENCE_GROUP_FLAG, true));
    let only_channels = Arc::new(
        StaticGroupResolver::new().with_version("messaging.knative.dev", "InMemoryChannel", "v1"),
    );
    let h = harness(|r| r.with_features(features).with_group_resolver(only_channels));
    seed(&h).await;

    let err = h.controller.reconcile(NS, "sub").await.unwrap_err();
    assert_eq!(err.reason(), reasons::SUBSCRIBER_RESOLVE_FAILED);
    assert!(err.message().starts_with("Failed to resolve spec.subscriber.ref:"));
    assert!(h.channelable("InMemoryChannel", "orders").await.spec.subscribers.is_empty());
}
