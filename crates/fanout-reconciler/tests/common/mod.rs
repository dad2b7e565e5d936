//! Shared fixtures for the reconciler integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use fanout_config::LoggingConfig;
use fanout_core::{Channelable, ObjectReference, Subscription};
use fanout_db_memory::{InMemoryStore, InMemoryTracker};
use fanout_reconciler::{
    AddressResolver, MemoryRecorder, Reconciler, SubscriptionController,
};
use fanout_storage::{DynStore, ResourceStore, StoredResource};
use serde_json::{Value, json};

pub const NS: &str = "default";

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub tracker: InMemoryTracker,
    pub recorder: Arc<MemoryRecorder>,
    pub controller: SubscriptionController,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::with_store(store.clone(), store)
    }

    /// `store` is what the reconciler talks to, `inner` is the backing store
    /// tests inspect.
    pub fn with_store(store: DynStore, inner: Arc<InMemoryStore>) -> Self {
        Self::build(store, inner, |r| r)
    }

    pub fn build(
        store: DynStore,
        inner: Arc<InMemoryStore>,
        customize: impl FnOnce(Reconciler) -> Reconciler,
    ) -> Self {
        fanout_reconciler::observability::init_tracing(&LoggingConfig {
            level: "debug".to_string(),
        });

        let tracker = InMemoryTracker::new();
        let resolver = Arc::new(AddressResolver::new(store.clone(), Arc::new(tracker.clone())));
        let reconciler = customize(Reconciler::new(store.clone(), Arc::new(tracker.clone()), resolver));
        let recorder = Arc::new(MemoryRecorder::new());
        let controller = SubscriptionController::new(store, reconciler, recorder.clone());
        Self {
            store: inner,
            tracker,
            recorder,
            controller,
        }
    }

    pub async fn create(&self, resource: Value) -> StoredResource {
        self.store.create(&resource).await.expect("create fixture")
    }

    pub async fn subscription(&self, name: &str) -> Option<Subscription> {
        self.store
            .read(&subscription_ref(name))
            .await
            .expect("read subscription")
            .map(|s| Subscription::from_value(s.resource).expect("valid subscription"))
    }

    pub async fn channel(&self, kind: &str, name: &str) -> StoredResource {
        self.store
            .read(&channel_ref(kind, name))
            .await
            .expect("read channel")
            .expect("channel exists")
    }

    pub async fn channelable(&self, kind: &str, name: &str) -> Channelable {
        Channelable::from_value(self.channel(kind, name).await.resource).expect("channelable")
    }

    /// Plays the channel implementation reporting readiness for `uid`.
    pub async fn report_subscriber(&self, kind: &str, name: &str, uid: &str, generation: i64, ready: &str) {
        let patch = json!({
            "status": {"subscribers": [{"uid": uid, "observedGeneration": generation, "ready": ready}]}
        });
        self.store
            .patch(&channel_ref(kind, name), &serde_json::to_vec(&patch).unwrap())
            .await
            .expect("report subscriber status");
    }
}

pub fn subscription_ref(name: &str) -> ObjectReference {
    ObjectReference::new("messaging.knative.dev/v1", "Subscription", NS, name)
}

pub fn channel_ref(kind: &str, name: &str) -> ObjectReference {
    ObjectReference::new("messaging.knative.dev/v1", kind, NS, name)
}

pub fn in_memory_channel(name: &str) -> Value {
    json!({
        "apiVersion": "messaging.knative.dev/v1",
        "kind": "InMemoryChannel",
        "metadata": {"name": name, "namespace": NS},
        "spec": {},
        "status": {
            "address": {"url": format!("http://{name}-kn-channel.{NS}.svc.cluster.local/")},
            "conditions": [{"type": "Ready", "status": "True"}]
        }
    })
}

pub fn channel_class(name: &str, ready: bool, backing: Option<&str>) -> Value {
    let mut status = json!({
        "conditions": [{"type": "Ready", "status": if ready { "True" } else { "Unknown" }}]
    });
    if let Some(backing) = backing {
        status["channel"] = json!({
            "apiVersion": "messaging.knative.dev/v1",
            "kind": "InMemoryChannel",
            "name": backing
        });
    }
    json!({
        "apiVersion": "messaging.knative.dev/v1",
        "kind": "Channel",
        "metadata": {"name": name, "namespace": NS},
        "spec": {"channelTemplate": {"apiVersion": "messaging.knative.dev/v1", "kind": "InMemoryChannel"}},
        "status": status
    })
}

pub fn service(name: &str) -> Value {
    json!({
        "apiVersion": "serving.knative.dev/v1",
        "kind": "Service",
        "metadata": {"name": name, "namespace": NS},
        "spec": {},
        "status": {"address": {"url": format!("http://{name}.{NS}.example.com/")}}
    })
}

pub fn subscription(name: &str, channel_kind: &str, channel: &str, subscriber: &str) -> Value {
    json!({
        "apiVersion": "messaging.knative.dev/v1",
        "kind": "Subscription",
        "metadata": {"name": name, "namespace": NS},
        "spec": {
            "channel": {"apiVersion": "messaging.knative.dev/v1", "kind": channel_kind, "name": channel},
            "subscriber": {"ref": {"apiVersion": "serving.knative.dev/v1", "kind": "Service", "name": subscriber}}
        }
    })
}
