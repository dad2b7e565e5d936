//! Finds the Channelable a Subscription points at.
//!
//! `spec.channel` either names a concrete Channelable, or a channel-class
//! object that publishes a pointer to its backing Channelable in
//! `status.channel`. The indirection is followed exactly once.

use std::sync::Arc;

use fanout_config::ChannelClassConfig;
use fanout_core::{ChannelClass, Channelable, CoreError, KReference, ObjectReference, Subscription};
use fanout_storage::{DynStore, DynTracker, StorageError, StoredResource, TrackerError};

use crate::resolver::{GroupResolver, ResolveError};

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error(transparent)]
    Group(ResolveError),

    #[error("invalid channel reference: {0}")]
    InvalidReference(CoreError),

    #[error("TrackerFailed: unable to track changes to spec.channel: {0}")]
    Tracker(#[from] TrackerError),

    #[error("{0}")]
    Store(#[from] StorageError),

    #[error("channel is not ready")]
    NotReady,

    #[error("Failed to convert to Channelable Object: {0}")]
    NotChannelable(CoreError),
}

impl LocateError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }

    /// Conversion failures do not go away by resolving again.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::NotChannelable(_))
    }
}

pub struct ChannelLocator {
    store: DynStore,
    channelable_tracker: DynTracker,
    tracker: DynTracker,
    group_resolver: Option<Arc<dyn GroupResolver>>,
    channel_class: ChannelClassConfig,
}

impl ChannelLocator {
    pub fn new(store: DynStore, tracker: DynTracker) -> Self {
        Self {
            store,
            channelable_tracker: Arc::clone(&tracker),
            tracker,
            group_resolver: None,
            channel_class: ChannelClassConfig::default(),
        }
    }

    /// Tracker used for Channelable lookups; defaults to the main tracker.
    pub fn with_channelable_tracker(mut self, tracker: DynTracker) -> Self {
        self.channelable_tracker = tracker;
        self
    }

    pub fn with_group_resolver(mut self, resolver: Arc<dyn GroupResolver>) -> Self {
        self.group_resolver = Some(resolver);
        self
    }

    pub fn with_channel_class(mut self, channel_class: ChannelClassConfig) -> Self {
        self.channel_class = channel_class;
        self
    }

    pub(crate) fn group_resolver(&self) -> Option<&Arc<dyn GroupResolver>> {
        self.group_resolver.as_ref()
    }

    /// Fetches the Channelable for `sub`, following a channel-class pointer.
    pub async fn locate(
        &self,
        sub: &Subscription,
        group_enabled: bool,
    ) -> Result<Channelable, LocateError> {
        tracing::info!(channel = %sub.spec.channel, "Getting channel");

        let mut obj = self
            .track_and_fetch(sub, &sub.spec.channel, group_enabled)
            .await
            .inspect_err(|e| {
                tracing::warn!(channel = %sub.spec.channel, error = %e, "failed");
            })?;

        if obj
            .reference
            .same_group_kind(&self.channel_class.group, &self.channel_class.kind)
        {
            // the channel-class object is tracked on its own, separately from the
            // Channelable lookup above
            let class_ref = obj.reference.clone();
            if let Err(e) = self.tracker.track(&class_ref, &sub.object_reference()).await {
                tracing::info!(channel = %sub.spec.channel, error = %e, "TrackReference for Channel failed");
                return Err(e.into());
            }

            tracing::debug!(channel = %sub.spec.channel, "fetching backing channel");
            let class = self.fetch_channel_class(&class_ref).await?;

            let backing = match class.status.channel.as_ref() {
                Some(backing) if class.status.is_ready() => backing,
                _ => {
                    tracing::warn!(
                        channel = %sub.spec.channel,
                        backing = ?class.status.channel,
                        "backing channel not ready"
                    );
                    return Err(LocateError::NotReady);
                }
            };

            let backing_ref = backing.to_kreference(sub.namespace());
            obj = self.track_and_fetch(sub, &backing_ref, group_enabled).await?;
        }

        Channelable::from_value(obj.resource).map_err(|e| {
            tracing::error!(channel = %sub.spec.channel, error = %e, "Failed to convert to Channelable Object");
            LocateError::NotChannelable(e)
        })
    }

    async fn track_and_fetch(
        &self,
        sub: &Subscription,
        reference: &KReference,
        group_enabled: bool,
    ) -> Result<StoredResource, LocateError> {
        let mut reference = reference.clone();
        if group_enabled && let Some(resolver) = &self.group_resolver {
            reference = resolver.resolve_group(&reference).await.map_err(|e| {
                tracing::warn!(reference = %reference, error = %e, "Failed to resolve Channel reference");
                LocateError::Group(e)
            })?;
        }

        let mut target = reference
            .to_object_reference(sub.namespace())
            .map_err(LocateError::InvalidReference)?;
        // channels are always looked up next to the Subscription
        target.namespace = sub.namespace().to_string();

        // register before reading so a change in between is not missed
        self.channelable_tracker
            .track(&target, &sub.object_reference())
            .await?;

        self.read(&target).await.inspect_err(|e| {
            tracing::error!(channel = %target, error = %e, "Error getting channel");
        })
    }

    async fn fetch_channel_class(
        &self,
        reference: &ObjectReference,
    ) -> Result<ChannelClass, LocateError> {
        let stored = self.read(reference).await?;
        ChannelClass::from_value(stored.resource).map_err(LocateError::InvalidReference)
    }

    async fn read(&self, reference: &ObjectReference) -> Result<StoredResource, LocateError> {
        Ok(self
            .store
            .read(reference)
            .await?
            .ok_or_else(|| StorageError::not_found(reference))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::{ObjectMeta, SubscriptionSpec};
    use fanout_db_memory::{InMemoryStore, InMemoryTracker};
    use fanout_storage::ResourceStore;
    use serde_json::{Value, json};

    fn subscription(channel: KReference) -> Subscription {
        Subscription::new(
            ObjectMeta::new("default", "sub").with_uid("sub-uid"),
            SubscriptionSpec::for_channel(channel),
        )
    }

    fn imc(name: &str) -> Value {
        json!({
            "apiVersion": "messaging.knative.dev/v1",
            "kind": "InMemoryChannel",
            "metadata": {"name": name, "namespace": "default"},
            "spec": {}
        })
    }

    fn channel_class(ready: bool, backing: Option<&str>) -> Value {
        let mut status = json!({
            "conditions": [{"type": "Ready", "status": if ready { "True" } else { "False" }}]
        });
        if let Some(name) = backing {
            status["channel"] = json!({
                "apiVersion": "messaging.knative.dev/v1",
                "kind": "InMemoryChannel",
                "name": name
            });
        }
        json!({
            "apiVersion": "messaging.knative.dev/v1",
            "kind": "Channel",
            "metadata": {"name": "orders", "namespace": "default"},
            "spec": {},
            "status": status
        })
    }

    fn locator(store: &Arc<InMemoryStore>, tracker: &InMemoryTracker) -> ChannelLocator {
        ChannelLocator::new(store.clone(), Arc::new(tracker.clone()))
    }

    #[tokio::test]
    async fn test_locate_direct_channelable() {
        let store = Arc::new(InMemoryStore::new());
        store.create(&imc("orders")).await.unwrap();
        let tracker = InMemoryTracker::new();

        let sub = subscription(KReference::new("messaging.knative.dev/v1", "InMemoryChannel", "orders"));
        let channel = locator(&store, &tracker).locate(&sub, false).await.unwrap();
        assert_eq!(channel.name(), "orders");
        assert_eq!(tracker.tracked_by(&sub.object_reference()).len(), 1);
    }

    #[tokio::test]
    async fn test_locate_follows_backing_pointer_and_tracks_all() {
        let store = Arc::new(InMemoryStore::new());
        store.create(&channel_class(true, Some("orders-kn-channel"))).await.unwrap();
        store.create(&imc("orders-kn-channel")).await.unwrap();
        let tracker = InMemoryTracker::new();

        let sub = subscription(KReference::new("messaging.knative.dev/v1", "Channel", "orders"));
        let channel = locator(&store, &tracker).locate(&sub, false).await.unwrap();
        assert_eq!(channel.name(), "orders-kn-channel");
        assert_eq!(channel.type_meta.kind, "InMemoryChannel");

        let tracked = tracker.tracked_by(&sub.object_reference());
        assert!(tracked.iter().any(|r| r.kind == "Channel" && r.name == "orders"));
        assert!(tracked.iter().any(|r| r.kind == "InMemoryChannel" && r.name == "orders-kn-channel"));
    }

    #[tokio::test]
    async fn test_channel_class_not_ready_never_fetches_backing() {
        let store = Arc::new(InMemoryStore::new());
        store.create(&channel_class(false, Some("orders-kn-channel"))).await.unwrap();
        store.create(&imc("orders-kn-channel")).await.unwrap();
        let tracker = InMemoryTracker::new();

        let sub = subscription(KReference::new("messaging.knative.dev/v1", "Channel", "orders"));
        let err = locator(&store, &tracker).locate(&sub, false).await.unwrap_err();
        assert!(matches!(err, LocateError::NotReady));
        assert_eq!(err.to_string(), "channel is not ready");
        assert!(
            !tracker
                .tracked_by(&sub.object_reference())
                .iter()
                .any(|r| r.kind == "InMemoryChannel")
        );
    }

    #[tokio::test]
    async fn test_ready_channel_class_without_pointer() {
        let store = Arc::new(InMemoryStore::new());
        store.create(&channel_class(true, None)).await.unwrap();
        let tracker = InMemoryTracker::new();

        let sub = subscription(KReference::new("messaging.knative.dev/v1", "Channel", "orders"));
        let err = locator(&store, &tracker).locate(&sub, false).await.unwrap_err();
        assert!(matches!(err, LocateError::NotReady));
    }

    #[tokio::test]
    async fn test_missing_channel_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let tracker = InMemoryTracker::new();

        let sub = subscription(KReference::new("messaging.knative.dev/v1", "InMemoryChannel", "gone"));
        let err = locator(&store, &tracker).locate(&sub, false).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_permanent());
        // tracked even though it does not exist yet
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test]
    async fn test_non_channelable_is_permanent() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create(&json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {"name": "orders", "namespace": "default"},
                "data": {}
            }))
            .await
            .unwrap();
        let tracker = InMemoryTracker::new();

        let sub = subscription(KReference::new("v1", "ConfigMap", "orders"));
        let err = locator(&store, &tracker).locate(&sub, false).await.unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_group_resolution_when_enabled() {
        use crate::resolver::StaticGroupResolver;

        let store = Arc::new(InMemoryStore::new());
        store.create(&imc("orders")).await.unwrap();
        let tracker = InMemoryTracker::new();
        let groups = StaticGroupResolver::new().with_version("messaging.knative.dev", "InMemoryChannel", "v1");
        let locator = locator(&store, &tracker).with_group_resolver(Arc::new(groups));

        let sub = subscription(KReference::with_group("messaging.knative.dev", "InMemoryChannel", "orders"));
        assert_eq!(locator.locate(&sub, true).await.unwrap().name(), "orders");

        // without the flag the reference has no apiVersion
        let err = locator.locate(&sub, false).await.unwrap_err();
        assert!(matches!(err, LocateError::InvalidReference(_)));
    }
}
