//! Keeps a Subscription's entry in its Channel's `spec.subscribers` in sync.

use fanout_core::{Channelable, SubscriberSpec, Subscription};
use fanout_storage::patch::{create_merge_patch, is_empty_patch};
use fanout_storage::{DynStore, StorageError};
use serde_json::Value;

use crate::delivery::delivery_spec;
use crate::error::{ReconcileError, ReconcileEvent, reasons};

pub struct ChannelSync {
    store: DynStore,
}

impl ChannelSync {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// Adds, updates or (for a Subscription being deleted) removes the entry
    /// and updates the AddedToChannel condition.
    pub async fn sync_channel(
        &self,
        channel: &Channelable,
        sub: &mut Subscription,
    ) -> Result<Option<ReconcileEvent>, ReconcileError> {
        let deleting = sub.is_being_deleted();
        match self.sync_physical_channel(sub, channel, deleting).await {
            Err(e) => {
                tracing::warn!(channel = %channel.name(), error = %e, "Failed to sync physical Channel");
                sub.status.mark_not_added_to_channel(
                    reasons::PHYSICAL_CHANNEL_SYNC_FAILED,
                    format!("Failed to sync physical Channel: {e}"),
                );
                Err(ReconcileError::new(
                    reasons::PHYSICAL_CHANNEL_SYNC_FAILED,
                    format!("Failed to synchronize to channel {:?}: {e}", channel.name()),
                )
                .with_source(e))
            }
            Ok(true) if deleting => Ok(Some(ReconcileEvent::normal(
                reasons::SUBSCRIBER_REMOVED,
                format!("Subscription was removed from channel {:?}", channel.name()),
            ))),
            Ok(true) => {
                sub.status.mark_added_to_channel();
                Ok(Some(ReconcileEvent::normal(
                    reasons::SUBSCRIBER_SYNC,
                    format!("Subscription was synchronized to channel {:?}", channel.name()),
                )))
            }
            Ok(false) => {
                if !deleting {
                    sub.status.mark_added_to_channel();
                }
                Ok(None)
            }
        }
    }

    async fn sync_physical_channel(
        &self,
        sub: &Subscription,
        channel: &Channelable,
        is_deleted: bool,
    ) -> Result<bool, StorageError> {
        tracing::debug!(subscription = %sub.name(), channel = %channel.name(), "Reconciling physical from Channel");
        match self.patch_subscription(channel, sub).await {
            Err(e) if is_deleted && e.is_not_found() => {
                tracing::warn!(channel = %sub.spec.channel, "Could not find Channel");
                Ok(false)
            }
            other => other,
        }
    }

    /// Returns whether a patch was sent.
    async fn patch_subscription(
        &self,
        channel: &Channelable,
        sub: &Subscription,
    ) -> Result<bool, StorageError> {
        let mut after = channel.clone();
        if sub.is_being_deleted() {
            remove_subscriber(&mut after, sub);
        } else {
            add_subscriber(&mut after, sub, channel);
        }

        let mut patch = create_merge_patch(&serde_json::to_value(channel)?, &serde_json::to_value(&after)?);
        // `{}` means nothing to do
        if is_empty_patch(&patch) {
            return Ok(false);
        }
        if !channel.metadata.resource_version.is_empty() {
            patch["metadata"]["resourceVersion"] =
                Value::String(channel.metadata.resource_version.clone());
        }

        let bytes = serde_json::to_vec(&patch)?;
        let reference = channel.object_reference();
        if let Err(e) = self.store.patch(&reference, &bytes).await {
            tracing::warn!(channel = %reference, error = %e, patch = %patch, "Failed to patch the Channel");
            return Err(e);
        }
        tracing::debug!(channel = %reference, patch = %patch, "Patched resource");
        Ok(true)
    }
}

fn remove_subscriber(channel: &mut Channelable, sub: &Subscription) {
    channel.spec.subscribers.retain(|s| s.uid != sub.uid());
}

fn add_subscriber(after: &mut Channelable, sub: &Subscription, original: &Channelable) {
    let physical = &sub.status.physical_subscription;
    let delivery = delivery_spec(sub, original);

    if let Some(existing) = after.spec.subscribers.iter_mut().find(|s| s.uid == sub.uid()) {
        existing.generation = sub.generation();
        existing.subscriber_uri = physical.subscriber_uri.clone();
        existing.reply_uri = physical.reply_uri.clone();
        existing.delivery = delivery;
        return;
    }

    after.spec.subscribers.push(SubscriberSpec {
        uid: sub.uid().to_string(),
        generation: sub.generation(),
        subscriber_uri: physical.subscriber_uri.clone(),
        reply_uri: physical.reply_uri.clone(),
        delivery,
    });
}
