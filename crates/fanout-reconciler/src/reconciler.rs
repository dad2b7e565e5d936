//! Subscription reconciliation.
//!
//! [`Reconciler::reconcile_kind`] runs the active path:
//! locate the Channel, resolve destinations, sync the Channel, then fold the
//! Channel's view of the subscriber back into status. Each step aborts the
//! pass on failure, leaving the reason on the Subscription's conditions.
//!
//! [`Reconciler::finalize_kind`] runs while the Subscription is being
//! deleted and removes its entry from the Channel.

use std::sync::Arc;

use fanout_config::{FeatureFlags, ReconcilerConfig};
use fanout_core::Subscription;
use fanout_storage::{DynStore, DynTracker};

use crate::destinations::DestinationResolution;
use crate::error::{ReconcileError, ReconcileResult, reasons};
use crate::locator::{ChannelLocator, LocateError};
use crate::resolver::{DestinationResolver, GroupResolver};
use crate::status::check_channel_status_for_subscription;
use crate::sync::ChannelSync;

pub struct Reconciler {
    locator: ChannelLocator,
    destinations: DestinationResolution,
    sync: ChannelSync,
    features: FeatureFlags,
}

impl Reconciler {
    pub fn new(
        store: DynStore,
        tracker: DynTracker,
        resolver: Arc<dyn DestinationResolver>,
    ) -> Self {
        Self {
            locator: ChannelLocator::new(Arc::clone(&store), tracker),
            destinations: DestinationResolution::new(resolver),
            sync: ChannelSync::new(store),
            features: FeatureFlags::with_defaults(),
        }
    }

    /// Applies the channel-class kind and feature flags from `config`.
    pub fn with_config(mut self, config: &ReconcilerConfig) -> Self {
        self.locator = self.locator.with_channel_class(config.channel_class.clone());
        self.features = config.features.clone();
        self
    }

    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Used for both the channel reference and `spec.subscriber.ref` when
    /// `kreference.group.enabled` is on.
    pub fn with_group_resolver(mut self, resolver: Arc<dyn GroupResolver>) -> Self {
        self.locator = self.locator.with_group_resolver(Arc::clone(&resolver));
        self.destinations = self.destinations.with_group_resolver(resolver);
        self
    }

    pub fn with_channelable_tracker(mut self, tracker: DynTracker) -> Self {
        self.locator = self.locator.with_channelable_tracker(tracker);
        self
    }

    fn group_enabled(&self, sub: &Subscription) -> bool {
        self.locator.group_resolver().is_some()
            && self.features.kreference_group_enabled(sub.namespace())
    }

    pub async fn reconcile_kind(&self, sub: &mut Subscription) -> ReconcileResult {
        let group_enabled = self.group_enabled(sub);

        let channel = match self.locator.locate(sub, group_enabled).await {
            Ok(channel) => channel,
            Err(e) => {
                tracing::warn!(
                    channel = %sub.spec.channel,
                    error = %e,
                    "Failed to get Spec.Channel or backing channel as Channelable duck type"
                );
                let message = format!("Failed to get Spec.Channel or backing channel: {e}");
                sub.status.mark_references_resolved_unknown(
                    reasons::CHANNEL_REFERENCE_FAILED,
                    message.clone(),
                );
                return Err(channel_reference_failed(message, e));
            }
        };

        self.destinations
            .resolve_subscription_uris(sub, &channel, group_enabled)
            .await?;

        // A write means the Channel has not seen this entry yet; the Channel's
        // status update triggers the next pass.
        if let Some(event) = self.sync.sync_channel(&channel, sub).await? {
            return Ok(Some(event));
        }

        check_channel_status_for_subscription(&channel, sub)?;
        Ok(None)
    }

    pub async fn finalize_kind(&self, sub: &mut Subscription) -> ReconcileResult {
        let channel = match self.locator.locate(sub, self.group_enabled(sub)).await {
            Ok(channel) => channel,
            // nothing left to remove the entry from
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                let message = format!("Failed to get Spec.Channel or backing channel: {e}");
                return Err(channel_reference_failed(message, e));
            }
        };

        if sub.status.is_added_to_channel() {
            return self.sync.sync_channel(&channel, sub).await;
        }
        Ok(None)
    }
}

fn channel_reference_failed(message: String, e: LocateError) -> ReconcileError {
    let permanent = e.is_permanent();
    ReconcileError::new(reasons::CHANNEL_REFERENCE_FAILED, message)
        .with_source(e)
        .into_permanent(permanent)
}
