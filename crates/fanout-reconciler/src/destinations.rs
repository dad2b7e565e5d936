//! Resolves subscriber, reply and dead-letter sink into `status.physicalSubscription`.

use std::sync::Arc;

use fanout_core::{Channelable, Subscription, is_nil_or_empty_destination};
use url::Url;

use crate::error::{ReconcileError, reasons};
use crate::resolver::{DestinationResolver, GroupResolver, ResolveError};

pub struct DestinationResolution {
    resolver: Arc<dyn DestinationResolver>,
    group_resolver: Option<Arc<dyn GroupResolver>>,
}

impl DestinationResolution {
    pub fn new(resolver: Arc<dyn DestinationResolver>) -> Self {
        Self {
            resolver,
            group_resolver: None,
        }
    }

    pub fn with_group_resolver(mut self, resolver: Arc<dyn GroupResolver>) -> Self {
        self.group_resolver = Some(resolver);
        self
    }

    /// Resolves the three destinations in order, stopping at the first failure.
    pub async fn resolve_subscription_uris(
        &self,
        sub: &mut Subscription,
        channel: &Channelable,
        group_enabled: bool,
    ) -> Result<(), ReconcileError> {
        sub.status.mark_references_resolved_unknown(
            reasons::RESOLVING,
            "Subscription resolution interrupted.",
        );

        self.resolve_subscriber(sub, group_enabled).await?;
        self.resolve_reply(sub).await?;
        self.resolve_dead_letter_sink(sub, channel).await?;

        sub.status.mark_references_resolved();
        Ok(())
    }

    async fn resolve_subscriber(
        &self,
        sub: &mut Subscription,
        group_enabled: bool,
    ) -> Result<(), ReconcileError> {
        if is_nil_or_empty_destination(sub.spec.subscriber.as_ref()) {
            sub.status.physical_subscription.subscriber_uri = None;
            return Ok(());
        }
        let Some(mut subscriber) = sub.spec.subscriber.clone() else {
            return Ok(());
        };
        subscriber.set_defaults(sub.namespace());

        if group_enabled
            && let (Some(reference), Some(groups)) =
                (subscriber.reference.as_ref(), self.group_resolver.as_ref())
        {
            match groups.resolve_group(reference).await {
                Ok(resolved) => {
                    tracing::debug!(subscriber = %resolved, "Group resolved");
                    subscriber.reference = Some(resolved);
                }
                Err(e) => {
                    tracing::warn!(error = %e, subscriber = ?subscriber, "Failed to resolve Subscriber.Ref");
                    return Err(fail(
                        sub,
                        reasons::SUBSCRIBER_RESOLVE_FAILED,
                        format!("Failed to resolve spec.subscriber.ref: {e}"),
                        e,
                    ));
                }
            }
        }

        match self
            .resolver
            .resolve(&subscriber, &sub.object_reference())
            .await
        {
            Ok(uri) => {
                let status = &mut sub.status.physical_subscription;
                if changed(status.subscriber_uri.as_ref(), &uri) {
                    tracing::debug!(subscriber_uri = %uri, "Resolved Subscriber");
                    status.subscriber_uri = Some(uri);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, subscriber = ?subscriber, "Failed to resolve Subscriber");
                Err(fail(
                    sub,
                    reasons::SUBSCRIBER_RESOLVE_FAILED,
                    format!("Failed to resolve spec.subscriber: {e}"),
                    e,
                ))
            }
        }
    }

    async fn resolve_reply(&self, sub: &mut Subscription) -> Result<(), ReconcileError> {
        if is_nil_or_empty_destination(sub.spec.reply.as_ref()) {
            sub.status.physical_subscription.reply_uri = None;
            return Ok(());
        }
        let Some(mut reply) = sub.spec.reply.clone() else {
            return Ok(());
        };
        reply.set_defaults(sub.namespace());

        match self.resolver.resolve(&reply, &sub.object_reference()).await {
            Ok(uri) => {
                let status = &mut sub.status.physical_subscription;
                if changed(status.reply_uri.as_ref(), &uri) {
                    tracing::debug!(reply_uri = %uri, "Resolved reply");
                    status.reply_uri = Some(uri);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, reply = ?reply, "Failed to resolve reply");
                Err(fail(
                    sub,
                    reasons::REPLY_RESOLVE_FAILED,
                    format!("Failed to resolve spec.reply: {e}"),
                    e,
                ))
            }
        }
    }

    /// The Subscription's own sink wins, with no fallback when it fails. Without
    /// one, a Channel that declares a sink must have published its URI in status.
    async fn resolve_dead_letter_sink(
        &self,
        sub: &mut Subscription,
        channel: &Channelable,
    ) -> Result<(), ReconcileError> {
        let declared = sub
            .spec
            .delivery
            .as_ref()
            .and_then(|d| d.dead_letter_sink.clone());

        if let Some(mut sink) = declared {
            // never handed to the resolver
            if sink.is_empty() {
                sub.status.physical_subscription.dead_letter_sink_uri = None;
                let e = ResolveError::EmptyDestination;
                tracing::warn!(error = %e, "Failed to resolve spec.delivery.deadLetterSink");
                return Err(fail(
                    sub,
                    reasons::DEAD_LETTER_SINK_RESOLVE_FAILED,
                    format!("Failed to resolve spec.delivery.deadLetterSink: {e}"),
                    e,
                ));
            }
            sink.set_defaults(sub.namespace());
            return match self.resolver.resolve(&sink, &sub.object_reference()).await {
                Ok(uri) => {
                    tracing::debug!(dead_letter_sink_uri = %uri, "Resolved deadLetterSink");
                    sub.status.physical_subscription.dead_letter_sink_uri = Some(uri);
                    Ok(())
                }
                Err(e) => {
                    sub.status.physical_subscription.dead_letter_sink_uri = None;
                    tracing::warn!(error = %e, dead_letter_sink = ?sink, "Failed to resolve spec.delivery.deadLetterSink");
                    Err(fail(
                        sub,
                        reasons::DEAD_LETTER_SINK_RESOLVE_FAILED,
                        format!("Failed to resolve spec.delivery.deadLetterSink: {e}"),
                        e,
                    ))
                }
            };
        }

        let channel_declares_sink = channel
            .spec
            .delivery
            .as_ref()
            .is_some_and(|d| d.dead_letter_sink.is_some());
        if channel_declares_sink {
            if let Some(uri) = channel.status.dead_letter_sink_uri.clone() {
                tracing::debug!(dead_letter_sink_uri = %uri, "Resolved channel deadLetterSink");
                sub.status.physical_subscription.dead_letter_sink_uri = Some(uri);
                return Ok(());
            }
            sub.status.physical_subscription.dead_letter_sink_uri = None;
            tracing::warn!(channel = %channel.name(), "Channel didn't set status.deadLetterSinkUri");
            let message = format!(
                "channel {} didn't set status.deadLetterSinkUri",
                channel.name()
            );
            sub.status.mark_references_not_resolved(
                reasons::DEAD_LETTER_SINK_RESOLVE_FAILED,
                message.clone(),
            );
            return Err(ReconcileError::new(
                reasons::DEAD_LETTER_SINK_RESOLVE_FAILED,
                message,
            ));
        }

        sub.status.physical_subscription.dead_letter_sink_uri = None;
        Ok(())
    }
}

fn changed(current: Option<&Url>, resolved: &Url) -> bool {
    current.is_none_or(|c| c != resolved)
}

fn fail(
    sub: &mut Subscription,
    reason: &'static str,
    message: String,
    source: impl Into<crate::error::BoxError>,
) -> ReconcileError {
    sub.status.mark_references_not_resolved(reason, message.clone());
    ReconcileError::new(reason, message).with_source(source)
}
