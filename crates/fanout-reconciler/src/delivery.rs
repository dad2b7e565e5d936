//! Effective delivery policy published into a Channel's subscriber entry.

use fanout_core::{Channelable, DeliverySpec, Subscription};

/// Computes the delivery policy for `sub`'s entry in `channel`.
///
/// The dead-letter sink is always the resolved URI from the Subscription's
/// status, never a reference. Retry settings come all-or-nothing from one
/// source: the Subscription's own delivery if it has one, otherwise the
/// Channel's default. Returns `None` rather than an empty policy.
pub fn delivery_spec(sub: &Subscription, channel: &Channelable) -> Option<DeliverySpec> {
    let mut delivery = sub
        .status
        .physical_subscription
        .dead_letter_sink_uri
        .clone()
        .map(DeliverySpec::with_dead_letter_uri);

    let source = match (&sub.spec.delivery, &channel.spec.delivery) {
        (None, Some(channel_default)) => Some(channel_default),
        (own, _) => own.as_ref(),
    };

    if let Some(source) = source.filter(|s| s.has_retry_settings()) {
        delivery
            .get_or_insert_with(DeliverySpec::default)
            .copy_retry_settings(source);
    }
    delivery
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::{BackoffPolicy, ChannelableSpec, KReference, ObjectMeta, SubscriptionSpec, TypeMeta};
    use url::Url;

    fn sub(delivery: Option<DeliverySpec>, dls: Option<&str>) -> Subscription {
        let mut spec = SubscriptionSpec::for_channel(KReference::new(
            "messaging.knative.dev/v1",
            "InMemoryChannel",
            "orders",
        ));
        spec.delivery = delivery;
        let mut s = Subscription::new(ObjectMeta::new("default", "sub"), spec);
        s.status.physical_subscription.dead_letter_sink_uri = dls.map(|u| Url::parse(u).unwrap());
        s
    }

    fn channel(delivery: Option<DeliverySpec>) -> Channelable {
        Channelable {
            type_meta: TypeMeta::new("messaging.knative.dev/v1", "InMemoryChannel"),
            metadata: ObjectMeta::new("default", "orders"),
            spec: ChannelableSpec {
                subscribers: Vec::new(),
                delivery,
            },
            status: Default::default(),
        }
    }

    fn all_retry() -> DeliverySpec {
        DeliverySpec {
            dead_letter_sink: None,
            retry: Some(5),
            backoff_policy: Some(BackoffPolicy::Linear),
            backoff_delay: Some("PT1S".to_string()),
            timeout: Some("PT10S".to_string()),
            retry_after_max: Some("PT30S".to_string()),
        }
    }

    #[test]
    fn test_no_policy_anywhere_is_none() {
        assert_eq!(delivery_spec(&sub(None, None), &channel(None)), None);
    }

    #[test]
    fn test_dead_letter_only() {
        let d = delivery_spec(&sub(None, Some("http://dls/")), &channel(None)).unwrap();
        assert_eq!(d.dead_letter_sink_uri(), Some("http://dls/"));
        assert!(!d.has_retry_settings());
    }

    #[test]
    fn test_channel_default_copies_all_five() {
        let d = delivery_spec(&sub(None, Some("http://dls/")), &channel(Some(all_retry()))).unwrap();
        let expected = DeliverySpec {
            dead_letter_sink: DeliverySpec::with_dead_letter_uri(Url::parse("http://dls/").unwrap())
                .dead_letter_sink,
            ..all_retry()
        };
        assert_eq!(d, expected);
    }

    #[test]
    fn test_channel_default_with_only_sink_adds_nothing() {
        let channel_default = DeliverySpec::with_dead_letter_uri(Url::parse("http://declared/").unwrap());
        assert_eq!(delivery_spec(&sub(None, None), &channel(Some(channel_default))), None);
    }

    #[test]
    fn test_subscription_override_wins_wholesale() {
        let own = DeliverySpec {
            retry: Some(1),
            ..Default::default()
        };
        let d = delivery_spec(&sub(Some(own), None), &channel(Some(all_retry()))).unwrap();
        assert_eq!(d.retry, Some(1));
        // nothing leaks in from the channel default
        assert_eq!(d.backoff_policy, None);
        assert_eq!(d.timeout, None);
        assert_eq!(d.retry_after_max, None);
    }

    #[test]
    fn test_subscription_override_without_retry_settings() {
        let own = DeliverySpec::default();
        assert_eq!(delivery_spec(&sub(Some(own), None), &channel(Some(all_retry()))), None);
    }
}
