use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::conditions::{self, Condition, ConditionSet, CONDITION_READY};
use crate::destination::{DeliverySpec, Destination};
use crate::error::Result;
use crate::meta::{self, ObjectMeta, TypeMeta};
use crate::reference::{KReference, ObjectReference};

pub const SUBSCRIPTION_API_VERSION: &str = "messaging.knative.dev/v1";
pub const SUBSCRIPTION_KIND: &str = "Subscription";
pub const SUBSCRIPTION_FINALIZER: &str = "subscriptions.messaging.knative.dev";

pub const CONDITION_REFERENCES_RESOLVED: &str = "ReferencesResolved";
pub const CONDITION_ADDED_TO_CHANNEL: &str = "AddedToChannel";
pub const CONDITION_CHANNEL_READY: &str = "ChannelReady";

pub const SUBSCRIPTION_CONDITION_SET: ConditionSet = ConditionSet::new(
    CONDITION_READY,
    &[
        CONDITION_REFERENCES_RESOLVED,
        CONDITION_ADDED_TO_CHANNEL,
        CONDITION_CHANNEL_READY,
    ],
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: SubscriptionSpec,
    #[serde(default)]
    pub status: SubscriptionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    pub channel: KReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber: Option<Destination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Destination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliverySpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub physical_subscription: PhysicalSubscription,
}

/// Resolved addresses of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalSubscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_uri: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_uri: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_sink_uri: Option<Url>,
}

impl Subscription {
    pub fn new(metadata: ObjectMeta, spec: SubscriptionSpec) -> Self {
        Self {
            type_meta: TypeMeta::new(SUBSCRIPTION_API_VERSION, SUBSCRIPTION_KIND),
            metadata,
            spec,
            status: SubscriptionStatus::default(),
        }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn uid(&self) -> &str {
        &self.metadata.uid
    }

    pub fn generation(&self) -> i64 {
        self.metadata.generation
    }

    pub fn is_being_deleted(&self) -> bool {
        self.metadata.is_being_deleted()
    }

    pub fn object_reference(&self) -> ObjectReference {
        meta::object_reference(&self.type_meta, &self.metadata)
    }
}

impl SubscriptionSpec {
    pub fn for_channel(channel: KReference) -> Self {
        Self {
            channel,
            subscriber: None,
            reply: None,
            delivery: None,
        }
    }

    pub fn with_subscriber(mut self, subscriber: Destination) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    pub fn with_reply(mut self, reply: Destination) -> Self {
        self.reply = Some(reply);
        self
    }

    pub fn with_delivery(mut self, delivery: DeliverySpec) -> Self {
        self.delivery = Some(delivery);
        self
    }
}

impl SubscriptionStatus {
    pub fn initialize_conditions(&mut self) {
        SUBSCRIPTION_CONDITION_SET.initialize(&mut self.conditions);
    }

    pub fn get_condition(&self, condition_type: &str) -> Option<&Condition> {
        conditions::get(&self.conditions, condition_type)
    }

    pub fn is_ready(&self) -> bool {
        SUBSCRIPTION_CONDITION_SET.is_happy(&self.conditions)
    }

    pub fn is_added_to_channel(&self) -> bool {
        self.get_condition(CONDITION_ADDED_TO_CHANNEL)
            .is_some_and(Condition::is_true)
    }

    pub fn mark_references_resolved(&mut self) {
        SUBSCRIPTION_CONDITION_SET.mark_true(&mut self.conditions, CONDITION_REFERENCES_RESOLVED);
    }

    pub fn mark_references_not_resolved(&mut self, reason: &str, message: impl Into<String>) {
        SUBSCRIPTION_CONDITION_SET.mark_false(
            &mut self.conditions,
            CONDITION_REFERENCES_RESOLVED,
            reason,
            message,
        );
    }

    pub fn mark_references_resolved_unknown(&mut self, reason: &str, message: impl Into<String>) {
        SUBSCRIPTION_CONDITION_SET.mark_unknown(
            &mut self.conditions,
            CONDITION_REFERENCES_RESOLVED,
            reason,
            message,
        );
    }

    pub fn mark_added_to_channel(&mut self) {
        SUBSCRIPTION_CONDITION_SET.mark_true(&mut self.conditions, CONDITION_ADDED_TO_CHANNEL);
    }

    pub fn mark_not_added_to_channel(&mut self, reason: &str, message: impl Into<String>) {
        SUBSCRIPTION_CONDITION_SET.mark_false(
            &mut self.conditions,
            CONDITION_ADDED_TO_CHANNEL,
            reason,
            message,
        );
    }

    pub fn mark_channel_ready(&mut self) {
        SUBSCRIPTION_CONDITION_SET.mark_true(&mut self.conditions, CONDITION_CHANNEL_READY);
    }

    pub fn mark_channel_failed(&mut self, reason: &str, message: impl Into<String>) {
        SUBSCRIPTION_CONDITION_SET.mark_false(
            &mut self.conditions,
            CONDITION_CHANNEL_READY,
            reason,
            message,
        );
    }

    pub fn mark_channel_unknown(&mut self, reason: &str, message: impl Into<String>) {
        SUBSCRIPTION_CONDITION_SET.mark_unknown(
            &mut self.conditions,
            CONDITION_CHANNEL_READY,
            reason,
            message,
        );
    }
}
