//! Channel shapes.
//!
//! [`Channelable`] is the capability every concrete channel implementation
//! exposes: a subscriber list in its spec and per-subscriber readiness in its
//! status. It is read from arbitrary kinds (`InMemoryChannel`, `KafkaChannel`,
//! ...), so conversion from JSON is the capability check.
//!
//! [`ChannelClass`] is the generic `Channel` kind which only points at a
//! backing Channelable through `status.channel`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::conditions::{self, Condition, ConditionStatus, CONDITION_READY};
use crate::destination::DeliverySpec;
use crate::error::{CoreError, Result};
use crate::meta::{self, ObjectMeta, TypeMeta};
use crate::reference::{KReference, ObjectReference};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channelable {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: ChannelableSpec,
    #[serde(default)]
    pub status: ChannelableStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelableSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscribers: Vec<SubscriberSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliverySpec>,
}

/// One entry of a channel's subscriber list, owned by the subscription with the same UID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberSpec {
    pub uid: String,
    #[serde(default)]
    pub generation: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_uri: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_uri: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliverySpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelableStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscribers: Vec<SubscriberStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_sink_uri: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Addressable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Readiness of one subscriber as reported by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberStatus {
    pub uid: String,
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub ready: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Addressable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
}

impl Channelable {
    /// Convert a stored object into a Channelable.
    ///
    /// Fails when the object lacks a spec or its subscriber list is malformed.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        serde_json::from_value(value)
            .map_err(|e| CoreError::invalid_object(kind, format!("not Channelable: {e}")))
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn object_reference(&self) -> ObjectReference {
        meta::object_reference(&self.type_meta, &self.metadata)
    }

    pub fn is_ready(&self) -> bool {
        conditions::get(&self.status.conditions, CONDITION_READY).is_some_and(Condition::is_true)
    }

    /// Status reported for `uid`, only if it matches `generation`.
    pub fn subscriber_status(&self, uid: &str, generation: i64) -> Option<&SubscriberStatus> {
        self.status
            .subscribers
            .iter()
            .find(|s| s.uid == uid && s.observed_generation == generation)
    }

    pub fn subscriber(&self, uid: &str) -> Option<&SubscriberSpec> {
        self.spec.subscribers.iter().find(|s| s.uid == uid)
    }
}

/// The generic `Channel` kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelClass {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ChannelClassSpec,
    #[serde(default)]
    pub status: ChannelClassStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelClassSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_template: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliverySpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelClassStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Pointer to the backing Channelable, published once it exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<BackingChannelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Addressable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackingChannelRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl ChannelClass {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| CoreError::invalid_object("Channel", e.to_string()))
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl ChannelClassStatus {
    pub fn is_ready(&self) -> bool {
        conditions::get(&self.conditions, CONDITION_READY).is_some_and(Condition::is_true)
    }
}

impl BackingChannelRef {
    /// Reference to the backing channel, which always lives in `namespace`.
    pub fn to_kreference(&self, namespace: &str) -> KReference {
        KReference::new(self.api_version.clone(), self.kind.clone(), self.name.clone())
            .in_namespace(namespace)
    }
}
