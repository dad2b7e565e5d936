//! Destinations and delivery policies.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::reference::KReference;

/// Either a reference to an addressable object, a URI, or both (in which case
/// the URI is resolved relative to the referenced object's address).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Destination {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<KReference>,
    /// Absolute, or relative to the address of `reference`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Destination {
    pub fn from_uri(uri: Url) -> Self {
        Self {
            reference: None,
            uri: Some(uri.into()),
        }
    }

    pub fn from_ref(reference: KReference) -> Self {
        Self {
            reference: Some(reference),
            uri: None,
        }
    }

    /// Neither a reference nor a URI is set.
    pub fn is_empty(&self) -> bool {
        self.reference.is_none() && self.uri.is_none()
    }

    /// Default the reference namespace to the namespace of the owning object.
    pub fn set_defaults(&mut self, parent_namespace: &str) {
        if let Some(reference) = self.reference.as_mut() {
            reference.set_default_namespace(parent_namespace);
        }
    }
}

/// `None` and an empty destination both mean "no target".
pub fn is_nil_or_empty_destination(destination: Option<&Destination>) -> bool {
    destination.is_none_or(Destination::is_empty)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffPolicy {
    Linear,
    Exponential,
}

/// Delivery options for a subscriber.
///
/// Durations are ISO-8601 strings (`PT1S`) and are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_sink: Option<Destination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_policy: Option<BackoffPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_delay: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_max: Option<String>,
}

impl DeliverySpec {
    /// Policy carrying only an already-resolved dead-letter URI.
    pub fn with_dead_letter_uri(uri: Url) -> Self {
        Self {
            dead_letter_sink: Some(Destination::from_uri(uri)),
            ..Default::default()
        }
    }

    /// Any of the retry-related fields is set.
    pub fn has_retry_settings(&self) -> bool {
        self.retry.is_some()
            || self.backoff_policy.is_some()
            || self.backoff_delay.is_some()
            || self.timeout.is_some()
            || self.retry_after_max.is_some()
    }

    /// Copy the retry-related fields wholesale, including unset ones.
    pub fn copy_retry_settings(&mut self, from: &DeliverySpec) {
        self.retry = from.retry;
        self.backoff_policy = from.backoff_policy;
        self.backoff_delay = from.backoff_delay.clone();
        self.timeout = from.timeout.clone();
        self.retry_after_max = from.retry_after_max.clone();
    }

    /// The URI of a dead-letter sink given directly as a URI.
    pub fn dead_letter_sink_uri(&self) -> Option<&str> {
        self.dead_letter_sink.as_ref().and_then(|d| d.uri.as_deref())
    }
}
