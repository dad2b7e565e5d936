//! Storage types.

use fanout_core::ObjectReference;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// An object as stored in the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResource {
    /// Where the object lives.
    pub reference: ObjectReference,
    /// Opaque version, bumped on every write.
    pub resource_version: String,
    /// The full object as JSON, with `metadata.resourceVersion` set.
    pub resource: Value,
    /// When this version was written.
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    /// When the object was originally created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl StoredResource {
    /// Creates a new `StoredResource`.
    #[must_use]
    pub fn new(
        reference: ObjectReference,
        resource_version: impl Into<String>,
        resource: Value,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            reference,
            resource_version: resource_version.into(),
            resource,
            last_updated: now,
            created_at: now,
        }
    }

    /// Creates the next version of this object with updated content.
    #[must_use]
    pub fn new_version(&self, resource_version: impl Into<String>, resource: Value) -> Self {
        Self {
            reference: self.reference.clone(),
            resource_version: resource_version.into(),
            resource,
            last_updated: OffsetDateTime::now_utc(),
            created_at: self.created_at,
        }
    }

    /// Kind of the stored object.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.reference.kind
    }
}

/// Derives the store reference from an object's `apiVersion`, `kind` and metadata.
///
/// Returns `None` when any of the identifying fields is missing.
#[must_use]
pub fn reference_of(resource: &Value) -> Option<ObjectReference> {
    let api_version = resource.get("apiVersion")?.as_str()?;
    let kind = resource.get("kind")?.as_str()?;
    let metadata = resource.get("metadata")?;
    let name = metadata.get("name")?.as_str()?;
    let namespace = metadata
        .get("namespace")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if api_version.is_empty() || kind.is_empty() || name.is_empty() {
        return None;
    }
    Some(ObjectReference::new(api_version, kind, namespace, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_of() {
        let obj = json!({
            "apiVersion": "messaging.knative.dev/v1",
            "kind": "InMemoryChannel",
            "metadata": {"name": "orders", "namespace": "default"}
        });
        let r = reference_of(&obj).unwrap();
        assert_eq!(r.kind, "InMemoryChannel");
        assert_eq!(r.namespace, "default");
        assert_eq!(r.name, "orders");
    }

    #[test]
    fn test_reference_of_missing_fields() {
        assert!(reference_of(&json!({"kind": "X", "metadata": {"name": "a"}})).is_none());
        assert!(reference_of(&json!({"apiVersion": "v1", "kind": "X"})).is_none());
        assert!(
            reference_of(&json!({"apiVersion": "v1", "kind": "X", "metadata": {"name": ""}}))
                .is_none()
        );
    }

    #[test]
    fn test_new_version_keeps_created_at() {
        let r = ObjectReference::new("v1", "Service", "default", "svc");
        let first = StoredResource::new(r, "1", json!({}));
        let second = first.new_version("2", json!({"a": 1}));
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.resource_version, "2");
        assert_eq!(second.kind(), "Service");
    }
}
