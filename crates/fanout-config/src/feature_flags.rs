//! Feature flags passed to the reconciler as explicit configuration
//!
//! Supports various flag types:
//! - Boolean: Simple on/off
//! - Namespace-based: Enabled only for Subscriptions in listed namespaces
//! - Time-based: Enable during specific time windows

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

/// Allows `KReference.group` to be used instead of `apiVersion`.
pub const KREFERENCE_GROUP_FLAG: &str = "kreference.group.enabled";

/// Context for evaluating feature flags
#[derive(Debug, Clone, Default)]
pub struct FeatureContext {
    /// Namespace of the object being reconciled
    pub namespace: Option<String>,
    /// Custom attributes for advanced targeting
    pub attributes: HashMap<String, String>,
}

impl FeatureContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create context for a namespace
    pub fn for_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    /// Add custom attribute
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Type of feature flag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
#[derive(Default)]
pub enum FeatureFlagType {
    /// Simple on/off toggle
    #[default]
    Boolean,
    /// Enable for specific namespaces
    NamespaceBased {
        #[serde(default)]
        allowed_namespaces: Vec<String>,
    },
    /// Enable during a time window
    TimeBased {
        #[serde(with = "time::serde::rfc3339::option", default)]
        start: Option<OffsetDateTime>,
        #[serde(with = "time::serde::rfc3339::option", default)]
        end: Option<OffsetDateTime>,
    },
}

/// A single feature flag
///
/// `type` may be omitted and then means `boolean`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "FlagDocument")]
pub struct FeatureFlag {
    /// Flag name (e.g., "kreference.group.enabled")
    pub name: String,
    /// Whether the flag is enabled
    pub enabled: bool,
    /// Flag type for advanced evaluation
    #[serde(flatten)]
    pub flag_type: FeatureFlagType,
    /// Description of what this flag controls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Discriminant of [`FeatureFlagType`] as written in configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FlagKind {
    #[default]
    Boolean,
    NamespaceBased,
    TimeBased,
}

/// Flat on-disk shape of a flag. Serde cannot default the tag of a flattened
/// internally tagged enum, so the tag is read as a plain field instead.
#[derive(Deserialize)]
struct FlagDocument {
    name: String,
    #[serde(default)]
    enabled: bool,
    #[serde(rename = "type", default)]
    kind: FlagKind,
    #[serde(default)]
    allowed_namespaces: Vec<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    start: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    end: Option<OffsetDateTime>,
    #[serde(default)]
    description: Option<String>,
}

impl From<FlagDocument> for FeatureFlag {
    fn from(doc: FlagDocument) -> Self {
        let flag_type = match doc.kind {
            FlagKind::Boolean => FeatureFlagType::Boolean,
            FlagKind::NamespaceBased => FeatureFlagType::NamespaceBased {
                allowed_namespaces: doc.allowed_namespaces,
            },
            FlagKind::TimeBased => FeatureFlagType::TimeBased {
                start: doc.start,
                end: doc.end,
            },
        };
        Self {
            name: doc.name,
            enabled: doc.enabled,
            flag_type,
            description: doc.description,
        }
    }
}

impl FeatureFlag {
    /// Create a new boolean feature flag
    pub fn boolean(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
            flag_type: FeatureFlagType::Boolean,
            description: None,
        }
    }

    /// Create a namespace-based feature flag
    pub fn namespace_based(name: impl Into<String>, allowed_namespaces: Vec<String>) -> Self {
        Self {
            name: name.into(),
            enabled: !allowed_namespaces.is_empty(),
            flag_type: FeatureFlagType::NamespaceBased { allowed_namespaces },
            description: None,
        }
    }

    /// Create a flag that is on between `start` and `end`
    pub fn time_based(
        name: impl Into<String>,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            flag_type: FeatureFlagType::TimeBased { start, end },
            description: None,
        }
    }

    /// Add description to flag
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Evaluate this flag for a given context
    pub fn evaluate(&self, context: &FeatureContext) -> bool {
        if !self.enabled {
            return false;
        }

        match &self.flag_type {
            FeatureFlagType::Boolean => true,

            FeatureFlagType::NamespaceBased { allowed_namespaces } => context
                .namespace
                .as_ref()
                .is_some_and(|ns| allowed_namespaces.contains(ns)),

            FeatureFlagType::TimeBased { start, end } => {
                let now = OffsetDateTime::now_utc();
                let after_start = start.is_none_or(|s| now >= s);
                let before_end = end.is_none_or(|e| now <= e);
                after_start && before_end
            }
        }
    }
}

/// Collection of feature flags
///
/// Serialized as a list of flags so that dotted flag names survive TOML and
/// environment layering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<FeatureFlag>", into = "Vec<FeatureFlag>")]
pub struct FeatureFlags {
    flags: HashMap<String, FeatureFlag>,
}

impl From<Vec<FeatureFlag>> for FeatureFlags {
    fn from(list: Vec<FeatureFlag>) -> Self {
        let mut flags = Self::new();
        for flag in list {
            flags.set(flag);
        }
        flags
    }
}

impl From<FeatureFlags> for Vec<FeatureFlag> {
    fn from(flags: FeatureFlags) -> Self {
        let mut list: Vec<_> = flags.flags.into_values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }
}

impl FeatureFlags {
    /// Create a new empty feature flags collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with default built-in flags
    pub fn with_defaults() -> Self {
        let mut flags = Self::new();

        flags.set(
            FeatureFlag::boolean(KREFERENCE_GROUP_FLAG, false)
                .with_description("Resolve KReference.group to an apiVersion"),
        );

        flags
    }

    /// Set a feature flag
    pub fn set(&mut self, flag: FeatureFlag) {
        self.flags.insert(flag.name.clone(), flag);
    }

    /// Get a feature flag by name
    pub fn get(&self, name: &str) -> Option<&FeatureFlag> {
        self.flags.get(name)
    }

    /// Check if a flag is enabled for the given context
    pub fn is_enabled(&self, name: &str, context: &FeatureContext) -> bool {
        self.flags
            .get(name)
            .is_some_and(|flag| flag.evaluate(context))
    }

    /// Check if a flag is enabled (without context, for simple boolean flags)
    pub fn is_enabled_simple(&self, name: &str) -> bool {
        self.is_enabled(name, &FeatureContext::default())
    }

    /// Whether group-qualified references are resolved in `namespace`.
    pub fn kreference_group_enabled(&self, namespace: &str) -> bool {
        self.is_enabled(KREFERENCE_GROUP_FLAG, &FeatureContext::for_namespace(namespace))
    }

    /// Remove a feature flag
    pub fn remove(&mut self, name: &str) -> Option<FeatureFlag> {
        self.flags.remove(name)
    }

    /// List all flags
    pub fn list(&self) -> impl Iterator<Item = &FeatureFlag> {
        self.flags.values()
    }

    /// Merge with another set of flags (other takes precedence)
    pub fn merge(&mut self, other: FeatureFlags) {
        for (name, flag) in other.flags {
            self.flags.insert(name, flag);
        }
    }

    /// Get the number of flags
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_boolean_flag() {
        let flag = FeatureFlag::boolean("test.feature", true);
        let ctx = FeatureContext::new();
        assert!(flag.evaluate(&ctx));

        let disabled = FeatureFlag::boolean("test.disabled", false);
        assert!(!disabled.evaluate(&ctx));
    }

    #[test]
    fn test_namespace_based_flag() {
        let flag = FeatureFlag::namespace_based(
            "test.ns",
            vec!["team-a".to_string(), "team-b".to_string()],
        );

        assert!(flag.evaluate(&FeatureContext::for_namespace("team-a")));
        assert!(!flag.evaluate(&FeatureContext::for_namespace("team-c")));
        assert!(!flag.evaluate(&FeatureContext::new()));
    }

    #[test]
    fn test_time_based_flag() {
        let now = OffsetDateTime::now_utc();
        let open = FeatureFlag::time_based("test.window", Some(now - Duration::hours(1)), None);
        assert!(open.evaluate(&FeatureContext::new()));

        let expired = FeatureFlag::time_based("test.expired", None, Some(now - Duration::hours(1)));
        assert!(!expired.evaluate(&FeatureContext::new()));
    }

    #[test]
    fn test_feature_flags_collection() {
        let mut flags = FeatureFlags::new();
        flags.set(FeatureFlag::boolean("feature.a", true));
        flags.set(FeatureFlag::boolean("feature.b", false));

        assert!(flags.is_enabled_simple("feature.a"));
        assert!(!flags.is_enabled_simple("feature.b"));
        assert!(!flags.is_enabled_simple("feature.unknown"));
    }

    #[test]
    fn test_default_flags() {
        let flags = FeatureFlags::with_defaults();
        assert!(flags.get(KREFERENCE_GROUP_FLAG).is_some());
        assert!(!flags.kreference_group_enabled("default"));
    }

    #[test]
    fn test_merge_overrides_defaults() {
        let mut flags = FeatureFlags::with_defaults();
        flags.merge(FeatureFlags::from(vec![FeatureFlag::boolean(
            KREFERENCE_GROUP_FLAG,
            true,
        )]));
        assert_eq!(flags.len(), 1);
        assert!(flags.kreference_group_enabled("default"));
    }

    #[test]
    fn test_type_defaults_to_boolean() {
        let flags: FeatureFlags = serde_json::from_value(serde_json::json!([
            {"name": KREFERENCE_GROUP_FLAG, "enabled": true}
        ]))
        .unwrap();
        let flag = flags.get(KREFERENCE_GROUP_FLAG).unwrap();
        assert_eq!(flag.flag_type, FeatureFlagType::Boolean);
        assert!(flags.kreference_group_enabled("anywhere"));
    }

    #[test]
    fn test_namespace_based_from_document() {
        let flags: FeatureFlags = serde_json::from_value(serde_json::json!([{
            "name": KREFERENCE_GROUP_FLAG,
            "enabled": true,
            "type": "namespace_based",
            "allowed_namespaces": ["team-a"]
        }]))
        .unwrap();
        assert!(flags.kreference_group_enabled("team-a"));
        assert!(!flags.kreference_group_enabled("team-b"));
    }

    #[test]
    fn test_serializes_as_list() {
        let flags = FeatureFlags::with_defaults();
        let json = serde_json::to_value(&flags).unwrap();
        assert_eq!(json[0]["name"], KREFERENCE_GROUP_FLAG);
        assert_eq!(json[0]["type"], "boolean");

        let back: FeatureFlags = serde_json::from_value(json).unwrap();
        assert!(back.get(KREFERENCE_GROUP_FLAG).is_some());
    }
}
