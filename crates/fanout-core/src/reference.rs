//! Object references and apiVersion parsing.
//!
//! Two reference shapes flow through the reconciler:
//! - [`KReference`]: the user-facing reference found in resource specs
//!   (`spec.channel`, `spec.subscriber.ref`). Namespace and apiVersion may be
//!   omitted, and a bare `group` may stand in for the apiVersion.
//! - [`ObjectReference`]: a fully qualified reference used for store lookups
//!   and dependency tracking.
//!
//! # Example
//!
//! ```
//! use fanout_core::reference::GroupVersion;
//!
//! let gv = GroupVersion::parse("messaging.knative.dev/v1").unwrap();
//! assert_eq!(gv.group, "messaging.knative.dev");
//! assert_eq!(gv.version, "v1");
//!
//! let core = GroupVersion::parse("v1").unwrap();
//! assert_eq!(core.group, "");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// A parsed `group/version` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersion {
    /// API group, empty for the core group
    pub group: String,
    /// API version within the group
    pub version: String,
}

impl GroupVersion {
    pub fn new(group: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
        }
    }

    /// Parse an apiVersion string (`group/version` or `version`).
    pub fn parse(api_version: &str) -> Result<Self> {
        let api_version = api_version.trim();
        if api_version.is_empty() {
            return Err(CoreError::invalid_api_version("empty apiVersion"));
        }

        let parts: Vec<&str> = api_version.split('/').collect();
        match parts.as_slice() {
            [version] => Ok(Self::new("", *version)),
            [group, version] if !group.is_empty() && !version.is_empty() => {
                Ok(Self::new(*group, *version))
            }
            _ => Err(CoreError::invalid_api_version(api_version)),
        }
    }

    /// Parse without failing; malformed input yields an empty group and the raw
    /// string as version.
    pub fn parse_lenient(api_version: &str) -> Self {
        Self::parse(api_version).unwrap_or_else(|_| Self::new("", api_version))
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_version())
    }
}

/// A reference to another object as written in a resource spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct KReference {
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    /// API group; only honoured when group resolution is enabled.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
}

impl KReference {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Reference by group only; the version is filled in by a group resolver.
    pub fn with_group(group: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Fill an empty namespace from the enclosing object.
    pub fn set_default_namespace(&mut self, parent_namespace: &str) {
        if self.namespace.is_empty() {
            self.namespace = parent_namespace.to_string();
        }
    }

    /// Resolve to a fully qualified reference.
    ///
    /// The namespace falls back to `default_namespace`; an apiVersion is
    /// required at this point.
    pub fn to_object_reference(&self, default_namespace: &str) -> Result<ObjectReference> {
        if self.api_version.is_empty() {
            return Err(CoreError::invalid_reference(format!(
                "{} {:?} has no apiVersion",
                self.kind, self.name
            )));
        }
        if self.kind.is_empty() || self.name.is_empty() {
            return Err(CoreError::invalid_reference(
                "reference must carry both kind and name",
            ));
        }
        GroupVersion::parse(&self.api_version)?;

        let namespace = if self.namespace.is_empty() {
            default_namespace
        } else {
            &self.namespace
        };
        Ok(ObjectReference::new(
            self.api_version.clone(),
            self.kind.clone(),
            namespace,
            self.name.clone(),
        ))
    }
}

impl fmt::Display for KReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = if self.api_version.is_empty() {
            &self.group
        } else {
            &self.api_version
        };
        if self.namespace.is_empty() {
            write!(f, "{}.{}/{}", self.kind, version, self.name)
        } else {
            write!(f, "{}.{}/{}/{}", self.kind, version, self.namespace, self.name)
        }
    }
}

/// A fully qualified object reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectReference {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// API group of the referenced object.
    pub fn group(&self) -> String {
        GroupVersion::parse_lenient(&self.api_version).group
    }

    /// True when both references point at the same kind in the same group,
    /// regardless of version.
    pub fn same_group_kind(&self, group: &str, kind: &str) -> bool {
        self.kind == kind && self.group() == group
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}/{}/{}",
            self.kind, self.api_version, self.namespace, self.name
        )
    }
}
