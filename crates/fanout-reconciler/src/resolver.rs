//! Destination and group resolution.
//!
//! [`DestinationResolver`] turns a [`Destination`] into an absolute URL and
//! [`GroupResolver`] turns a group-qualified [`KReference`] into one carrying
//! an `apiVersion`. The reconciler only depends on the traits; the
//! implementations here back tests and embedders without a platform resolver.

use std::collections::HashMap;

use async_trait::async_trait;
use fanout_core::{CoreError, Destination, GroupVersion, KReference, ObjectReference};
use fanout_storage::{DynStore, DynTracker, StorageError, TrackerError};
use serde_json::Value;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("destination has neither ref nor uri")]
    EmptyDestination,

    #[error(transparent)]
    InvalidReference(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StorageError),

    #[error("failed to track {reference}: {source}")]
    Tracker {
        reference: String,
        #[source]
        source: TrackerError,
    },

    #[error("{reference} does not contain address")]
    NotAddressable { reference: String },

    #[error("URI is not absolute (both scheme and host should be non-empty): {uri:?}")]
    RelativeUri { uri: String },

    #[error("invalid URI {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unable to resolve a version for group {group:?} kind {kind:?}")]
    UnknownGroup { group: String, kind: String },
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

/// Resolves a non-empty destination to an absolute URL on behalf of `parent`.
#[async_trait]
pub trait DestinationResolver: Send + Sync {
    async fn resolve(
        &self,
        destination: &Destination,
        parent: &ObjectReference,
    ) -> Result<Url, ResolveError>;
}

/// Fills `apiVersion` in for references that only name a group.
#[async_trait]
pub trait GroupResolver: Send + Sync {
    async fn resolve_group(&self, reference: &KReference) -> Result<KReference, ResolveError>;
}

/// Store-backed resolver reading the `status.address.url` of referenced objects.
///
/// - `ref` only: the object's address
/// - `ref` and `uri`: `uri` joined onto the object's address
/// - `uri` only: must already be absolute
///
/// Core `v1` Services resolve to their cluster-local DNS name.
#[derive(Clone)]
pub struct AddressResolver {
    store: DynStore,
    tracker: DynTracker,
}

impl AddressResolver {
    pub fn new(store: DynStore, tracker: DynTracker) -> Self {
        Self { store, tracker }
    }

    async fn address_of(
        &self,
        reference: &KReference,
        parent: &ObjectReference,
    ) -> Result<Url, ResolveError> {
        let target = reference.to_object_reference(&parent.namespace)?;
        self.tracker
            .track(&target, parent)
            .await
            .map_err(|source| ResolveError::Tracker {
                reference: target.to_string(),
                source,
            })?;

        if target.api_version == "v1" && target.kind == "Service" {
            let host = format!(
                "http://{}.{}.svc.cluster.local/",
                target.name, target.namespace
            );
            return Url::parse(&host).map_err(|source| ResolveError::InvalidUri { uri: host, source });
        }

        let stored = self
            .store
            .read(&target)
            .await?
            .ok_or_else(|| StorageError::not_found(&target))?;

        let address = stored
            .resource
            .pointer("/status/address/url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ResolveError::NotAddressable {
                reference: target.to_string(),
            })?;

        Url::parse(address).map_err(|source| ResolveError::InvalidUri {
            uri: address.to_string(),
            source,
        })
    }
}

fn parse_absolute(uri: &str) -> Result<Url, ResolveError> {
    match Url::parse(uri) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(url),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => Err(ResolveError::RelativeUri {
            uri: uri.to_string(),
        }),
        Err(source) => Err(ResolveError::InvalidUri {
            uri: uri.to_string(),
            source,
        }),
    }
}

#[async_trait]
impl DestinationResolver for AddressResolver {
    async fn resolve(
        &self,
        destination: &Destination,
        parent: &ObjectReference,
    ) -> Result<Url, ResolveError> {
        match (&destination.reference, &destination.uri) {
            (Some(reference), uri) => {
                let base = self.address_of(reference, parent).await?;
                match uri {
                    Some(uri) => base.join(uri).map_err(|source| ResolveError::InvalidUri {
                        uri: uri.clone(),
                        source,
                    }),
                    None => Ok(base),
                }
            }
            (None, Some(uri)) => parse_absolute(uri),
            (None, None) => Err(ResolveError::EmptyDestination),
        }
    }
}

/// Group resolution from a fixed `(group, kind) -> version` table.
#[derive(Debug, Clone, Default)]
pub struct StaticGroupResolver {
    versions: HashMap<(String, String), String>,
}

impl StaticGroupResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(
        mut self,
        group: impl Into<String>,
        kind: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.versions
            .insert((group.into(), kind.into()), version.into());
        self
    }
}

#[async_trait]
impl GroupResolver for StaticGroupResolver {
    async fn resolve_group(&self, reference: &KReference) -> Result<KReference, ResolveError> {
        if reference.group.is_empty() || !reference.api_version.is_empty() {
            return Ok(reference.clone());
        }

        let version = self
            .versions
            .get(&(reference.group.clone(), reference.kind.clone()))
            .ok_or_else(|| ResolveError::UnknownGroup {
                group: reference.group.clone(),
                kind: reference.kind.clone(),
            })?;

        let mut resolved = reference.clone();
        resolved.api_version = GroupVersion::new(reference.group.clone(), version.clone()).api_version();
        resolved.group.clear();
        Ok(resolved)
    }
}
