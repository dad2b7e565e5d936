//! Store and tracker traits.
//!
//! These are the seams between the reconciler and the platform it runs in.
//! The reconciler never owns storage semantics; it reads objects, sends merge
//! patches and registers the dependencies it reads.

use async_trait::async_trait;
use fanout_core::ObjectReference;
use serde_json::Value;

use crate::error::{StorageError, TrackerError};
use crate::types::StoredResource;

/// Versioned object storage addressed by [`ObjectReference`].
///
/// Objects are keyed by group, kind, namespace and name; the version part of
/// `apiVersion` does not take part in lookups. Implementations must be
/// thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use fanout_storage::{ResourceStore, StorageError, StoredResource};
///
/// async fn get_channel(
///     store: &dyn ResourceStore,
///     reference: &ObjectReference,
/// ) -> Result<StoredResource, StorageError> {
///     store
///         .read(reference)
///         .await?
///         .ok_or_else(|| StorageError::not_found(reference))
/// }
/// ```
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Creates a new object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if an object with the same key exists.
    /// Returns `StorageError::InvalidResource` if the object lacks apiVersion, kind or name.
    async fn create(&self, resource: &Value) -> Result<StoredResource, StorageError>;

    /// Reads an object.
    ///
    /// Returns `None` if the object does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing objects.
    async fn read(&self, reference: &ObjectReference)
    -> Result<Option<StoredResource>, StorageError>;

    /// Replaces an existing object.
    ///
    /// If the object carries a non-empty `metadata.resourceVersion` it must match
    /// the stored one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    /// Returns `StorageError::VersionConflict` on a resourceVersion mismatch.
    async fn update(&self, resource: &Value) -> Result<StoredResource, StorageError>;

    /// Applies a JSON merge patch (RFC 7396) to an existing object.
    ///
    /// A `metadata.resourceVersion` inside the patch acts as a precondition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    /// Returns `StorageError::VersionConflict` if the precondition fails.
    /// Returns `StorageError::InvalidPatch` if the patch is not a JSON object.
    async fn patch(
        &self,
        reference: &ObjectReference,
        merge_patch: &[u8],
    ) -> Result<StoredResource, StorageError>;

    /// Deletes an object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    async fn delete(&self, reference: &ObjectReference) -> Result<(), StorageError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// Registers that a change to one object must re-trigger reconciliation of another.
///
/// Callers register *before* reading the dependency so that a change landing
/// between the read and the registration is not missed.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Track `reference` on behalf of `dependent`.
    ///
    /// # Errors
    ///
    /// Returns a `TrackerError` if the registration cannot be recorded.
    async fn track(
        &self,
        reference: &ObjectReference,
        dependent: &ObjectReference,
    ) -> Result<(), TrackerError>;
}
