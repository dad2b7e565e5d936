use async_trait::async_trait;
use fanout_core::{GroupVersion, ObjectReference};
use fanout_storage::patch::apply_merge_patch;
use fanout_storage::{ResourceStore, StorageError, StoredResource, reference_of};
use papaya::HashMap as PapayaHashMap;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Mutex;

pub type StorageKey = String; // Format: "group/Kind/namespace/name"

/// Builds the storage key of a reference. The version part of the apiVersion
/// is not part of the key.
pub(crate) fn make_storage_key(reference: &ObjectReference) -> StorageKey {
    let group = GroupVersion::parse_lenient(&reference.api_version).group;
    format!(
        "{group}/{}/{}/{}",
        reference.kind, reference.namespace, reference.name
    )
}

/// In-memory object store using papaya lock-free HashMap.
///
/// This store provides:
/// - Lock-free concurrent reads via papaya::HashMap
/// - Serialized writes, so read-check-write sequences are atomic
/// - A global resourceVersion counter and optimistic concurrency checks
/// - Generation bumps on spec changes
/// - Finalizer-aware deletion: objects with finalizers get a deletion
///   timestamp and are only removed once the last finalizer is cleared
#[derive(Debug)]
pub struct InMemoryStore {
    /// Main storage using papaya for lock-free concurrent access
    pub(crate) data: Arc<PapayaHashMap<StorageKey, StoredResource>>,
    /// Atomic counter for generating resource versions
    pub(crate) version_counter: AtomicU64,
    /// Held by every write
    write_lock: Mutex<()>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            version_counter: AtomicU64::new(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Generates the next resource version.
    pub(crate) fn next_version(&self) -> String {
        self.version_counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
    }

    fn get_stored(&self, reference: &ObjectReference) -> Option<StoredResource> {
        let key = make_storage_key(reference);
        let guard = self.data.pin();
        guard.get(&key).cloned()
    }

    fn put(&self, stored: StoredResource) {
        let key = make_storage_key(&stored.reference);
        let guard = self.data.pin();
        guard.insert(key, stored);
    }

    fn remove(&self, reference: &ObjectReference) {
        let key = make_storage_key(reference);
        let guard = self.data.pin();
        guard.remove(&key);
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    /// Returns true if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores `next` as the new content of `existing`, or drops the object
    /// when it is being deleted and has no finalizers left.
    fn commit(
        &self,
        existing: &StoredResource,
        mut next: Value,
    ) -> Result<Option<StoredResource>, StorageError> {
        if spec_of(&existing.resource) != spec_of(&next) {
            let generation = existing.resource["metadata"]["generation"]
                .as_i64()
                .unwrap_or(0);
            set_metadata(&mut next, "generation", Value::from(generation + 1));
        }

        if is_being_deleted(&next) && !has_finalizers(&next) {
            self.remove(&existing.reference);
            return Ok(None);
        }

        let resource_version = self.next_version();
        set_metadata(
            &mut next,
            "resourceVersion",
            Value::String(resource_version.clone()),
        );
        let stored = existing.new_version(resource_version, next);
        self.put(stored.clone());
        Ok(Some(stored))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn spec_of(resource: &Value) -> Option<&Value> {
    resource.get("spec")
}

fn resource_version_of(resource: &Value) -> Option<&str> {
    resource["metadata"]["resourceVersion"]
        .as_str()
        .filter(|v| !v.is_empty())
}

fn is_being_deleted(resource: &Value) -> bool {
    !resource["metadata"]["deletionTimestamp"].is_null()
}

fn has_finalizers(resource: &Value) -> bool {
    resource["metadata"]["finalizers"]
        .as_array()
        .is_some_and(|f| !f.is_empty())
}

fn set_metadata(resource: &mut Value, field: &str, value: Value) {
    if let Some(metadata) = resource
        .get_mut("metadata")
        .and_then(Value::as_object_mut)
    {
        metadata.insert(field.to_string(), value);
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn create(&self, resource: &Value) -> Result<StoredResource, StorageError> {
        let reference = reference_of(resource).ok_or_else(|| {
            StorageError::invalid_resource("object must carry apiVersion, kind and metadata.name")
        })?;

        let _write = self.write_lock.lock().await;
        if self.get_stored(&reference).is_some() {
            return Err(StorageError::already_exists(&reference));
        }

        let mut object = resource.clone();
        let metadata = object
            .get("metadata")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        if metadata["uid"].as_str().is_none_or(str::is_empty) {
            set_metadata(
                &mut object,
                "uid",
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
        if metadata["generation"].as_i64().is_none_or(|g| g == 0) {
            set_metadata(&mut object, "generation", Value::from(1));
        }
        let resource_version = self.next_version();
        set_metadata(
            &mut object,
            "resourceVersion",
            Value::String(resource_version.clone()),
        );
        set_metadata(
            &mut object,
            "creationTimestamp",
            Value::String(
                OffsetDateTime::now_utc()
                    .format(&Rfc3339)
                    .unwrap_or_default(),
            ),
        );

        let stored = StoredResource::new(reference, resource_version, object);
        self.put(stored.clone());
        Ok(stored)
    }

    async fn read(
        &self,
        reference: &ObjectReference,
    ) -> Result<Option<StoredResource>, StorageError> {
        Ok(self.get_stored(reference))
    }

    async fn update(&self, resource: &Value) -> Result<StoredResource, StorageError> {
        let reference = reference_of(resource).ok_or_else(|| {
            StorageError::invalid_resource("object must carry apiVersion, kind and metadata.name")
        })?;

        let _write = self.write_lock.lock().await;
        let existing = self
            .get_stored(&reference)
            .ok_or_else(|| StorageError::not_found(&reference))?;

        if let Some(expected) = resource_version_of(resource)
            && expected != existing.resource_version
        {
            return Err(StorageError::version_conflict(
                expected,
                existing.resource_version.as_str(),
            ));
        }

        let mut next = resource.clone();
        // identity fields are owned by the store
        for field in ["uid", "generation", "creationTimestamp"] {
            let current = existing.resource["metadata"][field].clone();
            if !current.is_null() {
                set_metadata(&mut next, field, current);
            }
        }

        // a removed object still counts as written
        Ok(self
            .commit(&existing, next)?
            .unwrap_or_else(|| existing.clone()))
    }

    async fn patch(
        &self,
        reference: &ObjectReference,
        merge_patch: &[u8],
    ) -> Result<StoredResource, StorageError> {
        let _write = self.write_lock.lock().await;
        let existing = self
            .get_stored(reference)
            .ok_or_else(|| StorageError::not_found(reference))?;

        let patch: Value = serde_json::from_slice(merge_patch)
            .map_err(|e| StorageError::invalid_patch(e.to_string()))?;
        if let Some(expected) = resource_version_of(&patch)
            && expected != existing.resource_version
        {
            return Err(StorageError::version_conflict(
                expected,
                existing.resource_version.as_str(),
            ));
        }

        let mut next = existing.resource.clone();
        apply_merge_patch(&mut next, merge_patch)?;
        if reference_of(&next).map(|r| make_storage_key(&r)) != Some(make_storage_key(reference)) {
            return Err(StorageError::invalid_patch(
                "patch must not change apiVersion, kind, namespace or name",
            ));
        }

        Ok(self
            .commit(&existing, next)?
            .unwrap_or_else(|| existing.clone()))
    }

    async fn delete(&self, reference: &ObjectReference) -> Result<(), StorageError> {
        let _write = self.write_lock.lock().await;
        let existing = self
            .get_stored(reference)
            .ok_or_else(|| StorageError::not_found(reference))?;

        if !has_finalizers(&existing.resource) {
            self.remove(reference);
            return Ok(());
        }
        if is_being_deleted(&existing.resource) {
            return Ok(());
        }

        let mut next = existing.resource.clone();
        set_metadata(
            &mut next,
            "deletionTimestamp",
            Value::String(
                OffsetDateTime::now_utc()
                    .format(&Rfc3339)
                    .map_err(|e| StorageError::internal(e.to_string()))?,
            ),
        );
        self.commit(&existing, next)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
