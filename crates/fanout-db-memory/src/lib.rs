//! In-memory store and tracker for the fanout reconciler.
//!
//! This crate provides in-memory implementations of the `ResourceStore` and
//! `Tracker` traits from `fanout-storage`, using papaya lock-free maps for
//! concurrent access. It backs the reconciler's tests and local runs.
//!
//! # Example
//!
//! ```ignore
//! use fanout_db_memory::InMemoryStore;
//! use fanout_storage::ResourceStore;
//!
//! let store = InMemoryStore::new();
//!
//! let channel = serde_json::json!({
//!     "apiVersion": "messaging.knative.dev/v1",
//!     "kind": "InMemoryChannel",
//!     "metadata": {"name": "orders", "namespace": "default"},
//!     "spec": {}
//! });
//! let created = store.create(&channel).await?;
//! ```

pub mod storage;
pub mod tracker;

pub use fanout_storage::{ResourceStore, StorageError, StoredResource, Tracker};

pub use storage::{InMemoryStore, StorageKey};
pub use tracker::InMemoryTracker;

/// Creates a new shared in-memory store.
pub fn create_store() -> fanout_storage::DynStore {
    std::sync::Arc::new(InMemoryStore::new())
}
