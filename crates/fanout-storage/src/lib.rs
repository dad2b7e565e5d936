//! # fanout-storage
//!
//! Storage abstraction layer for the fanout reconciler.
//!
//! This crate defines the traits and types the reconciler uses to talk to the
//! platform that stores resources. It does not contain any store
//! implementation - those are provided by separate crates.
//!
//! ## Overview
//!
//! - [`ResourceStore`]: read / create / update / merge-patch / delete of JSON objects
//! - [`Tracker`]: dependency registration so that changes re-trigger reconciliation
//! - [`patch`]: JSON merge patch creation and application
//!
//! ## Example
//!
//! ```ignore
//! use fanout_storage::{ResourceStore, patch};
//!
//! async fn sync(store: &dyn ResourceStore, before: &Value, after: &Value) -> Result<bool, StorageError> {
//!     let diff = patch::create_merge_patch(before, after);
//!     if patch::is_empty_patch(&diff) {
//!         return Ok(false);
//!     }
//!     store.patch(&reference, &serde_json::to_vec(&diff)?).await?;
//!     Ok(true)
//! }
//! ```

mod error;
pub mod patch;
mod traits;
mod types;

// Re-export everything from submodules
pub use error::{ErrorCategory, StorageError, TrackerError};
pub use traits::{ResourceStore, Tracker};
pub use types::{StoredResource, reference_of};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn ResourceStore>;

/// Type alias for a shared tracker trait object.
pub type DynTracker = std::sync::Arc<dyn Tracker>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use fanout_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError, TrackerError};
    pub use crate::patch::{apply_merge_patch, create_merge_patch, is_empty_patch};
    pub use crate::traits::{ResourceStore, Tracker};
    pub use crate::types::{StoredResource, reference_of};
    pub use crate::{DynStore, DynTracker, StorageResult};
}
