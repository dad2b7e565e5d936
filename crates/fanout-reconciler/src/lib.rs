//! # fanout-reconciler
//!
//! Keeps a Subscription and the Channel it targets converged:
//!
//! - [`locator`] finds the Channelable behind `spec.channel`, following one
//!   channel-class indirection
//! - [`destinations`] resolves subscriber, reply and dead-letter sink into
//!   `status.physicalSubscription`
//! - [`delivery`] merges Subscription and Channel delivery policy
//! - [`sync`] writes the Subscription's entry into the Channel with a minimal
//!   merge patch
//! - [`status`] folds the Channel's per-subscriber readiness into conditions
//! - [`Reconciler`] sequences the above; [`SubscriptionController`] is the
//!   per-key driver around it
//!
//! Storage, dependency tracking and destination resolution are reached through
//! traits, so the reconciler runs against any platform implementing them.
//!
//! ```ignore
//! use fanout_db_memory::{InMemoryStore, InMemoryTracker};
//! use fanout_reconciler::{AddressResolver, Reconciler, SubscriptionController, TracingRecorder};
//!
//! let store = Arc::new(InMemoryStore::new());
//! let tracker = Arc::new(InMemoryTracker::new());
//! let resolver = Arc::new(AddressResolver::new(store.clone(), tracker.clone()));
//! let reconciler = Reconciler::new(store.clone(), tracker, resolver).with_config(&config);
//! let controller = SubscriptionController::new(store, reconciler, Arc::new(TracingRecorder));
//! controller.reconcile("default", "my-subscription").await?;
//! ```

pub mod controller;
pub mod delivery;
pub mod destinations;
pub mod error;
pub mod events;
pub mod locator;
pub mod observability;
pub mod reconciler;
pub mod resolver;
pub mod status;
pub mod sync;

pub use controller::SubscriptionController;
pub use error::{EventType, ReconcileError, ReconcileEvent, ReconcileResult, reasons};
pub use events::{EventRecorder, MemoryRecorder, TracingRecorder};
pub use locator::{ChannelLocator, LocateError};
pub use reconciler::Reconciler;
pub use resolver::{
    AddressResolver, DestinationResolver, GroupResolver, ResolveError, StaticGroupResolver,
};
