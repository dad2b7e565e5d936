//! Reconcile outcomes: events and errors.

use std::error::Error as StdError;
use std::fmt;

use fanout_storage::StorageError;

/// Reasons shared by condition updates and emitted events.
pub mod reasons {
    pub const UPDATE_FAILED: &str = "UpdateFailed";
    pub const PHYSICAL_CHANNEL_SYNC_FAILED: &str = "PhysicalChannelSyncFailed";
    pub const SUBSCRIPTION_NOT_MARKED_READY_BY_CHANNEL: &str =
        "SubscriptionNotMarkedReadyByChannel";
    pub const CHANNEL_REFERENCE_FAILED: &str = "ChannelReferenceFailed";
    pub const SUBSCRIBER_RESOLVE_FAILED: &str = "SubscriberResolveFailed";
    pub const REPLY_RESOLVE_FAILED: &str = "ReplyResolveFailed";
    pub const DEAD_LETTER_SINK_RESOLVE_FAILED: &str = "DeadLetterSinkResolveFailed";
    pub const TRACKER_FAILED: &str = "TrackerFailed";
    pub const INTERNAL_ERROR: &str = "InternalError";

    pub const SUBSCRIBER_SYNC: &str = "SubscriberSync";
    pub const SUBSCRIBER_REMOVED: &str = "SubscriberRemoved";

    /// Unknown reason while destinations are being resolved.
    pub const RESOLVING: &str = "Resolving";
}

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::Warning => write!(f, "Warning"),
        }
    }
}

/// An event about a Subscription, handed to an
/// [`EventRecorder`](crate::events::EventRecorder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileEvent {
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
}

impl ReconcileEvent {
    pub fn normal(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_type: EventType::Normal,
            reason: reason.into(),
            message: message.into(),
        }
    }

    pub fn warning(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_type: EventType::Warning,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ReconcileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.event_type, self.reason, self.message)
    }
}

/// A failed reconcile.
///
/// Carries a machine-readable reason (the same string used on the
/// Subscription's conditions) and a human-readable message. Every failure is
/// retryable unless marked permanent.
#[derive(Debug, thiserror::Error)]
#[error("{reason}: {message}")]
pub struct ReconcileError {
    reason: String,
    message: String,
    #[source]
    source: Option<BoxError>,
    permanent: bool,
}

impl ReconcileError {
    pub fn new(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: message.into(),
            source: None,
            permanent: false,
        }
    }

    /// Attach the underlying error.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Mark the failure as not retryable.
    pub fn into_permanent(mut self, permanent: bool) -> Self {
        self.permanent = permanent;
        self
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    /// True when a [`StorageError::NotFound`] is anywhere in the source chain.
    pub fn is_not_found(&self) -> bool {
        let mut current: Option<&(dyn StdError + 'static)> = self
            .source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static));
        while let Some(err) = current {
            if err
                .downcast_ref::<StorageError>()
                .is_some_and(StorageError::is_not_found)
            {
                return true;
            }
            current = err.source();
        }
        false
    }

    /// The Warning event reported for this failure.
    pub fn to_event(&self) -> ReconcileEvent {
        ReconcileEvent::warning(self.reason.clone(), self.message.clone())
    }
}

/// Outcome of one reconcile pass: an optional Normal event on success.
pub type ReconcileResult = Result<Option<ReconcileEvent>, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::ObjectReference;

    #[derive(Debug, thiserror::Error)]
    #[error("wrapped: {0}")]
    struct Wrapper(#[source] StorageError);

    #[test]
    fn test_display_and_event() {
        let err = ReconcileError::new(reasons::PHYSICAL_CHANNEL_SYNC_FAILED, "boom");
        assert_eq!(err.to_string(), "PhysicalChannelSyncFailed: boom");
        assert!(!err.is_permanent());

        let event = err.to_event();
        assert_eq!(event.event_type, EventType::Warning);
        assert_eq!(event.reason, "PhysicalChannelSyncFailed");
        assert_eq!(event.message, "boom");
    }

    #[test]
    fn test_is_not_found_walks_source_chain() {
        let missing = StorageError::not_found(&ObjectReference::new(
            "messaging.knative.dev/v1",
            "InMemoryChannel",
            "default",
            "gone",
        ));
        let err = ReconcileError::new(reasons::CHANNEL_REFERENCE_FAILED, "x")
            .with_source(Wrapper(missing));
        assert!(err.is_not_found());

        let other = ReconcileError::new(reasons::CHANNEL_REFERENCE_FAILED, "x")
            .with_source(StorageError::internal("disk"));
        assert!(!other.is_not_found());
        assert!(!ReconcileError::new("A", "b").is_not_found());
    }

    #[test]
    fn test_permanent_flag() {
        let err = ReconcileError::new(reasons::CHANNEL_REFERENCE_FAILED, "x").into_permanent(true);
        assert!(err.is_permanent());
    }
}
