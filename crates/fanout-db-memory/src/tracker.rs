use async_trait::async_trait;
use fanout_core::ObjectReference;
use fanout_storage::{Tracker, TrackerError};
use papaya::HashSet as PapayaHashSet;
use std::sync::Arc;

/// Records tracked (reference, dependent) pairs.
///
/// The in-memory backend has no watch machinery, so the recorded pairs are
/// what callers (and tests) inspect to see which objects a reconcile depends on.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracker {
    edges: Arc<PapayaHashSet<(ObjectReference, ObjectReference)>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `dependent` is tracking `reference`.
    pub fn is_tracking(&self, reference: &ObjectReference, dependent: &ObjectReference) -> bool {
        self.edges
            .pin()
            .contains(&(reference.clone(), dependent.clone()))
    }

    /// All objects tracking `reference`.
    pub fn dependents_of(&self, reference: &ObjectReference) -> Vec<ObjectReference> {
        let guard = self.edges.pin();
        let mut out: Vec<_> = guard
            .iter()
            .filter(|(r, _)| r == reference)
            .map(|(_, d)| d.clone())
            .collect();
        out.sort_by_key(ToString::to_string);
        out
    }

    /// All objects `dependent` is tracking.
    pub fn tracked_by(&self, dependent: &ObjectReference) -> Vec<ObjectReference> {
        let guard = self.edges.pin();
        let mut out: Vec<_> = guard
            .iter()
            .filter(|(_, d)| d == dependent)
            .map(|(r, _)| r.clone())
            .collect();
        out.sort_by_key(ToString::to_string);
        out
    }

    pub fn len(&self) -> usize {
        self.edges.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Tracker for InMemoryTracker {
    async fn track(
        &self,
        reference: &ObjectReference,
        dependent: &ObjectReference,
    ) -> Result<(), TrackerError> {
        if reference.kind.is_empty() || reference.name.is_empty() {
            return Err(TrackerError::InvalidReference {
                reference: reference.to_string(),
                message: "kind and name are required".to_string(),
            });
        }
        self.edges
            .pin()
            .insert((reference.clone(), dependent.clone()));
        Ok(())
    }
}
