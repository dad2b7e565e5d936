//! Per-key driver around [`Reconciler`].
//!
//! The watch loop hands a namespace/name to [`SubscriptionController::reconcile`],
//! which reads the Subscription, keeps the finalizer in place, dispatches to
//! the active or finalize path, writes back a changed status and reports the
//! outcome as an event. When to call it again is up to the caller.

use std::sync::Arc;

use fanout_core::{
    ObjectReference, SUBSCRIPTION_API_VERSION, SUBSCRIPTION_FINALIZER, SUBSCRIPTION_KIND,
    Subscription, SubscriptionStatus,
};
use fanout_storage::patch::create_merge_patch;
use fanout_storage::{DynStore, StorageError};
use serde_json::{Value, json};
use tracing::Instrument;

use crate::error::{ReconcileError, reasons};
use crate::events::EventRecorder;
use crate::reconciler::Reconciler;

pub struct SubscriptionController {
    store: DynStore,
    reconciler: Reconciler,
    recorder: Arc<dyn EventRecorder>,
}

impl SubscriptionController {
    pub fn new(store: DynStore, reconciler: Reconciler, recorder: Arc<dyn EventRecorder>) -> Self {
        tracing::debug!(backend = store.backend_name(), "Subscription controller created");
        Self {
            store,
            reconciler,
            recorder,
        }
    }

    /// Reconciles the Subscription `namespace/name`. A missing Subscription is
    /// not an error.
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<(), ReconcileError> {
        let span = tracing::info_span!("reconcile", namespace = %namespace, name = %name);
        self.reconcile_key(namespace, name).instrument(span).await
    }

    async fn reconcile_key(&self, namespace: &str, name: &str) -> Result<(), ReconcileError> {
        let reference =
            ObjectReference::new(SUBSCRIPTION_API_VERSION, SUBSCRIPTION_KIND, namespace, name);
        let stored = self.store.read(&reference).await.map_err(|e| {
            ReconcileError::new(reasons::INTERNAL_ERROR, format!("failed to read {reference}: {e}"))
                .with_source(e)
        })?;
        let Some(stored) = stored else {
            tracing::debug!("Subscription no longer exists");
            return Ok(());
        };

        let original = Subscription::from_value(stored.resource).map_err(|e| {
            ReconcileError::new(reasons::INTERNAL_ERROR, format!("invalid Subscription: {e}"))
                .with_source(e)
                .into_permanent(true)
        })?;
        let mut sub = original.clone();

        let result = if !sub.is_being_deleted() {
            if !sub.metadata.has_finalizer(SUBSCRIPTION_FINALIZER) {
                let mut finalizers = sub.metadata.finalizers.clone();
                finalizers.push(SUBSCRIPTION_FINALIZER.to_string());
                self.patch_finalizers(&mut sub, finalizers).await?;
            }
            sub.status.initialize_conditions();
            let result = self.reconciler.reconcile_kind(&mut sub).await;
            sub.status.observed_generation = sub.generation();
            result
        } else if sub.metadata.has_finalizer(SUBSCRIPTION_FINALIZER) {
            self.reconciler.finalize_kind(&mut sub).await
        } else {
            Ok(None)
        };

        carry_transition_times(&original.status, &mut sub.status);
        if !same_ignoring_transition_times(&original.status, &sub.status) {
            self.update_status(&original, &mut sub).await?;
        }

        match &result {
            Ok(Some(event)) => self.recorder.record(&sub.object_reference(), event),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(reason = %e.reason(), permanent = e.is_permanent(), "Reconcile error");
                self.recorder.record(&sub.object_reference(), &e.to_event());
            }
        }

        if result.is_ok()
            && sub.is_being_deleted()
            && sub.metadata.has_finalizer(SUBSCRIPTION_FINALIZER)
        {
            let finalizers = sub
                .metadata
                .finalizers
                .iter()
                .filter(|f| f.as_str() != SUBSCRIPTION_FINALIZER)
                .cloned()
                .collect();
            self.patch_finalizers(&mut sub, finalizers).await?;
            tracing::debug!("Finalizer removed");
        }

        result.map(|_| ())
    }

    async fn update_status(
        &self,
        original: &Subscription,
        sub: &mut Subscription,
    ) -> Result<(), ReconcileError> {
        let patch = serde_json::to_value(&original.status)
            .and_then(|before| Ok((before, serde_json::to_value(&sub.status)?)))
            .map(|(before, after)| {
                create_merge_patch(&json!({ "status": before }), &json!({ "status": after }))
            });

        let written = match patch {
            Ok(patch) => self.patch_subscription(sub, patch).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            let err = ReconcileError::new(
                reasons::UPDATE_FAILED,
                format!("Failed to update status for {:?}: {e}", sub.name()),
            )
            .with_source(e);
            self.recorder.record(&sub.object_reference(), &err.to_event());
            return Err(err);
        }
        Ok(())
    }

    async fn patch_finalizers(
        &self,
        sub: &mut Subscription,
        finalizers: Vec<String>,
    ) -> Result<(), ReconcileError> {
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        if let Err(e) = self.patch_subscription(sub, patch).await {
            let err = ReconcileError::new(
                reasons::UPDATE_FAILED,
                format!("Failed to update finalizers for {:?}: {e}", sub.name()),
            )
            .with_source(e);
            self.recorder.record(&sub.object_reference(), &err.to_event());
            return Err(err);
        }
        sub.metadata.finalizers = finalizers;
        Ok(())
    }

    /// Sends `patch` guarded by the Subscription's resourceVersion and keeps the
    /// new version on `sub`.
    async fn patch_subscription(
        &self,
        sub: &mut Subscription,
        mut patch: Value,
    ) -> Result<(), StorageError> {
        if !sub.metadata.resource_version.is_empty() {
            patch["metadata"]["resourceVersion"] =
                Value::String(sub.metadata.resource_version.clone());
        }
        let bytes = serde_json::to_vec(&patch)?;
        let stored = self.store.patch(&sub.object_reference(), &bytes).await?;
        sub.metadata.resource_version = stored.resource_version;
        Ok(())
    }
}

/// Keeps the stored transition time of every condition whose status ended the
/// pass where it started, however it moved in between.
fn carry_transition_times(original: &SubscriptionStatus, status: &mut SubscriptionStatus) {
    for condition in &mut status.conditions {
        if let Some(before) = original
            .conditions
            .iter()
            .find(|c| c.condition_type == condition.condition_type)
            && before.status == condition.status
        {
            condition.last_transition_time = before.last_transition_time;
        }
    }
}

/// Status equality that ignores `lastTransitionTime`.
fn same_ignoring_transition_times(a: &SubscriptionStatus, b: &SubscriptionStatus) -> bool {
    fn strip(status: &SubscriptionStatus) -> SubscriptionStatus {
        let mut status = status.clone();
        for condition in &mut status.conditions {
            condition.last_transition_time = None;
        }
        status
    }
    strip(a) == strip(b)
}
