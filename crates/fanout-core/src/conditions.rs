//! Status conditions and the living condition set.
//!
//! A [`ConditionSet`] names one "happy" condition (usually `Ready`) and the
//! dependent conditions it is derived from. Every mutation through the set
//! recomputes the happy condition:
//! - `False` if any dependent is `False` (reason/message copied from it)
//! - `True` if every dependent is `True`
//! - `Unknown` otherwise

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

pub const CONDITION_READY: &str = "Ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl ConditionStatus {
    pub fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    pub fn is_false(self) -> bool {
        matches!(self, Self::False)
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_time: Option<OffsetDateTime>,
}

impl Condition {
    pub fn new(condition_type: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            condition_type: condition_type.into(),
            status,
            reason: None,
            message: None,
            last_transition_time: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self.message = Some(message.into());
        self
    }

    pub fn is_true(&self) -> bool {
        self.status.is_true()
    }

    /// Equal in everything but the transition time.
    fn same_state(&self, other: &Condition) -> bool {
        self.condition_type == other.condition_type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Describes how a happy condition is derived from its dependents.
#[derive(Debug, Clone, Copy)]
pub struct ConditionSet {
    happy: &'static str,
    dependents: &'static [&'static str],
}

impl ConditionSet {
    pub const fn new(happy: &'static str, dependents: &'static [&'static str]) -> Self {
        Self { happy, dependents }
    }

    pub fn happy(&self) -> &'static str {
        self.happy
    }

    pub fn dependents(&self) -> &'static [&'static str] {
        self.dependents
    }

    /// Ensure every condition of the set exists, adding missing ones as `Unknown`.
    pub fn initialize(&self, conditions: &mut Vec<Condition>) {
        for t in std::iter::once(&self.happy).chain(self.dependents.iter()) {
            if get(conditions, t).is_none() {
                set(conditions, Condition::new(*t, ConditionStatus::Unknown));
            }
        }
        self.recompute(conditions);
    }

    pub fn mark_true(&self, conditions: &mut Vec<Condition>, condition_type: &str) {
        set(conditions, Condition::new(condition_type, ConditionStatus::True));
        self.recompute(conditions);
    }

    pub fn mark_false(
        &self,
        conditions: &mut Vec<Condition>,
        condition_type: &str,
        reason: &str,
        message: impl Into<String>,
    ) {
        set(
            conditions,
            Condition::new(condition_type, ConditionStatus::False).with_reason(reason, message),
        );
        self.recompute(conditions);
    }

    pub fn mark_unknown(
        &self,
        conditions: &mut Vec<Condition>,
        condition_type: &str,
        reason: &str,
        message: impl Into<String>,
    ) {
        set(
            conditions,
            Condition::new(condition_type, ConditionStatus::Unknown).with_reason(reason, message),
        );
        self.recompute(conditions);
    }

    pub fn is_happy(&self, conditions: &[Condition]) -> bool {
        get(conditions, self.happy).is_some_and(Condition::is_true)
    }

    fn recompute(&self, conditions: &mut Vec<Condition>) {
        let deps: Vec<Option<&Condition>> =
            self.dependents.iter().map(|t| get(conditions, t)).collect();

        let happy = if let Some(failed) = deps.iter().flatten().find(|c| c.status.is_false()) {
            let mut c = Condition::new(self.happy, ConditionStatus::False);
            c.reason = failed.reason.clone();
            c.message = failed.message.clone();
            c
        } else if deps.iter().all(|c| c.is_some_and(Condition::is_true)) {
            Condition::new(self.happy, ConditionStatus::True)
        } else {
            let mut c = Condition::new(self.happy, ConditionStatus::Unknown);
            if let Some(pending) = deps.iter().flatten().find(|c| !c.is_true()) {
                c.reason = pending.reason.clone();
                c.message = pending.message.clone();
            }
            c
        };
        set(conditions, happy);
    }
}

/// Look up a condition by type.
pub fn get<'a>(conditions: &'a [Condition], condition_type: &str) -> Option<&'a Condition> {
    conditions
        .iter()
        .find(|c| c.condition_type == condition_type)
}

/// Insert or replace a condition, keeping the list sorted by type.
///
/// The transition time only moves when the status does.
fn set(conditions: &mut Vec<Condition>, mut condition: Condition) {
    if let Some(existing) = conditions
        .iter_mut()
        .find(|c| c.condition_type == condition.condition_type)
    {
        if existing.same_state(&condition) {
            return;
        }
        condition.last_transition_time = if existing.status == condition.status {
            existing.last_transition_time
        } else {
            Some(OffsetDateTime::now_utc())
        };
        *existing = condition;
    } else {
        condition.last_transition_time = Some(OffsetDateTime::now_utc());
        conditions.push(condition);
    }
    conditions.sort_by(|a, b| a.condition_type.cmp(&b.condition_type));
}
