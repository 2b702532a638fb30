use std::fmt::Display;

use jiff::Timestamp;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use strum::EnumCount;

/// A **data structure** that contains a vector of [`Condition`]s.
/// Implemented on the status of the custom resources managed by this operator.
pub trait HasConditions {
    fn conditions(&self) -> &[Condition];

    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    /// Sets `condition`, replacing any existing condition of the same type.
    fn set_condition(&mut self, condition: Condition) {
        let mut set: ConditionSet = std::mem::take(self.conditions_mut()).into();
        set.put(condition);
        *self.conditions_mut() = set.into();
    }

    /// Returns the condition of the given type, if any.
    fn condition(&self, type_: ConditionType) -> Option<&Condition> {
        self.conditions().iter().find(|c| c.type_ == type_)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Last time the condition transitioned from one status to another.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,

    /// A human readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The reason for the condition's last transition.
    pub reason: ConditionReason,

    /// Status of the condition, one of True, False, Unknown.
    pub status: ConditionStatus,

    /// Type of the condition.
    #[serde(rename = "type")]
    pub type_: ConditionType,
}

impl Condition {
    /// The external bucket is being created.
    pub fn creating() -> Self {
        Self::new(
            ConditionType::Ready,
            ConditionStatus::False,
            ConditionReason::Creating,
        )
    }

    /// The external bucket exists and can be used.
    pub fn available() -> Self {
        Self::new(
            ConditionType::Ready,
            ConditionStatus::True,
            ConditionReason::Available,
        )
    }

    /// The external bucket is being deleted.
    pub fn deleting() -> Self {
        Self::new(
            ConditionType::Ready,
            ConditionStatus::False,
            ConditionReason::Deleting,
        )
    }

    /// The last reconciliation finished without errors.
    pub fn reconcile_success() -> Self {
        Self::new(
            ConditionType::Synced,
            ConditionStatus::True,
            ConditionReason::ReconcileSuccess,
        )
    }

    /// The last reconciliation failed.
    pub fn reconcile_error(error: &impl Display) -> Self {
        Self {
            message: Some(error.to_string()),
            ..Self::new(
                ConditionType::Synced,
                ConditionStatus::False,
                ConditionReason::ReconcileError,
            )
        }
    }

    fn new(type_: ConditionType, status: ConditionStatus, reason: ConditionReason) -> Self {
        Self {
            last_transition_time: None,
            message: None,
            reason,
            status,
            type_,
        }
    }

    /// Ignores timestamps.
    fn equivalent(&self, other: &Self) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    EnumCount,
    Eq,
    Hash,
    JsonSchema,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionType {
    /// Ready indicates whether the external resource is usable.
    #[default]
    Ready,

    /// Synced indicates whether the last reconciliation succeeded.
    Synced,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    /// True means a resource is in the condition.
    True,

    /// False means a resource is not in the condition.
    False,

    /// Unknown means the operator cannot decide if a resource is in the condition or not.
    #[default]
    Unknown,
}

#[derive(
    strum::Display,
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionReason {
    Creating,
    Available,
    Deleting,
    ReconcileSuccess,
    ReconcileError,
    #[default]
    Unknown,
}

/// Helper struct to order and merge [`Condition`] objects.
#[derive(Clone, Default)]
struct ConditionSet {
    conditions: Vec<Option<Condition>>,
}

impl ConditionSet {
    fn new() -> Self {
        // Every ConditionType has its fixed position, which keeps the
        // serialized order stable and prevents duplicate types.
        Self {
            conditions: vec![None; ConditionType::COUNT],
        }
    }

    /// Stores `condition` at its assigned index, carrying over the transition
    /// time of the previous condition if nothing changed.
    fn put(&mut self, condition: Condition) {
        let index = condition.type_ as usize;
        let merged = match self.conditions[index].take() {
            Some(old) => update_timestamps(old, condition),
            None => Condition {
                last_transition_time: Some(Time(Timestamp::now())),
                ..condition
            },
        };
        self.conditions[index] = Some(merged);
    }
}

fn update_timestamps(old_condition: Condition, new_condition: Condition) -> Condition {
    if old_condition.equivalent(&new_condition) {
        Condition {
            last_transition_time: old_condition.last_transition_time,
            ..new_condition
        }
    } else {
        Condition {
            last_transition_time: Some(Time(Timestamp::now())),
            ..new_condition
        }
    }
}

impl From<ConditionSet> for Vec<Condition> {
    fn from(value: ConditionSet) -> Self {
        value.conditions.into_iter().flatten().collect()
    }
}

impl From<Vec<Condition>> for ConditionSet {
    fn from(value: Vec<Condition>) -> Self {
        let mut result = Self::new();
        for condition in value {
            let index = condition.type_ as usize;
            result.conditions[index] = Some(condition);
        }
        result
    }
}
