pub mod condition;

pub use condition::{
    Condition, ConditionReason, ConditionStatus, ConditionType, HasConditions,
};
