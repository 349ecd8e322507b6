pub mod condition;
pub mod error;
pub mod list;
pub mod manager;
pub mod set;

pub use condition::{
    Condition, ConditionCause, ConditionStatus, ConditionType,
    REASON_INITIALIZING,
};
pub use error::ConditionError;
pub use list::Conditions;
pub use manager::{ConditionManager, ConditionsAccessor};
pub use set::ConditionSet;
