#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("condition type {0} is not declared in this condition set")]
    Undeclared(&'static str),

    #[error("aggregate condition {0} is derived and cannot be marked directly")]
    AggregateNotMarkable(&'static str),

    #[error("aggregate condition {0} cannot also be listed as a dependent")]
    AggregateAsDependent(&'static str),

    #[error("dependent condition {0} is listed more than once")]
    DuplicateDependent(&'static str),
}
