use tracing::debug;

use crate::condition::{Condition, ConditionType};
use crate::error::ConditionError;
use crate::manager::{ConditionManager, ConditionsAccessor};

/// Catalog of the conditions that gate readiness for one resource kind.
///
/// Built once and shared read-only between every resource of that kind.
/// The aggregate ("happy") condition is True only when every dependent is
/// True; see [`ConditionManager`] for the exact composition rule.
#[derive(Clone, Debug)]
pub struct ConditionSet<T: ConditionType> {
    happy: T,
    dependents: Vec<T>,
}

impl<T: ConditionType> ConditionSet<T> {
    pub fn new(
        happy: T,
        dependents: impl IntoIterator<Item = T>,
    ) -> Result<Self, ConditionError> {
        let mut declared: Vec<T> = Vec::new();
        for d in dependents {
            if d == happy {
                return Err(ConditionError::AggregateAsDependent(
                    happy.as_str(),
                ));
            }
            if declared.contains(&d) {
                return Err(ConditionError::DuplicateDependent(d.as_str()));
            }
            declared.push(d);
        }
        if declared.is_empty() {
            debug!(
                happy = happy.as_str(),
                "condition set has no dependents; aggregate is trivially ready"
            );
        }
        Ok(Self {
            happy,
            dependents: declared,
        })
    }

    pub fn happy(&self) -> T {
        self.happy
    }

    /// Dependents in declared order.
    pub fn dependents(&self) -> &[T] {
        &self.dependents
    }

    pub fn is_degenerate(&self) -> bool {
        self.dependents.is_empty()
    }

    pub fn is_dependent(&self, t: T) -> bool {
        self.dependents.contains(&t)
    }

    pub fn contains(&self, t: T) -> bool {
        t == self.happy || self.is_dependent(t)
    }

    /// Canonical position in the status record: aggregate first, then
    /// dependents in declared order, undeclared types last.
    pub(crate) fn rank(&self, t: T) -> usize {
        if t == self.happy {
            return 0;
        }
        self.dependents
            .iter()
            .position(|d| *d == t)
            .map(|i| i + 1)
            .unwrap_or(usize::MAX)
    }

    /// Bind this set to one status record for the duration of a
    /// reconciliation pass.
    pub fn manage<'a, S>(&'a self, status: &'a mut S) -> ConditionManager<'a, T, S>
    where
        S: ConditionsAccessor<T>,
    {
        ConditionManager::new(self, status)
    }

    pub fn get_condition<'s, S>(
        &self,
        status: &'s S,
        t: T,
    ) -> Option<&'s Condition<T>>
    where
        S: ConditionsAccessor<T>,
    {
        status.conditions().iter().find(|c| c.type_ == t)
    }

    /// True iff the aggregate condition is present and True.
    pub fn is_happy<S>(&self, status: &S) -> bool
    where
        S: ConditionsAccessor<T>,
    {
        self.get_condition(status, self.happy)
            .map(|c| c.is_true())
            .unwrap_or(false)
    }
}
