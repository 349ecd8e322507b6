use chrono::Utc;
use tracing::{debug, error};

use crate::condition::{
    Condition, ConditionCause, ConditionStatus, ConditionType,
    REASON_INITIALIZING,
};
use crate::error::ConditionError;
use crate::set::ConditionSet;

/// Access to the condition list of a status record.
pub trait ConditionsAccessor<T> {
    fn conditions(&self) -> &[Condition<T>];
    fn conditions_mut(&mut self) -> &mut Vec<Condition<T>>;
}

/// Reads and mutates the conditions of one borrowed status record.
///
/// Every mark call rescans all dependents and rewrites the aggregate:
///
/// * the first dependent (declared order) that is False makes the aggregate
///   False with that dependent's reason and message;
/// * otherwise the first Unknown (or missing) dependent makes it Unknown;
/// * otherwise the aggregate is True with reason and message cleared.
///
/// The aggregate is therefore always a function of the dependents' current
/// statuses, never of the order in which they were marked.
pub struct ConditionManager<'a, T: ConditionType, S> {
    set: &'a ConditionSet<T>,
    status: &'a mut S,
}

impl<'a, T, S> ConditionManager<'a, T, S>
where
    T: ConditionType,
    S: ConditionsAccessor<T>,
{
    pub(crate) fn new(set: &'a ConditionSet<T>, status: &'a mut S) -> Self {
        Self { set, status }
    }

    /// Insert every missing dependent and the aggregate as Unknown.
    /// Conditions already present are left as they are.
    pub fn initialize_conditions(&mut self) {
        let set = self.set;
        let mut inserted = false;
        for t in std::iter::once(set.happy()).chain(set.dependents().iter().copied()) {
            if set.get_condition(&*self.status, t).is_none() {
                self.set_condition(
                    t,
                    ConditionStatus::Unknown,
                    Some(REASON_INITIALIZING.to_string()),
                    None,
                );
                inserted = true;
            }
        }
        if inserted {
            self.recompute_happy();
        }
    }

    pub fn get_condition(&self, t: T) -> Option<&Condition<T>> {
        self.set.get_condition(&*self.status, t)
    }

    pub fn is_happy(&self) -> bool {
        self.set.is_happy(&*self.status)
    }

    pub fn mark_true(&mut self, t: T) -> Result<(), ConditionError> {
        self.check_markable(t)?;
        self.set_condition(t, ConditionStatus::True, None, None);
        self.recompute_happy();
        Ok(())
    }

    pub fn mark_false(
        &mut self,
        t: T,
        cause: ConditionCause,
    ) -> Result<(), ConditionError> {
        self.check_markable(t)?;
        self.set_condition(
            t,
            ConditionStatus::False,
            Some(cause.reason),
            Some(cause.message),
        );
        self.recompute_happy();
        Ok(())
    }

    pub fn mark_unknown(
        &mut self,
        t: T,
        cause: ConditionCause,
    ) -> Result<(), ConditionError> {
        self.check_markable(t)?;
        self.set_condition(
            t,
            ConditionStatus::Unknown,
            Some(cause.reason),
            Some(cause.message),
        );
        self.recompute_happy();
        Ok(())
    }

    fn check_markable(&self, t: T) -> Result<(), ConditionError> {
        if t == self.set.happy() {
            error!(
                condition = t.as_str(),
                "refusing to mark aggregate condition directly"
            );
            return Err(ConditionError::AggregateNotMarkable(t.as_str()));
        }
        if !self.set.is_dependent(t) {
            error!(
                condition = t.as_str(),
                "refusing to mark undeclared condition"
            );
            return Err(ConditionError::Undeclared(t.as_str()));
        }
        Ok(())
    }

    fn recompute_happy(&mut self) {
        let (status, reason, message) =
            aggregate(self.set, self.status.conditions());
        self.set_condition(self.set.happy(), status, reason, message);
    }

    /// Upsert one condition. The transition time is stamped on insert and
    /// on status change only.
    fn set_condition(
        &mut self,
        t: T,
        status: ConditionStatus,
        reason: Option<String>,
        message: Option<String>,
    ) {
        let set = self.set;
        let conditions = self.status.conditions_mut();
        if let Some(existing) = conditions.iter_mut().find(|c| c.type_ == t) {
            if existing.status != status {
                debug!(
                    condition = t.as_str(),
                    from = %existing.status,
                    to = %status,
                    "condition transition"
                );
                existing.last_transition_time = Some(now());
            }
            existing.status = status;
            existing.reason = reason;
            existing.message = message;
            return;
        }
        conditions.push(Condition {
            type_: t,
            status,
            reason,
            message,
            last_transition_time: Some(now()),
        });
        conditions.sort_by_key(|c| set.rank(c.type_));
    }
}

/// Aggregate status, reason and message implied by the dependents in
/// `conditions`.
pub(crate) fn aggregate<T: ConditionType>(
    set: &ConditionSet<T>,
    conditions: &[Condition<T>],
) -> (ConditionStatus, Option<String>, Option<String>) {
    let lookup = |t: T| conditions.iter().find(|c| c.type_ == t);

    for d in set.dependents() {
        if let Some(c) = lookup(*d).filter(|c| c.is_false()) {
            return (ConditionStatus::False, c.reason.clone(), c.message.clone());
        }
    }
    for d in set.dependents() {
        match lookup(*d) {
            None => return (ConditionStatus::Unknown, None, None),
            Some(c) if c.is_unknown() => {
                return (
                    ConditionStatus::Unknown,
                    c.reason.clone(),
                    c.message.clone(),
                );
            }
            Some(_) => {}
        }
    }
    (ConditionStatus::True, None, None)
}

fn now() -> String {
    Utc::now().to_rfc3339()
}
