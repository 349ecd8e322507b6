use ghsrc_conditions::{
    Condition, ConditionCause, ConditionSet, ConditionStatus, ConditionType,
    ConditionsAccessor,
};
use proptest::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Kind {
    Ready,
    D0,
    D1,
    D2,
    D3,
}

const DEPENDENTS: [Kind; 4] = [Kind::D0, Kind::D1, Kind::D2, Kind::D3];

impl ConditionType for Kind {
    fn as_str(&self) -> &'static str {
        match self {
            Kind::Ready => "Ready",
            Kind::D0 => "D0",
            Kind::D1 => "D1",
            Kind::D2 => "D2",
            Kind::D3 => "D3",
        }
    }
}

#[derive(Default, Clone, Debug)]
struct Status {
    conditions: Vec<Condition<Kind>>,
}

impl ConditionsAccessor<Kind> for Status {
    fn conditions(&self) -> &[Condition<Kind>] {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition<Kind>> {
        &mut self.conditions
    }
}

#[derive(Clone, Debug)]
enum Mark {
    True(usize),
    False(usize, String),
    Unknown(usize, String),
}

fn mark_strategy() -> impl Strategy<Value = Mark> {
    prop_oneof![
        (0..DEPENDENTS.len()).prop_map(Mark::True),
        (0..DEPENDENTS.len(), "[a-z]{1,8}")
            .prop_map(|(i, r)| Mark::False(i, r)),
        (0..DEPENDENTS.len(), "[a-z]{1,8}")
            .prop_map(|(i, r)| Mark::Unknown(i, r)),
    ]
}

fn set() -> ConditionSet<Kind> {
    ConditionSet::new(Kind::Ready, DEPENDENTS).unwrap()
}

fn apply(set: &ConditionSet<Kind>, status: &mut Status, mark: &Mark) {
    let mut cm = set.manage(status);
    match mark {
        Mark::True(i) => cm.mark_true(DEPENDENTS[*i]).unwrap(),
        Mark::False(i, r) => cm
            .mark_false(DEPENDENTS[*i], ConditionCause::new(r, format!("{r} msg")))
            .unwrap(),
        Mark::Unknown(i, r) => cm
            .mark_unknown(
                DEPENDENTS[*i],
                ConditionCause::new(r, format!("{r} msg")),
            )
            .unwrap(),
    }
}

fn find(status: &Status, t: Kind) -> &Condition<Kind> {
    status.conditions.iter().find(|c| c.type_ == t).unwrap()
}

/// Aggregate recomputed by hand from the dependents currently stored.
fn expected(status: &Status) -> (ConditionStatus, Option<String>) {
    let deps: Vec<&Condition<Kind>> =
        DEPENDENTS.iter().map(|d| find(status, *d)).collect();
    if let Some(c) = deps.iter().find(|c| c.status == ConditionStatus::False) {
        return (ConditionStatus::False, c.reason.clone());
    }
    if let Some(c) = deps.iter().find(|c| c.status == ConditionStatus::Unknown)
    {
        return (ConditionStatus::Unknown, c.reason.clone());
    }
    (ConditionStatus::True, None)
}

proptest! {
    #[test]
    fn aggregate_never_drifts_from_dependents(
        marks in proptest::collection::vec(mark_strategy(), 0..40)
    ) {
        let set = set();
        let mut status = Status::default();
        set.manage(&mut status).initialize_conditions();
        for mark in &marks {
            apply(&set, &mut status, mark);
            let ready = find(&status, Kind::Ready);
            let (want_status, want_reason) = expected(&status);
            prop_assert_eq!(ready.status, want_status);
            prop_assert_eq!(&ready.reason, &want_reason);

            let all_true = DEPENDENTS
                .iter()
                .all(|d| find(&status, *d).status == ConditionStatus::True);
            prop_assert_eq!(set.is_happy(&status), all_true);
        }
    }

    #[test]
    fn first_false_in_declared_order_names_the_aggregate(
        falses in proptest::sample::subsequence(vec![0usize, 1, 2, 3], 1..=4),
        order in 0usize..4,
    ) {
        let set = set();
        let mut status = Status::default();
        set.manage(&mut status).initialize_conditions();
        for d in DEPENDENTS {
            set.manage(&mut status).mark_true(d).unwrap();
        }

        // Mark in a scrambled order; the reported reason must not depend on it.
        let mut shuffled = falses.clone();
        let n = shuffled.len();
        shuffled.rotate_left(order % n);
        for i in &shuffled {
            apply(&set, &mut status, &Mark::False(*i, format!("r{i}")));
        }

        let ready = find(&status, Kind::Ready);
        prop_assert_eq!(ready.status, ConditionStatus::False);
        let first = falses.iter().min().copied().unwrap_or_default();
        let want_reason = format!("r{first}");
        let want_message = format!("r{first} msg");
        prop_assert_eq!(ready.reason.as_deref(), Some(want_reason.as_str()));
        prop_assert_eq!(ready.message.as_deref(), Some(want_message.as_str()));
    }

    #[test]
    fn initialize_twice_equals_once(
        marks in proptest::collection::vec(mark_strategy(), 0..10)
    ) {
        let set = set();
        let mut status = Status::default();
        set.manage(&mut status).initialize_conditions();
        for mark in &marks {
            apply(&set, &mut status, mark);
        }
        let once = status.conditions.clone();
        set.manage(&mut status).initialize_conditions();
        prop_assert_eq!(once, status.conditions);
    }
}
