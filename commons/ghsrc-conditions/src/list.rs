use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::Schema;
use serde::de::{IntoDeserializer, value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::condition::Condition;
use crate::manager::ConditionsAccessor;

/// The `conditions` array of a status record.
///
/// Entries whose `type` is not a variant of `T` are kept verbatim and written
/// back after the typed ones. They are never seen by a [`ConditionManager`],
/// so they cannot influence the aggregate.
///
/// [`ConditionManager`]: crate::ConditionManager
#[derive(Clone, Debug, PartialEq)]
pub struct Conditions<T> {
    typed: Vec<Condition<T>>,
    foreign: Vec<Condition<String>>,
}

impl<T> Default for Conditions<T> {
    fn default() -> Self {
        Self {
            typed: Vec::new(),
            foreign: Vec::new(),
        }
    }
}

impl<T> Conditions<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, Condition<T>> {
        self.typed.iter()
    }

    /// Entries with a type this controller does not know.
    pub fn foreign(&self) -> &[Condition<String>] {
        &self.foreign
    }

    pub fn len(&self) -> usize {
        self.typed.len() + self.foreign.len()
    }

    pub fn is_empty(&self) -> bool {
        self.typed.is_empty() && self.foreign.is_empty()
    }
}

impl<T> ConditionsAccessor<T> for Conditions<T> {
    fn conditions(&self) -> &[Condition<T>] {
        &self.typed
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition<T>> {
        &mut self.typed
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Entry<'a, T> {
    Typed(&'a Condition<T>),
    Foreign(&'a Condition<String>),
}

impl<T: Serialize> Serialize for Conditions<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            self.typed
                .iter()
                .map(Entry::Typed)
                .chain(self.foreign.iter().map(Entry::Foreign)),
        )
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Conditions<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<Condition<String>>::deserialize(deserializer)?;
        let mut out = Conditions::default();
        for c in raw {
            let parsed: Result<T, value::Error> =
                T::deserialize(c.type_.as_str().into_deserializer());
            match parsed {
                Ok(type_) => out.typed.push(Condition {
                    type_,
                    status: c.status,
                    reason: c.reason,
                    message: c.message,
                    last_transition_time: c.last_transition_time,
                }),
                Err(_) => out.foreign.push(c),
            }
        }
        Ok(out)
    }
}

// The stored schema accepts any type string, or the API server would reject
// records carrying foreign conditions.
impl<T> JsonSchema for Conditions<T> {
    fn schema_name() -> String {
        "Conditions".to_string()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        <Vec<Condition<String>>>::json_schema(generator)
    }

    fn is_referenceable() -> bool {
        false
    }
}
