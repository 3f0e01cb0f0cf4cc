//! Shared domain models.

use std::{collections::BTreeMap, fmt};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

mod entity;

pub use entity::{
    Artifact, Character, Constellation, FightProp, Named, Namecard, Skill, Weapon,
};

/// A raw excel record: field name to JSON value.
pub type Record = Map<String, Value>;

/// Projected records of one entity kind, ordered by id.
pub type Projection<T> = BTreeMap<EntityId, T>;

/// Identifier of an entity or text-map hash.
///
/// Upstream tables key most rows by integer ids while a few use
/// descriptive strings. The native form is kept for serialization and
/// [`EntityId::hash_key`] gives the string form used by text maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    /// Integer id.
    Num(i64),
    /// String id.
    Text(String),
}

impl EntityId {
    /// Interpret a JSON scalar as an id.
    ///
    /// Integers beyond `i64` are kept in their decimal string form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(
                number
                    .as_i64()
                    .map(EntityId::Num)
                    .unwrap_or_else(|| EntityId::Text(number.to_string())),
            ),
            Value::String(text) => Some(EntityId::Text(text.clone())),
            _ => None,
        }
    }

    /// String form used as a text-map key.
    pub fn hash_key(&self) -> String {
        self.to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        EntityId::Num(0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Num(value) => write!(f, "{value}"),
            EntityId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId::Num(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId::Text(value.to_string())
    }
}

// JSON object keys are always strings; serde_json quotes integer keys itself.
impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            EntityId::Num(value) => serializer.serialize_i64(*value),
            EntityId::Text(value) => serializer.serialize_str(value),
        }
    }
}

/// Typed accessors over a raw record.
///
/// Upstream tables have no schema guarantees, so every accessor returns a
/// fixed default when the field is absent or has an unexpected type.
pub trait RecordExt {
    /// Field value, if present.
    fn raw(&self, key: &str) -> Option<&Value>;

    /// Id stored under `key`; `None` when absent or not a scalar.
    fn id(&self, key: &str) -> Option<EntityId> {
        self.raw(key).and_then(EntityId::from_value)
    }

    /// String field; `""` when absent or not a string.
    fn text(&self, key: &str) -> String {
        self.raw(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Integer field; `0` when absent or not an integer.
    fn int(&self, key: &str) -> i64 {
        self.raw(key).and_then(Value::as_i64).unwrap_or(0)
    }

    /// List field copied verbatim; empty when absent or not a list.
    fn list(&self, key: &str) -> Vec<Value> {
        self.raw(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    /// Integer items of a list field, in order; non-integer items are dropped.
    fn int_list(&self, key: &str) -> Vec<i64> {
        self.raw(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default()
    }
}

impl RecordExt for Record {
    fn raw(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}
