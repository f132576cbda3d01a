use core::fmt;

use crate::ast::Key;
use crate::error::EvalError;
use crate::level::ContextLevel;
use crate::pdata::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ResourceField {
    Attributes,
    DroppedAttributesCount,
    SchemaUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ScopeField {
    Name,
    Version,
    Attributes,
    DroppedAttributesCount,
    SchemaUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ProfileField {
    Attributes,
    Body,
    ProfileId,
    TraceId,
    SpanId,
    TimeUnixNano,
    DurationNanos,
    DroppedAttributesCount,
    Flags,
    OriginalPayloadFormat,
    OriginalPayload,
}

/// The top-level field a path addresses, bound to a concrete level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    Resource(ResourceField),
    Scope(ScopeField),
    Profile(ProfileField),
    Cache(ContextLevel),
}

impl Accessor {
    pub fn resolve(level: ContextLevel, field: &str) -> Option<Accessor> {
        if field == "cache" {
            return Some(Accessor::Cache(level));
        }
        match level {
            ContextLevel::Resource => field.parse().ok().map(Accessor::Resource),
            ContextLevel::Scope => field.parse().ok().map(Accessor::Scope),
            ContextLevel::Profile => field.parse().ok().map(Accessor::Profile),
        }
    }
}

/// A path checked against a statement's level: the field it reads plus any
/// index keys applied to that field's value.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPath {
    pub(crate) accessor: Accessor,
    pub(crate) keys: Vec<Key>,
    pub(crate) text: String,
}

impl CompiledPath {
    pub fn new(accessor: Accessor, keys: Vec<Key>, text: String) -> Self {
        Self {
            accessor,
            keys,
            text,
        }
    }
}

impl fmt::Display for CompiledPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

fn key_text(key: &Key) -> String {
    match key {
        Key::String(s) => format!("{s:?}"),
        Key::Integer(i) => i.to_string(),
    }
}

fn slice_index(index: i64, len: usize) -> Result<usize, EvalError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(EvalError::IndexOutOfBounds { index, len })
}

/// Follows `keys` into `value`. Missing map keys and nil read as nil.
pub(crate) fn index_value(value: Value, keys: &[Key]) -> Result<Value, EvalError> {
    let mut current = value;
    for key in keys {
        current = match (current, key) {
            (Value::Nil, _) => return Ok(Value::Nil),
            (Value::Map(mut map), Key::String(k)) => map.shift_remove(k).unwrap_or_default(),
            (Value::Slice(mut items), Key::Integer(i)) => {
                let index = slice_index(*i, items.len())?;
                items.swap_remove(index)
            }
            (other, key) => {
                return Err(EvalError::InvalidIndex {
                    kind: other.type_name(),
                    key: key_text(key),
                })
            }
        };
    }
    Ok(current)
}

/// Writes `new_value` at `keys` below `target`, creating intermediate maps
/// for string keys that do not exist yet.
pub(crate) fn set_indexed(target: &mut Value, keys: &[Key], new_value: Value) -> Result<(), EvalError> {
    let Some((key, rest)) = keys.split_first() else {
        *target = new_value;
        return Ok(());
    };
    if target.is_nil() && matches!(key, Key::String(_)) {
        *target = Value::Map(Map::new());
    }
    match (target, key) {
        (Value::Map(map), Key::String(k)) => {
            let entry = map.entry(k.clone()).or_default();
            set_indexed(entry, rest, new_value)
        }
        (Value::Slice(items), Key::Integer(i)) => {
            let index = slice_index(*i, items.len())?;
            set_indexed(&mut items[index], rest, new_value)
        }
        (other, key) => Err(EvalError::InvalidIndex {
            kind: other.type_name(),
            key: key_text(key),
        }),
    }
}
