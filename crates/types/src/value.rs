//! Canonical template values.
//!
//! Values are immutable once built. Containers hold providers rather than
//! values so that nested entries can be converted lazily; cloning a value only
//! bumps reference counts.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{
    Serialize, Serializer,
    ser::{Error as _, SerializeMap, SerializeSeq},
};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::{ConversionError, ProviderRef, provider::same_provider};

static EMPTY_LIST: Lazy<ListValue> = Lazy::new(|| ListValue::new(Vec::new()));
static EMPTY_MAP: Lazy<MapValue> = Lazy::new(|| MapValue::new(IndexMap::new()));

/// Kind tag of a canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    List,
    Map,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, kind-tagged template value.
///
/// Equality, `Display` and serialization of lists and maps resolve every
/// entry, so they block while an entry is still waiting on a pending
/// deferred computation.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(Arc<str>),
    List(ListValue),
    Map(MapValue),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text.as_ref()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Deep export into JSON, resolving every nested provider.
    ///
    /// Non-finite floats have no JSON representation and become `null`.
    pub fn to_json(&self) -> Result<JsonValue, ConversionError> {
        Ok(match self {
            Value::Null => JsonValue::Null,
            Value::Bool(flag) => JsonValue::Bool(*flag),
            Value::Integer(number) => JsonValue::Number(Number::from(*number)),
            Value::Float(number) => Number::from_f64(*number).map(JsonValue::Number).unwrap_or(JsonValue::Null),
            Value::String(text) => JsonValue::String(text.to_string()),
            Value::List(list) => JsonValue::Array(
                list.iter()
                    .map(|provider| provider.resolve()?.to_json())
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::Map(map) => {
                let mut object = JsonMap::new();
                for (key, provider) in map.iter() {
                    object.insert(key.to_string(), provider.resolve()?.to_json()?);
                }
                JsonValue::Object(object)
            }
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Integer(left), Value::Integer(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => left == right,
            (Value::String(left), Value::String(right)) => left == right,
            (Value::List(left), Value::List(right)) => left == right,
            (Value::Map(left), Value::Map(right)) => left == right,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::Integer(number) => write!(f, "{number}"),
            // Debug keeps the fractional part ("1.0"), so floats stay distinguishable from ints.
            Value::Float(number) => write!(f, "{number:?}"),
            Value::String(text) => f.write_str(text),
            Value::List(list) => {
                f.write_str("[")?;
                for (index, provider) in list.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write_provider(f, provider)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (index, (key, provider)) in map.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: ")?;
                    write_provider(f, provider)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Serializes the fully resolved tree. Map keys keep insertion order and an
/// entry that fails to resolve aborts serialization with its error message.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(flag) => serializer.serialize_bool(*flag),
            Value::Integer(number) => serializer.serialize_i64(*number),
            Value::Float(number) => serializer.serialize_f64(*number),
            Value::String(text) => serializer.serialize_str(text),
            Value::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for provider in list {
                    seq.serialize_element(&provider.resolve().map_err(S::Error::custom)?)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut entries = serializer.serialize_map(Some(map.len()))?;
                for (key, provider) in map.iter() {
                    entries.serialize_entry(key, &provider.resolve().map_err(S::Error::custom)?)?;
                }
                entries.end()
            }
        }
    }
}

fn write_provider(f: &mut fmt::Formatter<'_>, provider: &ProviderRef) -> fmt::Result {
    match provider.resolve() {
        Ok(value) => write!(f, "{value}"),
        Err(error) => write!(f, "<error: {error}>"),
    }
}

fn providers_equal(left: &ProviderRef, right: &ProviderRef) -> bool {
    if same_provider(left, right) {
        return true;
    }
    match (left.resolve(), right.resolve()) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(Arc::from(text))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(Arc::from(text))
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Integer(number)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Float(number)
    }
}

/// Immutable ordered sequence of providers.
#[derive(Debug, Clone)]
pub struct ListValue {
    items: Arc<[ProviderRef]>,
}

impl ListValue {
    pub fn new(items: Vec<ProviderRef>) -> Self {
        Self { items: Arc::from(items) }
    }

    /// Shared empty list.
    pub fn empty() -> Self {
        EMPTY_LIST.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ProviderRef> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProviderRef> {
        self.items.iter()
    }

    /// Whether both lists are backed by the same allocation.
    pub fn shares_storage(&self, other: &ListValue) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// Resolve every element in order, stopping at the first failure.
    pub fn resolve_all(&self) -> Result<Vec<Value>, ConversionError> {
        self.items.iter().map(|provider| provider.resolve()).collect()
    }
}

impl PartialEq for ListValue {
    fn eq(&self, other: &Self) -> bool {
        self.shares_storage(other)
            || (self.len() == other.len() && self.iter().zip(other.iter()).all(|(left, right)| providers_equal(left, right)))
    }
}

impl<'a> IntoIterator for &'a ListValue {
    type Item = &'a ProviderRef;
    type IntoIter = std::slice::Iter<'a, ProviderRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Immutable string-keyed mapping to providers. Iteration follows insertion order.
#[derive(Debug, Clone)]
pub struct MapValue {
    entries: Arc<IndexMap<String, ProviderRef>>,
}

impl MapValue {
    pub fn new(entries: IndexMap<String, ProviderRef>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Shared empty map.
    pub fn empty() -> Self {
        EMPTY_MAP.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ProviderRef> {
        self.entries.get(key)
    }

    /// Whether both maps are backed by the same allocation.
    pub fn shares_storage(&self, other: &MapValue) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderRef)> {
        self.entries.iter().map(|(key, provider)| (key.as_str(), provider))
    }
}

impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        if self.shares_storage(other) {
            return true;
        }
        self.len() == other.len()
            && self.entries.iter().all(|(key, provider)| {
                other
                    .entries
                    .get(key)
                    .is_some_and(|other_provider| providers_equal(provider, other_provider))
            })
    }
}
