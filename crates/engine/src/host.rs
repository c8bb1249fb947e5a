//! Host values accepted by the converter.
//!
//! [`HostValue`] is the closed set of shapes the converter understands
//! natively. Anything else reaches the converter as [`HostValue::Opaque`],
//! tagged with its Rust type name, and is offered to the custom converters.

use std::{
    any::{Any, type_name},
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use stencil_types::{ProviderRef, Value, resolved};

use crate::future::HostFuture;

/// Host-side indirection to another value (for example a named global).
///
/// The converter follows the indirection and converts whatever it points to.
/// Self-referential chains are not detected.
pub trait GlobalValue: Send + Sync + fmt::Debug {
    fn global_value(&self) -> HostValue;
}

/// A value originating outside the canonical representation.
#[derive(Clone, Debug)]
pub enum HostValue {
    Null,
    /// Already converted; returned unchanged.
    Provider(ProviderRef),
    String(String),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Result of an asynchronous host computation.
    Future(HostFuture),
    /// String-keyed map; entries are converted lazily.
    Map(IndexMap<String, HostValue>),
    /// Enumerable ordered collection; elements are converted lazily.
    List(Vec<HostValue>),
    Global(Arc<dyn GlobalValue>),
    Opaque(OpaqueValue),
}

impl HostValue {
    /// Wrap any host type that only a custom converter understands.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        HostValue::Opaque(OpaqueValue::new(value))
    }

    pub fn global(global: impl GlobalValue + 'static) -> Self {
        HostValue::Global(Arc::new(global))
    }

    /// Runtime type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Provider(_) => "provider",
            HostValue::String(_) => type_name::<String>(),
            HostValue::Bool(_) => type_name::<bool>(),
            HostValue::Int32(_) => type_name::<i32>(),
            HostValue::Int64(_) => type_name::<i64>(),
            HostValue::Float32(_) => type_name::<f32>(),
            HostValue::Float64(_) => type_name::<f64>(),
            HostValue::Future(_) => type_name::<HostFuture>(),
            HostValue::Map(_) => "map",
            HostValue::List(_) => "list",
            HostValue::Global(_) => "global",
            HostValue::Opaque(opaque) => opaque.type_name(),
        }
    }

    pub fn as_opaque(&self) -> Option<&OpaqueValue> {
        match self {
            HostValue::Opaque(opaque) => Some(opaque),
            _ => None,
        }
    }
}

/// Type-erased host object carrying the name of its concrete type.
#[derive(Clone)]
pub struct OpaqueValue {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.inner).downcast_ref::<T>()
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueValue").field("type_name", &self.type_name).finish()
    }
}

impl From<&str> for HostValue {
    fn from(text: &str) -> Self {
        HostValue::String(text.to_string())
    }
}

impl From<String> for HostValue {
    fn from(text: String) -> Self {
        HostValue::String(text)
    }
}

impl From<bool> for HostValue {
    fn from(flag: bool) -> Self {
        HostValue::Bool(flag)
    }
}

impl From<i32> for HostValue {
    fn from(number: i32) -> Self {
        HostValue::Int32(number)
    }
}

impl From<i64> for HostValue {
    fn from(number: i64) -> Self {
        HostValue::Int64(number)
    }
}

impl From<f32> for HostValue {
    fn from(number: f32) -> Self {
        HostValue::Float32(number)
    }
}

impl From<f64> for HostValue {
    fn from(number: f64) -> Self {
        HostValue::Float64(number)
    }
}

impl From<ProviderRef> for HostValue {
    fn from(provider: ProviderRef) -> Self {
        HostValue::Provider(provider)
    }
}

impl From<Value> for HostValue {
    fn from(value: Value) -> Self {
        HostValue::Provider(resolved(value))
    }
}

impl From<HostFuture> for HostValue {
    fn from(future: HostFuture) -> Self {
        HostValue::Future(future)
    }
}

impl From<OpaqueValue> for HostValue {
    fn from(opaque: OpaqueValue) -> Self {
        HostValue::Opaque(opaque)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(HostValue::Null)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(items: Vec<T>) -> Self {
        HostValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<HostValue>> From<IndexMap<String, T>> for HostValue {
    fn from(entries: IndexMap<String, T>) -> Self {
        HostValue::Map(entries.into_iter().map(|(key, value)| (key, value.into())).collect())
    }
}

impl<T: Into<HostValue>> From<HashMap<String, T>> for HostValue {
    fn from(entries: HashMap<String, T>) -> Self {
        HostValue::Map(entries.into_iter().map(|(key, value)| (key, value.into())).collect())
    }
}

impl<T: Into<HostValue>> From<BTreeMap<String, T>> for HostValue {
    fn from(entries: BTreeMap<String, T>) -> Self {
        HostValue::Map(entries.into_iter().map(|(key, value)| (key, value.into())).collect())
    }
}

/// JSON documents map onto the built-in shapes: objects become maps, arrays
/// become lists, integers that fit in `i64` become `Int64` and every other
/// number becomes `Float64`.
impl From<JsonValue> for HostValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => HostValue::Null,
            JsonValue::Bool(flag) => HostValue::Bool(flag),
            JsonValue::Number(number) => match number.as_i64() {
                Some(integer) => HostValue::Int64(integer),
                None => number.as_f64().map(HostValue::Float64).unwrap_or(HostValue::Null),
            },
            JsonValue::String(text) => HostValue::String(text),
            JsonValue::Array(items) => HostValue::List(items.into_iter().map(HostValue::from).collect()),
            JsonValue::Object(entries) => HostValue::Map(entries.into_iter().map(|(key, value)| (key, HostValue::from(value))).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Widget {
        id: u32,
    }

    #[test]
    fn opaque_value_records_type_and_downcasts() {
        let host = HostValue::opaque(Widget { id: 9 });
        let opaque = host.as_opaque().expect("opaque");
        assert!(opaque.type_name().ends_with("Widget"), "type name: {}", opaque.type_name());
        assert_eq!(opaque.downcast_ref::<Widget>().map(|widget| widget.id), Some(9));
        assert!(opaque.downcast_ref::<String>().is_none());
    }

    #[test]
    fn json_numbers_keep_integer_and_float_apart() {
        assert!(matches!(HostValue::from(json!(3)), HostValue::Int64(3)));
        assert!(matches!(HostValue::from(json!(2.5)), HostValue::Float64(value) if value == 2.5));
        assert!(matches!(HostValue::from(json!(u64::MAX)), HostValue::Float64(_)));
    }

    #[test]
    fn json_containers_become_maps_and_lists() {
        let host = HostValue::from(json!({"a": [1, "two", null]}));
        let HostValue::Map(entries) = host else {
            panic!("expected map");
        };
        let Some(HostValue::List(items)) = entries.get("a") else {
            panic!("expected list under 'a'");
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(items[2], HostValue::Null));
    }

    #[test]
    fn option_none_is_null() {
        assert!(matches!(HostValue::from(None::<i32>), HostValue::Null));
        assert!(matches!(HostValue::from(Some(4)), HostValue::Int32(4)));
    }
}
