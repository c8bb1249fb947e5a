//! # Host Value Conversion
//!
//! The [`Converter`] turns [`HostValue`]s into canonical providers. Dispatch is
//! a fixed sequence of built-in cases followed by a single extension point:
//!
//! 1. `Null` becomes the canonical null provider.
//! 2. An existing provider is returned unchanged.
//! 3. Strings, booleans, integers, floats and futures are converted on the spot.
//! 4. Maps become map values whose entries are converted lazily.
//! 5. Lists become list values whose elements are converted lazily.
//! 6. Global indirections are followed to the value they point to.
//! 7. Everything else is offered to the custom converters, in order.
//! 8. If nobody accepts the value, conversion fails with
//!    [`ConversionError::Unrecognized`].
//!
//! ## Usage
//!
//! ```rust
//! use stencil_engine::{Converter, HostValue};
//! use serde_json::json;
//!
//! let converter = Converter::uncustomized();
//! let provider = converter.convert(HostValue::from(json!({"a": 1, "b": [2, 3]})))?;
//! let value = provider.resolve()?;
//! let map = value.as_map().expect("map");
//! let list = map.get("b").expect("entry").resolve()?;
//! assert_eq!(list.as_list().map(|items| items.len()), Some(2));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use stencil_types::{ConversionError, ListValue, MapValue, ProviderRef, Value, boolean, null};
use tracing::{debug, warn};

use crate::{
    HostValue,
    provider::{CachingProvider, DeferredProvider},
};

static UNCUSTOMIZED: Lazy<Converter> = Lazy::new(|| Converter::builder().build());

/// Extension point consulted after every built-in case has declined a value.
///
/// Return `Ok(None)` to let the next converter try. The converter passed in
/// can be used to convert nested host values.
pub trait CustomValueConverter: Send + Sync {
    fn convert(&self, converter: &Converter, value: &HostValue) -> Result<Option<ProviderRef>, ConversionError>;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Converts host values into canonical providers.
///
/// The converter holds nothing but its ordered list of custom converters, so
/// clones are cheap and a single instance can be shared by concurrent
/// conversions.
#[derive(Clone)]
pub struct Converter {
    custom_converters: Arc<[Arc<dyn CustomValueConverter>]>,
}

impl Converter {
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    /// Process-wide converter without custom converters.
    pub fn uncustomized() -> &'static Converter {
        &UNCUSTOMIZED
    }

    pub fn custom_converter_count(&self) -> usize {
        self.custom_converters.len()
    }

    /// Convert a host value into an equivalent provider.
    ///
    /// Primitives are converted immediately. Map entries and list elements are
    /// wrapped in caching providers and converted on first resolution.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Unrecognized`] when no built-in case and no
    /// custom converter accepts the value. Custom converter errors are
    /// propagated unchanged.
    pub fn convert(&self, value: impl Into<HostValue>) -> Result<ProviderRef, ConversionError> {
        let mut value = value.into();
        loop {
            value = match self.convert_primitive(value) {
                Ok(provider) => return Ok(provider),
                Err(value) => value,
            };
            match value {
                HostValue::Map(entries) => return Ok(self.map_from_entries(entries)),
                HostValue::List(items) => return Ok(self.list_from_items(items)),
                HostValue::Global(global) => value = global.global_value(),
                other => return self.convert_custom(other),
            }
        }
    }

    /// Like [`Converter::convert`], but defers all non-primitive work until the
    /// returned provider is first resolved. The work runs at most once.
    pub fn convert_lazy(&self, value: impl Into<HostValue>) -> ProviderRef {
        match self.convert_primitive(value.into()) {
            Ok(provider) => provider,
            Err(value) => {
                let converter = self.clone();
                Arc::new(CachingProvider::new(move || converter.convert(value)?.resolve()))
            }
        }
    }

    /// Build a list converting every item eagerly.
    ///
    /// # Errors
    ///
    /// Fails on the first item that cannot be converted.
    pub fn new_list<I>(&self, items: I) -> Result<ListValue, ConversionError>
    where
        I: IntoIterator,
        I::Item: Into<HostValue>,
    {
        let providers = items
            .into_iter()
            .map(|item| self.convert(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListValue::new(providers))
    }

    /// Fast path for values that need no structural work. Hands the value back
    /// when it is not a primitive.
    fn convert_primitive(&self, value: HostValue) -> Result<ProviderRef, HostValue> {
        let provider: ProviderRef = match value {
            HostValue::Null => null(),
            HostValue::Provider(provider) => provider,
            HostValue::String(text) => Arc::new(Value::from(text)),
            HostValue::Bool(flag) => boolean(flag),
            HostValue::Int32(number) => Arc::new(Value::Integer(i64::from(number))),
            HostValue::Int64(number) => Arc::new(Value::Integer(number)),
            HostValue::Float32(number) => Arc::new(Value::Float(f64::from(number))),
            HostValue::Float64(number) => Arc::new(Value::Float(number)),
            HostValue::Future(future) => Arc::new(DeferredProvider::new(self.clone(), future)),
            other => return Err(other),
        };
        Ok(provider)
    }

    fn map_from_entries(&self, entries: IndexMap<String, HostValue>) -> ProviderRef {
        if entries.is_empty() {
            return Arc::new(Value::Map(MapValue::empty()));
        }
        let providers = entries
            .into_iter()
            .map(|(key, value)| (key, self.convert_lazy(value)))
            .collect::<IndexMap<_, _>>();
        Arc::new(Value::Map(MapValue::new(providers)))
    }

    fn list_from_items(&self, items: Vec<HostValue>) -> ProviderRef {
        if items.is_empty() {
            return Arc::new(Value::List(ListValue::empty()));
        }
        let providers = items.into_iter().map(|item| self.convert_lazy(item)).collect();
        Arc::new(Value::List(ListValue::new(providers)))
    }

    fn convert_custom(&self, value: HostValue) -> Result<ProviderRef, ConversionError> {
        for custom in self.custom_converters.iter() {
            if let Some(provider) = custom.convert(self, &value)? {
                debug!(
                    converter = custom.name(),
                    type_name = value.type_name(),
                    "custom converter accepted value"
                );
                return Ok(provider);
            }
        }
        warn!(
            type_name = value.type_name(),
            custom_converters = self.custom_converter_count(),
            "unrecognized host value"
        );
        Err(ConversionError::unrecognized(value.type_name()))
    }
}

impl Default for Converter {
    fn default() -> Self {
        Converter::uncustomized().clone()
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field(
                "custom_converters",
                &self.custom_converters.iter().map(|custom| custom.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Collects custom converters; registration order is consultation order.
#[derive(Default)]
pub struct ConverterBuilder {
    custom_converters: Vec<Arc<dyn CustomValueConverter>>,
}

impl ConverterBuilder {
    pub fn with_custom_converter(mut self, converter: impl CustomValueConverter + 'static) -> Self {
        self.custom_converters.push(Arc::new(converter));
        self
    }

    pub fn with_shared_converter(mut self, converter: Arc<dyn CustomValueConverter>) -> Self {
        self.custom_converters.push(converter);
        self
    }

    pub fn with_custom_converters<I>(mut self, converters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn CustomValueConverter>>,
    {
        self.custom_converters.extend(converters);
        self
    }

    pub fn build(self) -> Converter {
        Converter {
            custom_converters: Arc::from(self.custom_converters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GlobalValue, HostFuture};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stencil_types::{RenderStatus, ValueKind, resolved, same_provider};

    #[derive(Debug)]
    struct Point {
        x: i64,
        y: i64,
    }

    struct PointConverter;

    impl CustomValueConverter for PointConverter {
        fn convert(&self, converter: &Converter, value: &HostValue) -> Result<Option<ProviderRef>, ConversionError> {
            let Some(point) = value.as_opaque().and_then(|opaque| opaque.downcast_ref::<Point>()) else {
                return Ok(None);
            };
            let mut entries = IndexMap::new();
            entries.insert("x".to_string(), point.x);
            entries.insert("y".to_string(), point.y);
            converter.convert(entries).map(Some)
        }
    }

    struct Declining {
        calls: AtomicUsize,
    }

    impl CustomValueConverter for Declining {
        fn convert(&self, _converter: &Converter, _value: &HostValue) -> Result<Option<ProviderRef>, ConversionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    struct Constant(&'static str);

    impl CustomValueConverter for Constant {
        fn convert(&self, _converter: &Converter, _value: &HostValue) -> Result<Option<ProviderRef>, ConversionError> {
            Ok(Some(resolved(Value::from(self.0))))
        }
    }

    #[derive(Debug)]
    struct SiteName;

    impl GlobalValue for SiteName {
        fn global_value(&self) -> HostValue {
            HostValue::from("stencil.example")
        }
    }

    #[derive(Debug)]
    struct Leaf;

    impl GlobalValue for Leaf {
        fn global_value(&self) -> HostValue {
            HostValue::from("leaf")
        }
    }

    #[derive(Debug)]
    struct Alias;

    impl GlobalValue for Alias {
        fn global_value(&self) -> HostValue {
            HostValue::global(SiteName)
        }
    }

    fn resolve(value: impl Into<HostValue>) -> Value {
        Converter::uncustomized()
            .convert(value)
            .expect("convert")
            .resolve()
            .expect("resolve")
    }

    #[test]
    fn primitives_convert_to_matching_kinds() {
        assert_eq!(resolve("text"), Value::from("text"));
        assert_eq!(resolve(true), Value::Bool(true));
        assert_eq!(resolve(7i32), Value::Integer(7));
        assert_eq!(resolve(7i64), Value::Integer(7));
        assert_eq!(resolve(1.5f32).kind(), ValueKind::Float);
        assert_eq!(resolve(1.5f32), Value::Float(1.5));
        assert_eq!(resolve(2.0f64), Value::Float(2.0));
    }

    #[test]
    fn null_and_booleans_are_canonical() {
        let converter = Converter::uncustomized();
        let first = converter.convert(HostValue::Null).expect("null");
        let second = converter.convert(None::<String>).expect("null");
        assert!(same_provider(&first, &second));
        assert!(same_provider(&first, &null()));
        assert!(same_provider(
            &converter.convert(false).expect("false"),
            &converter.convert(false).expect("false")
        ));
    }

    #[test]
    fn converting_a_provider_returns_same_instance() {
        let converter = Converter::uncustomized();
        let provider = converter.convert(json!({"a": 1})).expect("convert");
        let again = converter.convert(Arc::clone(&provider)).expect("convert provider");
        assert!(same_provider(&provider, &again));
    }

    #[test]
    fn map_with_nested_list_resolves_lazily() {
        let provider = Converter::uncustomized()
            .convert(json!({"a": 1, "b": [2, 3]}))
            .expect("convert");
        let value = provider.resolve().expect("resolve");
        let map = value.as_map().expect("map");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a").expect("a").resolve().expect("a"), Value::Integer(1));

        let nested = map.get("b").expect("b").resolve().expect("b");
        let list = nested.as_list().expect("list");
        assert_eq!(list.len(), 2);
        assert_eq!(list.resolve_all().expect("items"), vec![Value::Integer(2), Value::Integer(3)]);
    }

    #[test]
    fn list_preserves_order() {
        let value = resolve(vec![HostValue::from("z"), HostValue::from(1i32), HostValue::Null]);
        let items = value.as_list().expect("list").resolve_all().expect("items");
        assert_eq!(items, vec![Value::from("z"), Value::Integer(1), Value::Null]);
    }

    #[test]
    fn empty_containers_share_the_canonical_instances() {
        let list = resolve(Vec::<HostValue>::new());
        assert!(list.as_list().expect("list").shares_storage(&ListValue::empty()));
        let map = resolve(IndexMap::<String, HostValue>::new());
        assert!(map.as_map().expect("map").shares_storage(&MapValue::empty()));
        assert!(!ListValue::new(Vec::new()).shares_storage(&ListValue::empty()));
    }

    #[test]
    fn resolved_levels_release_nested_host_values() {
        let leaf = Arc::new(Leaf);
        let mut host = HostValue::Global(leaf.clone());
        for _ in 0..5 {
            host = HostValue::List(vec![host]);
        }
        let mut provider = Converter::uncustomized().convert(host).expect("convert");
        assert_eq!(Arc::strong_count(&leaf), 2, "only the pending entry holds the leaf");

        let mut levels = Vec::new();
        loop {
            let value = provider.resolve().expect("resolve");
            let Some(next) = value.as_list().and_then(|list| list.get(0)).cloned() else {
                assert_eq!(value, Value::from("leaf"));
                break;
            };
            levels.push(provider);
            provider = next;
        }
        assert_eq!(levels.len(), 5);
        assert_eq!(Arc::strong_count(&leaf), 1);
    }

    #[test]
    fn globals_are_followed() {
        assert_eq!(resolve(HostValue::global(Alias)), Value::from("stencil.example"));
    }

    #[test]
    fn unrecognized_value_names_its_type() {
        let error = Converter::uncustomized()
            .convert(HostValue::opaque(Point { x: 1, y: 2 }))
            .expect_err("should fail");
        let ConversionError::Unrecognized { type_name } = &error else {
            panic!("unexpected error: {error}");
        };
        assert!(type_name.ends_with("Point"), "type name: {type_name}");
    }

    #[test]
    fn custom_converter_handles_opaque_values() {
        let converter = Converter::builder().with_custom_converter(PointConverter).build();
        let value = converter
            .convert(HostValue::opaque(Point { x: 3, y: 4 }))
            .expect("convert")
            .resolve()
            .expect("resolve");
        assert_eq!(value.to_json().expect("json"), json!({"x": 3, "y": 4}));
    }

    #[test]
    fn custom_converters_are_consulted_in_order() {
        let declining = Arc::new(Declining {
            calls: AtomicUsize::new(0),
        });
        let converter = Converter::builder()
            .with_shared_converter(declining.clone())
            .with_custom_converter(Constant("first"))
            .with_custom_converter(Constant("second"))
            .build();
        assert_eq!(converter.custom_converter_count(), 3);

        let value = converter
            .convert(HostValue::opaque(()))
            .expect("convert")
            .resolve()
            .expect("resolve");
        assert_eq!(value, Value::from("first"));
        assert_eq!(declining.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn custom_converters_are_not_consulted_for_built_in_shapes() {
        let declining = Arc::new(Declining {
            calls: AtomicUsize::new(0),
        });
        let converter = Converter::builder().with_shared_converter(declining.clone()).build();
        converter.convert(json!({"a": [1, 2]})).expect("convert");
        converter.convert("plain").expect("convert");
        assert_eq!(declining.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn nested_entries_are_not_converted_until_resolved() {
        let declining = Arc::new(Declining {
            calls: AtomicUsize::new(0),
        });
        let converter = Converter::builder().with_shared_converter(declining.clone()).build();
        let provider = converter
            .convert(HostValue::from(vec![HostValue::opaque(1u8)]))
            .expect("list conversion defers the opaque element");
        assert_eq!(declining.calls.load(Ordering::SeqCst), 0);

        let value = provider.resolve().expect("list");
        let element = value.as_list().and_then(|list| list.get(0)).expect("element");
        assert!(matches!(element.resolve(), Err(ConversionError::Unrecognized { .. })));
        assert!(element.resolve().is_err());
        assert_eq!(declining.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn new_list_converts_eagerly() {
        let converter = Converter::uncustomized();
        let list = converter
            .new_list(vec![HostValue::from(1i32), HostValue::from("two")])
            .expect("list");
        assert_eq!(list.resolve_all().expect("items"), vec![Value::Integer(1), Value::from("two")]);

        let error = converter
            .new_list(vec![HostValue::from(1i32), HostValue::opaque(Point { x: 0, y: 0 })])
            .expect_err("should fail eagerly");
        assert!(matches!(error, ConversionError::Unrecognized { .. }));
    }

    #[test]
    fn futures_become_deferred_providers() {
        let (future, completer) = HostFuture::channel();
        let provider = Converter::uncustomized().convert(future).expect("convert");
        assert_eq!(provider.status(), RenderStatus::Pending);
        completer.complete(json!({"ready": true}));
        assert_eq!(provider.status(), RenderStatus::Done);
        let value = provider.resolve().expect("resolve");
        assert_eq!(value.to_json().expect("json"), json!({"ready": true}));
    }
}
