//! Provider abstraction shared by the value model and the conversion engine.
//!
//! A provider is a handle that yields a [`Value`], possibly after some
//! computation. The renderer checks [`ValueProvider::status`] to decide
//! whether it can continue without waiting and calls
//! [`ValueProvider::resolve`] once it actually needs the value.

use std::{fmt::Debug, sync::Arc};

use once_cell::sync::Lazy;

use crate::{ConversionError, Value};

/// Shared, immutable handle to any provider.
pub type ProviderRef = Arc<dyn ValueProvider>;

static NULL_PROVIDER: Lazy<ProviderRef> = Lazy::new(|| Arc::new(Value::Null));
static TRUE_PROVIDER: Lazy<ProviderRef> = Lazy::new(|| Arc::new(Value::Bool(true)));
static FALSE_PROVIDER: Lazy<ProviderRef> = Lazy::new(|| Arc::new(Value::Bool(false)));

/// Whether a provider can hand out its value without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// The value is available (or can be computed synchronously).
    Done,
    /// The value depends on asynchronous work that has not finished yet.
    Pending,
}

/// Trait describing a handle that yields a canonical template value.
///
/// Implementations must be safe to share across threads. The only mutation
/// allowed behind this trait is a one-time cache fill during `resolve`.
pub trait ValueProvider: Send + Sync + Debug {
    /// Report whether the value is available. Never blocks and never computes.
    fn status(&self) -> RenderStatus;

    /// Produce the underlying value, computing it on first use when needed.
    ///
    /// Repeated calls observe the same outcome.
    fn resolve(&self) -> Result<Value, ConversionError>;
}

impl ValueProvider for Value {
    fn status(&self) -> RenderStatus {
        RenderStatus::Done
    }

    fn resolve(&self) -> Result<Value, ConversionError> {
        Ok(self.clone())
    }
}

/// The canonical null provider. Every call returns the same instance.
pub fn null() -> ProviderRef {
    Arc::clone(&NULL_PROVIDER)
}

/// The canonical provider for `true` or `false`.
pub fn boolean(value: bool) -> ProviderRef {
    if value {
        Arc::clone(&TRUE_PROVIDER)
    } else {
        Arc::clone(&FALSE_PROVIDER)
    }
}

/// Wrap an already computed value, reusing the canonical singletons for null and booleans.
pub fn resolved(value: Value) -> ProviderRef {
    match value {
        Value::Null => null(),
        Value::Bool(flag) => boolean(flag),
        other => Arc::new(other),
    }
}

/// Returns true when both handles point at the same provider instance.
pub fn same_provider(left: &ProviderRef, right: &ProviderRef) -> bool {
    Arc::ptr_eq(left, right)
}
