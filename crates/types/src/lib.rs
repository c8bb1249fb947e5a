//! # Stencil Types
//!
//! The canonical value model handed to the template renderer: immutable,
//! kind-tagged [`Value`]s whose containers hold [`ValueProvider`] handles, plus
//! the [`ConversionError`] raised when a value cannot be produced.

pub mod error;
pub mod provider;
pub mod value;

pub use error::ConversionError;
pub use provider::{ProviderRef, RenderStatus, ValueProvider, boolean, null, resolved, same_provider};
pub use value::{ListValue, MapValue, Value, ValueKind};
