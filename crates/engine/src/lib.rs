//! # Stencil Engine
//!
//! Converts values coming from the host application into the canonical,
//! immutable values consumed by the template renderer.
//!
//! ## Key Features
//!
//! - **Eager primitives**: strings, booleans, integers and floats convert on the spot
//! - **Lazy containers**: map entries and list elements convert on first use, exactly once
//! - **Deferred values**: asynchronous host computations are exposed as providers
//!   whose status can be polled without blocking
//! - **Custom converters**: an ordered chain of extensions handles host types the
//!   engine does not know about
//!
//! ## Usage
//!
//! ```rust
//! use stencil_engine::{Converter, HostFuture, HostValue};
//! use stencil_types::{RenderStatus, Value};
//!
//! let converter = Converter::uncustomized();
//! let (future, completer) = HostFuture::channel();
//! let provider = converter.convert(future)?;
//! assert_eq!(provider.status(), RenderStatus::Pending);
//!
//! completer.complete(HostValue::from("hello"));
//! assert_eq!(provider.status(), RenderStatus::Done);
//! assert_eq!(provider.resolve()?, Value::from("hello"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`host`**: the closed set of host value shapes, plus opaque and global values
//! - **`future`**: handles to asynchronous host computations
//! - **`provider`**: caching and deferred providers
//! - **`converter`**: dispatch and the custom converter extension point

pub mod converter;
pub mod future;
pub mod host;
pub mod provider;

pub use converter::{Converter, ConverterBuilder, CustomValueConverter};
pub use future::{FutureCompleter, HostFuture};
pub use host::{GlobalValue, HostValue, OpaqueValue};
pub use provider::{CachingProvider, DeferredProvider};
