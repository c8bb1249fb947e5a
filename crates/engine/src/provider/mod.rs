//! Providers produced by the converter.
//!
//! Modules:
//! - `caching`: compute-once provider used for lazily converted entries
//! - `deferred`: provider backed by an asynchronous host computation

mod caching;
mod deferred;

pub use caching::CachingProvider;
pub use deferred::DeferredProvider;
