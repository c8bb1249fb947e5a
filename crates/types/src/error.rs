//! Error types for value conversion and resolution.

use std::{error::Error as StdError, sync::Arc};

use thiserror::Error;

/// Failure surfaced while converting a host value or resolving a provider.
///
/// Errors are cheap to clone so that a provider which cached a failed
/// computation can hand the same failure to every caller.
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    /// No built-in case and no custom converter accepted the host value.
    #[error("attempting to convert unrecognized object to template value (object type {type_name})")]
    Unrecognized { type_name: String },

    /// The asynchronous host computation backing a deferred value failed.
    #[error("deferred value computation failed: {source}")]
    Upstream { source: Arc<dyn StdError + Send + Sync> },
}

impl ConversionError {
    /// Create an unrecognized value error for the given runtime type name.
    pub fn unrecognized(type_name: impl Into<String>) -> Self {
        Self::Unrecognized {
            type_name: type_name.into(),
        }
    }

    /// Wrap a failure raised by an upstream asynchronous computation.
    pub fn upstream(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Upstream {
            source: Arc::from(error.into()),
        }
    }
}
