use std::fmt;

use once_cell::sync::OnceCell;
use stencil_types::{ConversionError, RenderStatus, Value, ValueProvider};
use tracing::{debug, warn};

use crate::{Converter, HostFuture};

/// Provider backed by an asynchronous host computation.
///
/// `status` mirrors the computation's completion without blocking. `resolve`
/// waits for the computation if needed, converts its result through the
/// owning [`Converter`], and caches the converted value so later calls neither
/// wait nor convert again.
pub struct DeferredProvider {
    converter: Converter,
    future: HostFuture,
    cached: OnceCell<Result<Value, ConversionError>>,
}

impl DeferredProvider {
    pub fn new(converter: Converter, future: HostFuture) -> Self {
        Self {
            converter,
            future,
            cached: OnceCell::new(),
        }
    }

    fn compute(&self) -> Result<Value, ConversionError> {
        if !self.future.is_done() {
            debug!("deferred value not ready, blocking until host computation completes");
        }
        let host_value = self.future.wait().inspect_err(|error| {
            warn!(error = %error, "deferred host computation failed");
        })?;
        self.converter.convert(host_value)?.resolve()
    }
}

impl ValueProvider for DeferredProvider {
    fn status(&self) -> RenderStatus {
        if self.cached.get().is_some() || self.future.is_done() {
            RenderStatus::Done
        } else {
            RenderStatus::Pending
        }
    }

    fn resolve(&self) -> Result<Value, ConversionError> {
        self.cached.get_or_init(|| self.compute()).clone()
    }
}

impl fmt::Debug for DeferredProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredProvider")
            .field("future", &self.future)
            .field("resolved", &self.cached.get().is_some())
            .finish()
    }
}
