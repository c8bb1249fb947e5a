use std::{fmt, sync::Mutex};

use once_cell::sync::OnceCell;
use stencil_types::{ConversionError, RenderStatus, Value, ValueProvider};
use tracing::trace;

type Computation = Box<dyn FnOnce() -> Result<Value, ConversionError> + Send>;

/// Provider that computes its value on first `resolve` and memoizes it.
///
/// The computation runs at most once, even when several threads resolve
/// concurrently: the first caller runs it, the others block until it is done
/// and then read the cached outcome. A failed computation is cached as well.
/// The computation is dropped once it has run, releasing whatever it captured.
pub struct CachingProvider {
    compute: Mutex<Option<Computation>>,
    cached: OnceCell<Result<Value, ConversionError>>,
}

impl CachingProvider {
    pub fn new<F>(compute: F) -> Self
    where
        F: FnOnce() -> Result<Value, ConversionError> + Send + 'static,
    {
        Self {
            compute: Mutex::new(Some(Box::new(compute))),
            cached: OnceCell::new(),
        }
    }

    /// Whether the computation has already run.
    pub fn is_computed(&self) -> bool {
        self.cached.get().is_some()
    }

    fn run(&self) -> Result<Value, ConversionError> {
        let compute = self.compute.lock().expect("lazy computation lock").take();
        match compute {
            Some(compute) => {
                trace!("computing lazy value");
                compute()
            }
            // Only reachable when an earlier attempt panicked mid-computation.
            None => Err(ConversionError::upstream("lazy computation did not complete")),
        }
    }
}

impl ValueProvider for CachingProvider {
    /// The computation is synchronous, so the value is always obtainable.
    fn status(&self) -> RenderStatus {
        RenderStatus::Done
    }

    fn resolve(&self) -> Result<Value, ConversionError> {
        self.cached.get_or_init(|| self.run()).clone()
    }
}

impl fmt::Debug for CachingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingProvider")
            .field("computed", &self.is_computed())
            .finish()
    }
}
