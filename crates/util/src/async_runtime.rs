//! Async runtime helpers for blocking callers.
//!
//! Deferred template values are produced by host futures, but the renderer
//! asks for them from synchronous code. This module provides the single entry
//! point used to wait for such futures, reusing the current Tokio runtime when
//! that is safe.

use std::future::Future;

use anyhow::{anyhow, bail};
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    task,
};
use tracing::trace;

/// Execute an async future from synchronous code.
///
/// # Arguments
/// - `future`: The future to run to completion.
///
/// # Returns
/// Returns the future's output, or an error if a Tokio runtime cannot be
/// created or the caller is running on a current-thread runtime.
///
/// # Notes
/// - On a multi-threaded runtime the current worker is handed over with
///   `block_in_place` and the future is driven by the current handle.
/// - A current-thread runtime cannot be blocked: the work being waited on may
///   be scheduled on that very thread. The call fails instead of hanging.
/// - Outside Tokio a single-threaded runtime is created for the call.
pub fn block_on_future<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            trace!("blocking in place on current runtime");
            task::block_in_place(|| handle.block_on(future))
        }
        Ok(handle) => {
            trace!(flavor = ?handle.runtime_flavor(), "refusing to block non multi-thread runtime");
            bail!("cannot block a current-thread runtime while waiting on a host future")
        }
        Err(_) => run_on_private_runtime(future),
    }
}

fn run_on_private_runtime<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| anyhow!(error))?
        .block_on(future)
}
