//! Handles to asynchronous host computations.
//!
//! A [`HostFuture`] is the explicit task handle the converter wraps into a
//! deferred provider. It offers a non-blocking completion check and a
//! blocking wait; the outcome of the wait is cached on the handle so every
//! clone observes the same result. Cancellation and timeouts are not
//! supported: a handle that is waited on runs to completion or reports the
//! upstream failure.

use std::{
    fmt,
    sync::{Arc, Mutex, TryLockError},
};

use anyhow::anyhow;
use once_cell::sync::OnceCell;
use stencil_types::ConversionError;
use stencil_util::block_on_future;
use tokio::{
    sync::oneshot::{self, error::TryRecvError},
    task::JoinHandle,
};
use tracing::debug;

use crate::HostValue;

type HostResult = anyhow::Result<HostValue>;

enum FutureSource {
    Task(JoinHandle<HostResult>),
    Channel(oneshot::Receiver<HostResult>),
    Complete(HostResult),
}

impl FutureSource {
    fn is_finished(&mut self) -> bool {
        match self {
            FutureSource::Task(handle) => handle.is_finished(),
            FutureSource::Channel(receiver) => match receiver.try_recv() {
                Ok(result) => {
                    *self = FutureSource::Complete(result);
                    true
                }
                Err(TryRecvError::Empty) => false,
                Err(TryRecvError::Closed) => {
                    *self = FutureSource::Complete(Err(completer_dropped()));
                    true
                }
            },
            FutureSource::Complete(_) => true,
        }
    }

    fn wait(self) -> HostResult {
        match self {
            FutureSource::Task(handle) => {
                block_on_future(async move { handle.await.map_err(|error| anyhow!("host task failed: {error}"))? })
            }
            FutureSource::Channel(receiver) => block_on_future(async move { receiver.await.map_err(|_| completer_dropped())? }),
            FutureSource::Complete(result) => result,
        }
    }
}

fn completer_dropped() -> anyhow::Error {
    anyhow!("future completer dropped without producing a value")
}

struct FutureState {
    source: Mutex<Option<FutureSource>>,
    outcome: OnceCell<Result<HostValue, ConversionError>>,
}

/// Cloneable handle to an asynchronous host computation producing a [`HostValue`].
#[derive(Clone)]
pub struct HostFuture {
    state: Arc<FutureState>,
}

impl HostFuture {
    fn from_source(source: FutureSource) -> Self {
        Self {
            state: Arc::new(FutureState {
                source: Mutex::new(Some(source)),
                outcome: OnceCell::new(),
            }),
        }
    }

    /// Wrap a spawned Tokio task. The task keeps running on its own runtime.
    pub fn from_task(handle: JoinHandle<HostResult>) -> Self {
        Self::from_source(FutureSource::Task(handle))
    }

    /// A future whose value is already available.
    pub fn ready(value: impl Into<HostValue>) -> Self {
        Self::from_source(FutureSource::Complete(Ok(value.into())))
    }

    /// A future that already failed.
    pub fn failed(error: anyhow::Error) -> Self {
        Self::from_source(FutureSource::Complete(Err(error)))
    }

    /// A future completed later through the returned [`FutureCompleter`].
    pub fn channel() -> (Self, FutureCompleter) {
        let (sender, receiver) = oneshot::channel();
        (Self::from_source(FutureSource::Channel(receiver)), FutureCompleter { sender })
    }

    /// Whether the computation has finished. Never blocks.
    ///
    /// Reports `false` while another caller is inside [`HostFuture::wait`].
    pub fn is_done(&self) -> bool {
        if self.state.outcome.get().is_some() {
            return true;
        }
        match self.state.source.try_lock() {
            Ok(mut source) => source.as_mut().is_some_and(FutureSource::is_finished),
            Err(TryLockError::WouldBlock) => false,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().as_mut().is_some_and(FutureSource::is_finished),
        }
    }

    /// Block until the computation completes and return its outcome.
    ///
    /// Only the first caller actually waits; concurrent callers block on the
    /// same wait and everyone receives a clone of the cached outcome.
    ///
    /// Waiting from inside a current-thread Tokio runtime fails with an
    /// upstream error, since the computation may need that thread to make
    /// progress.
    pub fn wait(&self) -> Result<HostValue, ConversionError> {
        self.state
            .outcome
            .get_or_init(|| {
                let source = self.state.source.lock().expect("future source lock").take();
                let Some(source) = source else {
                    return Err(ConversionError::upstream("host future source already consumed"));
                };
                debug!("waiting for host future");
                let result = source.wait().map_err(ConversionError::upstream);
                debug!(succeeded = result.is_ok(), "host future finished");
                result
            })
            .clone()
    }
}

impl fmt::Debug for HostFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFuture")
            .field("waited", &self.state.outcome.get().is_some())
            .finish()
    }
}

/// Producer side of [`HostFuture::channel`].
#[derive(Debug)]
pub struct FutureCompleter {
    sender: oneshot::Sender<HostResult>,
}

impl FutureCompleter {
    pub fn complete(self, value: impl Into<HostValue>) {
        self.send(Ok(value.into()));
    }

    pub fn fail(self, error: anyhow::Error) {
        self.send(Err(error));
    }

    fn send(self, result: HostResult) {
        if self.sender.send(result).is_err() {
            debug!("host future dropped before completion");
        }
    }
}
