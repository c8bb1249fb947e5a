pub mod async_runtime;

pub use async_runtime::block_on_future;
