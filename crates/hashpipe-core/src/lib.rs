//! Hashpipe Core - Generic staged pipeline engine
//!
//! This crate provides the pieces every hashing pipeline is built from:
//! bounded item streams with an explicit end-of-stream signal, a stage
//! trait, and an executor that runs stages concurrently and closes each
//! stream exactly once after its producer finished.

pub mod error;
pub mod item;
pub mod logging;
pub mod pipeline;
pub mod semaphore;
pub mod shutdown;
pub mod stream;

// Re-exports for convenience
pub use error::{ErrorSlot, PipelineError};
pub use item::Item;
pub use logging::init_logging;
pub use pipeline::{
    DEFAULT_STREAM_CAPACITY, FnStage, Pipeline, PipelineOutput, Stage, StageStats, stage_fn,
};
pub use semaphore::{Semaphore, SemaphoreGuard};
pub use shutdown::CancelToken;
pub use stream::{ItemCounter, StreamReader, StreamWriter, stream};
