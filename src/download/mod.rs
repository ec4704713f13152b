//! Download queue with bounded concurrency and throttled progress
//!
//! Provides:
//! - FIFO admission of queued transfers up to a configured concurrency limit
//! - Per-item and size-weighted overall progress, throttled per transfer
//! - Remove, retry and clear operations that abort in-flight transports
//! - An HTTP transport and a serializable command surface for embedding UIs

pub mod commands;
mod progress;
pub(crate) mod queue;
mod record;
pub mod types;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use queue::{Collaborators, TransferQueueManager};
pub use worker::HttpTransport;
