//! Bounded-concurrency download queue.
//!
//! [`TransferQueueManager`] keeps every known transfer in insertion order,
//! admits queued transfers in FIFO order up to `simultaneousDownloads`, and
//! reports per-item status and progress plus overall size and progress to an
//! [`EventSink`]. Fetching bytes, saving payloads and generating ids are
//! delegated to the [`Transport`], [`Persistence`] and [`IdGenerator`]
//! collaborators.

pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod ids;
pub mod persistence;
pub mod transport;
pub mod units;

pub use config::QueueConfig;
pub use download::commands::{dispatch, dispatch_json, CommandReply, DownloadCommand};
pub use download::types::{QueueEvent, TransferSnapshot, TransferStatus};
pub use download::{Collaborators, HttpTransport, TransferQueueManager};
pub use error::{ConfigError, TransportError};
pub use events::{ChannelSink, EventSink, LogSink};
pub use ids::{IdGenerator, UuidIds};
pub use persistence::{DirectoryPersistence, Persistence};
pub use transport::{TransferOutcome, TransferReporter, Transport, TransportHandle};
