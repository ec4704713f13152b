//! Change notifications emitted by the queue

use crate::download::types::QueueEvent;
use log::debug;
use tokio::sync::mpsc::UnboundedSender;

/// Receiver of queue change notifications.
///
/// Events arrive in the order the queue state changed, one at a time. They are
/// sent while the queue holds its emission lock, so `emit` must not block on
/// or call back into the queue.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: QueueEvent);
}

impl<F> EventSink for F
where
    F: Fn(QueueEvent) + Send + Sync,
{
    fn emit(&self, event: QueueEvent) {
        self(event)
    }
}

/// Forwards every event into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<QueueEvent>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<QueueEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: QueueEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.sender.send(event);
    }
}

/// Writes events to the `log` facade at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: QueueEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => debug!("download_event: {}", json),
            Err(_) => debug!("download_event: {:?}", event),
        }
    }
}
