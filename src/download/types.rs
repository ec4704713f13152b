//! Download status, snapshots and event payloads

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum TransferStatus {
    #[serde(rename = "queued")]
    Queued,
    #[serde(rename = "downloading")]
    Downloading,
    #[serde(rename = "finished")]
    Finished,
    #[serde(rename = "failed")]
    Failed,
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStatus::Queued => write!(f, "queued"),
            TransferStatus::Downloading => write!(f, "downloading"),
            TransferStatus::Finished => write!(f, "finished"),
            TransferStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Read-only view of one transfer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransferSnapshot {
    pub id: String,
    pub name: String,
    pub url: String,
    pub total_bytes: u64,
    pub display_size: String,
    pub progress: f64,
    pub status: TransferStatus,
    pub error: Option<String>,
    pub created_at: i64, // ms since epoch
}

/// New item event payload
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DownloadItemAdded {
    pub task_id: String,
    pub name: String,
    pub total_bytes: u64,
}

/// Status change event payload
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DownloadStatusChanged {
    pub task_id: String,
    pub status: TransferStatus,
    pub error: Option<String>,
}

/// Progress event payload for downloads
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DownloadProgress {
    pub task_id: String,
    pub percent: u32,
    pub progress: f64,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub speed: f64, // bytes per second
}

/// Task deleted event payload
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DownloadTaskDeleted {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverallSizeChanged {
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverallProgressChanged {
    pub percent: u32,
    pub progress: f64,
}

/// Every notification the queue emits, tagged with its event name
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "payload")]
pub enum QueueEvent {
    #[serde(rename = "download-item-added")]
    ItemAdded(DownloadItemAdded),
    #[serde(rename = "download-status-changed")]
    StatusChanged(DownloadStatusChanged),
    #[serde(rename = "download-progress")]
    Progress(DownloadProgress),
    #[serde(rename = "download-task-deleted")]
    TaskDeleted(DownloadTaskDeleted),
    #[serde(rename = "download-overall-size")]
    OverallSize(OverallSizeChanged),
    #[serde(rename = "download-overall-progress")]
    OverallProgress(OverallProgressChanged),
}
