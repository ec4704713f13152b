//! Serializable command surface for embedding UIs

use log::debug;
use serde::{Deserialize, Serialize};

use super::queue::TransferQueueManager;
use super::types::TransferSnapshot;
use crate::units::SizeInformation;

/// A request from the UI, e.g. `{"command": "download", "filename": "a.zip",
/// "url": "https://...", "size": 1024}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DownloadCommand {
    Download {
        filename: String,
        url: String,
        size: i64,
    },
    RemoveAll,
    RemoveItem {
        id: String,
    },
    RetryItem {
        id: String,
    },
    StartAll,
    PauseAll,
    IsActive,
    Overview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueOverview {
    pub overall_size: u64,
    pub display_size: String,
    pub overall_progress: f64,
    pub active: bool,
    pub simultaneous_downloads: usize,
    pub items: Vec<TransferSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum CommandReply {
    Enqueued { id: String },
    Done,
    Ignored { reason: String },
    Active { active: bool },
    Overview(QueueOverview),
}

/// Run one command against the queue
pub fn dispatch(manager: &TransferQueueManager, command: DownloadCommand) -> CommandReply {
    match command {
        DownloadCommand::Download {
            filename,
            url,
            size,
        } => match u64::try_from(size) {
            Ok(size) => CommandReply::Enqueued {
                id: manager.enqueue(filename, url, size),
            },
            Err(_) => {
                debug!("download_command: ignoring {} with size {}", filename, size);
                CommandReply::Ignored {
                    reason: format!("size must not be negative, got {}", size),
                }
            }
        },
        DownloadCommand::RemoveAll => {
            manager.remove_all();
            CommandReply::Done
        }
        DownloadCommand::RemoveItem { id } => {
            manager.remove_item(&id);
            CommandReply::Done
        }
        DownloadCommand::RetryItem { id } => {
            manager.retry_item(&id);
            CommandReply::Done
        }
        DownloadCommand::StartAll => {
            manager.start_all();
            CommandReply::Done
        }
        DownloadCommand::PauseAll => {
            manager.pause_all();
            CommandReply::Done
        }
        DownloadCommand::IsActive => CommandReply::Active {
            active: manager.is_active(),
        },
        DownloadCommand::Overview => {
            let overall_size = manager.overall_size();
            CommandReply::Overview(QueueOverview {
                overall_size,
                display_size: SizeInformation::from_bytes(overall_size).to_string(),
                overall_progress: manager.overall_progress(),
                active: manager.is_active(),
                simultaneous_downloads: manager.config().simultaneous_downloads,
                items: manager.items(),
            })
        }
    }
}

/// Parse a JSON command and run it
pub fn dispatch_json(
    manager: &TransferQueueManager,
    input: &str,
) -> Result<CommandReply, serde_json::Error> {
    let command: DownloadCommand = serde_json::from_str(input)?;
    Ok(dispatch(manager, command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::testing::harness;
    use crate::download::types::TransferStatus;

    #[test]
    fn download_command_enqueues() {
        let h = harness(1);
        let reply = dispatch_json(
            &h.manager,
            r#"{"command": "download", "filename": "a.zip", "url": "https://files.test/a.zip", "size": 1500}"#,
        )
        .unwrap();

        let CommandReply::Enqueued { id } = reply else {
            panic!("expected enqueued reply");
        };
        let item = h.manager.item(&id).unwrap();
        assert_eq!(item.name, "a.zip");
        assert_eq!(item.total_bytes, 1500);
        assert_eq!(item.status, TransferStatus::Downloading);
    }

    #[test]
    fn negative_size_is_ignored() {
        let h = harness(1);
        let reply = dispatch(
            &h.manager,
            DownloadCommand::Download {
                filename: "bad.bin".to_string(),
                url: "https://files.test/bad.bin".to_string(),
                size: -1,
            },
        );

        assert!(matches!(reply, CommandReply::Ignored { .. }));
        assert!(h.manager.items().is_empty());
        assert!(h.recorder.events().is_empty());
    }

    #[test]
    fn overview_reports_aggregates() {
        let h = harness(1);
        h.manager.enqueue("a.bin", "https://files.test/a.bin", 1_000_000);
        h.manager.enqueue("b.bin", "https://files.test/b.bin", 1_000_000);

        let CommandReply::Overview(overview) = dispatch(&h.manager, DownloadCommand::Overview)
        else {
            panic!("expected overview");
        };
        assert_eq!(overview.overall_size, 2_000_000);
        assert_eq!(overview.display_size, "2.00 MB");
        assert_eq!(overview.overall_progress, 0.0);
        assert!(overview.active);
        assert_eq!(overview.simultaneous_downloads, 1);
        assert_eq!(overview.items.len(), 2);
    }

    #[test]
    fn simple_commands_parse_and_reply() {
        let h = harness(1);
        assert_eq!(
            dispatch_json(&h.manager, r#"{"command": "is_active"}"#).unwrap(),
            CommandReply::Active { active: false }
        );
        assert_eq!(
            dispatch_json(&h.manager, r#"{"command": "remove_item", "id": "nope"}"#).unwrap(),
            CommandReply::Done
        );
        assert_eq!(
            dispatch_json(&h.manager, r#"{"command": "pause_all"}"#).unwrap(),
            CommandReply::Done
        );
        assert!(dispatch_json(&h.manager, r#"{"command": "explode"}"#).is_err());
    }

    #[test]
    fn replies_serialize_with_tag() {
        let json = serde_json::to_value(CommandReply::Enqueued {
            id: "t1".to_string(),
        })
        .unwrap();
        assert_eq!(json["reply"], "enqueued");
        assert_eq!(json["id"], "t1");
    }
}
