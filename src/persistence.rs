//! Saving completed payloads

use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;

/// Fallback name when a suggested file name has nothing usable left
const FALLBACK_FILE_NAME: &str = "download";

/// Destination for completed transfer payloads. Fire-and-forget: the queue
/// does not wait for or inspect the result.
pub trait Persistence: Send + Sync {
    fn save(&self, payload: Vec<u8>, suggested_name: &str);
}

impl<F> Persistence for F
where
    F: Fn(Vec<u8>, &str) + Send + Sync,
{
    fn save(&self, payload: Vec<u8>, suggested_name: &str) {
        self(payload, suggested_name)
    }
}

/// Writes each payload to a file inside one directory
#[derive(Debug, Clone)]
pub struct DirectoryPersistence {
    dir: PathBuf,
    runtime: Handle,
}

impl DirectoryPersistence {
    pub fn new(dir: impl Into<PathBuf>, runtime: Handle) -> Self {
        Self {
            dir: dir.into(),
            runtime,
        }
    }
}

impl Persistence for DirectoryPersistence {
    fn save(&self, payload: Vec<u8>, suggested_name: &str) {
        let dir = self.dir.clone();
        let name = suggested_name.to_string();
        self.runtime.spawn(async move {
            match write_payload(&dir, &name, &payload).await {
                Ok(path) => info!("download_saved: {} bytes={}", path.display(), payload.len()),
                Err(e) => warn!("download_save_failed: {} error={}", name, e),
            }
        });
    }
}

/// Write `payload` into `dir` under a sanitized version of `name`
pub(crate) async fn write_payload(
    dir: &Path,
    name: &str,
    payload: &[u8],
) -> Result<PathBuf, String> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| format!("Failed to create directory: {}", e))?;

    let destination = dir.join(sanitize_file_name(name));
    tokio::fs::write(&destination, payload)
        .await
        .map_err(|e| format!("Failed to write file: {}", e))?;

    Ok(destination)
}

/// Reduce a display name to a single safe path component
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
