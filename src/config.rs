//! Queue configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of transfers allowed to run at the same time
pub const DEFAULT_SIMULTANEOUS_DOWNLOADS: usize = 2;

/// Default transport method
pub const DEFAULT_DOWNLOAD_METHOD: &str = "GET";

/// Default minimum spacing between applied progress updates per transfer
pub const DEFAULT_PROGRESS_THROTTLE_SECS: f64 = 0.1;

/// Options recognized by the transfer queue.
///
/// Field names follow the camelCase keys used by the embedding UI, so a
/// config object can be passed through unchanged:
///
/// ```json
/// { "simultaneousDownloads": 3, "downloadMethod": "GET" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueConfig {
    pub simultaneous_downloads: usize,
    pub download_method: String,
    pub progress_throttle_interval_seconds: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            simultaneous_downloads: DEFAULT_SIMULTANEOUS_DOWNLOADS,
            download_method: DEFAULT_DOWNLOAD_METHOD.to_string(),
            progress_throttle_interval_seconds: DEFAULT_PROGRESS_THROTTLE_SECS,
        }
    }
}

impl QueueConfig {
    /// Parse and validate a JSON config object. Missing keys take defaults.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: QueueConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simultaneous_downloads == 0 {
            return Err(ConfigError::NoConcurrency);
        }
        let throttle = self.progress_throttle_interval_seconds;
        if !throttle.is_finite() || throttle < 0.0 {
            return Err(ConfigError::InvalidThrottle(throttle));
        }
        if blob_fetch::FetchRequest::new(&self.download_method, "").is_err() {
            return Err(ConfigError::InvalidMethod(self.download_method.clone()));
        }
        Ok(())
    }

    pub fn progress_throttle(&self) -> Duration {
        let secs = self.progress_throttle_interval_seconds;
        Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_missing_keys() {
        let config = QueueConfig::from_json(r#"{"simultaneousDownloads": 4}"#).unwrap();
        assert_eq!(config.simultaneous_downloads, 4);
        assert_eq!(config.download_method, "GET");
        assert_eq!(config.progress_throttle(), Duration::from_millis(100));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = QueueConfig::from_json(r#"{"simultaneousDownloads": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NoConcurrency));
    }

    #[test]
    fn negative_throttle_is_rejected() {
        let config = QueueConfig {
            progress_throttle_interval_seconds: -1.0,
            ..QueueConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThrottle(_))
        ));
    }

    #[test]
    fn malformed_method_is_rejected() {
        let err = QueueConfig::from_json(r#"{"downloadMethod": "NOT VALID"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMethod(m) if m == "NOT VALID"));
    }

    #[test]
    fn negative_concurrency_fails_to_parse() {
        let err = QueueConfig::from_json(r#"{"simultaneousDownloads": -2}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
