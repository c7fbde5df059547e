//! Relay configuration
//!
//! Loaded from YAML. Every field has a default so an empty document is a valid
//! configuration (listener only, no feeds).
//!
//! ```yaml
//! listen: 127.0.0.1:23200
//! queue_capacity: 256
//! write_timeout_ms: 2000
//! tracker_id: FthrWt04072
//! archive_dir: /var/log/downlink
//! feeds:
//!   - id: raven
//!     path: /dev/ttyUSB0
//!   - id: rehearsal
//!     path: captures/flight-3.log
//!     replay_rate: 20
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::{ClassifierConfig, DEFAULT_MIN_LINE_LENGTH};
use crate::delivery::{
    DEFAULT_LISTEN_ADDR, DEFAULT_QUEUE_CAPACITY, DEFAULT_WRITE_TIMEOUT, DeliveryConfig,
};
use crate::error::{RelayError, Result};
use crate::providers::replay::{MAX_REPLAY_RATE, MIN_REPLAY_RATE};
use crate::schema::DEFAULT_TRACKER_ID;
use crate::types::FeedId;

/// Top-level relay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// TCP address the monitoring consumer connects to
    pub listen: String,

    /// Frames buffered between the feeds and the delivery task
    pub queue_capacity: usize,

    /// Upper bound on a single frame write, in milliseconds
    pub write_timeout_ms: u64,

    /// Radio id GPS and link-health lines must carry
    pub tracker_id: String,

    /// Lines shorter than this are dropped before classification
    pub min_line_length: usize,

    /// Directory for raw line archives. No archiving when unset.
    pub archive_dir: Option<PathBuf>,

    /// Input feeds, one task each
    pub feeds: Vec<FeedConfig>,
}

/// One input feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    /// Name used in logs, counters and the archive file name
    pub id: String,

    /// Device node, pipe or capture file
    pub path: PathBuf,

    /// Replay the file at this many lines per second instead of reading it
    /// as fast as it arrives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_rate: Option<f64>,
}

impl FeedConfig {
    pub fn feed_id(&self) -> FeedId {
        FeedId::from(self.id.as_str())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN_ADDR.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT.as_millis() as u64,
            tracker_id: DEFAULT_TRACKER_ID.to_string(),
            min_line_length: DEFAULT_MIN_LINE_LENGTH,
            archive_dir: None,
            feeds: Vec::new(),
        }
    }
}

impl RelayConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| RelayError::io_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<SocketAddr>().is_err() {
            return Err(RelayError::config_error(format!(
                "listen address '{}' is not a socket address",
                self.listen
            )));
        }
        if self.queue_capacity == 0 {
            return Err(RelayError::config_error("queue_capacity must be at least 1"));
        }
        if self.write_timeout_ms == 0 {
            return Err(RelayError::config_error("write_timeout_ms must be at least 1"));
        }
        if self.tracker_id.trim().is_empty() {
            return Err(RelayError::config_error("tracker_id must not be empty"));
        }

        let mut seen = HashSet::new();
        for feed in &self.feeds {
            if feed.id.trim().is_empty() {
                return Err(RelayError::config_error("feed id must not be empty"));
            }
            if !seen.insert(feed.id.as_str()) {
                return Err(RelayError::config_error(format!("duplicate feed id '{}'", feed.id)));
            }
            if let Some(rate) = feed.replay_rate
                && !(MIN_REPLAY_RATE..=MAX_REPLAY_RATE).contains(&rate)
            {
                return Err(RelayError::config_error(format!(
                    "feed '{}' replay_rate must be between {} and {} lines/s, got {}",
                    feed.id, MIN_REPLAY_RATE, MAX_REPLAY_RATE, rate
                )));
            }
        }
        Ok(())
    }

    pub fn delivery(&self) -> DeliveryConfig {
        DeliveryConfig {
            listen: self.listen.clone(),
            queue_capacity: self.queue_capacity,
            write_timeout: Duration::from_millis(self.write_timeout_ms),
        }
    }

    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            tracker_id: self.tracker_id.clone(),
            min_line_length: self.min_line_length,
        }
    }
}
