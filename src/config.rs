//! Configuration for the mirror engine.
//!
//! All tunables live here. Configuration is constructed once (or
//! deserialized from YAML/JSON by the host application), validated, and
//! passed immutably into [`MirrorEngine::new()`](crate::engine::MirrorEngine::new)
//! and its collaborators. Credential entry and channel selection menus are
//! the host's concern, not this crate's.
//!
//! # Configuration Structure
//!
//! ```text
//! MirrorConfig
//! ├── source_channel / target_channel   # channel identifiers
//! ├── page_size: usize                  # history page size
//! ├── range: Option<IdRange>            # optional [start_id, end_id] narrowing
//! ├── pacing_interval: Duration         # delay between consecutive sends
//! ├── pin_silent: bool                  # suppress pin notifications
//! ├── media: MediaConfig                # size cap, streaming threshold, staging dir
//! ├── retry: RetryConfig                # transient-failure backoff
//! └── state: StateConfig                # checkpoint + log file paths
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! source_channel: "old-announcements"
//! target_channel: "announcements"
//! page_size: 100
//! pacing_interval_ms: 1500
//!
//! media:
//!   max_bytes: 1572864000
//!   progress_threshold_bytes: 10485760
//!
//! state:
//!   checkpoint_path: "sent_ids.txt"
//!   error_log_path: "errors.txt"
//!   skipped_media_log_path: "skipped_media.txt"
//! ```

use crate::channel::ChannelId;
use crate::error::{MirrorError, Result};
use crate::resilience::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Inclusive `[start_id, end_id]` restriction on the replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub start_id: i64,
    pub end_id: i64,
}

impl IdRange {
    pub fn contains(&self, id: i64) -> bool {
        id >= self.start_id && id <= self.end_id
    }
}

/// Media staging policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Hard cap in bytes. Larger objects fail fast with `SizeExceeded`
    /// before any download is attempted.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Above this size, downloads and uploads report incremental progress
    /// to the injected observer.
    #[serde(default = "default_progress_threshold_bytes")]
    pub progress_threshold_bytes: u64,

    /// Directory for transient staging files. Defaults to the system
    /// temp directory.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

fn default_max_bytes() -> u64 {
    1_500 * 1024 * 1024 // 1.5 GiB, the usual provider upload ceiling
}

fn default_progress_threshold_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            progress_threshold_bytes: default_progress_threshold_bytes(),
            staging_dir: None,
        }
    }
}

/// Locations of the durable run state owned by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Newline-delimited source message ids, append-only.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    /// Newline-delimited `[id] cause` entries, append-only.
    #[serde(default = "default_error_log_path")]
    pub error_log_path: PathBuf,

    /// Newline-delimited `id - mediaKind - reason` triples, append-only.
    #[serde(default = "default_skipped_media_log_path")]
    pub skipped_media_log_path: PathBuf,
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("sent_ids.txt")
}

fn default_error_log_path() -> PathBuf {
    PathBuf::from("errors.txt")
}

fn default_skipped_media_log_path() -> PathBuf {
    PathBuf::from("skipped_media.txt")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
            error_log_path: default_error_log_path(),
            skipped_media_log_path: default_skipped_media_log_path(),
        }
    }
}

/// The top-level config object passed to `MirrorEngine::new()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Channel whose history is read.
    pub source_channel: ChannelId,

    /// Channel that receives the replicated messages.
    pub target_channel: ChannelId,

    /// Page size for history pagination.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Optional replay narrowing to a sub-range of source ids.
    #[serde(default)]
    pub range: Option<IdRange>,

    /// Enforced delay between consecutive sends, for provider rate limits.
    /// Zero disables pacing.
    #[serde(default = "default_pacing_interval", with = "duration_ms")]
    pub pacing_interval: Duration,

    /// Suppress the provider-side notification when re-applying pins.
    #[serde(default = "default_true")]
    pub pin_silent: bool,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub state: StateConfig,
}

fn default_page_size() -> usize {
    100
}

fn default_pacing_interval() -> Duration {
    Duration::from_millis(1_000)
}

fn default_true() -> bool {
    true
}

/// Serialize `pacing_interval` as integer milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

impl MirrorConfig {
    /// Minimal config for tests: tiny pages, no pacing, fast retries, all
    /// state files under `dir`.
    pub fn for_testing(dir: &std::path::Path) -> Self {
        Self {
            source_channel: ChannelId::new("source"),
            target_channel: ChannelId::new("target"),
            page_size: 3,
            range: None,
            pacing_interval: Duration::ZERO,
            pin_silent: true,
            media: MediaConfig {
                max_bytes: 1024 * 1024,
                progress_threshold_bytes: 1024,
                staging_dir: Some(dir.join("staging")),
            },
            retry: RetryConfig::testing(),
            state: StateConfig {
                checkpoint_path: dir.join("sent_ids.txt"),
                error_log_path: dir.join("errors.txt"),
                skipped_media_log_path: dir.join("skipped_media.txt"),
            },
        }
    }

    /// Validate invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(MirrorError::Config("page_size must be non-zero".into()));
        }
        if self.source_channel == self.target_channel {
            return Err(MirrorError::Config(
                "source and target channel must differ".into(),
            ));
        }
        if let Some(range) = &self.range {
            if range.start_id > range.end_id {
                return Err(MirrorError::Config(format!(
                    "invalid range: start_id {} > end_id {}",
                    range.start_id, range.end_id
                )));
            }
        }
        Ok(())
    }
}
