// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the mirror engine.
//!
//! Errors are categorized by where they occur in the pipeline and whether
//! the engine should retry, skip the message, or abort the whole run.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Fatal | Description |
//! |-------------------|-----------|-------|----------------------------------------------|
//! | `Network` | Yes | No | Transient fetch/download/upload/send failure |
//! | `FatalSetup` | No | Yes | Auth failure, channel not resolvable |
//! | `History` | No | Yes | Pagination broke mid-run, replay incomplete |
//! | `MediaUnavailable`| No | No | Provider cannot materialize the object |
//! | `SizeExceeded` | No | No | Media above the configured hard cap |
//! | `PinPropagation` | No | No | Pin failed after a successful send |
//! | `Checkpoint` | No | No | Checkpoint file append/flush failed |
//! | `Staging` | No | No | Local temp file could not be created/written |
//! | `Config` | No | Yes | Configuration invalid |
//!
//! # Retry Behavior
//!
//! Use [`MirrorError::is_retryable()`] to decide whether an operation should
//! be retried with backoff. Only transient network errors qualify; everything
//! else is either a per-item skip or a run-level abort
//! ([`MirrorError::is_fatal()`]).

use thiserror::Error;

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Errors that can occur while mirroring a channel history.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Transient network failure talking to the provider.
    ///
    /// Covers page fetches, media downloads/uploads, sends and pins.
    /// Retryable with exponential backoff.
    #[error("network error ({operation}): {message}")]
    Network { operation: String, message: String },

    /// Setup-phase failure: authentication rejected or a channel could not
    /// be resolved. Aborts the run before any message is processed.
    #[error("setup error: {0}")]
    FatalSetup(String),

    /// History pagination failed. Pagination cannot be resumed mid-failure,
    /// so the run aborts before the replay loop starts.
    #[error("history fetch error: {0}")]
    History(String),

    /// The provider could not materialize a media object.
    ///
    /// Distinct from a transient network error: retrying will not help.
    /// Recorded to the skipped-media log, run continues.
    #[error("media unavailable for message {id}")]
    MediaUnavailable { id: i64 },

    /// Media exceeds the configured hard cap. Detected before download.
    #[error("media for message {id} is {size} bytes, cap is {cap}")]
    SizeExceeded { id: i64, size: u64, cap: u64 },

    /// Pin failed after the message itself was sent successfully.
    ///
    /// Best-effort: recorded to the error sink, the message still counts
    /// as sent.
    #[error("pin propagation failed for message {id}: {message}")]
    PinPropagation { id: i64, message: String },

    /// Checkpoint file append or flush failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] std::io::Error),

    /// Local staging artifact could not be created or written.
    #[error("staging error: {0}")]
    Staging(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MirrorError {
    /// Create a transient network error.
    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Check if this error is retryable with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Check if this error aborts the entire run.
    ///
    /// Fatal errors escape the per-message loop; everything else is caught
    /// at the engine boundary and converted into a sink record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::FatalSetup(_) | Self::History(_) | Self::Config(_)
        )
    }
}
