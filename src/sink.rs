// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Append-only sink for per-item failures and skipped media.
//!
//! Business logic never touches log storage directly; the engine only
//! calls [`ErrorSink::record_failure`] and
//! [`ErrorSink::record_skipped_media`]. Both are infallible toward the
//! caller: a logging failure must never mask or replace the failure being
//! logged, so sink write errors are reported via `tracing` and swallowed.
//!
//! # File Formats
//!
//! - Error log: one `[id] cause` entry per line.
//! - Skipped-media log: one `id - mediaKind - reason` triple per line.

use crate::message::MediaKind;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Injected failure-recording interface.
///
/// Implementations must be append-only and durable; they must never throw
/// back into the engine.
pub trait ErrorSink: Send + Sync + 'static {
    /// Record a per-item failure attributed to source message `id`.
    fn record_failure(&self, id: i64, cause: String)
        -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Record media that was skipped (unavailable or over the size cap).
    fn record_skipped_media(
        &self,
        id: i64,
        kind: MediaKind,
        reason: String,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// File-backed sink writing the two append-only logs.
pub struct FileErrorSink {
    error_log: Mutex<File>,
    skipped_log: Mutex<File>,
    error_path: PathBuf,
    skipped_path: PathBuf,
}

impl FileErrorSink {
    /// Open (or create) both log files in append mode.
    pub async fn open(
        error_path: impl AsRef<Path>,
        skipped_path: impl AsRef<Path>,
    ) -> std::io::Result<Self> {
        let error_path = error_path.as_ref().to_path_buf();
        let skipped_path = skipped_path.as_ref().to_path_buf();

        let error_log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&error_path)
            .await?;
        let skipped_log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&skipped_path)
            .await?;

        Ok(Self {
            error_log: Mutex::new(error_log),
            skipped_log: Mutex::new(skipped_log),
            error_path,
            skipped_path,
        })
    }

    async fn append(file: &Mutex<File>, path: &Path, line: String) {
        let mut file = file.lock().await;
        let write = async {
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        };
        if let Err(e) = write.await {
            // The original failure is what matters; never propagate this.
            warn!(path = %path.display(), error = %e, "failed to append to sink log");
        }
    }
}

impl ErrorSink for FileErrorSink {
    fn record_failure(
        &self,
        id: i64,
        cause: String,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            warn!(id, cause = %cause, "recording per-item failure");
            Self::append(
                &self.error_log,
                &self.error_path,
                format!("[{}] {}\n", id, cause),
            )
            .await;
        })
    }

    fn record_skipped_media(
        &self,
        id: i64,
        kind: MediaKind,
        reason: String,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            warn!(id, %kind, reason = %reason, "recording skipped media");
            Self::append(
                &self.skipped_log,
                &self.skipped_path,
                format!("{} - {} - {}\n", id, kind, reason),
            )
            .await;
        })
    }
}
