// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Durable checkpoint of already-replicated source ids.
//!
//! The checkpoint is a newline-delimited text file, one source message id
//! per line, append-only. It is loaded once at startup and appended to
//! after each fully processed message; it never shrinks and is never
//! rewritten.
//!
//! # Durability
//!
//! `record()` flushes and fsyncs before returning, so a crash immediately
//! after it is indistinguishable from "not recorded". A crash *between* a
//! successful send and `record()` therefore causes one duplicate resend on
//! the next run. That at-least-once window is the documented contract, not
//! a bug to mask.
//!
//! # Identity, not content
//!
//! Deduplication is purely by id. If a message is edited upstream between
//! runs, the edited content is never re-replicated; there is no content
//! hash. Accepted as current behavior.

use crate::error::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Append-only checkpoint store backed by a plain text file.
pub struct CheckpointStore {
    /// File handle held open in append mode for the run's lifetime.
    file: File,
    /// In-memory view of the checkpoint, loaded once at startup.
    ids: HashSet<i64>,
    /// Path to the checkpoint file.
    path: PathBuf,
}

impl CheckpointStore {
    /// Open (or create) the checkpoint file and load all recorded ids.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut ids = HashSet::new();
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                for line in contents.lines() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match line.parse::<i64>() {
                        Ok(id) => {
                            ids.insert(id);
                        }
                        Err(_) => {
                            // A torn write can leave a truncated final
                            // line; the id was never durably recorded.
                            warn!(path = %path.display(), line, "skipping malformed checkpoint line");
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no checkpoint file, starting fresh");
            }
            Err(e) => return Err(e.into()),
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        if !ids.is_empty() {
            info!(path = %path.display(), count = ids.len(), "restored checkpoint from previous run");
        }

        Ok(Self { file, ids, path })
    }

    /// Whether `id` has already been replicated.
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Durably record `id` as replicated.
    ///
    /// The append is flushed and fsynced before this returns. Recording an
    /// id twice is a no-op.
    pub async fn record(&mut self, id: i64) -> Result<()> {
        if !self.ids.insert(id) {
            return Ok(());
        }

        self.file.write_all(format!("{}\n", id).as_bytes()).await?;
        self.file.flush().await?;
        self.file.sync_data().await?;

        debug!(id, "checkpointed");
        Ok(())
    }

    /// All recorded ids.
    pub fn ids(&self) -> &HashSet<i64> {
        &self.ids
    }

    /// Number of recorded ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the checkpoint is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Checkpoint file path (for diagnostics).
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_checkpoint_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sent_ids.txt");

        let mut store = CheckpointStore::open(&path).await.unwrap();
        assert!(store.is_empty());
        assert!(!store.contains(5));

        store.record(5).await.unwrap();
        assert!(store.contains(5));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_checkpoint_survives_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sent_ids.txt");

        {
            let mut store = CheckpointStore::open(&path).await.unwrap();
            store.record(1).await.unwrap();
            store.record(2).await.unwrap();
            store.record(3).await.unwrap();
        }

        let store = CheckpointStore::open(&path).await.unwrap();
        assert_eq!(store.len(), 3);
        assert!(store.contains(1));
        assert!(store.contains(2));
        assert!(store.contains(3));
        assert!(!store.contains(4));
    }

    #[tokio::test]
    async fn test_checkpoint_file_format_one_id_per_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sent_ids.txt");

        let mut store = CheckpointStore::open(&path).await.unwrap();
        store.record(10).await.unwrap();
        store.record(11).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "10\n11\n");
    }

    #[tokio::test]
    async fn test_checkpoint_append_only_across_runs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sent_ids.txt");

        {
            let mut store = CheckpointStore::open(&path).await.unwrap();
            store.record(1).await.unwrap();
        }
        {
            let mut store = CheckpointStore::open(&path).await.unwrap();
            store.record(2).await.unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "1\n2\n");
    }

    #[tokio::test]
    async fn test_checkpoint_duplicate_record_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sent_ids.txt");

        let mut store = CheckpointStore::open(&path).await.unwrap();
        store.record(7).await.unwrap();
        store.record(7).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "7\n");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_checkpoint_tolerates_malformed_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sent_ids.txt");
        std::fs::write(&path, "1\n2\ngarb").unwrap();

        let store = CheckpointStore::open(&path).await.unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains(1));
        assert!(store.contains(2));
    }

    #[tokio::test]
    async fn test_checkpoint_path_accessor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        let store = CheckpointStore::open(&path).await.unwrap();
        assert_eq!(store.path(), path.as_path());
    }
}
