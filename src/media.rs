// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Transient media staging: download, upload, guaranteed cleanup.
//!
//! A media object is staged to local disk only for the duration of one
//! message's processing step. [`StagedMedia`] owns the temp file through a
//! [`tempfile::TempPath`], so the artifact is deleted on *every* exit path
//! of the staging step, success or failure; nothing orphaned survives a
//! `?`.
//!
//! # Size Policy
//!
//! Objects above the configured hard cap fail fast with `SizeExceeded`
//! before any download is attempted. Above the (lower) streaming
//! threshold, downloads and uploads report incremental progress to the
//! injected observer; below it, progress callbacks are suppressed.

use crate::channel::{
    ChannelId, MessageSource, MessageTarget, NoOpProgress, ProgressObserver, RemoteId,
};
use crate::config::MediaConfig;
use crate::error::{MirrorError, Result};
use crate::message::{MediaAttributes, MediaRef};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::debug;

/// A transient local artifact, exclusively owned by one in-flight message.
///
/// The underlying file is removed when this value drops.
#[derive(Debug)]
pub struct StagedMedia {
    path: TempPath,
    bytes: u64,
}

impl StagedMedia {
    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes actually downloaded.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Downloads media to transient local storage and uploads it to the target.
pub struct MediaStager {
    staging_dir: Option<PathBuf>,
    max_bytes: u64,
    progress_threshold: u64,
    observer: Arc<dyn ProgressObserver>,
}

impl MediaStager {
    /// Create a stager from config, with an injected progress observer.
    ///
    /// Creates the staging directory if one is configured.
    pub fn new(config: &MediaConfig, observer: Arc<dyn ProgressObserver>) -> Result<Self> {
        if let Some(dir) = &config.staging_dir {
            std::fs::create_dir_all(dir)
                .map_err(|e| MirrorError::Staging(format!("create {}: {}", dir.display(), e)))?;
        }

        Ok(Self {
            staging_dir: config.staging_dir.clone(),
            max_bytes: config.max_bytes,
            progress_threshold: config.progress_threshold_bytes,
            observer,
        })
    }

    /// The observer to hand a transfer of `size` bytes: real one above the
    /// streaming threshold, no-op below it.
    fn observer_for(&self, size: u64) -> Arc<dyn ProgressObserver> {
        if size >= self.progress_threshold {
            Arc::clone(&self.observer)
        } else {
            Arc::new(NoOpProgress)
        }
    }

    fn new_staging_path(&self) -> Result<TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("mirror-media-");

        let file = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| MirrorError::Staging(format!("create staging file: {}", e)))?;

        Ok(file.into_temp_path())
    }

    /// Download `media` for message `id` into a staged local file.
    ///
    /// Fails fast with `SizeExceeded` when the declared size is over the
    /// hard cap, and with `MediaUnavailable` when the provider cannot
    /// materialize the object. The temp file is cleaned up on all failure
    /// paths.
    pub async fn stage<S: MessageSource + ?Sized>(
        &self,
        source: &S,
        id: i64,
        media: &MediaRef,
    ) -> Result<StagedMedia> {
        if media.size > self.max_bytes {
            return Err(MirrorError::SizeExceeded {
                id,
                size: media.size,
                cap: self.max_bytes,
            });
        }

        let path = self.new_staging_path()?;
        let observer = self.observer_for(media.size);

        // `path` is owned here: an early return on error drops it and the
        // file with it.
        let written = source
            .fetch_media(media.clone(), path.to_path_buf(), observer)
            .await?;

        match written {
            Some(bytes) => {
                debug!(id, bytes, path = %path.display(), "media staged");
                crate::metrics::record_media_staged(bytes);
                Ok(StagedMedia { path, bytes })
            }
            None => Err(MirrorError::MediaUnavailable { id }),
        }
    }

    /// Upload a staged file to the target, returning the target-side id.
    ///
    /// Borrows the staged artifact so the engine can retry the upload
    /// without re-downloading; cleanup stays with the owner.
    pub async fn upload<T: MessageTarget + ?Sized>(
        &self,
        target: &T,
        channel: &ChannelId,
        staged: &StagedMedia,
        caption: &str,
        attributes: &MediaAttributes,
    ) -> Result<RemoteId> {
        let observer = self.observer_for(staged.bytes());
        target
            .send_media(
                channel.clone(),
                staged.path().to_path_buf(),
                caption.to_string(),
                attributes.clone(),
                observer,
            )
            .await
    }
}
