// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The mirror engine: per-message orchestration.
//!
//! One sequential worker processes the replay strictly in ascending id
//! order. Per message the pipeline is:
//!
//! ```text
//! checkpoint skip → filter → stage media → pace → send → pin → checkpoint
//! ```
//!
//! Every step that performs I/O can fail; failures inside the loop are
//! caught at the engine boundary, converted into an [`ErrorSink`] record,
//! and the loop moves on. Nothing per-item ever aborts the run. Only
//! setup-phase errors (auth, channel resolution, history pagination)
//! escape [`MirrorEngine::run`].
//!
//! Checkpointing happens only after the send (and pin, when applicable)
//! completed; a pin failure is best-effort and does not block the
//! checkpoint of the send itself. Sends are serialized and paced; the
//! process may be interrupted between messages with no loss beyond the
//! documented at-least-once duplicate window.

use crate::channel::{MessageSource, MessageTarget, NoOpProgress, ProgressObserver, RemoteId};
use crate::checkpoint::CheckpointStore;
use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result};
use crate::history::read_replay;
use crate::media::MediaStager;
use crate::message::{MediaKind, SourceMessage};
use crate::metrics;
use crate::resilience::{with_retry, SendPacer};
use crate::sink::ErrorSink;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Why a message produced no target-side send.
///
/// Checkpoint skips are counted directly by the run loop and never reach
/// a [`ReplicationOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing meaningful to replicate (no text, no media).
    Empty,
    /// Provider could not materialize the media object.
    MediaUnavailable,
    /// Media over the configured hard cap.
    SizeExceeded,
}

/// Per-message result.
#[derive(Debug, Clone)]
pub enum ReplicationOutcome {
    /// Message was sent; `pin_applied` is `Some(false)` when the source
    /// message was pinned but the pin could not be propagated.
    Sent {
        remote: RemoteId,
        pin_applied: Option<bool>,
    },
    Skipped(SkipReason),
    Failed(String),
}

/// Aggregated counts for one run. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub sent: usize,
    pub skipped_checkpoint: usize,
    pub skipped_empty: usize,
    pub skipped_media: usize,
    pub failed: usize,
    pub pins_applied: usize,
    pub pin_failures: usize,
}

impl RunSummary {
    /// Total skipped, all reasons.
    pub fn skipped(&self) -> usize {
        self.skipped_checkpoint + self.skipped_empty + self.skipped_media
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processed {}, sent {}, skipped {} (checkpoint {}, empty {}, media {}), failed {}, pins {} ({} failed)",
            self.processed,
            self.sent,
            self.skipped(),
            self.skipped_checkpoint,
            self.skipped_empty,
            self.skipped_media,
            self.failed,
            self.pins_applied,
            self.pin_failures,
        )
    }
}

/// Orchestrates one replication run from source to target.
pub struct MirrorEngine<S, T, E> {
    config: MirrorConfig,
    source: Arc<S>,
    target: Arc<T>,
    sink: Arc<E>,
    checkpoint: CheckpointStore,
    stager: MediaStager,
    pacer: SendPacer,
}

impl<S, T, E> MirrorEngine<S, T, E>
where
    S: MessageSource,
    T: MessageTarget,
    E: ErrorSink,
{
    /// Create an engine with no progress reporting.
    pub async fn new(
        config: MirrorConfig,
        source: Arc<S>,
        target: Arc<T>,
        sink: Arc<E>,
    ) -> Result<Self> {
        Self::with_progress(config, source, target, sink, Arc::new(NoOpProgress)).await
    }

    /// Create an engine with an injected progress observer for large media
    /// transfers.
    ///
    /// Validates the configuration and loads the checkpoint; both failures
    /// abort before anything is replicated.
    pub async fn with_progress(
        config: MirrorConfig,
        source: Arc<S>,
        target: Arc<T>,
        sink: Arc<E>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<Self> {
        config.validate()?;

        let checkpoint = CheckpointStore::open(&config.state.checkpoint_path).await?;
        let stager = MediaStager::new(&config.media, observer)?;
        let pacer = SendPacer::new(config.pacing_interval);

        Ok(Self {
            config,
            source,
            target,
            sink,
            checkpoint,
            stager,
            pacer,
        })
    }

    /// Already-replicated ids loaded at startup.
    pub fn checkpointed(&self) -> usize {
        self.checkpoint.len()
    }

    /// Run the full replication pass.
    ///
    /// Fetches the replay (fatal on failure), then processes each message
    /// independently in ascending id order. Returns a [`RunSummary`] of
    /// outcome counts.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let replay = read_replay(
            self.source.as_ref(),
            &self.config.source_channel,
            self.config.page_size,
            self.config.range,
        )
        .await?;

        metrics::record_replay_backlog(replay.len());
        info!(
            source = %self.config.source_channel,
            target = %self.config.target_channel,
            replay_len = replay.len(),
            already_checkpointed = self.checkpoint.len(),
            "starting replication run"
        );

        let mut summary = RunSummary::default();

        for msg in &replay {
            summary.processed += 1;

            // Checkpoint skip is silent: no sink entry, by contract.
            if self.checkpoint.contains(msg.id) {
                debug!(id = msg.id, "already replicated, skipping");
                metrics::record_outcome("already_replicated");
                summary.skipped_checkpoint += 1;
                continue;
            }

            let started = Instant::now();
            let outcome = match self.replicate_one(msg).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => return Err(e),
                Err(MirrorError::MediaUnavailable { id }) => {
                    self.sink
                        .record_skipped_media(id, media_kind(msg), "unavailable".to_string())
                        .await;
                    ReplicationOutcome::Skipped(SkipReason::MediaUnavailable)
                }
                Err(MirrorError::SizeExceeded { id, size, cap }) => {
                    self.sink
                        .record_skipped_media(
                            id,
                            media_kind(msg),
                            format!("{} bytes exceeds cap {}", size, cap),
                        )
                        .await;
                    ReplicationOutcome::Skipped(SkipReason::SizeExceeded)
                }
                Err(e) => {
                    self.sink.record_failure(msg.id, e.to_string()).await;
                    ReplicationOutcome::Failed(e.to_string())
                }
            };
            metrics::record_message_duration(started.elapsed());

            match outcome {
                ReplicationOutcome::Sent { pin_applied, .. } => {
                    metrics::record_outcome("sent");
                    summary.sent += 1;
                    match pin_applied {
                        Some(true) => summary.pins_applied += 1,
                        Some(false) => summary.pin_failures += 1,
                        None => {}
                    }
                }
                ReplicationOutcome::Skipped(SkipReason::Empty) => {
                    metrics::record_outcome("empty");
                    summary.skipped_empty += 1;
                }
                ReplicationOutcome::Skipped(
                    SkipReason::MediaUnavailable | SkipReason::SizeExceeded,
                ) => {
                    metrics::record_outcome("skipped_media");
                    summary.skipped_media += 1;
                }
                ReplicationOutcome::Failed(_) => {
                    metrics::record_outcome("failed");
                    summary.failed += 1;
                }
            }
        }

        info!(%summary, "replication run complete");
        Ok(summary)
    }

    /// Process one message through filter → stage → pace → send → pin →
    /// checkpoint.
    ///
    /// Errors returned here are classified by the caller; this method never
    /// writes to the sink except for best-effort pin failures.
    async fn replicate_one(&mut self, msg: &SourceMessage) -> Result<ReplicationOutcome> {
        let text = msg.outbound_text();

        let remote = if let Some(media) = &msg.media {
            let staged = with_retry(&self.config.retry, "stage_media", || {
                self.stager.stage(self.source.as_ref(), msg.id, media)
            })
            .await?;

            let caption = text.clone().unwrap_or_default();
            // Pacing guards every send attempt, including the very first
            // pair of a run; skips and staging work never wait.
            self.pacer.pause().await;
            with_retry(&self.config.retry, "send_media", || {
                self.stager.upload(
                    self.target.as_ref(),
                    &self.config.target_channel,
                    &staged,
                    &caption,
                    &media.attributes,
                )
            })
            .await?
            // `staged` drops here: the transient artifact is gone whether
            // the upload succeeded or the `?` above fired.
        } else {
            let Some(body) = text else {
                debug!(id = msg.id, "nothing to replicate, filtering out");
                return Ok(ReplicationOutcome::Skipped(SkipReason::Empty));
            };
            self.pacer.pause().await;
            with_retry(&self.config.retry, "send_text", || {
                self.target
                    .send_text(self.config.target_channel.clone(), body.clone())
            })
            .await?
        };

        debug!(id = msg.id, remote = %remote, "message sent");

        // Pin uses the target-side id just produced by the send, never the
        // source id. Best-effort: failure is logged, the send stands.
        let pin_applied = if msg.pinned {
            let pin_result = with_retry(&self.config.retry, "pin_message", || {
                self.target.pin_message(
                    self.config.target_channel.clone(),
                    remote,
                    self.config.pin_silent,
                )
            })
            .await;

            match pin_result {
                Ok(()) => {
                    metrics::record_pin(true);
                    Some(true)
                }
                Err(e) => {
                    metrics::record_pin(false);
                    let err = MirrorError::PinPropagation {
                        id: msg.id,
                        message: e.to_string(),
                    };
                    warn!(id = msg.id, remote = %remote, error = %err, "pin propagation failed");
                    self.sink.record_failure(msg.id, err.to_string()).await;
                    Some(false)
                }
            }
        } else {
            None
        };

        self.checkpoint.record(msg.id).await?;

        Ok(ReplicationOutcome::Sent { remote, pin_applied })
    }
}

fn media_kind(msg: &SourceMessage) -> MediaKind {
    msg.media.as_ref().map(|m| m.kind).unwrap_or(MediaKind::Other)
}
