//! # Channel Mirror
//!
//! Replicates an ordered message history from one channel to another:
//! same content, same relative order, same pin state.
//!
//! ## Architecture
//!
//! The engine sits between two provider boundaries, reading paginated
//! history from the source and serializing sends to the target:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            channel-mirror                            │
//! │                                                                      │
//! │  ┌───────────────┐   ┌──────────────┐   ┌─────────────────────────┐  │
//! │  │ HistoryReader │──►│ MirrorEngine │──►│ send → pin → checkpoint │  │
//! │  │ (pagination)  │   │ (per message)│   │ (strictly serialized)   │  │
//! │  └───────────────┘   └──────┬───────┘   └─────────────────────────┘  │
//! │                             │                                        │
//! │            ┌────────────────┼───────────────────┐                    │
//! │            ▼                ▼                   ▼                    │
//! │  ┌─────────────────┐ ┌─────────────┐ ┌───────────────────────────┐   │
//! │  │ CheckpointStore │ │ MediaStager │ │ ErrorSink (append-only    │   │
//! │  │ (id file)       │ │ (temp files)│ │ error + skipped-media log)│   │
//! │  └─────────────────┘ └─────────────┘ └───────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Semantics
//!
//! Idempotent by checkpoint, at-least-once: a crash between a successful
//! send and the checkpoint append causes one duplicate resend on the next
//! run. Per-item failures are isolated to the error sink; only setup-phase
//! errors abort a run.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use channel_mirror::{MirrorConfig, MirrorEngine, FileErrorSink};
//! use std::sync::Arc;
//!
//! # async fn example(source: Arc<impl channel_mirror::MessageSource>,
//! #                  target: Arc<impl channel_mirror::MessageTarget>)
//! #     -> channel_mirror::error::Result<()> {
//! let config = MirrorConfig::for_testing(std::path::Path::new("/tmp/mirror"));
//! let sink = Arc::new(
//!     FileErrorSink::open(&config.state.error_log_path, &config.state.skipped_media_log_path)
//!         .await?,
//! );
//!
//! let mut engine = MirrorEngine::new(config, source, target, sink).await?;
//! let summary = engine.run().await?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod media;
pub mod message;
pub mod metrics;
pub mod resilience;
pub mod sink;

// Re-exports for convenience
pub use channel::{ChannelId, MessageSource, MessageTarget, NoOpProgress, ProgressObserver, RemoteId};
pub use checkpoint::CheckpointStore;
pub use config::{IdRange, MediaConfig, MirrorConfig, StateConfig};
pub use engine::{MirrorEngine, ReplicationOutcome, RunSummary, SkipReason};
pub use error::{MirrorError, Result};
pub use history::read_replay;
pub use media::{MediaStager, StagedMedia};
pub use message::{MediaAttributes, MediaKind, MediaRef, MessageKind, SourceMessage};
pub use resilience::{RetryConfig, SendPacer};
pub use sink::{ErrorSink, FileErrorSink};
