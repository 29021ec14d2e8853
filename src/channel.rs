// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Provider boundary traits.
//!
//! The messaging provider client (wire protocol, auth, session lifecycle)
//! lives outside this crate. The engine reaches it through two narrow
//! traits: [`MessageSource`] for reading history and downloading media, and
//! [`MessageTarget`] for sends and pins. The host application provides the
//! implementations; tests use recording mocks.
//!
//! Parameters are owned (`String`, `PathBuf`) so implementations can move
//! them straight into their boxed futures without cloning gymnastics.

use crate::error::Result;
use crate::message::{MediaAttributes, MediaRef, SourceMessage};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// An addressable channel, source or target side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target-side message id, produced by a send.
///
/// Deliberately a distinct type from the source `i64` ids: the two id
/// spaces are unrelated, and a pin must only ever use this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RemoteId(pub i64);

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Incremental transfer progress, bytes so far out of total.
///
/// Observability only; correctness never depends on these callbacks.
pub trait ProgressObserver: Send + Sync + 'static {
    fn on_progress(&self, transferred: u64, total: u64);
}

/// Observer that ignores all progress reports.
#[derive(Debug, Clone, Default)]
pub struct NoOpProgress;

impl ProgressObserver for NoOpProgress {
    fn on_progress(&self, _transferred: u64, _total: u64) {}
}

/// Read side of the provider boundary.
pub trait MessageSource: Send + Sync + 'static {
    /// Fetch one page of history, newest first.
    ///
    /// `cursor = 0` means "from the head of the channel"; otherwise the page
    /// starts strictly below `cursor`. An empty page terminates pagination.
    ///
    /// Failures here are fatal to the run: map them to
    /// [`MirrorError::Network`](crate::error::MirrorError::Network) and the
    /// history reader will surface them before the replay loop starts.
    fn fetch_page(
        &self,
        channel: ChannelId,
        cursor: i64,
        page_size: usize,
    ) -> BoxFuture<'_, Vec<SourceMessage>>;

    /// Download a media object to `dest`, reporting progress to `observer`.
    ///
    /// Returns the number of bytes written, or `Ok(None)` when the provider
    /// cannot materialize the object at all (deleted, expired reference).
    /// `Ok(None)` is not a transient condition and must not be retried.
    fn fetch_media(
        &self,
        media: MediaRef,
        dest: PathBuf,
        observer: Arc<dyn ProgressObserver>,
    ) -> BoxFuture<'_, Option<u64>>;
}

/// Write side of the provider boundary.
pub trait MessageTarget: Send + Sync + 'static {
    /// Send a plain text message, returning the target-side id.
    fn send_text(&self, channel: ChannelId, text: String) -> BoxFuture<'_, RemoteId>;

    /// Upload a local file as a media message with `caption` (possibly
    /// empty) and `attributes`, returning the target-side id.
    fn send_media(
        &self,
        channel: ChannelId,
        file: PathBuf,
        caption: String,
        attributes: MediaAttributes,
        observer: Arc<dyn ProgressObserver>,
    ) -> BoxFuture<'_, RemoteId>;

    /// Pin a previously sent message by its target-side id.
    ///
    /// `silent` suppresses the provider-side pin notification.
    fn pin_message(&self, channel: ChannelId, id: RemoteId, silent: bool) -> BoxFuture<'_, ()>;
}
