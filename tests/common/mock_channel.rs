//! Mock MessageSource / MessageTarget for testing.
//!
//! Both mocks record every call for assertions and support configurable
//! failure injection: transient network failures, permanently unavailable
//! media, and pin rejections.

use channel_mirror::channel::{BoxFuture, ChannelId, ProgressObserver, RemoteId};
use channel_mirror::error::MirrorError;
use channel_mirror::message::{MediaAttributes, MediaRef, SourceMessage};
use channel_mirror::{MessageSource, MessageTarget};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// A recorded fetch_page() call.
#[derive(Debug, Clone)]
pub struct PageFetch {
    pub cursor: i64,
    pub page_size: usize,
}

/// Mock source serving a fixed history, newest first, with real cursor
/// semantics: a page contains ids strictly below the cursor (or the head
/// of the channel for cursor 0).
pub struct MockSource {
    /// Full history, descending by id.
    messages: Vec<SourceMessage>,
    /// Media payloads by handle. Handles absent from this map and from
    /// `unavailable` yield a default payload.
    media_content: HashMap<String, Vec<u8>>,
    /// Handles the provider cannot materialize (fetch_media -> Ok(None)).
    unavailable: HashSet<String>,
    /// Remaining transient failures per media handle.
    media_failures: Mutex<HashMap<String, usize>>,
    /// Remaining transient page-fetch failures.
    page_failures: AtomicUsize,
    /// Recorded fetch_page() calls.
    page_fetches: Mutex<Vec<PageFetch>>,
}

impl MockSource {
    pub fn new(mut messages: Vec<SourceMessage>) -> Self {
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        Self {
            messages,
            media_content: HashMap::new(),
            unavailable: HashSet::new(),
            media_failures: Mutex::new(HashMap::new()),
            page_failures: AtomicUsize::new(0),
            page_fetches: Mutex::new(Vec::new()),
        }
    }

    /// Set the payload served for a media handle.
    pub fn with_media(mut self, handle: &str, content: &[u8]) -> Self {
        self.media_content.insert(handle.to_string(), content.to_vec());
        self
    }

    /// Mark a media handle as permanently unavailable.
    pub fn with_unavailable_media(mut self, handle: &str) -> Self {
        self.unavailable.insert(handle.to_string());
        self
    }

    /// Make the next `n` downloads of `handle` fail transiently.
    pub async fn fail_media_times(&self, handle: &str, n: usize) {
        self.media_failures
            .lock()
            .await
            .insert(handle.to_string(), n);
    }

    /// Make the next `n` page fetches fail transiently.
    pub fn fail_pages(&self, n: usize) {
        self.page_failures.store(n, Ordering::SeqCst);
    }

    /// All recorded page fetches.
    pub async fn page_fetches(&self) -> Vec<PageFetch> {
        self.page_fetches.lock().await.clone()
    }
}

impl MessageSource for MockSource {
    fn fetch_page(
        &self,
        _channel: ChannelId,
        cursor: i64,
        page_size: usize,
    ) -> BoxFuture<'_, Vec<SourceMessage>> {
        Box::pin(async move {
            if self.page_failures.load(Ordering::SeqCst) > 0 {
                self.page_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(MirrorError::network("fetch_page", "connection reset"));
            }

            self.page_fetches
                .lock()
                .await
                .push(PageFetch { cursor, page_size });

            let page: Vec<SourceMessage> = self
                .messages
                .iter()
                .filter(|m| cursor == 0 || m.id < cursor)
                .take(page_size)
                .cloned()
                .collect();
            Ok(page)
        })
    }

    fn fetch_media(
        &self,
        media: MediaRef,
        dest: PathBuf,
        _observer: Arc<dyn ProgressObserver>,
    ) -> BoxFuture<'_, Option<u64>> {
        Box::pin(async move {
            {
                let mut failures = self.media_failures.lock().await;
                if let Some(remaining) = failures.get_mut(&media.handle) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(MirrorError::network("fetch_media", "timed out"));
                    }
                }
            }

            if self.unavailable.contains(&media.handle) {
                return Ok(None);
            }

            let content = self
                .media_content
                .get(&media.handle)
                .cloned()
                .unwrap_or_else(|| b"media-bytes".to_vec());
            tokio::fs::write(&dest, &content).await?;
            Ok(Some(content.len() as u64))
        })
    }
}

/// What a send carried.
#[derive(Debug, Clone)]
pub enum SentPayload {
    Text(String),
    Media {
        caption: String,
        attributes: MediaAttributes,
        /// Bytes read from the staged file at send time. Proves the
        /// artifact existed while the upload ran.
        bytes: Vec<u8>,
    },
}

/// A recorded send.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub remote: RemoteId,
    pub payload: SentPayload,
    /// When the send was accepted, for pacing assertions.
    pub at: Instant,
}

/// A recorded pin.
#[derive(Debug, Clone)]
pub struct PinCall {
    pub remote: RemoteId,
    pub silent: bool,
}

/// Mock target assigning sequential remote ids from 100 upward.
pub struct MockTarget {
    next_id: AtomicI64,
    sent: Mutex<Vec<SentMessage>>,
    pins: Mutex<Vec<PinCall>>,
    /// Remaining transient send failures.
    send_failures: AtomicUsize,
    /// Remaining transient pin failures.
    pin_failures: AtomicUsize,
}

impl MockTarget {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            sent: Mutex::new(Vec::new()),
            pins: Mutex::new(Vec::new()),
            send_failures: AtomicUsize::new(0),
            pin_failures: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` sends fail transiently.
    pub fn fail_sends(&self, n: usize) {
        self.send_failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` pins fail transiently.
    pub fn fail_pins(&self, n: usize) {
        self.pin_failures.store(n, Ordering::SeqCst);
    }

    /// All recorded sends, in order.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// All recorded pins, in order.
    pub async fn pins(&self) -> Vec<PinCall> {
        self.pins.lock().await.clone()
    }

    /// Texts sent, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|s| match &s.payload {
                SentPayload::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    fn take_send_failure(&self) -> bool {
        self.send_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn record(&self, payload: SentPayload) -> RemoteId {
        let remote = RemoteId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().await.push(SentMessage {
            remote,
            payload,
            at: Instant::now(),
        });
        remote
    }
}

impl Default for MockTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageTarget for MockTarget {
    fn send_text(&self, _channel: ChannelId, text: String) -> BoxFuture<'_, RemoteId> {
        Box::pin(async move {
            if self.take_send_failure() {
                return Err(MirrorError::network("send_text", "flood wait"));
            }
            Ok(self.record(SentPayload::Text(text)).await)
        })
    }

    fn send_media(
        &self,
        _channel: ChannelId,
        file: PathBuf,
        caption: String,
        attributes: MediaAttributes,
        _observer: Arc<dyn ProgressObserver>,
    ) -> BoxFuture<'_, RemoteId> {
        Box::pin(async move {
            if self.take_send_failure() {
                return Err(MirrorError::network("send_media", "flood wait"));
            }
            let bytes = tokio::fs::read(&file).await?;
            Ok(self
                .record(SentPayload::Media {
                    caption,
                    attributes,
                    bytes,
                })
                .await)
        })
    }

    fn pin_message(&self, _channel: ChannelId, id: RemoteId, silent: bool) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let failed = self
                .pin_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                return Err(MirrorError::network("pin_message", "rights missing"));
            }
            self.pins.lock().await.push(PinCall { remote: id, silent });
            Ok(())
        })
    }
}
