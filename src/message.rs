// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Source message data model.
//!
//! Messages are read-only to the mirror: they are owned by the source
//! provider and ingested through [`crate::channel::MessageSource`]. The
//! content/service distinction and the media subtype are resolved once at
//! ingestion into closed enums; nothing downstream inspects provider types.
//!
//! # Caption Resolution
//!
//! Outbound text follows a fallback chain: a media object's native caption
//! wins, else the message body; when both exist they are concatenated with
//! the caption first. A message with neither text nor media carries nothing
//! worth replicating and is filtered out by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind discriminant, resolved once at ingestion.
///
/// Service messages (membership changes, channel photo updates, ...) carry
/// no user content and are never replicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Content,
    Service,
}

/// Media subtype, a closed set rather than provider type inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    Sticker,
    Other,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
            MediaKind::Audio => "audio",
            MediaKind::Voice => "voice",
            MediaKind::Sticker => "sticker",
            MediaKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Attributes carried alongside a media object to the target send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttributes {
    /// Original file name, if the provider exposes one.
    pub file_name: Option<String>,
    /// MIME type, if known.
    pub mime_type: Option<String>,
}

/// Opaque reference to a remote media object.
///
/// The handle is only meaningful to the source provider client; this crate
/// never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Provider-side handle for the object.
    pub handle: String,
    /// Declared size in bytes. Checked against the hard cap before download.
    pub size: u64,
    /// Media subtype.
    pub kind: MediaKind,
    /// Native caption attached to the media, distinct from the message body.
    pub caption: Option<String>,
    /// Attributes forwarded to the target send.
    #[serde(default)]
    pub attributes: MediaAttributes,
}

/// A single message from the source channel's history.
///
/// `id` is monotonically increasing and unique per channel; it doubles as
/// both identity (checkpointing) and resume cursor (pagination).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMessage {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// Plain body text, if any.
    pub body: Option<String>,
    /// Attached media, if any.
    pub media: Option<MediaRef>,
    /// Whether the message is pinned in the source channel.
    pub pinned: bool,
    pub kind: MessageKind,
}

impl SourceMessage {
    /// Minimal text-only message, useful in tests and examples.
    pub fn text(id: i64, body: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            body: Some(body.into()),
            media: None,
            pinned: false,
            kind: MessageKind::Content,
        }
    }

    /// True for provider-generated service notifications.
    pub fn is_service(&self) -> bool {
        self.kind == MessageKind::Service
    }

    /// Resolve the outbound text for this message.
    ///
    /// Returns `None` when there is nothing textual to carry over; for a
    /// message without media that means there is nothing to replicate at all.
    pub fn outbound_text(&self) -> Option<String> {
        let caption = self.media.as_ref().and_then(|m| m.caption.as_deref());
        let body = self.body.as_deref().filter(|b| !b.is_empty());
        match (caption.filter(|c| !c.is_empty()), body) {
            (Some(c), Some(b)) => Some(format!("{}\n\n{}", c, b)),
            (Some(c), None) => Some(c.to_string()),
            (None, Some(b)) => Some(b.to_string()),
            (None, None) => None,
        }
    }
}
