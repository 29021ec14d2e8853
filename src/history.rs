// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! History pagination into a single ascending replay sequence.
//!
//! The provider serves history newest-first in pages. [`read_replay`]
//! issues successive page requests, advancing the cursor to the oldest id
//! seen so far, until a page comes back empty; the concatenation is then
//! reversed into one oldest-first sequence. That replay order is what
//! everything downstream consumes.
//!
//! Service-kind messages are dropped here, at ingestion. An optional
//! `[start_id, end_id]` range narrows the replay; pagination stops early
//! once a page has gone past `start_id`, since pages only get older.
//!
//! Failure here is fatal: a half-fetched history cannot be resumed, so the
//! run aborts before any message is processed.

use crate::channel::{ChannelId, MessageSource};
use crate::config::IdRange;
use crate::error::{MirrorError, Result};
use crate::message::SourceMessage;
use tracing::{debug, info};

/// Flatten newest-first pages into one ascending replay sequence.
///
/// Drops service messages, applies the optional range, reverses to
/// oldest-first. Pure; exposed for property tests.
pub fn into_ascending_replay(
    pages: Vec<Vec<SourceMessage>>,
    range: Option<IdRange>,
) -> Vec<SourceMessage> {
    let mut messages: Vec<SourceMessage> = pages
        .into_iter()
        .flatten()
        .filter(|m| !m.is_service())
        .filter(|m| range.map_or(true, |r| r.contains(m.id)))
        .collect();

    messages.reverse();

    debug_assert!(
        messages.windows(2).all(|w| w[0].id < w[1].id),
        "replay must be strictly ascending by id"
    );

    messages
}

/// Fetch the full (or range-narrowed) history and return the replay
/// sequence, oldest first.
pub async fn read_replay<S: MessageSource + ?Sized>(
    source: &S,
    channel: &ChannelId,
    page_size: usize,
    range: Option<IdRange>,
) -> Result<Vec<SourceMessage>> {
    let mut pages: Vec<Vec<SourceMessage>> = Vec::new();
    let mut cursor: i64 = 0;
    let mut fetched = 0usize;

    loop {
        let page = source
            .fetch_page(channel.clone(), cursor, page_size)
            .await
            .map_err(|e| MirrorError::History(format!("page fetch at cursor {}: {}", cursor, e)))?;

        if page.is_empty() {
            break;
        }

        let oldest = page.last().map(|m| m.id).unwrap_or(cursor);
        fetched += page.len();
        debug!(cursor, oldest, page_len = page.len(), "fetched history page");
        crate::metrics::record_page_fetched(page.len());

        pages.push(page);
        cursor = oldest;

        // Pages only get older; once we are past the range start there is
        // nothing left worth fetching.
        if let Some(r) = range {
            if oldest < r.start_id {
                break;
            }
        }
    }

    let replay = into_ascending_replay(pages, range);
    info!(
        channel = %channel,
        fetched,
        replay_len = replay.len(),
        "history replay assembled"
    );
    Ok(replay)
}
