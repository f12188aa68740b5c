//! Per-conversation paginated message cache.
//!
//! Holds the merged, ascending-ordered message set for one conversation:
//! optimistic local sends, pulled history pages, and pushed broker events
//! all funnel through the merge functions here. The merge is commutative
//! and idempotent with respect to arrival order: a push arriving before or
//! after the page containing the same id converges to an identical final
//! state, and every id appears exactly once.
//!
//! Pages are 1-based; higher page numbers hold older messages. Older pages
//! prepend to a head region that page-1 refreshes never touch, so backward
//! pagination survives reconciliation pulls.

use std::collections::HashSet;

use chatwire_proto::{ChatMessage, DeliveryState, Page};

use crate::error::FetchError;

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Expected page size before the first server response arrives.
    pub page_size: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { page_size: 25 }
    }
}

/// Ordered message set for one conversation.
#[derive(Debug, Clone)]
pub struct MessageCache {
    conversation_id: u64,
    /// Ascending by page/arrival time: oldest first.
    messages: Vec<ChatMessage>,
    ids: HashSet<u64>,
    /// Length of the head region contributed by pages >= 2.
    older_head_len: usize,
    /// Highest page requested; optimistically bumped at fetch time and
    /// rolled back by one on failure.
    page_cursor: u32,
    /// Highest page successfully merged.
    pages_merged: u32,
    has_more_older: bool,
    /// Id of the in-flight optimistic send, if any.
    pending_send: Option<u64>,
}

impl MessageCache {
    /// Empty cache for a conversation.
    #[must_use]
    pub fn new(conversation_id: u64, _config: CacheConfig) -> Self {
        Self {
            conversation_id,
            messages: Vec::new(),
            ids: HashSet::new(),
            older_head_len: 0,
            page_cursor: 0,
            pages_merged: 0,
            has_more_older: false,
            pending_send: None,
        }
    }

    /// Conversation this cache belongs to.
    #[must_use]
    pub fn conversation_id(&self) -> u64 {
        self.conversation_id
    }

    /// The merged message list, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages in the merged set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when no messages are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether older pages remain beyond what has been fetched.
    ///
    /// Derived from the deepest page response's total/page-size/page-number
    /// arithmetic (see `PageResponse::has_more_older`).
    #[must_use]
    pub fn has_more_older(&self) -> bool {
        self.has_more_older
    }

    /// Highest page successfully merged.
    #[must_use]
    pub fn pages_fetched(&self) -> u32 {
        self.pages_merged
    }

    /// Reserve the next page number for a fetch.
    ///
    /// The counter moves optimistically; [`MessageCache::record_fetch_failure`]
    /// rolls it back so a failed fetch can be retried at the same depth.
    pub fn begin_fetch(&mut self) -> u32 {
        self.page_cursor = self.page_cursor.saturating_add(1);
        self.page_cursor
    }

    /// Record a failed fetch for the page reserved by the last
    /// [`MessageCache::begin_fetch`].
    ///
    /// Rolls the page counter back by one and reports the error: blocking
    /// for a first-page failure (nothing to show), retryable otherwise.
    pub fn record_fetch_failure(&mut self, reason: impl Into<String>) -> FetchError {
        let failed_page = self.page_cursor;
        self.page_cursor = self.page_cursor.saturating_sub(1);

        if failed_page <= 1 {
            FetchError::Initial { conversation_id: self.conversation_id, reason: reason.into() }
        } else {
            FetchError::OlderPage {
                conversation_id: self.conversation_id,
                page: failed_page,
                reason: reason.into(),
            }
        }
    }

    /// Insert a local send immediately, ahead of server confirmation.
    ///
    /// Records the id so [`MessageCache::commit_send`] and
    /// [`MessageCache::rollback_send`] can find the entry later.
    pub fn append_optimistic(&mut self, message: ChatMessage) {
        debug_assert_eq!(message.delivery_state, DeliveryState::Optimistic);

        self.pending_send = Some(message.id);
        self.ids.insert(message.id);
        self.messages.push(message);
    }

    /// Replace the in-flight optimistic entry with its confirmed
    /// counterpart.
    ///
    /// Falls back to an idempotent insert when the push path already
    /// superseded the optimistic entry.
    pub fn commit_send(&mut self, confirmed: ChatMessage) {
        let optimistic_id = self.pending_send.take();

        if let Some(id) = optimistic_id
            && let Some(pos) = self.messages.iter().position(|m| m.id == id)
            && self.messages[pos].delivery_state == DeliveryState::Optimistic
        {
            self.ids.remove(&id);
            self.ids.insert(confirmed.id);
            self.messages[pos] = confirmed;
            return;
        }

        self.merge_inbound(confirmed);
    }

    /// Remove the in-flight optimistic entry after a failed send.
    ///
    /// Only the optimistic entry goes; pushes and page merges that arrived
    /// mid-send are untouched. Returns the discarded message so the caller
    /// can restore the user's draft. No-op returning `None` when no send is
    /// in flight or the entry was already confirmed by the push path.
    pub fn rollback_send(&mut self) -> Option<ChatMessage> {
        let optimistic_id = self.pending_send.take()?;
        let pos = self
            .messages
            .iter()
            .position(|m| m.id == optimistic_id && m.delivery_state == DeliveryState::Optimistic)?;

        let discarded = self.messages.remove(pos);
        self.ids.remove(&discarded.id);
        tracing::warn!(
            conversation = self.conversation_id,
            id = optimistic_id,
            "rolled back optimistic send"
        );
        Some(discarded)
    }

    /// Idempotent insert of a pushed message.
    ///
    /// No-op when the id is already present, except that a confirmed
    /// arrival supersedes an optimistic entry carrying the same id.
    pub fn merge_inbound(&mut self, message: ChatMessage) {
        if self.ids.contains(&message.id) {
            if message.delivery_state == DeliveryState::Confirmed
                && let Some(pos) = self.messages.iter().position(|m| {
                    m.id == message.id && m.delivery_state == DeliveryState::Optimistic
                })
            {
                self.messages[pos] = message;
            }
            return;
        }

        self.ids.insert(message.id);
        self.messages.push(message);
    }

    /// Merge a fetched history page.
    ///
    /// Page 1 replaces the current tail outright (optimistic entries are
    /// re-reconciled by id, older-page head untouched); pages > 1 prepend
    /// after filtering ids already present, never disturbing the relative
    /// order of messages already in the set.
    pub fn merge_server_page(&mut self, page: Page) {
        debug_assert_eq!(page.conversation_id, self.conversation_id);

        let deepest_before = self.pages_merged;
        if page.page_number >= deepest_before {
            self.has_more_older = page.has_more_older;
        }
        self.pages_merged = self.pages_merged.max(page.page_number);
        self.page_cursor = self.page_cursor.max(page.page_number);

        if page.page_number <= 1 {
            self.replace_tail(page);
        } else {
            self.prepend_older(page);
        }
        self.rebuild_ids();
    }

    fn replace_tail(&mut self, page: Page) {
        let head_ids: HashSet<u64> =
            self.messages[..self.older_head_len].iter().map(|m| m.id).collect();
        let page_ids: HashSet<u64> = page.messages.iter().map(|m| m.id).collect();

        // Unconfirmed local sends survive the refresh
        let optimistic_keep: Vec<ChatMessage> = self.messages[self.older_head_len..]
            .iter()
            .filter(|m| {
                m.delivery_state == DeliveryState::Optimistic && !page_ids.contains(&m.id)
            })
            .cloned()
            .collect();

        let mut rebuilt: Vec<ChatMessage> =
            self.messages[..self.older_head_len].to_vec();
        rebuilt.extend(page.messages.into_iter().filter(|m| !head_ids.contains(&m.id)));
        rebuilt.extend(optimistic_keep);

        self.messages = rebuilt;
    }

    fn prepend_older(&mut self, page: Page) {
        let fresh: Vec<ChatMessage> =
            page.messages.into_iter().filter(|m| !self.ids.contains(&m.id)).collect();

        self.older_head_len += fresh.len();
        let mut rebuilt = fresh;
        rebuilt.append(&mut self.messages);
        self.messages = rebuilt;
    }

    /// Evict everything, as on conversation switch.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.ids.clear();
        self.older_head_len = 0;
        self.page_cursor = 0;
        self.pages_merged = 0;
        self.has_more_older = false;
        self.pending_send = None;
    }

    fn rebuild_ids(&mut self) {
        self.ids = self.messages.iter().map(|m| m.id).collect();
        debug_assert_eq!(self.ids.len(), self.messages.len(), "duplicate id in merged set");
    }
}
