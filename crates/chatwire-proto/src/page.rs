//! Paginated pull API types.
//!
//! The pull API serves conversation history in 1-based pages where a higher
//! page number holds older messages. The wire response is the collaborator's
//! standard pagination envelope: `{current_page, per_page, total, data}`.

use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;

/// Wire envelope returned by the pull API for one history page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    /// 1-based page number served.
    pub current_page: u32,
    /// Page size the server used.
    pub per_page: u32,
    /// Total messages in the conversation.
    pub total: u64,
    /// Messages in this page, oldest first.
    pub data: Vec<ChatMessage>,
}

impl PageResponse {
    /// Whether pages older than this one exist.
    ///
    /// Pages count from the newest end, so older history remains while
    /// `current_page * per_page` has not covered `total`.
    #[must_use]
    pub fn has_more_older(&self) -> bool {
        u64::from(self.current_page) * u64::from(self.per_page) < self.total
    }

    /// Convert into a [`Page`] for the given conversation.
    #[must_use]
    pub fn into_page(self, conversation_id: u64) -> Page {
        let has_more_older = self.has_more_older();
        Page {
            conversation_id,
            page_number: self.current_page,
            messages: self.data,
            has_more_older,
        }
    }
}

/// One fetched history page, ready for the merge layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Conversation the page belongs to.
    pub conversation_id: u64,
    /// 1-based page number; higher means older.
    pub page_number: u32,
    /// Messages in this page, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Whether older pages remain beyond this one.
    pub has_more_older: bool,
}
