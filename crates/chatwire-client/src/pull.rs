//! REST pull API: history pages and outbound sends.
//!
//! The push path is delivery-only; this client is the source of truth.
//! History arrives as 1-based pages (higher page number means older
//! messages) in the standard pagination envelope, and sends go out as
//! plain POSTs whose response is the confirmed message.

use chatwire_proto::{ChatMessage, MediaRef, Page, PageResponse, ProtocolError};
use serde_json::json;
use thiserror::Error;

/// Pull API errors.
#[derive(Debug, Error)]
pub enum PullError {
    /// Request or response-body failure at the HTTP layer.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the server.
    #[error("server returned {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// Response body failed domain validation.
    #[error("invalid response body: {0}")]
    Invalid(#[from] ProtocolError),
}

/// HTTP client for the conversation API.
#[derive(Debug, Clone)]
pub struct PullClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl PullClient {
    /// Client against the given API base URL, with an optional bearer token.
    #[must_use]
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http: reqwest::Client::new(), base_url, auth_token }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fetch one history page for a conversation.
    ///
    /// `page` is 1-based; page 1 is the newest slice.
    ///
    /// # Errors
    ///
    /// - `PullError::Http` / `PullError::Status` on transport or server
    ///   failure. The caller decides blocking vs retryable by page number.
    pub async fn fetch_page(&self, conversation_id: u64, page: u32) -> Result<Page, PullError> {
        let url = format!("{}/conversations/{conversation_id}/messages", self.base_url);
        tracing::debug!(conversation = conversation_id, page, "fetching history page");

        let response = self
            .authorized(self.http.get(&url).query(&[("page", page)]))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PullError::Status { status: status.as_u16(), url });
        }

        let envelope: PageResponse = response.json().await?;
        Ok(envelope.into_page(conversation_id))
    }

    /// Send a message; the response body is the confirmed message.
    ///
    /// `item_metadata` is optional structured metadata attached to the
    /// message (forwarded verbatim, never interpreted here).
    ///
    /// # Errors
    ///
    /// - `PullError::Status` on rejection; the caller rolls back its
    ///   optimistic entry.
    /// - `PullError::Invalid` when the response is not a valid message.
    pub async fn send_message(
        &self,
        conversation_id: u64,
        body: &str,
        media_refs: &[MediaRef],
        item_metadata: Option<serde_json::Value>,
    ) -> Result<ChatMessage, PullError> {
        let url = format!("{}/conversations/{conversation_id}/messages", self.base_url);
        tracing::debug!(conversation = conversation_id, "sending message");

        let mut payload = json!({
            "body": body,
            "media": media_refs,
        });
        if let Some(metadata) = item_metadata {
            payload["item_metadata"] = metadata;
        }

        let response = self
            .authorized(self.http.post(&url).json(&payload))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PullError::Status { status: status.as_u16(), url });
        }

        let value: serde_json::Value = response.json().await?;
        Ok(ChatMessage::from_value(&value)?)
    }
}
