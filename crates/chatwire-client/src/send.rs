//! Optimistic send flow.
//!
//! Ties the pull API to the message cache: the draft appears immediately
//! as an optimistic entry whose id is minted from [`Environment`]
//! randomness, then the server's confirmed echo replaces it, or a failure
//! removes it and hands the draft back for composer restoration.

use chatwire_core::Environment;
use chatwire_proto::{ChatMessage, MediaRef};
use chatwire_view::{MessageCache, SendError};
use serde_json::Value;

use crate::pull::PullClient;

/// Send a message through the optimistic-insert path.
///
/// The optimistic entry is visible in `cache` for the whole round trip.
/// Pushes and page merges landing mid-send are unaffected by the outcome.
///
/// # Errors
///
/// - `SendError::Rejected` when the POST fails. The optimistic entry has
///   been removed and the error carries the draft body.
pub async fn send_optimistic<E: Environment>(
    env: &E,
    pull: &PullClient,
    cache: &mut MessageCache,
    sender_id: u64,
    body: &str,
    media_refs: &[MediaRef],
    item_metadata: Option<Value>,
) -> Result<ChatMessage, SendError> {
    let conversation_id = cache.conversation_id();
    let optimistic = ChatMessage::optimistic(
        env.random_u64(),
        conversation_id,
        sender_id,
        body.to_string(),
        env.now_unix_ms(),
    );
    cache.append_optimistic(optimistic);

    match pull.send_message(conversation_id, body, media_refs, item_metadata).await {
        Ok(confirmed) => {
            cache.commit_send(confirmed.clone());
            Ok(confirmed)
        },
        Err(err) => {
            tracing::warn!(conversation = conversation_id, %err, "send failed, rolling back");
            let draft = cache.rollback_send().map_or_else(|| body.to_string(), |m| m.body);
            Err(SendError::Rejected { reason: err.to_string(), draft })
        },
    }
}
