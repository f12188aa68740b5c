//! Wire types for the Chatwire realtime delivery protocol.
//!
//! The broker speaks JSON frames over a single bidirectional connection:
//! `{event, data?, channel?, timestamp?}`. Subscriptions are multiplexed
//! over that connection using `pusher:subscribe` / `pusher:unsubscribe`
//! control events, and conversation channels follow the
//! `chat.<conversation_id>` naming scheme.
//!
//! This crate is pure data: no I/O, no state. Higher layers decide what to
//! do with decoded frames.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod frame;
mod message;
mod page;

pub use error::ProtocolError;
pub use frame::{
    CONTROL_PREFIX, EVENT_MESSAGE_CREATED, EVENT_PING, EVENT_PONG, EVENT_SUBSCRIBE,
    EVENT_UNSUBSCRIBE, Frame, conversation_channel, conversation_from_channel,
};
pub use message::{ChatMessage, DeliveryState, MediaRef};
pub use page::{Page, PageResponse};
