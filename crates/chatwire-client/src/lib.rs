//! Tokio driver for the Chatwire delivery layer.
//!
//! Everything protocol-shaped lives in the sans-IO crates; this crate is
//! the thin layer that touches the real world:
//!
//! - [`transport`]: websocket I/O task bridging frames over channels
//! - [`session`]: the driver loop that executes state-machine actions
//! - [`pull`]: REST client for history pages and outbound sends
//! - [`send`]: the optimistic send flow over pull client and cache
//! - [`env`]: production [`Environment`](chatwire_core::Environment)
//!
//! The application talks to a [`SessionHandle`]: commands in, broadcast
//! [`ChatEvent`]s out.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod events;
pub mod pull;
pub mod send;
pub mod session;
pub mod transport;

pub use env::TokioEnv;
pub use events::{ChatEvent, SessionCommand};
pub use pull::{PullClient, PullError};
pub use send::send_optimistic;
pub use session::{SessionConfig, SessionError, SessionHandle, spawn};
pub use transport::{Socket, SocketEvent, TransportError};
