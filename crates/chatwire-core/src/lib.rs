//! Sans-IO state machines for the Chatwire realtime delivery layer.
//!
//! Every component in this crate uses the action pattern: methods take time
//! as input and return actions for a driver to execute. This keeps the state
//! machines pure (no I/O) and makes the failure/retry policy independently
//! unit-testable under real or virtual time.
//!
//! # Components
//!
//! - [`ConnectionManager`]: socket lifecycle and reconnect/backoff policy
//! - [`BackoffPolicy`] / [`BackoffState`]: the consolidated retry record
//! - [`ChannelMux`]: desired-set subscription multiplexer with resync
//! - [`HealthMonitor`]: keepalive ticks, stability classification, counters
//! - [`EventRouter`]: inbound frame decode/validate/dispatch with a
//!   debounced reconciliation trigger
//! - [`Notifier`]: rate-limited user-facing connection notices

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod backoff;
mod channels;
mod connection;
mod env;
mod error;
mod health;
mod notify;
mod router;

pub use backoff::{BackoffPolicy, BackoffState};
pub use channels::ChannelMux;
pub use connection::{ConnectionAction, ConnectionConfig, ConnectionEvent, ConnectionManager, ConnectionState};
pub use env::Environment;
pub use error::ConnectionError;
pub use health::{HealthConfig, HealthMonitor, HealthSample};
pub use notify::{ConnectionNotice, Notifier};
pub use router::{EventRouter, RouteOutcome, RouterConfig};
