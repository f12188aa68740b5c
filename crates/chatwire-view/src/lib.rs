//! View-model layer for the Chatwire delivery stack.
//!
//! Pure state machines between the delivery core and a rendering layer:
//!
//! - [`MessageCache`]: per-conversation ordered message set merging
//!   optimistic, pulled, and pushed entries through one commutative,
//!   idempotent merge function
//! - [`VirtualWindow`]: index-range math for rendering a windowed subset of
//!   a long list
//! - [`ScrollController`]: backward-pagination triggers, scroll position
//!   preservation, and auto-scroll decisions
//!
//! Nothing here touches a UI toolkit. Scroll logic operates on plain
//! [`ViewportMetrics`] so every decision is testable with numbers.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cache;
mod error;
mod metrics;
mod scroll;
mod window;

pub use cache::{CacheConfig, MessageCache};
pub use error::{FetchError, SendError};
pub use metrics::ViewportMetrics;
pub use scroll::{ScrollConfig, ScrollController, restore_offset};
pub use window::{VirtualWindow, WindowConfig, WindowPlan};
