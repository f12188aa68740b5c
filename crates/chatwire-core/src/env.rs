//! Environment abstraction for deterministic testing.
//!
//! Decouples the delivery layer from system resources (time, randomness).
//! Production drivers use the real clock and OS entropy; tests drive the
//! state machines with explicit instants and seeded randomness.

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// # Invariants
///
/// - `now()` never goes backwards within one execution context.
/// - `random_bytes()` uses a CSPRNG in production.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulated
    /// environments substitute virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time in unix milliseconds.
    ///
    /// Used only for stamping outbound frames (keepalive pings, optimistic
    /// `created_at`); never for scheduling decisions.
    fn now_unix_ms(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Convenience for client-generated optimistic message ids.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
