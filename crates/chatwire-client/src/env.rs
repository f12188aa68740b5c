//! Production environment: real clock, OS entropy.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chatwire_core::Environment;
use rand::RngCore;

/// [`Environment`] backed by the system clock and OS entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioEnv;

impl Environment for TokioEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_unix_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        rand::thread_rng().fill_bytes(buffer);
    }
}
