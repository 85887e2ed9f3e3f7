//! Time and randomness abstraction for the tracker.
//!
//! Decouples the tracker's deterministic policy from wall-clock time and the
//! anti-tamper clamp's randomness, so the policy itself can be driven by a
//! fixed clock and a seeded RNG in tests.

use std::time::{Duration, Instant};

/// Abstract source of monotonic time and randomness.
///
/// # Invariants
///
/// Implementations MUST guarantee `now()` never goes backwards within a
/// single session.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Draws a value uniformly in `[0.0, 1.0)`, used only by the anti-tamper
    /// clamp's 0.5% activation check.
    fn random_unit(&self) -> f64;
}

/// Production clock using `std::time::Instant` and the OS's cryptographic
/// RNG.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[allow(clippy::expect_used)]
    fn random_unit(&self) -> f64 {
        let mut bytes = [0u8; 8];
        getrandom::fill(&mut bytes)
            .expect("invariant: OS RNG failure is unrecoverable - proxy cannot operate securely");
        // 53 bits of entropy is enough precision for a percentage threshold check.
        let as_u64 = u64::from_le_bytes(bytes) >> 11;
        #[allow(clippy::cast_precision_loss)]
        let scaled = as_u64 as f64 / (1u64 << 53) as f64;
        scaled
    }
}

/// Sleeps for `duration` using the ambient async runtime. Only production
/// driver code calls this; tracker logic never awaits.
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_time_advances() {
        let clock = SystemClock::new();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = clock.now();
        assert!(t2 > t1);
    }

    #[test]
    fn system_clock_random_unit_is_in_range() {
        let clock = SystemClock::new();
        for _ in 0..64 {
            let value = clock.random_unit();
            assert!((0.0..1.0).contains(&value));
        }
    }
}
