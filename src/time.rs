//! Injectable wall-clock time.
//!
//! The [`TimeProvider`] trait decouples key rotation and token expiry from the
//! system clock so tests can drive virtual time. Use [`SystemTimeProvider`] in
//! production and [`SimulatedTimeProvider`] in tests.
//!
//! # Tiger Style
//!
//! - No `.expect()` or `.unwrap()` - safe fallback to 0
//! - Inline for hot path performance

use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Get current Unix timestamp in milliseconds.
///
/// Returns 0 if system time is before the UNIX epoch (should never happen on
/// properly configured systems, but prevents panics).
#[inline]
pub fn current_time_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Trait for injectable time sources.
///
/// All expiry arithmetic in this crate flows through a `TimeProvider`, so a
/// manager constructed with a simulated clock is fully deterministic.
pub trait TimeProvider: Send + Sync {
    /// Get current Unix timestamp in milliseconds.
    fn now_unix_ms(&self) -> i64;
}

/// Production time provider using the system clock.
///
/// Zero-size type that delegates to [`current_time_ms`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    #[inline]
    fn now_unix_ms(&self) -> i64 {
        current_time_ms()
    }
}

/// Simulated time provider for deterministic testing.
///
/// Clones share the same underlying clock, so a test can hold one handle and
/// advance time under a manager holding another.
///
/// # Example
///
/// ```
/// use blockgate::{SimulatedTimeProvider, TimeProvider};
///
/// let time = SimulatedTimeProvider::new(1_000_000);
/// time.advance_ms(500);
/// assert_eq!(time.now_unix_ms(), 1_000_500);
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedTimeProvider {
    current_time_ms: Arc<AtomicI64>,
}

impl SimulatedTimeProvider {
    /// Create a new simulated time provider starting at the given timestamp.
    pub fn new(initial_time_ms: i64) -> Self {
        Self {
            current_time_ms: Arc::new(AtomicI64::new(initial_time_ms)),
        }
    }

    /// Advance time by the given number of milliseconds.
    pub fn advance_ms(&self, delta_ms: i64) {
        self.current_time_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Set the current time to a specific value.
    pub fn set_ms(&self, time_ms: i64) {
        self.current_time_ms.store(time_ms, Ordering::SeqCst);
    }
}

impl TimeProvider for SimulatedTimeProvider {
    #[inline]
    fn now_unix_ms(&self) -> i64 {
        self.current_time_ms.load(Ordering::SeqCst)
    }
}
