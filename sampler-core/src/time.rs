//! Millisecond tick arithmetic and wall-clock access.
//!
//! The sampler measures latencies and throttles redraws against a free-running
//! 32-bit millisecond counter. The counter wraps roughly every 49.7 days, so
//! every comparison goes through [`elapsed_ms`] instead of a plain subtraction.

use chrono::NaiveDateTime;

/// Milliseconds elapsed from `reference` to `now` on a 32-bit tick counter.
///
/// When `now` is smaller than `reference` the counter wrapped exactly once
/// between the two samples. Callers must sample at least once per wrap period;
/// a double wrap is indistinguishable from a short interval.
#[must_use]
pub const fn elapsed_ms(now: u32, reference: u32) -> u32 {
    if now >= reference {
        now - reference
    } else {
        (u32::MAX - reference) + 1 + now
    }
}

/// Source of the free-running millisecond tick counter.
pub trait TickSource {
    /// Returns the current tick count.
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `reference`, wrap-safe.
    fn elapsed_since(&self, reference: u32) -> u32 {
        elapsed_ms(self.now_ms(), reference)
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Real-time clock used to stamp exported files.
pub trait Calendar {
    /// Returns the current local date and time.
    fn now(&self) -> NaiveDateTime;
}

impl<C: Calendar + ?Sized> Calendar for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}
