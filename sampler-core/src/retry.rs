//! Bounded retry helper for hardware acknowledgements.
//!
//! Some peripherals only report that a request took effect after a short
//! delay. [`retry_with_delay`] repeats an attempt a fixed number of times with
//! a fixed pause between attempts and tells the caller whether the attempt
//! ever succeeded, leaving the decision to log or escalate with the caller.

use core::fmt;

use embedded_hal::delay::DelayNs;

/// Attempt budget and spacing for [`retry_with_delay`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub delay_ms: u32,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u8, delay_ms: u32) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }
}

/// Result of a bounded retry loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RetryOutcome {
    /// The attempt reported success after `attempts` tries.
    Satisfied { attempts: u8 },
    /// Every attempt failed.
    Exhausted { attempts: u8 },
}

impl RetryOutcome {
    /// Returns `true` when some attempt succeeded.
    #[must_use]
    pub const fn is_satisfied(self) -> bool {
        matches!(self, RetryOutcome::Satisfied { .. })
    }

    /// Number of attempts that were made.
    #[must_use]
    pub const fn attempts(self) -> u8 {
        match self {
            RetryOutcome::Satisfied { attempts } | RetryOutcome::Exhausted { attempts } => attempts,
        }
    }
}

impl fmt::Display for RetryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryOutcome::Satisfied { attempts } => write!(f, "satisfied after {attempts}"),
            RetryOutcome::Exhausted { attempts } => write!(f, "exhausted after {attempts}"),
        }
    }
}

/// Runs `attempt` until it returns `true` or the policy budget is spent.
///
/// The closure receives the zero-based attempt index. The policy delay is
/// inserted between attempts, never before the first one nor after the last.
pub fn retry_with_delay<D, F>(policy: RetryPolicy, delay: &mut D, mut attempt: F) -> RetryOutcome
where
    D: DelayNs,
    F: FnMut(u8) -> bool,
{
    for index in 0..policy.max_attempts {
        if index > 0 {
            delay.delay_ms(policy.delay_ms);
        }
        if attempt(index) {
            return RetryOutcome::Satisfied {
                attempts: index + 1,
            };
        }
    }

    RetryOutcome::Exhausted {
        attempts: policy.max_attempts,
    }
}
