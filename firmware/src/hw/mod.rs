//! Board adapters for the STM32WB55 Nucleo.

#![cfg(target_os = "none")]

pub mod power;

use embassy_time::Instant;
use sampler_core::time::TickSource;

/// Millisecond tick counter backed by the embassy time driver.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmbassyTicks;

impl TickSource for EmbassyTicks {
    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> u32 {
        // The core works on a wrapping 32-bit counter.
        (Instant::now().as_millis() & u64::from(u32::MAX)) as u32
    }
}
