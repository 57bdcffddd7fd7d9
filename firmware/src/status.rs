#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Lightweight atomics track the rangefinder supply, the last measured boot
//! time, and link health counters so the render task can log a
//! [`StatusSnapshot`] without locking any screen model.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};
use sampler_core::events::SamplerEvent;

static POWER_ON: AtomicBool = AtomicBool::new(false);
static LAST_POWER_TRANSITION: LatestValue = LatestValue::new();
static LAST_BOOT_TIME: LatestValue = LatestValue::new();
static RAIL_FAILURES: AtomicU32 = AtomicU32::new(0);
static DROPPED_EVENTS: AtomicU32 = AtomicU32::new(0);
static DROPPED_COMMANDS: AtomicU32 = AtomicU32::new(0);
static UNHANDLED_RECORDS: AtomicU32 = AtomicU32::new(0);

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub power_on: bool,
    pub last_power_transition_ms: Option<u32>,
    pub last_boot_time_ms: Option<u32>,
    pub rail_failures: u32,
    pub dropped_events: u32,
    pub dropped_commands: u32,
    pub unhandled_records: u32,
}

/// Most recent value of a measurement that may not have happened yet.
///
/// The full `u32` range is valid, so presence lives in its own flag. It is
/// set after the value and read before it.
struct LatestValue {
    value: AtomicU32,
    present: AtomicBool,
}

impl LatestValue {
    const fn new() -> Self {
        Self {
            value: AtomicU32::new(0),
            present: AtomicBool::new(false),
        }
    }

    fn store(&self, value: u32) {
        self.value.store(value, Ordering::Relaxed);
        self.present.store(true, Ordering::Release);
    }

    fn load(&self) -> Option<u32> {
        self.present
            .load(Ordering::Acquire)
            .then(|| self.value.load(Ordering::Relaxed))
    }
}

/// Folds an event into the status counters.
pub fn record_event(event: SamplerEvent) {
    match event {
        SamplerEvent::PowerChanged { on, at_ms } => {
            POWER_ON.store(on, Ordering::Relaxed);
            LAST_POWER_TRANSITION.store(at_ms);
        }
        SamplerEvent::BootTimeMeasured { boot_time_ms } => {
            LAST_BOOT_TIME.store(boot_time_ms);
        }
        SamplerEvent::RailNotAcknowledged { .. } => {
            RAIL_FAILURES.fetch_add(1, Ordering::Relaxed);
        }
        _ => {}
    }
}

pub fn record_dropped_event() {
    DROPPED_EVENTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_dropped_command() {
    DROPPED_COMMANDS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_unhandled_record() {
    UNHANDLED_RECORDS.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> StatusSnapshot {
    StatusSnapshot {
        power_on: POWER_ON.load(Ordering::Relaxed),
        last_power_transition_ms: LAST_POWER_TRANSITION.load(),
        last_boot_time_ms: LAST_BOOT_TIME.load(),
        rail_failures: RAIL_FAILURES.load(Ordering::Relaxed),
        dropped_events: DROPPED_EVENTS.load(Ordering::Relaxed),
        dropped_commands: DROPPED_COMMANDS.load(Ordering::Relaxed),
        unhandled_records: UNHANDLED_RECORDS.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_value_keeps_the_whole_range() {
        let latest = LatestValue::new();
        assert_eq!(latest.load(), None);

        latest.store(0);
        assert_eq!(latest.load(), Some(0));

        latest.store(u32::MAX);
        assert_eq!(latest.load(), Some(u32::MAX));
    }

    #[test]
    fn boot_time_at_tick_limit_is_reported() {
        record_event(SamplerEvent::BootTimeMeasured {
            boot_time_ms: u32::MAX,
        });
        assert_eq!(snapshot().last_boot_time_ms, Some(u32::MAX));
    }

    #[test]
    fn power_events_update_snapshot() {
        record_event(SamplerEvent::PowerChanged { on: true, at_ms: 0 });
        let status = snapshot();
        assert!(status.power_on);
        assert_eq!(status.last_power_transition_ms, Some(0));

        record_event(SamplerEvent::PowerChanged {
            on: false,
            at_ms: 1_000,
        });
        let status = snapshot();
        assert!(!status.power_on);
        assert_eq!(status.last_power_transition_ms, Some(1_000));
    }
}
