//! Boot-latency test.
//!
//! Entering the screen (or pressing OK) power-cycles the rangefinder: the
//! supply is switched off, the tester blocks for the settle period, stamps the
//! power-on tick, arms the boot-signal wait and switches the supply back on.
//! The first boot-info record that arrives while armed yields the latency.

use embedded_hal::delay::DelayNs;

use crate::events::{EventSink, SamplerEvent};
use crate::link::{BootInfoHandler, LrfLink};
use crate::model::{ModelCell, StatusLines};
use crate::power::{PowerControl, PowerTransition, RailStatus};
use crate::records::BootInfo;
use crate::retry::RetryOutcome;
use crate::time::{TickSource, elapsed_ms};

/// Boot times at or above this value are not shown as a latency figure.
pub const MAX_DISPLAYED_BOOT_TIME_MS: u32 = 10_000;
pub const DEFAULT_SETTLE_MS: u32 = 1_000;
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BootTestConfig {
    /// Blocking wait between power-off and power-on.
    pub settle_ms: u32,
    /// Calibration subtracted from every measurement.
    pub boot_time_correction_ms: u32,
    pub baud_rate: u32,
    /// Give up waiting for the boot signal after this long. `None` waits forever.
    pub response_timeout_ms: Option<u32>,
}

impl BootTestConfig {
    pub const fn new(
        settle_ms: u32,
        boot_time_correction_ms: u32,
        baud_rate: u32,
        response_timeout_ms: Option<u32>,
    ) -> Self {
        Self {
            settle_ms,
            boot_time_correction_ms,
            baud_rate,
            response_timeout_ms,
        }
    }
}

impl Default for BootTestConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_MS, 0, DEFAULT_BAUD_RATE, None)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BootTestState {
    #[default]
    Idle,
    PoweringOff,
    Settling,
    AwaitingBootSignal,
    SignalReceived,
    TimedOut,
}

impl BootTestState {
    pub const fn label(self) -> &'static str {
        match self {
            BootTestState::Idle => "idle",
            BootTestState::PoweringOff => "powering-off",
            BootTestState::Settling => "settling",
            BootTestState::AwaitingBootSignal => "awaiting-boot-signal",
            BootTestState::SignalReceived => "signal-received",
            BootTestState::TimedOut => "timed-out",
        }
    }
}

/// State shown by the boot-time screen.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BootTimeModel {
    pub state: BootTestState,
    pub boot_info: Option<BootInfo>,
    pub boot_time_ms: u32,
    pub await_boot_info: bool,
    pub power_on_tstamp: u32,
    pub status: StatusLines,
}

impl BootTimeModel {
    pub fn has_boot_info(&self) -> bool {
        self.boot_info.is_some()
    }

    /// The measured latency if it is worth rendering.
    pub fn displayed_boot_time(&self) -> Option<u32> {
        (self.boot_time_ms > 0 && self.boot_time_ms < MAX_DISPLAYED_BOOT_TIME_MS)
            .then_some(self.boot_time_ms)
    }

    fn invalidate(&mut self) {
        self.boot_info = None;
        self.boot_time_ms = 0;
        self.status.clear();
    }
}

/// Drives the boot-time screen against a model cell.
pub struct BootTimeTester<C, T, E> {
    cell: C,
    ticks: T,
    events: E,
    config: BootTestConfig,
}

impl<C, T, E> BootTimeTester<C, T, E>
where
    C: ModelCell<BootTimeModel>,
    T: TickSource,
    E: EventSink,
{
    pub fn new(cell: C, ticks: T, events: E, config: BootTestConfig) -> Self {
        Self {
            cell,
            ticks,
            events,
            config,
        }
    }

    pub fn cell(&self) -> &C {
        &self.cell
    }

    pub fn config(&self) -> BootTestConfig {
        self.config
    }

    /// Screen enter: opens the serial link, registers for boot info and
    /// runs a power cycle.
    pub fn enter<'h, L, P, D>(&'h self, link: &mut L, power: &mut P, delay: &mut D)
    where
        L: LrfLink<'h>,
        P: PowerControl,
        D: DelayNs,
    {
        self.cell.with(|model| model.await_boot_info = false);
        link.start_serial(self.config.baud_rate);
        let handler: &'h dyn BootInfoHandler = self;
        link.set_boot_info_handler(Some(handler));
        self.power_cycle(power, delay);
    }

    /// OK button: measure again.
    pub fn retrigger<P, D>(&self, power: &mut P, delay: &mut D)
    where
        P: PowerControl,
        D: DelayNs,
    {
        self.power_cycle(power, delay);
    }

    /// Screen exit: stops listening for boot info and closes the serial link.
    pub fn exit<'h, L>(&'h self, link: &mut L)
    where
        L: LrfLink<'h>,
    {
        link.set_boot_info_handler(None);
        link.stop_serial();
        self.cell.with(|model| {
            model.await_boot_info = false;
            model.state = BootTestState::Idle;
        });
    }

    /// Expires the boot-signal wait when a response timeout is configured.
    ///
    /// Returns `true` when this call timed the cycle out.
    pub fn poll(&self, now_ms: u32) -> bool {
        let Some(timeout_ms) = self.config.response_timeout_ms else {
            return false;
        };

        let waited = self.cell.with(|model| {
            if !model.await_boot_info || model.state != BootTestState::AwaitingBootSignal {
                return None;
            }
            let waited = elapsed_ms(now_ms, model.power_on_tstamp);
            if waited < timeout_ms {
                return None;
            }
            model.await_boot_info = false;
            model.state = BootTestState::TimedOut;
            model
                .status
                .set_pair("No response", format_args!("after {waited} ms"));
            Some(waited)
        });

        match waited {
            Some(waited_ms) => {
                self.cell.request_redraw();
                self.events
                    .emit(SamplerEvent::BootResponseTimeout { waited_ms });
                true
            }
            None => false,
        }
    }

    fn power_cycle<P, D>(&self, power: &mut P, delay: &mut D)
    where
        P: PowerControl,
        D: DelayNs,
    {
        self.cell.update(|model| {
            model.invalidate();
            model.await_boot_info = false;
            model.state = BootTestState::PoweringOff;
        });
        self.events.emit(SamplerEvent::BootCycleStarted);

        let off = power.set_power(false);
        self.report(off);

        self.cell.update(|model| model.state = BootTestState::Settling);
        delay.delay_ms(self.config.settle_ms);

        let power_on_tstamp = self.ticks.now_ms();
        self.cell.update(|model| {
            model.power_on_tstamp = power_on_tstamp;
            model.await_boot_info = true;
            model.state = BootTestState::AwaitingBootSignal;
        });

        let on = power.set_power(true);
        self.report(on);
    }

    fn report(&self, transition: PowerTransition) {
        self.events.emit(SamplerEvent::PowerChanged {
            on: transition.on,
            at_ms: transition.timestamp_ms,
        });
        if let RailStatus::Enabled(RetryOutcome::Exhausted { attempts }) = transition.rail {
            self.events
                .emit(SamplerEvent::RailNotAcknowledged { attempts });
        }
    }
}

impl<C, T, E> BootInfoHandler for BootTimeTester<C, T, E>
where
    C: ModelCell<BootTimeModel>,
    T: TickSource,
    E: EventSink,
{
    fn on_boot_info(&self, info: &BootInfo) {
        let correction = self.config.boot_time_correction_ms;
        let measured = self.cell.update(|model| {
            model.boot_info = Some(info.clone());
            if model.await_boot_info {
                model.boot_time_ms = elapsed_ms(info.received_at_ms, model.power_on_tstamp)
                    .saturating_sub(correction);
                model.await_boot_info = false;
                model.state = BootTestState::SignalReceived;
                Some(model.boot_time_ms)
            } else {
                model.boot_time_ms = 0;
                None
            }
        });

        let event = match measured {
            Some(boot_time_ms) => SamplerEvent::BootTimeMeasured { boot_time_ms },
            None => SamplerEvent::UnsolicitedBootInfo,
        };
        self.events.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displayed_boot_time_excludes_bounds() {
        let mut model = BootTimeModel::default();
        assert_eq!(model.displayed_boot_time(), None);

        model.boot_time_ms = 1;
        assert_eq!(model.displayed_boot_time(), Some(1));

        model.boot_time_ms = 9_999;
        assert_eq!(model.displayed_boot_time(), Some(9_999));

        model.boot_time_ms = MAX_DISPLAYED_BOOT_TIME_MS;
        assert_eq!(model.displayed_boot_time(), None);
    }

    #[test]
    fn default_config_matches_bench_setup() {
        let config = BootTestConfig::default();
        assert_eq!(config.settle_ms, 1_000);
        assert_eq!(config.boot_time_correction_ms, 0);
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.response_timeout_ms, None);
    }
}
