//! Power sequencing for the rangefinder.
//!
//! The rangefinder is powered through a primary control line and, on some
//! builds, an auxiliary supply rail that only reports itself enabled a few
//! milliseconds after the request. [`PowerSequencer`] owns both, stamps every
//! transition with the tick counter, and reports whether the rail acknowledged
//! instead of failing the transition.

use embedded_hal::delay::DelayNs;

use crate::retry::{RetryOutcome, RetryPolicy, retry_with_delay};
use crate::time::TickSource;

/// Number of rail enable attempts before giving up.
pub const RAIL_ENABLE_ATTEMPTS: u8 = 5;
/// Pause between rail enable attempts.
pub const RAIL_ENABLE_INTERVAL_MS: u32 = 10;

/// Primary power-control line.
pub trait PowerLine {
    /// Configures the line as a push-pull output and drives it to `high`.
    fn drive(&mut self, high: bool);

    /// Returns the line to its inert, high-impedance default state.
    fn release(&mut self);
}

/// Auxiliary supply rail enabled alongside the primary line.
pub trait AuxRail {
    /// `false` for builds without a secondary rail.
    const PRESENT: bool = true;

    /// Returns `true` when the rail reports that it is supplying power.
    fn is_enabled(&self) -> bool;

    /// Requests the rail to turn on.
    fn enable(&mut self);

    /// Turns the rail off.
    fn disable(&mut self);
}

/// Rail stand-in for builds that only drive the primary line.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoAuxRail;

impl NoAuxRail {
    pub const fn new() -> Self {
        Self
    }
}

impl AuxRail for NoAuxRail {
    const PRESENT: bool = false;

    fn is_enabled(&self) -> bool {
        false
    }

    fn enable(&mut self) {}

    fn disable(&mut self) {}
}

/// Tunables for [`PowerSequencer`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PowerConfig {
    pub rail_retry: RetryPolicy,
}

impl PowerConfig {
    pub const fn new(rail_retry: RetryPolicy) -> Self {
        Self { rail_retry }
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self::new(RetryPolicy::new(
            RAIL_ENABLE_ATTEMPTS,
            RAIL_ENABLE_INTERVAL_MS,
        ))
    }
}

/// What happened to the auxiliary rail during a transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RailStatus {
    /// The build has no auxiliary rail.
    Absent,
    /// The rail was switched off.
    Disabled,
    /// The rail was enabled; the outcome says whether it acknowledged.
    Enabled(RetryOutcome),
}

/// Record of a single power transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PowerTransition {
    pub on: bool,
    pub timestamp_ms: u32,
    pub rail: RailStatus,
}

impl PowerTransition {
    /// Returns `false` only when an enabled rail never acknowledged.
    #[must_use]
    pub const fn rail_acknowledged(&self) -> bool {
        !matches!(self.rail, RailStatus::Enabled(RetryOutcome::Exhausted { .. }))
    }
}

/// Observable power state owned by the sequencer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PowerState {
    pub on: bool,
    pub last_transition_ms: Option<u32>,
    pub rail_attempts: u8,
}

/// Anything able to switch the rangefinder supply.
pub trait PowerControl {
    fn set_power(&mut self, on: bool) -> PowerTransition;
}

/// Drives the primary line and optional auxiliary rail.
pub struct PowerSequencer<L, R, T, D> {
    line: L,
    rail: R,
    ticks: T,
    delay: D,
    config: PowerConfig,
    state: PowerState,
}

impl<L, R, T, D> PowerSequencer<L, R, T, D>
where
    L: PowerLine,
    R: AuxRail,
    T: TickSource,
    D: DelayNs,
{
    /// Creates a sequencer with the default rail retry policy.
    pub fn new(line: L, rail: R, ticks: T, delay: D) -> Self {
        Self::with_config(line, rail, ticks, delay, PowerConfig::default())
    }

    pub fn with_config(line: L, rail: R, ticks: T, delay: D, config: PowerConfig) -> Self {
        Self {
            line,
            rail,
            ticks,
            delay,
            config,
            state: PowerState::default(),
        }
    }

    /// Returns the last recorded power state.
    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn line(&self) -> &L {
        &self.line
    }

    pub fn rail(&self) -> &R {
        &self.rail
    }

    /// Consumes the sequencer and hands back its collaborators.
    pub fn into_parts(self) -> (L, R, T, D) {
        (self.line, self.rail, self.ticks, self.delay)
    }

    /// Switches the rangefinder on or off and stamps the transition.
    ///
    /// Powering on stamps the first rail attempt (or the line edge when no
    /// rail is present). Powering off stamps after the line is released and
    /// the rail disabled. A rail that never acknowledges does not fail the
    /// transition; it shows up in [`PowerTransition::rail`].
    pub fn set_power(&mut self, on: bool) -> PowerTransition {
        let transition = if on {
            self.power_on()
        } else {
            self.power_off()
        };

        self.state.on = on;
        self.state.last_transition_ms = Some(transition.timestamp_ms);
        transition
    }

    fn power_on(&mut self) -> PowerTransition {
        self.line.drive(true);

        if !R::PRESENT {
            self.state.rail_attempts = 0;
            return PowerTransition {
                on: true,
                timestamp_ms: self.ticks.now_ms(),
                rail: RailStatus::Absent,
            };
        }

        let rail = &mut self.rail;
        let ticks = &self.ticks;
        let mut stamped = None;
        let outcome = retry_with_delay(self.config.rail_retry, &mut self.delay, |attempt| {
            rail.enable();
            if attempt == 0 {
                stamped = Some(ticks.now_ms());
            }
            rail.is_enabled()
        });

        self.state.rail_attempts = outcome.attempts();
        PowerTransition {
            on: true,
            timestamp_ms: stamped.unwrap_or_else(|| self.ticks.now_ms()),
            rail: RailStatus::Enabled(outcome),
        }
    }

    fn power_off(&mut self) -> PowerTransition {
        self.line.drive(false);
        self.line.release();

        let rail = if R::PRESENT {
            self.rail.disable();
            RailStatus::Disabled
        } else {
            RailStatus::Absent
        };

        PowerTransition {
            on: false,
            timestamp_ms: self.ticks.now_ms(),
            rail,
        }
    }
}

impl<L, R, T, D> PowerControl for PowerSequencer<L, R, T, D>
where
    L: PowerLine,
    R: AuxRail,
    T: TickSource,
    D: DelayNs,
{
    fn set_power(&mut self, on: bool) -> PowerTransition {
        PowerSequencer::set_power(self, on)
    }
}
