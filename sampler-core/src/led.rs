//! Timed LED pulses driven by sampler events.
//!
//! [`LedFeedback`] lights the indicator in one of three colors and turns it
//! off again once the minimum flash duration has elapsed. The off-timer is a
//! tick deadline; the owner calls [`LedFeedback::service`] when it wakes.

use crate::events::SamplerEvent;
use crate::time::elapsed_ms;

/// Default minimum flash duration.
pub const DEFAULT_MIN_FLASH_MS: u32 = 250;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LedColor {
    Red,
    Green,
    Blue,
}

impl LedColor {
    /// Maps a raw color code; unknown codes yield `None`.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(LedColor::Red),
            1 => Some(LedColor::Green),
            2 => Some(LedColor::Blue),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        match self {
            LedColor::Red => 0,
            LedColor::Green => 1,
            LedColor::Blue => 2,
        }
    }
}

/// Shared notification output.
pub trait Indicator {
    /// Claims the output for the lifetime of the feedback block.
    fn acquire(&mut self);

    /// Gives the output back.
    fn release(&mut self);

    /// Lights only the given color.
    fn show(&mut self, color: LedColor);

    /// Returns the output to its neutral, unlit state.
    fn clear(&mut self);
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LedConfig {
    pub min_flash_ms: u32,
}

impl LedConfig {
    pub const fn new(min_flash_ms: u32) -> Self {
        Self { min_flash_ms }
    }
}

impl Default for LedConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FLASH_MS)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LedState {
    pub color: Option<LedColor>,
    /// Tick at which the current pulse started; `None` when the timer is idle.
    pub armed_at: Option<u32>,
}

/// Single-shot LED pulse controller.
pub struct LedFeedback<I: Indicator> {
    indicator: I,
    config: LedConfig,
    state: LedState,
}

impl<I: Indicator> LedFeedback<I> {
    pub fn new(mut indicator: I, config: LedConfig) -> Self {
        indicator.acquire();
        Self {
            indicator,
            config,
            state: LedState::default(),
        }
    }

    pub fn state(&self) -> LedState {
        self.state
    }

    pub fn config(&self) -> LedConfig {
        self.config
    }

    /// Lights `color` and (re)arms the off-timer from `now_ms`.
    pub fn activate(&mut self, color: LedColor, now_ms: u32) {
        self.indicator.show(color);
        self.state = LedState {
            color: Some(color),
            armed_at: Some(now_ms),
        };
    }

    /// Like [`Self::activate`] for a raw color code. Unknown codes are ignored.
    pub fn activate_code(&mut self, code: u8, now_ms: u32) -> bool {
        match LedColor::from_code(code) {
            Some(color) => {
                self.activate(color, now_ms);
                true
            }
            None => false,
        }
    }

    /// Pulses the color associated with `event`, if any.
    pub fn on_event(&mut self, event: SamplerEvent, now_ms: u32) {
        if let Some(color) = color_for_event(event) {
            self.activate(color, now_ms);
        }
    }

    /// Milliseconds until the pulse expires, or `None` when nothing is lit.
    pub fn remaining_ms(&self, now_ms: u32) -> Option<u32> {
        self.state.armed_at.map(|armed_at| {
            self.config
                .min_flash_ms
                .saturating_sub(elapsed_ms(now_ms, armed_at))
        })
    }

    /// Turns the indicator off once the pulse has lasted long enough.
    ///
    /// Returns `true` when this call switched the LED off.
    pub fn service(&mut self, now_ms: u32) -> bool {
        match self.remaining_ms(now_ms) {
            Some(0) => {
                self.indicator.clear();
                self.state = LedState::default();
                true
            }
            _ => false,
        }
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Releases the shared output and hands the indicator back.
    pub fn release(mut self) -> I {
        self.indicator.release();
        self.indicator
    }
}

/// Color pulsed for an event: failures red, completed measurements green,
/// power transitions blue.
pub const fn color_for_event(event: SamplerEvent) -> Option<LedColor> {
    if event.is_failure() {
        return Some(LedColor::Red);
    }
    match event {
        SamplerEvent::ExportSaved { .. } | SamplerEvent::BootTimeMeasured { .. } => {
            Some(LedColor::Green)
        }
        SamplerEvent::PowerChanged { .. } => Some(LedColor::Blue),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    enum Op {
        Acquire,
        Release,
        Show(LedColor),
        Clear,
    }

    #[derive(Default)]
    struct MockIndicator {
        ops: Vec<Op, 16>,
    }

    impl Indicator for MockIndicator {
        fn acquire(&mut self) {
            self.ops.push(Op::Acquire).expect("op log overflow");
        }

        fn release(&mut self) {
            self.ops.push(Op::Release).expect("op log overflow");
        }

        fn show(&mut self, color: LedColor) {
            self.ops.push(Op::Show(color)).expect("op log overflow");
        }

        fn clear(&mut self) {
            self.ops.push(Op::Clear).expect("op log overflow");
        }
    }

    #[test]
    fn pulse_turns_off_after_minimum_duration() {
        let mut led = LedFeedback::new(MockIndicator::default(), LedConfig::new(100));
        led.activate(LedColor::Green, 1_000);

        assert!(!led.service(1_099));
        assert_eq!(led.remaining_ms(1_099), Some(1));
        assert!(led.service(1_100));
        assert_eq!(led.state(), LedState::default());
        assert!(!led.service(1_200));

        let indicator = led.release();
        assert_eq!(
            indicator.ops.as_slice(),
            &[Op::Acquire, Op::Show(LedColor::Green), Op::Clear, Op::Release]
        );
    }

    #[test]
    fn reactivation_rearms_timer() {
        let mut led = LedFeedback::new(MockIndicator::default(), LedConfig::new(100));
        led.activate(LedColor::Red, 0);
        led.activate(LedColor::Blue, 80);

        assert!(!led.service(150));
        assert_eq!(led.state().color, Some(LedColor::Blue));
        assert!(led.service(180));
    }

    #[test]
    fn timer_survives_tick_wrap() {
        let mut led = LedFeedback::new(MockIndicator::default(), LedConfig::new(50));
        led.activate(LedColor::Red, u32::MAX - 9);

        assert!(!led.service(20));
        assert!(led.service(40));
    }

    #[test]
    fn unknown_codes_are_ignored() {
        let mut led = LedFeedback::new(MockIndicator::default(), LedConfig::default());
        assert!(!led.activate_code(7, 0));
        assert_eq!(led.state(), LedState::default());
        assert!(led.activate_code(2, 0));
        assert_eq!(led.indicator().ops.last(), Some(&Op::Show(LedColor::Blue)));
    }

    #[test]
    fn events_map_to_colors() {
        assert_eq!(
            color_for_event(SamplerEvent::ExportSaved { bytes: 12 }),
            Some(LedColor::Green)
        );
        assert_eq!(
            color_for_event(SamplerEvent::ExportOpenFailed),
            Some(LedColor::Red)
        );
        assert_eq!(
            color_for_event(SamplerEvent::ExportCloseFailed),
            Some(LedColor::Red)
        );
        assert_eq!(
            color_for_event(SamplerEvent::PowerChanged { on: true, at_ms: 0 }),
            Some(LedColor::Blue)
        );
        assert_eq!(color_for_event(SamplerEvent::AcquisitionStarted), None);
    }
}
