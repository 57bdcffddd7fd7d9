//! Rangefinder supply control.
//!
//! The primary control line is a flex pin: driven push-pull while switching
//! and returned to analog (high impedance) when released. Boards built with
//! the `aux-rail` feature also switch a load switch whose power-good output
//! reports when the secondary rail is up.

use embassy_stm32::gpio::{Flex, Level, Speed};
use sampler_core::power::PowerLine;

#[cfg(feature = "aux-rail")]
use embassy_stm32::gpio::{Input, Output};
#[cfg(feature = "aux-rail")]
use sampler_core::power::AuxRail;

pub struct FlexPowerLine<'d> {
    pin: Flex<'d>,
}

impl<'d> FlexPowerLine<'d> {
    pub fn new(pin: Flex<'d>) -> Self {
        Self { pin }
    }
}

impl PowerLine for FlexPowerLine<'_> {
    fn drive(&mut self, high: bool) {
        self.pin.set_level(Level::from(high));
        self.pin.set_as_output(Speed::Low);
    }

    fn release(&mut self) {
        self.pin.set_as_analog();
    }
}

#[cfg(feature = "aux-rail")]
pub struct LoadSwitchRail<'d> {
    enable: Output<'d>,
    power_good: Input<'d>,
}

#[cfg(feature = "aux-rail")]
impl<'d> LoadSwitchRail<'d> {
    pub fn new(enable: Output<'d>, power_good: Input<'d>) -> Self {
        Self { enable, power_good }
    }
}

#[cfg(feature = "aux-rail")]
impl AuxRail for LoadSwitchRail<'_> {
    fn is_enabled(&self) -> bool {
        self.power_good.is_high()
    }

    fn enable(&mut self) {
        self.enable.set_high();
    }

    fn disable(&mut self) {
        self.enable.set_low();
    }
}

#[cfg(feature = "aux-rail")]
pub type Rail = LoadSwitchRail<'static>;

#[cfg(not(feature = "aux-rail"))]
pub type Rail = sampler_core::power::NoAuxRail;
