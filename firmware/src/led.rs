#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Event queue and RGB indicator for the firmware target.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use sampler_core::events::{EventSink, SamplerEvent};

#[cfg(target_os = "none")]
use embassy_stm32::gpio::Output;
#[cfg(target_os = "none")]
use sampler_core::led::{Indicator, LedColor};

use crate::status;

pub const EVENT_QUEUE_DEPTH: usize = 8;

pub type EventQueue<M> = Channel<M, SamplerEvent, EVENT_QUEUE_DEPTH>;

/// Forwards events to the LED task. Events are dropped (and counted) when
/// the queue is full so handlers never block.
pub struct ChannelEventSink<'q, M: RawMutex> {
    queue: &'q EventQueue<M>,
}

impl<'q, M: RawMutex> ChannelEventSink<'q, M> {
    pub const fn new(queue: &'q EventQueue<M>) -> Self {
        Self { queue }
    }
}

impl<M: RawMutex> EventSink for ChannelEventSink<'_, M> {
    fn emit(&self, event: SamplerEvent) {
        if self.queue.try_send(event).is_err() {
            status::record_dropped_event();
        }
    }
}

/// Nucleo RGB user LEDs, active high.
#[cfg(target_os = "none")]
pub struct PinIndicator<'d> {
    red: Output<'d>,
    green: Output<'d>,
    blue: Output<'d>,
}

#[cfg(target_os = "none")]
impl<'d> PinIndicator<'d> {
    pub fn new(red: Output<'d>, green: Output<'d>, blue: Output<'d>) -> Self {
        Self { red, green, blue }
    }

    fn all_off(&mut self) {
        self.red.set_low();
        self.green.set_low();
        self.blue.set_low();
    }
}

#[cfg(target_os = "none")]
impl Indicator for PinIndicator<'_> {
    fn acquire(&mut self) {
        self.all_off();
    }

    fn release(&mut self) {
        self.all_off();
    }

    fn show(&mut self, color: LedColor) {
        self.all_off();
        match color {
            LedColor::Red => self.red.set_high(),
            LedColor::Green => self.green.set_high(),
            LedColor::Blue => self.blue.set_high(),
        }
    }

    fn clear(&mut self) {
        self.all_off();
    }
}
