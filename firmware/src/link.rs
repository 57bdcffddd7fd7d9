#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Firmware side of the rangefinder link.
//!
//! The UART task decodes records and queues them; the screen task drains the
//! queue and hands each record to whichever handler is registered through
//! [`FirmwareLink`]. Serial start/stop requests travel back to the UART task
//! over a signal.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use sampler_core::link::{
    BootInfoHandler, DiagnosticHandler, IdentificationHandler, LrfCommand, LrfLink, RecordRouter,
};
use sampler_core::records::{BootInfo, Identification};

use crate::status;

pub const RECORD_QUEUE_DEPTH: usize = 4;

/// Records the firmware decoder produces.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LinkRecord {
    Identification(Identification),
    BootInfo(BootInfo),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SerialControl {
    Start { baud: u32 },
    Stop,
}

pub type RecordQueue<M> = Channel<M, LinkRecord, RECORD_QUEUE_DEPTH>;
pub type SerialControlSignal<M> = Signal<M, SerialControl>;

pub struct FirmwareLink<'h, M: RawMutex> {
    router: RecordRouter<'h>,
    serial: &'h SerialControlSignal<M>,
    shared_buffer: bool,
}

impl<'h, M: RawMutex> FirmwareLink<'h, M> {
    pub fn new(serial: &'h SerialControlSignal<M>) -> Self {
        Self {
            router: RecordRouter::new(),
            serial,
            shared_buffer: false,
        }
    }

    /// Delivers a decoded record. Returns `false` if no handler was registered.
    pub fn dispatch(&self, record: &LinkRecord) -> bool {
        let delivered = match record {
            LinkRecord::Identification(ident) => self.router.deliver_identification(ident),
            LinkRecord::BootInfo(info) => self.router.deliver_boot_info(info),
        };
        if !delivered {
            status::record_unhandled_record();
        }
        delivered
    }

    pub fn shared_buffer_enabled(&self) -> bool {
        self.shared_buffer
    }
}

impl<'h, M: RawMutex> LrfLink<'h> for FirmwareLink<'h, M> {
    fn send_command(&mut self, command: LrfCommand) {
        // No command encoder is fitted on this board; replies never arrive.
        status::record_dropped_command();
        log_command_dropped(command);
    }

    fn set_identification_handler(&mut self, handler: Option<&'h dyn IdentificationHandler>) {
        self.router.set_identification_handler(handler);
    }

    fn set_diagnostic_handler(&mut self, handler: Option<&'h dyn DiagnosticHandler>) {
        self.router.set_diagnostic_handler(handler);
    }

    fn set_boot_info_handler(&mut self, handler: Option<&'h dyn BootInfoHandler>) {
        self.router.set_boot_info_handler(handler);
    }

    fn enable_shared_buffer(&mut self, enabled: bool) {
        self.shared_buffer = enabled;
    }

    fn start_serial(&mut self, baud: u32) {
        self.serial.signal(SerialControl::Start { baud });
    }

    fn stop_serial(&mut self) {
        self.serial.signal(SerialControl::Stop);
    }
}

#[cfg(target_os = "none")]
fn log_command_dropped(command: LrfCommand) {
    defmt::warn!("link: {} not sent (no command encoder)", command.label());
}

#[cfg(not(target_os = "none"))]
fn log_command_dropped(command: LrfCommand) {
    println!("link: {command} not sent (no command encoder)");
}
