use std::collections::VecDeque;

use sampler_core::link::{
    BootInfoHandler, DiagnosticHandler, IdentificationHandler, LrfCommand, LrfLink, RecordRouter,
};

/// Bench side of the rangefinder link.
///
/// Commands queue up until the session hands them to the simulated device;
/// records coming back go through [`HostLink::router`].
#[derive(Default)]
pub struct HostLink<'h> {
    pub router: RecordRouter<'h>,
    pending: VecDeque<LrfCommand>,
    baud: Option<u32>,
    shared_buffer: bool,
}

impl HostLink<'_> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_command(&mut self) -> Option<LrfCommand> {
        self.pending.pop_front()
    }

    /// Baud rate of the open serial port, if any.
    pub fn serial_baud(&self) -> Option<u32> {
        self.baud
    }

    pub fn shared_buffer_enabled(&self) -> bool {
        self.shared_buffer
    }
}

impl<'h> LrfLink<'h> for HostLink<'h> {
    fn send_command(&mut self, command: LrfCommand) {
        self.pending.push_back(command);
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
        self.baud = Some(baud);
    }

    fn stop_serial(&mut self) {
        self.baud = None;
    }
}
