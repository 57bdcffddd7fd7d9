//! Command and record plumbing between the screens and the rangefinder link.
//!
//! The serial decoder runs in its own activity and hands decoded records to at
//! most one registered handler per record kind. Screens register themselves
//! on enter and deregister on exit; replies to commands only ever come back
//! through those handlers.

use core::fmt;

use crate::records::{BootInfo, DiagnosticFrame, Identification};

/// Commands the sampler sends to the rangefinder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LrfCommand {
    SendIdentification,
    ReadDiagnostic,
}

impl LrfCommand {
    pub const fn label(self) -> &'static str {
        match self {
            LrfCommand::SendIdentification => "send-identification",
            LrfCommand::ReadDiagnostic => "read-diagnostic",
        }
    }
}

impl fmt::Display for LrfCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub trait IdentificationHandler {
    fn on_identification(&self, ident: &Identification);
}

pub trait DiagnosticHandler {
    fn on_diagnostic(&self, frame: &DiagnosticFrame);
}

pub trait BootInfoHandler {
    fn on_boot_info(&self, info: &BootInfo);
}

/// Link to the rangefinder as seen by the screens.
///
/// Registering `None` deregisters the handler for that record kind; a new
/// registration replaces the previous one.
pub trait LrfLink<'h> {
    /// Queues a command. Fire-and-forget: replies arrive via the handlers.
    fn send_command(&mut self, command: LrfCommand);

    fn set_identification_handler(&mut self, handler: Option<&'h dyn IdentificationHandler>);

    fn set_diagnostic_handler(&mut self, handler: Option<&'h dyn DiagnosticHandler>);

    fn set_boot_info_handler(&mut self, handler: Option<&'h dyn BootInfoHandler>);

    /// Grants or revokes the decoder's larger shared receive buffer.
    fn enable_shared_buffer(&mut self, enabled: bool);

    fn start_serial(&mut self, baud: u32);

    fn stop_serial(&mut self);
}

/// Handler table used by link implementations to dispatch decoded records.
#[derive(Default)]
pub struct RecordRouter<'h> {
    identification: Option<&'h dyn IdentificationHandler>,
    diagnostic: Option<&'h dyn DiagnosticHandler>,
    boot_info: Option<&'h dyn BootInfoHandler>,
}

impl<'h> RecordRouter<'h> {
    pub const fn new() -> Self {
        Self {
            identification: None,
            diagnostic: None,
            boot_info: None,
        }
    }

    pub fn set_identification_handler(&mut self, handler: Option<&'h dyn IdentificationHandler>) {
        self.identification = handler;
    }

    pub fn set_diagnostic_handler(&mut self, handler: Option<&'h dyn DiagnosticHandler>) {
        self.diagnostic = handler;
    }

    pub fn set_boot_info_handler(&mut self, handler: Option<&'h dyn BootInfoHandler>) {
        self.boot_info = handler;
    }

    pub fn has_identification_handler(&self) -> bool {
        self.identification.is_some()
    }

    pub fn has_diagnostic_handler(&self) -> bool {
        self.diagnostic.is_some()
    }

    pub fn has_boot_info_handler(&self) -> bool {
        self.boot_info.is_some()
    }

    /// Hands `ident` to the registered handler. Returns `false` when nobody listens.
    pub fn deliver_identification(&self, ident: &Identification) -> bool {
        match self.identification {
            Some(handler) => {
                handler.on_identification(ident);
                true
            }
            None => false,
        }
    }

    pub fn deliver_diagnostic(&self, frame: &DiagnosticFrame) -> bool {
        match self.diagnostic {
            Some(handler) => {
                handler.on_diagnostic(frame);
                true
            }
            None => false,
        }
    }

    pub fn deliver_boot_info(&self, info: &BootInfo) -> bool {
        match self.boot_info {
            Some(handler) => {
                handler.on_boot_info(info);
                true
            }
            None => false,
        }
    }

    /// Drops every registration.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
