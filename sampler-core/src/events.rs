//! Sampler event catalog shared by firmware and host targets.
//!
//! Core components never log directly. They report noteworthy transitions as
//! [`SamplerEvent`] values through an [`EventSink`], and each target decides
//! how to surface them: `defmt` lines and LED pulses on the device, transcript
//! entries on the emulator.

use core::fmt;

/// Why a diagnostic frame was refused by the acquisition pipeline.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FrameRejection {
    /// The frame declared a total of zero values.
    EmptyTransfer,
    /// `received_count` exceeds `expected_total`.
    Overrun,
    /// The frame carries fewer values than it claims to have received.
    ShortPayload,
    /// `received_count` went backwards within the session.
    Regressed,
    /// `expected_total` changed within the session.
    TotalMismatch,
    /// The session already finished its transfer.
    AfterCompletion,
}

impl fmt::Display for FrameRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FrameRejection::EmptyTransfer => "empty-transfer",
            FrameRejection::Overrun => "overrun",
            FrameRejection::ShortPayload => "short-payload",
            FrameRejection::Regressed => "regressed",
            FrameRejection::TotalMismatch => "total-mismatch",
            FrameRejection::AfterCompletion => "after-completion",
        };
        f.write_str(label)
    }
}

/// Discrete events emitted by the power, boot-test and acquisition components.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SamplerEvent {
    PowerChanged { on: bool, at_ms: u32 },
    RailNotAcknowledged { attempts: u8 },
    BootCycleStarted,
    BootTimeMeasured { boot_time_ms: u32 },
    UnsolicitedBootInfo,
    BootResponseTimeout { waited_ms: u32 },
    AcquisitionStarted,
    IdentificationReceived,
    FrameRejected(FrameRejection),
    MissingIdentification,
    ExportOpenFailed,
    ExportWriteFailed { written: u32, expected: u32 },
    /// Every line was accepted but the file could not be committed on close.
    ExportCloseFailed,
    ExportSaved { bytes: u32 },
}

impl SamplerEvent {
    /// Returns `true` for events that represent a failure the operator should notice.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            SamplerEvent::RailNotAcknowledged { .. }
                | SamplerEvent::BootResponseTimeout { .. }
                | SamplerEvent::FrameRejected(_)
                | SamplerEvent::MissingIdentification
                | SamplerEvent::ExportOpenFailed
                | SamplerEvent::ExportWriteFailed { .. }
                | SamplerEvent::ExportCloseFailed
        )
    }
}

impl fmt::Display for SamplerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerEvent::PowerChanged { on, at_ms } => {
                let level = if *on { "on" } else { "off" };
                write!(f, "power-{level} t={at_ms}ms")
            }
            SamplerEvent::RailNotAcknowledged { attempts } => {
                write!(f, "rail-not-acknowledged attempts={attempts}")
            }
            SamplerEvent::BootCycleStarted => f.write_str("boot-cycle-started"),
            SamplerEvent::BootTimeMeasured { boot_time_ms } => {
                write!(f, "boot-time {boot_time_ms}ms")
            }
            SamplerEvent::UnsolicitedBootInfo => f.write_str("boot-info-unsolicited"),
            SamplerEvent::BootResponseTimeout { waited_ms } => {
                write!(f, "boot-response-timeout waited={waited_ms}ms")
            }
            SamplerEvent::AcquisitionStarted => f.write_str("acquisition-started"),
            SamplerEvent::IdentificationReceived => f.write_str("identification-received"),
            SamplerEvent::FrameRejected(reason) => write!(f, "frame-rejected {reason}"),
            SamplerEvent::MissingIdentification => f.write_str("missing-identification"),
            SamplerEvent::ExportOpenFailed => f.write_str("export-open-failed"),
            SamplerEvent::ExportWriteFailed { written, expected } => {
                write!(f, "export-write-failed wrote={written} expected={expected}")
            }
            SamplerEvent::ExportCloseFailed => f.write_str("export-close-failed"),
            SamplerEvent::ExportSaved { bytes } => write!(f, "export-saved bytes={bytes}"),
        }
    }
}

/// Consumer of [`SamplerEvent`]s.
///
/// Sinks are shared by reference between handlers, so implementations use
/// interior mutability (a channel, a cell, or an atomic counter).
pub trait EventSink {
    fn emit(&self, event: SamplerEvent);
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn emit(&self, event: SamplerEvent) {
        (**self).emit(event);
    }
}

/// Sink that discards every event.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopEventSink;

impl NoopEventSink {
    pub const fn new() -> Self {
        Self
    }
}

impl EventSink for NoopEventSink {
    fn emit(&self, _: SamplerEvent) {}
}
