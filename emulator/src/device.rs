//! Simulated rangefinder.
//!
//! Answers the sampler's commands with already-decoded records, the way the
//! serial decoder would deliver them, and reports a boot record a fixed time
//! after its supply comes up.

use sampler_core::link::LrfCommand;
use sampler_core::records::{BootInfo, DiagnosticFrame, Identification, MAX_DIAGNOSTIC_VALUES};

pub const DEFAULT_BOOT_LATENCY_MS: u32 = 640;
pub const DEFAULT_VALUE_COUNT: u16 = 32;
pub const DEFAULT_CHUNK: u16 = 8;
pub const DEFAULT_MARKER_INDEX: u16 = 1;
pub const DEFAULT_FRAME_INTERVAL_MS: u32 = 120;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceProfile {
    pub serial: &'static str,
    pub firmware: &'static str,
    pub signed_values: bool,
    /// Replies to `SendIdentification`.
    pub identifies: bool,
    /// Emits a boot record after power-on.
    pub announces_boot: bool,
    pub boot_latency_ms: u32,
    pub value_count: u16,
    /// Values added by each streamed frame.
    pub chunk: u16,
    /// Index stored in the first value; the export puts the date line there.
    pub marker_index: u16,
    /// Transfer time between consecutive frames.
    pub frame_interval_ms: u32,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            serial: "LRF0421",
            firmware: "5.2.1",
            signed_values: true,
            identifies: true,
            announces_boot: true,
            boot_latency_ms: DEFAULT_BOOT_LATENCY_MS,
            value_count: DEFAULT_VALUE_COUNT,
            chunk: DEFAULT_CHUNK,
            marker_index: DEFAULT_MARKER_INDEX,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

/// A record the device sends back.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Identification(Identification),
    Diagnostic(DiagnosticFrame),
}

#[derive(Clone, Debug, Default)]
pub struct SimulatedLrf {
    pub profile: DeviceProfile,
}

impl SimulatedLrf {
    pub fn new(profile: DeviceProfile) -> Self {
        Self { profile }
    }

    /// Records the device sends in reply to `command`.
    pub fn respond(&self, command: LrfCommand) -> Vec<Reply> {
        match command {
            LrfCommand::SendIdentification if self.profile.identifies => {
                vec![Reply::Identification(Identification::new(
                    self.profile.serial,
                    self.profile.firmware,
                    self.profile.signed_values,
                ))]
            }
            LrfCommand::SendIdentification => Vec::new(),
            LrfCommand::ReadDiagnostic => self.frames().into_iter().map(Reply::Diagnostic).collect(),
        }
    }

    /// Boot record for a supply that came up at `powered_at_ms`.
    pub fn boot_record(&self, powered_at_ms: u32) -> Option<BootInfo> {
        self.profile.announces_boot.then(|| {
            BootInfo::new(
                self.profile.serial,
                self.profile.firmware,
                powered_at_ms.wrapping_add(self.profile.boot_latency_ms),
            )
        })
    }

    /// The diagnostic log as it is streamed: one cumulative frame per chunk.
    pub fn frames(&self) -> Vec<DiagnosticFrame> {
        let values = self.log_values();
        let total = u16::try_from(values.len()).unwrap_or(u16::MAX);
        if total == 0 {
            return Vec::new();
        }

        let chunk = self.profile.chunk.max(1);
        let mut frames = Vec::new();
        let mut received: u16 = 0;
        while received < total {
            received = received.saturating_add(chunk).min(total);
            frames.push(DiagnosticFrame::from_values(
                &values[..usize::from(received)],
                received,
                total,
            ));
        }
        frames
    }

    fn log_values(&self) -> Vec<u16> {
        let count = usize::from(self.profile.value_count).min(MAX_DIAGNOSTIC_VALUES);
        (0..count)
            .map(|index| {
                if index == 0 {
                    return self.profile.marker_index;
                }
                let step = u16::try_from(index).unwrap_or(u16::MAX);
                // Ramps through zero so signed firmware produces negative readings.
                step.wrapping_mul(97).wrapping_sub(400)
            })
            .collect()
    }
}
