//! Decoded rangefinder records delivered by the serial decoder.

use heapless::{String, Vec};

/// Largest diagnostic transfer the sampler buffers.
pub const MAX_DIAGNOSTIC_VALUES: usize = 4096;
/// Capacity of the device serial number.
pub const SERIAL_CAPACITY: usize = 16;
/// Capacity of firmware and boot identifier strings.
pub const FIRMWARE_CAPACITY: usize = 24;

pub type SerialNumber = String<SERIAL_CAPACITY>;
pub type FirmwareVersion = String<FIRMWARE_CAPACITY>;

/// Device identification reported in reply to `SendIdentification`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Identification {
    pub serial: SerialNumber,
    pub firmware: FirmwareVersion,
    /// Newer firmware streams diagnostic values as signed 16-bit integers.
    pub signed_values: bool,
}

impl Identification {
    /// Builds an identification record, truncating over-long strings.
    pub fn new(serial: &str, firmware: &str, signed_values: bool) -> Self {
        Self {
            serial: bounded(serial),
            firmware: bounded(firmware),
            signed_values,
        }
    }
}

/// Cumulative state of a streamed diagnostic transfer.
///
/// Each delivery carries every value received so far, so the latest frame
/// replaces the previous one wholesale.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiagnosticFrame {
    pub values: Vec<u16, MAX_DIAGNOSTIC_VALUES>,
    pub received_count: u16,
    pub expected_total: u16,
}

impl DiagnosticFrame {
    pub const fn new() -> Self {
        Self {
            values: Vec::new(),
            received_count: 0,
            expected_total: 0,
        }
    }

    /// Builds a frame from raw values; extra values beyond capacity are dropped.
    pub fn from_values(values: &[u16], received_count: u16, expected_total: u16) -> Self {
        let mut frame = Self::new();
        for value in values {
            if frame.values.push(*value).is_err() {
                break;
            }
        }
        frame.received_count = received_count;
        frame.expected_total = expected_total;
        frame
    }

    /// Returns `true` once every declared value has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.expected_total > 0 && self.received_count == self.expected_total
    }

    /// Values that have been received, bounded by `received_count`.
    pub fn received(&self) -> &[u16] {
        let end = usize::from(self.received_count).min(self.values.len());
        &self.values[..end]
    }

    /// Value at the self-describing header index, which marks where the
    /// date/time line goes in the export.
    pub fn marker_index(&self) -> Option<usize> {
        self.values.first().map(|value| usize::from(*value))
    }
}

/// First record the rangefinder emits after power-on.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BootInfo {
    pub id: FirmwareVersion,
    pub firmware: FirmwareVersion,
    /// Tick count at which the decoder first observed the record.
    pub received_at_ms: u32,
}

impl BootInfo {
    pub fn new(id: &str, firmware: &str, received_at_ms: u32) -> Self {
        Self {
            id: bounded(id),
            firmware: bounded(firmware),
            received_at_ms,
        }
    }
}

/// Copies `text` into a bounded string, cutting at a character boundary.
pub fn bounded<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
