#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Boot-string decoder.
//!
//! After power-on the rangefinder prints a single line, `<id> <firmware>`,
//! before it accepts commands. The decoder stamps the line with the tick of
//! its first byte, which is what the boot-latency test measures against.

use heapless::String;
use sampler_core::records::BootInfo;

pub const BOOT_LINE_CAPACITY: usize = 48;

#[derive(Default)]
pub struct BootLineDecoder {
    line: String<BOOT_LINE_CAPACITY>,
    first_byte_at: Option<u32>,
}

impl BootLineDecoder {
    pub const fn new() -> Self {
        Self {
            line: String::new(),
            first_byte_at: None,
        }
    }

    /// Forgets any partial line.
    pub fn reset(&mut self) {
        self.line.clear();
        self.first_byte_at = None;
    }

    /// Feeds one received byte. Returns the boot record once a line completes.
    pub fn push(&mut self, byte: u8, now_ms: u32) -> Option<BootInfo> {
        match byte {
            b'\n' => self.finish(),
            b'\r' => None,
            byte if byte.is_ascii_graphic() || byte == b' ' => {
                self.first_byte_at.get_or_insert(now_ms);
                // Over-long lines keep their head; the tail is dropped.
                let _ = self.line.push(char::from(byte));
                None
            }
            _ => {
                self.first_byte_at.get_or_insert(now_ms);
                None
            }
        }
    }

    fn finish(&mut self) -> Option<BootInfo> {
        let stamp = self.first_byte_at.take();
        let info = {
            let mut fields = self.line.split_whitespace();
            match (fields.next(), stamp) {
                (Some(id), Some(received_at_ms)) => {
                    Some(BootInfo::new(id, fields.next().unwrap_or(""), received_at_ms))
                }
                _ => None,
            }
        };
        self.line.clear();
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(decoder: &mut BootLineDecoder, bytes: &[u8], start_ms: u32) -> Option<BootInfo> {
        let mut result = None;
        for (offset, byte) in (0_u32..).zip(bytes) {
            if let Some(info) = decoder.push(*byte, start_ms + offset) {
                result = Some(info);
            }
        }
        result
    }

    #[test]
    fn stamps_line_with_first_byte() {
        let mut decoder = BootLineDecoder::new();
        let info = feed(&mut decoder, b"NLRF-24 4.2.1\r\n", 1_250).expect("boot line");

        assert_eq!(info.id.as_str(), "NLRF-24");
        assert_eq!(info.firmware.as_str(), "4.2.1");
        assert_eq!(info.received_at_ms, 1_250);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let mut decoder = BootLineDecoder::new();
        assert_eq!(feed(&mut decoder, b"\r\n\r\n", 0), None);

        let info = feed(&mut decoder, b"LRF\n", 40).expect("boot line");
        assert_eq!(info.firmware.as_str(), "");
        assert_eq!(info.received_at_ms, 40);
    }

    #[test]
    fn reset_drops_partial_line() {
        let mut decoder = BootLineDecoder::new();
        assert_eq!(feed(&mut decoder, b"garb", 0), None);
        decoder.reset();

        let info = feed(&mut decoder, b"LRF 1.0\n", 500).expect("boot line");
        assert_eq!(info.id.as_str(), "LRF");
        assert_eq!(info.received_at_ms, 500);
    }
}
