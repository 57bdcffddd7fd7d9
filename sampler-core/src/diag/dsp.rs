//! `.dsp` export format.
//!
//! A value line is an optional minus sign followed by a five-digit,
//! zero-padded magnitude. A marker line is the export date and time as
//! `DD/MM/YYYY HH:MM:SS`. Every line after the first is preceded by CRLF and
//! the file has no trailing terminator.

use core::fmt::{self, Write as _};

use chrono::{Datelike, NaiveDateTime, Timelike};
use heapless::String;

use crate::storage::StorageError;

pub const FILE_EXTENSION: &str = ".dsp";
pub const LINE_SEPARATOR: &str = "\r\n";
pub const LINE_CAPACITY: usize = 24;
pub const PREFIX_CAPACITY: usize = 24;
pub const SUFFIX_CAPACITY: usize = 24;
pub const PATH_CAPACITY: usize = 128;

pub type Line = String<LINE_CAPACITY>;

/// Interprets a raw diagnostic word.
pub fn decode_value(raw: u16, signed: bool) -> i32 {
    if signed {
        i32::from(i16::from_ne_bytes(raw.to_ne_bytes()))
    } else {
        i32::from(raw)
    }
}

/// Formats a value line into `out`, replacing its contents.
///
/// # Errors
///
/// Fails only if `out` cannot hold the line.
pub fn write_value_line(out: &mut Line, raw: u16, signed: bool, first: bool) -> fmt::Result {
    out.clear();
    let value = decode_value(raw, signed);
    let sign = if value < 0 { "-" } else { "" };
    write!(
        out,
        "{}{sign}{:05}",
        separator(first),
        value.unsigned_abs()
    )
}

/// Formats a date/time marker line into `out`, replacing its contents.
///
/// # Errors
///
/// Fails only if `out` cannot hold the line.
pub fn write_marker_line(out: &mut Line, stamp: &NaiveDateTime, first: bool) -> fmt::Result {
    out.clear();
    write!(
        out,
        "{}{:02}/{:02}/{:04} {:02}:{:02}:{:02}",
        separator(first),
        stamp.day(),
        stamp.month(),
        stamp.year(),
        stamp.hour(),
        stamp.minute(),
        stamp.second()
    )
}

const fn separator(first: bool) -> &'static str {
    if first { "" } else { LINE_SEPARATOR }
}

/// File name and path of a diagnostic export.
///
/// The name is split as `<serial>-` and `<YYYY.MM.DD-HH.MM.SS>.dsp`; status
/// messages refer to the prefix and show the suffix on their own line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExportName {
    prefix: String<PREFIX_CAPACITY>,
    suffix: String<SUFFIX_CAPACITY>,
    path: String<PATH_CAPACITY>,
}

impl ExportName {
    /// Builds the export name for `serial` stamped at `stamp` under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTooLong`] when any part overflows its buffer.
    pub fn new(data_dir: &str, serial: &str, stamp: &NaiveDateTime) -> Result<Self, StorageError> {
        let mut prefix = String::new();
        write!(prefix, "{serial}-").map_err(|_| StorageError::PathTooLong)?;

        let mut suffix = String::new();
        write!(
            suffix,
            "{:04}.{:02}.{:02}-{:02}.{:02}.{:02}{FILE_EXTENSION}",
            stamp.year(),
            stamp.month(),
            stamp.day(),
            stamp.hour(),
            stamp.minute(),
            stamp.second()
        )
        .map_err(|_| StorageError::PathTooLong)?;

        let mut path = String::new();
        let dir = data_dir.trim_end_matches('/');
        write!(path, "{dir}/{prefix}{suffix}").map_err(|_| StorageError::PathTooLong)?;

        Ok(Self {
            prefix,
            suffix,
            path,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
