//! Host stand-ins for the sampler's hardware collaborators.

use std::cell::{Cell, RefCell};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{Local, NaiveDateTime};
use embedded_hal::delay::DelayNs;
use sampler_core::events::{EventSink, SamplerEvent};
use sampler_core::led::{Indicator, LedColor};
use sampler_core::power::{AuxRail, PowerLine};
use sampler_core::storage::{DspFile, Storage, StorageError};
use sampler_core::time::{Calendar, TickSource};

/// Virtual millisecond counter shared by every bench component.
///
/// Blocking delays advance the counter instead of sleeping, so a power cycle
/// with a one second settle period completes instantly.
#[derive(Clone, Debug, Default)]
pub struct SimClock {
    now: Rc<Cell<u32>>,
}

impl SimClock {
    pub fn starting_at(ms: u32) -> Self {
        let clock = Self::default();
        clock.set(ms);
        clock
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl TickSource for SimClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

impl DelayNs for SimClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}

/// Wall clock used to stamp export files.
#[derive(Copy, Clone, Debug)]
pub enum HostCalendar {
    Local,
    Fixed(NaiveDateTime),
}

impl Calendar for HostCalendar {
    fn now(&self) -> NaiveDateTime {
        match self {
            HostCalendar::Local => Local::now().naive_local(),
            HostCalendar::Fixed(stamp) => *stamp,
        }
    }
}

/// Event sink that buffers events until the session drains them.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    pending: Rc<RefCell<Vec<SamplerEvent>>>,
}

impl EventLog {
    pub fn drain(&self) -> Vec<SamplerEvent> {
        self.pending.borrow_mut().drain(..).collect()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: SamplerEvent) {
        self.pending.borrow_mut().push(event);
    }
}

/// Storage rooted in a host directory.
///
/// Device paths such as `/data/x.dsp` resolve below `root`. An optional quota
/// caps the bytes accepted across all files, which stands in for a full card.
#[derive(Clone, Debug)]
pub struct HostStorage {
    root: PathBuf,
    quota: Rc<Cell<Option<u64>>>,
}

impl HostStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            quota: Rc::new(Cell::new(None)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a device path onto the host filesystem.
    pub fn resolve(&self, device_path: &str) -> PathBuf {
        self.root.join(device_path.trim_start_matches('/'))
    }

    /// Creates `device_dir` below the root, as mounting a formatted card would.
    pub fn ensure_dir(&self, device_dir: &str) -> io::Result<()> {
        fs::create_dir_all(self.resolve(device_dir))
    }

    pub fn set_quota(&self, bytes: Option<u64>) {
        self.quota.set(bytes);
    }

    pub fn quota(&self) -> Option<u64> {
        self.quota.get()
    }
}

impl Storage for HostStorage {
    type File = HostFile<File>;

    fn open_truncate(&self, path: &str) -> Result<Self::File, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.resolve(path))
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => StorageError::NotFound,
                io::ErrorKind::PermissionDenied => StorageError::Denied,
                _ => StorageError::Io,
            })?;

        Ok(HostFile::new(file, Rc::clone(&self.quota)))
    }
}

/// Unbuffered export file; each `write` reaches the writer before it returns
/// so the count it reports is what the medium took.
pub struct HostFile<W> {
    writer: W,
    quota: Rc<Cell<Option<u64>>>,
}

impl<W: Write> HostFile<W> {
    fn new(writer: W, quota: Rc<Cell<Option<u64>>>) -> Self {
        Self { writer, quota }
    }

    fn reserve(&self, wanted: usize) -> usize {
        match self.quota.get() {
            Some(left) => usize::try_from(left).map_or(wanted, |left| left.min(wanted)),
            None => wanted,
        }
    }

    fn charge(&self, used: usize) {
        if let Some(left) = self.quota.get() {
            let used = u64::try_from(used).unwrap_or(u64::MAX);
            self.quota.set(Some(left.saturating_sub(used)));
        }
    }
}

impl<W: Write> DspFile for HostFile<W> {
    fn write(&mut self, bytes: &[u8]) -> usize {
        let accepted = self.reserve(bytes.len());

        let mut written = 0;
        while written < accepted {
            match self.writer.write(&bytes[written..accepted]) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Ok(0) | Err(_) => break,
                Ok(count) => written += count,
            }
        }

        self.charge(written);
        written
    }

    fn close(mut self) -> Result<(), StorageError> {
        self.writer.flush().map_err(|_| StorageError::Io)
    }
}

/// Primary power-control line of the bench fixture.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BenchLine {
    pub high: bool,
    /// The pin has been returned to its high-impedance state.
    pub released: bool,
}

impl PowerLine for BenchLine {
    fn drive(&mut self, high: bool) {
        self.high = high;
        self.released = false;
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Load switch that reports power-good only after `lag` extra enable requests.
#[derive(Clone, Debug, Default)]
pub struct BenchRail {
    lag: Rc<Cell<u8>>,
    requests: u8,
}

impl BenchRail {
    /// Returns the rail and a handle for changing its lag at runtime.
    pub fn new(lag: u8) -> (Self, Rc<Cell<u8>>) {
        let handle = Rc::new(Cell::new(lag));
        let rail = Self {
            lag: Rc::clone(&handle),
            requests: 0,
        };
        (rail, handle)
    }
}

impl AuxRail for BenchRail {
    fn is_enabled(&self) -> bool {
        self.requests > self.lag.get()
    }

    fn enable(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn disable(&mut self) {
        self.requests = 0;
    }
}

/// Indicator that remembers the color it shows.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct HostLed {
    pub acquired: bool,
    pub lit: Option<LedColor>,
}

impl Indicator for HostLed {
    fn acquire(&mut self) {
        self.acquired = true;
    }

    fn release(&mut self) {
        self.acquired = false;
    }

    fn show(&mut self, color: LedColor) {
        self.lit = Some(color);
    }

    fn clear(&mut self) {
        self.lit = None;
    }
}
