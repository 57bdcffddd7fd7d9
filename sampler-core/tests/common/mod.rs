#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};
use embedded_hal::delay::DelayNs;
use sampler_core::events::{EventSink, SamplerEvent};
use sampler_core::link::{
    BootInfoHandler, DiagnosticHandler, IdentificationHandler, LrfCommand, LrfLink, RecordRouter,
};
use sampler_core::power::{PowerControl, PowerTransition, RailStatus};
use sampler_core::storage::{DspFile, Storage, StorageError};
use sampler_core::time::{Calendar, TickSource};

/// Shared virtual millisecond clock. Delays advance it.
#[derive(Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<u32>>,
    step: u32,
    delays: Rc<RefCell<Vec<u32>>>,
}

impl MockClock {
    pub fn starting_at(ms: u32) -> Self {
        let clock = Self::default();
        clock.set(ms);
        clock
    }

    /// Every tick read advances the clock by `step` afterwards.
    pub fn with_step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn current(&self) -> u32 {
        self.now.get()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.delays.borrow().clone()
    }
}

impl TickSource for MockClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }
}

impl DelayNs for MockClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.borrow_mut().push(ms);
        self.advance(ms);
    }
}

pub struct FixedCalendar(pub NaiveDateTime);

impl FixedCalendar {
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        let stamp = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .expect("valid calendar stamp");
        Self(stamp)
    }
}

impl Calendar for FixedCalendar {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: RefCell<Vec<SamplerEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SamplerEvent> {
        self.events.borrow().clone()
    }

    pub fn contains(&self, event: SamplerEvent) -> bool {
        self.events.borrow().contains(&event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SamplerEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Power control that records transitions against a clock.
pub struct MockPower {
    clock: MockClock,
    pub transitions: Vec<PowerTransition>,
}

impl MockPower {
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            transitions: Vec::new(),
        }
    }

    pub fn levels(&self) -> Vec<bool> {
        self.transitions.iter().map(|t| t.on).collect()
    }
}

impl PowerControl for MockPower {
    fn set_power(&mut self, on: bool) -> PowerTransition {
        let transition = PowerTransition {
            on,
            timestamp_ms: self.clock.current(),
            rail: RailStatus::Absent,
        };
        self.transitions.push(transition);
        transition
    }
}

/// Link that records commands and routes records to registered handlers.
#[derive(Default)]
pub struct MockLink<'h> {
    pub router: RecordRouter<'h>,
    pub commands: Vec<LrfCommand>,
    pub shared_buffer: bool,
    pub serial_baud: Option<u32>,
    pub serial_stops: u32,
}

impl MockLink<'_> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'h> LrfLink<'h> for MockLink<'h> {
    fn send_command(&mut self, command: LrfCommand) {
        self.commands.push(command);
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
        self.serial_baud = Some(baud);
    }

    fn stop_serial(&mut self) {
        self.serial_baud = None;
        self.serial_stops += 1;
    }
}

/// In-memory storage with an optional byte quota shared by all files.
#[derive(Default)]
pub struct MockStorage {
    files: RefCell<Vec<(String, Rc<RefCell<Vec<u8>>>)>>,
    quota: Rc<Cell<Option<usize>>>,
    closed: Rc<Cell<u32>>,
    pub fail_open: Cell<bool>,
    fail_close: Rc<Cell<bool>>,
}

impl MockStorage {
    pub fn with_quota(bytes: usize) -> Self {
        let storage = Self::default();
        storage.quota.set(Some(bytes));
        storage
    }

    pub fn failing() -> Self {
        let storage = Self::default();
        storage.fail_open.set(true);
        storage
    }

    /// Accepts every write but reports an I/O failure when the file is closed.
    pub fn failing_close() -> Self {
        let storage = Self::default();
        storage.fail_close.set(true);
        storage
    }

    pub fn paths(&self) -> Vec<String> {
        self.files
            .borrow()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn contents(&self, path: &str) -> Option<String> {
        self.files
            .borrow()
            .iter()
            .find(|(candidate, _)| candidate == path)
            .map(|(_, data)| String::from_utf8_lossy(&data.borrow()).into_owned())
    }

    pub fn closed_files(&self) -> u32 {
        self.closed.get()
    }
}

pub struct MockFile {
    data: Rc<RefCell<Vec<u8>>>,
    quota: Rc<Cell<Option<usize>>>,
    closed: Rc<Cell<u32>>,
    fail_close: Rc<Cell<bool>>,
}

impl DspFile for MockFile {
    fn write(&mut self, bytes: &[u8]) -> usize {
        let allowed = self
            .quota
            .get()
            .map_or(bytes.len(), |left| left.min(bytes.len()));
        if let Some(left) = self.quota.get() {
            self.quota.set(Some(left - allowed));
        }
        self.data.borrow_mut().extend_from_slice(&bytes[..allowed]);
        allowed
    }

    fn close(self) -> Result<(), StorageError> {
        self.closed.set(self.closed.get() + 1);
        if self.fail_close.get() {
            return Err(StorageError::Io);
        }
        Ok(())
    }
}

impl Storage for MockStorage {
    type File = MockFile;

    fn open_truncate(&self, path: &str) -> Result<MockFile, StorageError> {
        if self.fail_open.get() {
            return Err(StorageError::Denied);
        }

        let data = Rc::new(RefCell::new(Vec::new()));
        let mut files = self.files.borrow_mut();
        files.retain(|(candidate, _)| candidate != path);
        files.push((path.to_owned(), Rc::clone(&data)));

        Ok(MockFile {
            data,
            quota: Rc::clone(&self.quota),
            closed: Rc::clone(&self.closed),
            fail_close: Rc::clone(&self.fail_close),
        })
    }
}
