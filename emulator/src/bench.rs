//! The two sampler screens wired to host collaborators.

use std::io;
use std::path::PathBuf;

use sampler_core::boot_time::{BootTestConfig, BootTimeModel, BootTimeTester};
use sampler_core::diag::{DiagConfig, SaveDiagModel, SaveDiagScreen};
use sampler_core::model::LocalCell;

use crate::host::{EventLog, HostCalendar, HostStorage, SimClock};

pub const DEFAULT_DATA_ROOT: &str = "bench-data";
/// The bench gives up on a silent device after this long.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u32 = 5_000;

pub type BootScreen = BootTimeTester<LocalCell<BootTimeModel>, SimClock, EventLog>;
pub type DiagScreen =
    SaveDiagScreen<LocalCell<SaveDiagModel>, HostStorage, HostCalendar, SimClock, EventLog>;

#[derive(Clone, Debug)]
pub struct BenchConfig {
    /// Host directory standing in for the sampler's storage card.
    pub data_root: PathBuf,
    pub boot: BootTestConfig,
    pub diag: DiagConfig,
    pub calendar: HostCalendar,
    pub start_tick: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            boot: BootTestConfig {
                response_timeout_ms: Some(DEFAULT_RESPONSE_TIMEOUT_MS),
                ..BootTestConfig::default()
            },
            diag: DiagConfig::default(),
            calendar: HostCalendar::Local,
            start_tick: 0,
        }
    }
}

/// Owns the screens; sessions borrow it so the link can hold handler references.
pub struct Bench {
    pub clock: SimClock,
    pub events: EventLog,
    pub storage: HostStorage,
    pub boot: BootScreen,
    pub diag: DiagScreen,
}

impl Bench {
    /// Builds the bench and creates the data directory below the root.
    ///
    /// # Errors
    ///
    /// Fails when the data directory cannot be created.
    pub fn new(config: BenchConfig) -> io::Result<Self> {
        let clock = SimClock::starting_at(config.start_tick);
        let events = EventLog::default();
        let storage = HostStorage::new(config.data_root);
        storage.ensure_dir(&config.diag.data_dir)?;

        let boot = BootTimeTester::new(
            LocalCell::new(BootTimeModel::default()),
            clock.clone(),
            events.clone(),
            config.boot,
        );
        let diag = SaveDiagScreen::new(
            LocalCell::new(SaveDiagModel::default()),
            storage.clone(),
            config.calendar,
            clock.clone(),
            events.clone(),
            config.diag,
        );

        Ok(Self {
            clock,
            events,
            storage,
            boot,
            diag,
        })
    }
}
