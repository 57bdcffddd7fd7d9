use std::io;
use std::path::Path;

use chrono::NaiveDate;
use lrf_emulator::bench::{Bench, BenchConfig};
use lrf_emulator::device::SimulatedLrf;
use lrf_emulator::host::HostCalendar;
use lrf_emulator::session::{Session, TranscriptLogger};

const OUTPUT_ROOT: &str = "bench-data/transcripts";

const BOOT_SCRIPT: &[&str] = &[
    "boot",
    "ok",
    "set latency=1830",
    "ok",
    "set rail=7",
    "ok",
    "set announce=off",
    "ok",
    "wait 5000",
    "back",
];

const DIAG_SCRIPT: &[&str] = &[
    "diag",
    "set signed=off",
    "ok",
    "set values=200",
    "set chunk=25",
    "ok",
    "status",
    "back",
];

const FAULT_SCRIPT: &[&str] = &[
    "set ident=off",
    "diag",
    "set ident=on",
    "set quota=40",
    "ok",
    "set quota=0",
    "set tick=4294967000",
    "boot",
    "back",
];

fn main() -> io::Result<()> {
    record("boot", "LRF sampler boot-time transcript", BOOT_SCRIPT)?;
    record("diag", "LRF sampler diagnostic download transcript", DIAG_SCRIPT)?;
    record("faults", "LRF sampler fault handling transcript", FAULT_SCRIPT)?;
    Ok(())
}

fn record(tag: &str, header: &str, script: &[&str]) -> io::Result<()> {
    let root = Path::new(OUTPUT_ROOT).join(tag);
    let stamp = NaiveDate::from_ymd_opt(2024, 3, 7)
        .and_then(|date| date.and_hms_opt(9, 5, 2))
        .map_or(HostCalendar::Local, HostCalendar::Fixed);
    let bench = Bench::new(BenchConfig {
        data_root: root.clone(),
        calendar: stamp,
        ..BenchConfig::default()
    })?;

    let transcript = TranscriptLogger::create(&root.join(format!("{tag}.log")), header)?;
    let mut session = Session::new(&bench, SimulatedLrf::default(), transcript);
    for line in script {
        session.handle_command(line)?;
    }
    session.finish()
}
