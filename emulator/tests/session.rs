use std::fs;
use std::io::Cursor;
use std::path::Path;

use chrono::NaiveDate;
use lrf_emulator::bench::{Bench, BenchConfig};
use lrf_emulator::console;
use lrf_emulator::device::SimulatedLrf;
use lrf_emulator::host::HostCalendar;
use lrf_emulator::session::{Screen, Session, TranscriptLogger};

const EXPORT_FILE: &str = "data/LRF0421-2024.03.07-09.05.02.dsp";

fn bench(root: &Path) -> Bench {
    let stamp = NaiveDate::from_ymd_opt(2024, 3, 7)
        .and_then(|date| date.and_hms_opt(9, 5, 2))
        .expect("valid stamp");
    Bench::new(BenchConfig {
        data_root: root.to_path_buf(),
        calendar: HostCalendar::Fixed(stamp),
        ..BenchConfig::default()
    })
    .expect("bench")
}

fn session<'b>(bench: &'b Bench, root: &Path) -> Session<'b> {
    let transcript =
        TranscriptLogger::create(&root.join("transcript.log"), "test bench").expect("transcript");
    Session::new(bench, SimulatedLrf::default(), transcript)
}

fn run(session: &mut Session<'_>, line: &str) -> Vec<String> {
    session.handle_command(line).expect("command")
}

fn has(lines: &[String], expected: &str) -> bool {
    lines.iter().any(|line| line == expected)
}

#[test]
fn boot_measures_device_latency() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    let lines = run(&mut session, "boot");

    assert_eq!(session.active_screen(), Some(Screen::BootTime));
    assert!(has(&lines, "EVT  boot-cycle-started"), "{lines:#?}");
    assert!(has(&lines, "EVT  power-off t=0ms"));
    assert!(has(&lines, "EVT  power-on t=1000ms"));
    assert!(has(&lines, "EVT  boot-time 640ms"));
    assert!(has(&lines, "  boot time 640 ms"));
    assert!(has(&lines, "LED  green"));
}

#[test]
fn boot_time_survives_tick_wrap() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    run(&mut session, "set tick=4294966195");
    let lines = run(&mut session, "boot");

    assert!(has(&lines, "EVT  power-on t=4294967195ms"), "{lines:#?}");
    assert!(has(&lines, "  boot time 640 ms"));
}

#[test]
fn slow_rail_is_reported_and_measurement_continues() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    run(&mut session, "boot");
    run(&mut session, "set rail=7");
    let lines = run(&mut session, "ok");

    assert!(has(&lines, "EVT  rail-not-acknowledged attempts=5"), "{lines:#?}");
    assert!(has(&lines, "  boot time 640 ms"));
}

#[test]
fn silent_device_times_out() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    run(&mut session, "set announce=off");
    let lines = run(&mut session, "boot");
    assert!(has(&lines, "[boot-time] awaiting-boot-signal redraws=3"), "{lines:#?}");

    let lines = run(&mut session, "wait 4999");
    assert!(!lines.iter().any(|line| line.starts_with("EVT")), "{lines:#?}");

    let lines = run(&mut session, "wait 1");
    assert!(has(&lines, "EVT  boot-response-timeout waited=5000ms"), "{lines:#?}");
    assert!(has(&lines, "  | No response"));
    assert!(has(&lines, "  | after 5000 ms"));
    assert!(has(&lines, "LED  red"));
}

#[test]
fn diag_download_writes_dsp_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    let lines = run(&mut session, "diag");

    assert!(has(&lines, "LRF  <- send-identification"), "{lines:#?}");
    assert!(has(&lines, "LRF  <- read-diagnostic"));
    assert!(has(&lines, "LRF  -> frame 32/32"));
    assert!(has(&lines, "EVT  export-saved bytes=239"));
    assert!(has(&lines, "  | OK"));
    assert!(has(&lines, "  | Data saved in LRF0421-"));
    assert!(has(&lines, "  | 2024.03.07-09.05.02.dsp"));
    assert!(lines.iter().any(|line| line.starts_with("[save-diag] progress 100%")));

    let contents = fs::read_to_string(dir.path().join(EXPORT_FILE)).expect("export file");
    assert!(contents.starts_with("00001\r\n07/03/2024 09:05:02\r\n-00206\r\n"));
    assert!(contents.ends_with("\r\n02607"));
    assert_eq!(contents.split("\r\n").count(), 32);
    assert_eq!(contents.len(), 239);
}

#[test]
fn unsigned_firmware_exports_raw_words() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    run(&mut session, "set signed=off");
    run(&mut session, "diag");

    let contents = fs::read_to_string(dir.path().join(EXPORT_FILE)).expect("export file");
    assert!(contents.starts_with("00001\r\n07/03/2024 09:05:02\r\n65330\r\n"));
}

#[test]
fn missing_identification_blocks_export() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    run(&mut session, "set ident=off");
    let lines = run(&mut session, "diag");

    assert!(has(&lines, "EVT  missing-identification"), "{lines:#?}");
    assert!(has(&lines, "  | Error!"));
    assert!(has(&lines, "  | Missing LRF identification"));
    assert!(has(&lines, "LED  red"));
    assert!(!dir.path().join(EXPORT_FILE).exists());
}

#[test]
fn full_card_reports_short_write() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    run(&mut session, "set quota=40");
    let lines = run(&mut session, "diag");

    assert!(has(&lines, "EVT  export-write-failed wrote=6 expected=8"), "{lines:#?}");
    assert!(has(&lines, "  | Error writing LRF0421-"));

    let contents = fs::read(dir.path().join(EXPORT_FILE)).expect("export file");
    assert_eq!(contents.len(), 40);
}

#[test]
fn leaving_screens_closes_the_serial_port() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    run(&mut session, "boot");
    let status = run(&mut session, "status");
    assert!(has(&status, "serial 115200 baud shared-buffer=false"), "{status:#?}");

    run(&mut session, "back");
    assert_eq!(session.active_screen(), None);
    let status = run(&mut session, "status");
    assert!(has(&status, "serial closed shared-buffer=false"), "{status:#?}");

    let lines = run(&mut session, "back");
    assert_eq!(lines, vec!["ERR no active screen".to_string()]);
}

#[test]
fn transcript_records_both_sides() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    run(&mut session, "boot");
    let lines = run(&mut session, "bogus");
    assert_eq!(lines, vec!["ERR syntax unexpected input at column 1".to_string()]);
    session.finish().expect("finish");

    let transcript = fs::read_to_string(dir.path().join("transcript.log")).expect("transcript");
    assert!(transcript.starts_with("# test bench\n"));
    assert!(transcript.contains("CMD boot"));
    assert!(transcript.contains("OUT EVT  boot-time 640ms"));
    assert!(transcript.contains("CMD bogus"));
    assert!(transcript.contains("OUT session closed"));
}

#[test]
fn console_stops_at_quit() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());
    let mut output = Vec::new();

    console::run(
        &mut session,
        Cursor::new("boot\nstatus\nquit\nstatus\n"),
        &mut output,
    )
    .expect("console");

    let output = String::from_utf8(output).expect("utf8 output");
    assert!(output.starts_with("LRF bench: LRF0421 fw "), "{output}");
    assert!(output.contains("boot wait 5000 ms"));
    assert!(output.contains("menu> "));
    assert!(output.contains("boot-time> screen boot-time tick="));
    assert!(output.contains("left boot-time"));
    assert_eq!(output.matches("screen ").count(), 1);
    assert!(session.quit_requested());
    assert_eq!(session.active_screen(), None);
}

#[test]
fn console_ends_cleanly_at_end_of_input() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());
    let mut output = Vec::new();

    console::run(&mut session, Cursor::new("diag\n"), &mut output).expect("console");

    let output = String::from_utf8(output).expect("utf8 output");
    assert!(output.ends_with("save-diag> \n"), "{output}");
    assert!(!session.quit_requested());
}

#[test]
fn help_covers_commands_and_settings() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bench = bench(dir.path());
    let mut session = session(&bench, dir.path());

    let lines = run(&mut session, "help");
    assert!(lines[0].starts_with("boot "), "{lines:#?}");
    assert!(lines.iter().any(|line| line.starts_with("quit | exit")));

    let lines = run(&mut session, "help set");
    assert_eq!(lines.len(), 10, "{lines:#?}");
    assert!(has(&lines, "set quota     card bytes left, 0 = unlimited"));

    let lines = run(&mut session, "help wait");
    assert_eq!(
        lines,
        vec!["wait <ms>: advance bench time; a silent LRF times out".to_string()]
    );

    let lines = run(&mut session, "help quota");
    assert_eq!(
        lines,
        vec!["set quota=<value>: card bytes left, 0 = unlimited".to_string()]
    );

    let lines = run(&mut session, "help colour");
    assert_eq!(lines, vec!["ERR no help for `colour`".to_string()]);
}
