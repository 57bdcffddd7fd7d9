use std::cell::Cell;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant as HostInstant};

use sampler_core::boot_time::DEFAULT_BAUD_RATE;
use sampler_core::led::{LedColor, LedConfig, LedFeedback};
use sampler_core::model::ModelCell;
use sampler_core::power::PowerSequencer;
use sampler_core::time::{TickSource, elapsed_ms};

use crate::bench::Bench;
use crate::commands::{self, COMMAND_HELP, Command, SettingKey};
use crate::device::{Reply, SimulatedLrf};
use crate::host::{BenchLine, BenchRail, HostLed, SimClock};
use crate::link::HostLink;

/// The simulated rangefinder only talks at this rate.
pub const DEVICE_BAUD_RATE: u32 = DEFAULT_BAUD_RATE;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Screen {
    BootTime,
    SaveDiag,
}

impl Screen {
    pub const fn label(self) -> &'static str {
        match self {
            Screen::BootTime => "boot-time",
            Screen::SaveDiag => "save-diag",
        }
    }
}

/// Name of the screen, or `menu` when none is open.
fn screen_label(screen: Option<Screen>) -> &'static str {
    screen.map_or("menu", Screen::label)
}

type BenchPower = PowerSequencer<BenchLine, BenchRail, SimClock, SimClock>;

/// Interactive bench session driving the sampler screens against the device.
pub struct Session<'b> {
    bench: &'b Bench,
    link: HostLink<'b>,
    device: SimulatedLrf,
    power: BenchPower,
    rail_lag: Rc<Cell<u8>>,
    led: LedFeedback<HostLed>,
    active: Option<Screen>,
    quit: bool,
    transcript: TranscriptLogger,
    started_at: HostInstant,
}

impl<'b> Session<'b> {
    pub fn new(bench: &'b Bench, device: SimulatedLrf, transcript: TranscriptLogger) -> Self {
        let (rail, rail_lag) = BenchRail::new(0);
        let power = PowerSequencer::new(
            BenchLine::default(),
            rail,
            bench.clock.clone(),
            bench.clock.clone(),
        );

        Self {
            bench,
            link: HostLink::new(),
            device,
            power,
            rail_lag,
            led: LedFeedback::new(HostLed::default(), LedConfig::default()),
            active: None,
            quit: false,
            transcript,
            started_at: HostInstant::now(),
        }
    }

    pub fn active_screen(&self) -> Option<Screen> {
        self.active
    }

    pub fn device(&self) -> &SimulatedLrf {
        &self.device
    }

    /// Set once `quit` or `exit` has been handled.
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Console prompt naming the open screen.
    pub fn prompt(&self) -> String {
        format!("{}> ", screen_label(self.active))
    }

    /// One-line summary of the fixture printed when the console starts.
    pub fn banner(&self) -> String {
        let boot = self.bench.boot.config();
        let wait = boot
            .response_timeout_ms
            .map_or_else(|| "unbounded".to_string(), |ms| format!("{ms} ms"));
        format!(
            "LRF bench: {} fw {} on {} baud, card at {}, boot wait {wait}, correction {} ms",
            self.device.profile.serial,
            self.device.profile.firmware,
            DEVICE_BAUD_RATE,
            self.bench.storage.root().display(),
            boot.boot_time_correction_ms
        )
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.transcript.append_line(
            elapsed,
            self.bench.clock.now_ms(),
            Direction::Typed,
            trimmed,
        )?;

        let lines = match commands::parse(trimmed) {
            Ok(Command::Help { topic }) => help_lines(topic),
            Ok(command) => self.execute(command),
            Err(err) => vec![format!("ERR syntax {err}")],
        };

        self.record_output(elapsed, &lines)?;
        Ok(lines)
    }

    /// Leaves the active screen and turns the indicator off.
    pub fn finish(mut self) -> io::Result<()> {
        self.leave_screen();
        self.led.release();
        let elapsed = self.started_at.elapsed();
        self.transcript.append_line(
            elapsed,
            self.bench.clock.now_ms(),
            Direction::Printed,
            "session closed",
        )
    }

    fn execute(&mut self, command: Command<'_>) -> Vec<String> {
        let mut lines = Vec::new();
        let bench = self.bench;
        let mut delay = bench.clock.clone();

        match command {
            Command::Boot => {
                self.leave_screen();
                bench.boot.enter(&mut self.link, &mut self.power, &mut delay);
                self.active = Some(Screen::BootTime);
                self.answer_power_on(&mut lines);
            }
            Command::Diag => {
                self.leave_screen();
                bench.diag.enter(&mut self.link);
                self.active = Some(Screen::SaveDiag);
                self.serve_commands(&mut lines);
            }
            Command::Ok => match self.active {
                Some(Screen::BootTime) => {
                    bench.boot.retrigger(&mut self.power, &mut delay);
                    self.answer_power_on(&mut lines);
                }
                Some(Screen::SaveDiag) => {
                    bench.diag.ok(&mut self.link);
                    self.serve_commands(&mut lines);
                }
                None => lines.push("ERR no active screen".to_string()),
            },
            Command::Back => {
                if self.leave_screen().is_none() {
                    lines.push("ERR no active screen".to_string());
                }
            }
            Command::Wait { ms } => {
                bench.clock.advance(ms);
                if self.active == Some(Screen::BootTime) {
                    bench.boot.poll(bench.clock.now_ms());
                }
            }
            Command::Status => {
                self.describe_status(&mut lines);
            }
            Command::Set { key, value } => {
                self.apply_setting(key, value);
                lines.push(format!("{} = {value}", key.name()));
            }
            Command::Help { topic } => lines.extend(help_lines(topic)),
            Command::Quit => {
                if let Some(screen) = self.leave_screen() {
                    lines.push(format!("left {}", screen.label()));
                }
                self.quit = true;
            }
        }

        self.collect_events(&mut lines);
        if matches!(
            command,
            Command::Boot | Command::Diag | Command::Ok | Command::Wait { .. }
        ) {
            self.render(&mut lines);
        }
        lines
    }

    fn leave_screen(&mut self) -> Option<Screen> {
        let bench = self.bench;
        let screen = self.active.take()?;
        match screen {
            Screen::BootTime => bench.boot.exit(&mut self.link),
            Screen::SaveDiag => bench.diag.exit(&mut self.link),
        }
        Some(screen)
    }

    /// Delivers the boot record of a device that was just powered on.
    fn answer_power_on(&mut self, lines: &mut Vec<String>) {
        let state = self.power.state();
        let Some(powered_at) = state.last_transition_ms.filter(|_| state.on) else {
            return;
        };
        let Some(info) = self.device.boot_record(powered_at) else {
            return;
        };
        if self.link.serial_baud() != Some(DEVICE_BAUD_RATE) {
            lines.push("LRF  boot record lost: serial port closed or at wrong rate".to_string());
            return;
        }

        let clock = &self.bench.clock;
        if elapsed_ms(clock.now_ms(), powered_at) < self.device.profile.boot_latency_ms {
            clock.set(info.received_at_ms);
        }
        lines.push(format!("LRF  -> boot {} {}", info.id, info.firmware));
        if !self.link.router.deliver_boot_info(&info) {
            lines.push("LRF  boot record dropped: no listener".to_string());
        }
    }

    /// Hands queued commands to the device and routes its replies.
    fn serve_commands(&mut self, lines: &mut Vec<String>) {
        while let Some(command) = self.link.next_command() {
            lines.push(format!("LRF  <- {command}"));
            for reply in self.device.respond(command) {
                let delivered = match &reply {
                    Reply::Identification(ident) => {
                        lines.push(format!("LRF  -> ident {} fw {}", ident.serial, ident.firmware));
                        self.link.router.deliver_identification(ident)
                    }
                    Reply::Diagnostic(frame) => {
                        self.bench.clock.advance(self.device.profile.frame_interval_ms);
                        lines.push(format!(
                            "LRF  -> frame {}/{}",
                            frame.received_count, frame.expected_total
                        ));
                        self.link.router.deliver_diagnostic(frame)
                    }
                };
                if !delivered {
                    lines.push("LRF  record dropped: no listener".to_string());
                }
            }
        }
    }

    fn collect_events(&mut self, lines: &mut Vec<String>) {
        let was_lit = self.led.indicator().lit;
        let now = self.bench.clock.now_ms();
        for event in self.bench.events.drain() {
            lines.push(format!("EVT  {event}"));
            self.led.on_event(event, now);
        }
        self.led.service(now);

        let lit = self.led.indicator().lit;
        if lit != was_lit {
            lines.push(format!("LED  {}", led_label(lit)));
        }
    }

    fn render(&self, lines: &mut Vec<String>) {
        match self.active {
            Some(Screen::BootTime) => {
                let cell = self.bench.boot.cell();
                let model = cell.snapshot();
                lines.push(format!(
                    "[boot-time] {} redraws={}",
                    model.state.label(),
                    cell.take_redraws()
                ));
                if let Some(info) = &model.boot_info {
                    lines.push(format!("  id {} fw {}", info.id, info.firmware));
                }
                if let Some(boot_time_ms) = model.displayed_boot_time() {
                    lines.push(format!("  boot time {boot_time_ms} ms"));
                }
                push_status(lines, model.status.iter());
            }
            Some(Screen::SaveDiag) => {
                let cell = self.bench.diag.cell();
                let model = cell.snapshot();
                let progress = match model.progress {
                    Some(progress) => format!("{:.0}%", progress * 100.0),
                    None => "-".to_string(),
                };
                lines.push(format!(
                    "[save-diag] progress {progress} redraws={}",
                    cell.take_redraws()
                ));
                if model.rejected_frames > 0 {
                    lines.push(format!("  rejected frames {}", model.rejected_frames));
                }
                push_status(lines, model.status.iter());
            }
            None => lines.push("[menu]".to_string()),
        }
    }

    fn describe_status(&self, lines: &mut Vec<String>) {
        lines.push(format!(
            "screen {} tick={}",
            screen_label(self.active),
            self.bench.clock.now_ms()
        ));

        let power = self.power.state();
        let last = power
            .last_transition_ms
            .map_or_else(|| "-".to_string(), |ms| format!("{ms}"));
        lines.push(format!(
            "power {} last={last} rail-attempts={}",
            if power.on { "on" } else { "off" },
            power.rail_attempts
        ));

        let serial = self
            .link
            .serial_baud()
            .map_or_else(|| "closed".to_string(), |baud| format!("{baud} baud"));
        lines.push(format!(
            "serial {serial} shared-buffer={}",
            self.link.shared_buffer_enabled()
        ));

        let profile = &self.device.profile;
        lines.push(format!(
            "device {} fw {} latency={}ms values={} chunk={} marker={} signed={} ident={} announce={}",
            profile.serial,
            profile.firmware,
            profile.boot_latency_ms,
            profile.value_count,
            profile.chunk,
            profile.marker_index,
            profile.signed_values,
            profile.identifies,
            profile.announces_boot
        ));

        let quota = self
            .bench
            .storage
            .quota()
            .map_or_else(|| "unlimited".to_string(), |bytes| format!("{bytes} bytes"));
        lines.push(format!(
            "storage {} quota={quota} rail-lag={}",
            self.bench.storage.root().display(),
            self.rail_lag.get()
        ));

        let boot = self.bench.boot.cell().snapshot();
        lines.push(format!(
            "boot-time {} power-on={} awaiting={}",
            boot.state.label(),
            boot.power_on_tstamp,
            boot.await_boot_info
        ));
        let diag = self.bench.diag.cell().snapshot();
        lines.push(format!(
            "save-diag identified={} received={}/{} written={} completed={}",
            diag.has_identification,
            diag.frame.received_count,
            diag.frame.expected_total,
            diag.bytes_written,
            diag.completed
        ));
    }

    fn apply_setting(&mut self, key: SettingKey, value: u32) {
        let profile = &mut self.device.profile;
        let narrow = u16::try_from(value).unwrap_or(u16::MAX);
        match key {
            SettingKey::Latency => profile.boot_latency_ms = value,
            SettingKey::Values => profile.value_count = narrow,
            SettingKey::Chunk => profile.chunk = narrow,
            SettingKey::Marker => profile.marker_index = narrow,
            SettingKey::Signed => profile.signed_values = value != 0,
            SettingKey::Ident => profile.identifies = value != 0,
            SettingKey::Announce => profile.announces_boot = value != 0,
            SettingKey::Rail => self.rail_lag.set(u8::try_from(value).unwrap_or(u8::MAX)),
            SettingKey::Quota => self
                .bench
                .storage
                .set_quota((value != 0).then_some(u64::from(value))),
            SettingKey::Tick => self.bench.clock.set(value),
        }
    }

    fn record_output(&mut self, elapsed: Duration, lines: &[String]) -> io::Result<()> {
        let tick = self.bench.clock.now_ms();
        for line in lines {
            self.transcript
                .append_line(elapsed, tick, Direction::Printed, line)?;
        }
        Ok(())
    }
}

fn push_status<'a>(lines: &mut Vec<String>, status: impl Iterator<Item = &'a str>) {
    for line in status {
        lines.push(format!("  | {line}"));
    }
}

fn led_label(color: Option<LedColor>) -> &'static str {
    match color {
        Some(LedColor::Red) => "red",
        Some(LedColor::Green) => "green",
        Some(LedColor::Blue) => "blue",
        None => "off",
    }
}

/// `help` with no topic lists every command; a topic names a command or a
/// `set` key.
fn help_lines(topic: Option<&str>) -> Vec<String> {
    let Some(topic) = topic else {
        return COMMAND_HELP
            .iter()
            .map(|help| format!("{:<18} {}", help.usage, help.summary))
            .collect();
    };

    if topic.eq_ignore_ascii_case("set") {
        return SettingKey::ALL
            .iter()
            .map(|key| format!("set {:<9} {}", key.name(), key.describe()))
            .collect();
    }
    if let Some(help) = COMMAND_HELP
        .iter()
        .find(|help| help.name.eq_ignore_ascii_case(topic))
    {
        return vec![format!("{}: {}", help.usage, help.summary)];
    }
    if let Some(key) = SettingKey::from_name(topic) {
        return vec![format!("set {}=<value>: {}", key.name(), key.describe())];
    }
    vec![format!("ERR no help for `{topic}`")]
}

/// Operator commands and bench output, stamped with host wall time and the
/// bench tick at which they happened.
pub struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    /// Creates (or truncates) the transcript and writes `title` as its first line.
    pub fn create(path: &Path, title: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);
        writeln!(writer, "# {title}")?;
        writeln!(writer, "# wall-ms   tick        CMD typed, OUT printed")?;
        writer.flush()?;
        Ok(Self { writer })
    }

    fn append_line(
        &mut self,
        wall: Duration,
        tick: u32,
        direction: Direction,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "{:>9}   {tick:<10}  {} {line}",
            wall.as_millis(),
            direction.tag()
        )?;
        self.writer.flush()
    }
}

#[derive(Copy, Clone)]
enum Direction {
    Typed,
    Printed,
}

impl Direction {
    const fn tag(self) -> &'static str {
        match self {
            Direction::Typed => "CMD",
            Direction::Printed => "OUT",
        }
    }
}
