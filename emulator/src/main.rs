use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

use lrf_emulator::bench::{Bench, BenchConfig};
use lrf_emulator::console;
use lrf_emulator::device::SimulatedLrf;
use lrf_emulator::session::{Session, TranscriptLogger};

const TRANSCRIPT_NAME: &str = "transcript.log";
const USAGE: &str = "Usage: lrf-emulator [--data-dir <path>] [--transcript <path>] \
                     [--correction <ms>] [--timeout <ms>]";

struct Options {
    bench: BenchConfig,
    transcript: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("lrf-emulator: {err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let transcript_path = options
        .transcript
        .unwrap_or_else(|| options.bench.data_root.join(TRANSCRIPT_NAME));
    let bench = Bench::new(options.bench)?;
    let transcript = TranscriptLogger::create(&transcript_path, "LRF sampler bench transcript")?;
    let mut session = Session::new(&bench, SimulatedLrf::default(), transcript);

    console::run(&mut session, io::stdin().lock(), io::stdout().lock())?;
    session.finish()
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        bench: BenchConfig::default(),
        transcript: None,
    };

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg.clone(), None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--data-dir" => options.bench.data_root = PathBuf::from(value()?),
            "--transcript" => options.transcript = Some(PathBuf::from(value()?)),
            "--correction" => options.bench.boot.boot_time_correction_ms = parse_ms(&value()?)?,
            "--timeout" => {
                let ms = parse_ms(&value()?)?;
                options.bench.boot.response_timeout_ms = (ms != 0).then_some(ms);
            }
            other => return Err(format!("Unknown option `{other}`")),
        }
    }

    Ok(options)
}

fn parse_ms(value: &str) -> Result<u32, String> {
    value
        .parse()
        .map_err(|_| format!("Expected milliseconds, got `{value}`"))
}
