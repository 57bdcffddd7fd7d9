//! Line console in front of a bench [`Session`].

use std::io::{self, BufRead, Write};

use crate::session::Session;

/// Feeds `input` to the session line by line until it runs out or the
/// operator quits, echoing every reply to `output`.
///
/// # Errors
///
/// Propagates failures reading the console, writing replies, or appending
/// to the transcript.
pub fn run<R, W>(session: &mut Session<'_>, input: R, mut output: W) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "{}", session.banner())?;
    writeln!(output, "`help` lists commands, `quit` leaves.")?;

    let mut lines = input.lines();
    loop {
        write!(output, "{}", session.prompt())?;
        output.flush()?;

        let Some(line) = lines.next().transpose()? else {
            writeln!(output)?;
            return Ok(());
        };
        for reply in session.handle_command(&line)? {
            writeln!(output, "{reply}")?;
        }
        if session.quit_requested() {
            return Ok(());
        }
    }
}
