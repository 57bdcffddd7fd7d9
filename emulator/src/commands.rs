//! Bench console grammar.
//!
//! ```text
//! boot | diag | ok | back | status | exit | quit
//! wait <ms>
//! set <key>=<number|on|off>
//! help [command|setting]
//! ```

use core::fmt;

use winnow::ascii::{Caseless, dec_uint, multispace0, multispace1};
use winnow::combinator::{alt, eof, opt, preceded, separated_pair, terminated};
use winnow::error::{ContextError, ParseError};
use winnow::prelude::*;
use winnow::token::take_while;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    /// Open the boot-time screen and power-cycle the device.
    Boot,
    /// Open the save-diagnostic screen and start a download.
    Diag,
    /// Press OK on the active screen.
    Ok,
    /// Leave the active screen.
    Back,
    /// Let bench time pass.
    Wait { ms: u32 },
    Status,
    Set { key: SettingKey, value: u32 },
    Help { topic: Option<&'a str> },
    /// Leave the active screen and end the console.
    Quit,
}

/// One console command as listed by `help`.
pub struct CommandHelp {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub const COMMAND_HELP: &[CommandHelp] = &[
    CommandHelp {
        name: "boot",
        usage: "boot",
        summary: "open the boot-time screen and power-cycle the LRF",
    },
    CommandHelp {
        name: "diag",
        usage: "diag",
        summary: "open the save-diagnostic screen and download the log",
    },
    CommandHelp {
        name: "ok",
        usage: "ok",
        summary: "measure again, or restart the download",
    },
    CommandHelp {
        name: "back",
        usage: "back",
        summary: "leave the active screen",
    },
    CommandHelp {
        name: "wait",
        usage: "wait <ms>",
        summary: "advance bench time; a silent LRF times out",
    },
    CommandHelp {
        name: "status",
        usage: "status",
        summary: "dump screen, supply, serial, device and card state",
    },
    CommandHelp {
        name: "set",
        usage: "set <key>=<value>",
        summary: "change the simulated LRF or fixture; `help set` lists keys",
    },
    CommandHelp {
        name: "help",
        usage: "help [command|key]",
        summary: "describe a command or a `set` key",
    },
    CommandHelp {
        name: "quit",
        usage: "quit | exit",
        summary: "power the screen down and close the transcript",
    },
];

/// Bench parameters that can be changed between runs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SettingKey {
    Latency,
    Values,
    Chunk,
    Marker,
    Signed,
    Ident,
    Announce,
    Rail,
    Quota,
    Tick,
}

impl SettingKey {
    pub const ALL: [SettingKey; 10] = [
        SettingKey::Latency,
        SettingKey::Values,
        SettingKey::Chunk,
        SettingKey::Marker,
        SettingKey::Signed,
        SettingKey::Ident,
        SettingKey::Announce,
        SettingKey::Rail,
        SettingKey::Quota,
        SettingKey::Tick,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(name))
    }

    pub const fn describe(self) -> &'static str {
        match self {
            SettingKey::Latency => "ms from power-on to the boot record",
            SettingKey::Values => "words in the diagnostic log",
            SettingKey::Chunk => "words per diagnostic frame",
            SettingKey::Marker => "value of the first word (date line index)",
            SettingKey::Signed => "firmware reports signed words (on/off)",
            SettingKey::Ident => "LRF answers the identification request (on/off)",
            SettingKey::Announce => "LRF sends a boot record after power-on (on/off)",
            SettingKey::Rail => "enable polls before the aux rail acknowledges",
            SettingKey::Quota => "card bytes left, 0 = unlimited",
            SettingKey::Tick => "jump the bench tick counter",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SettingKey::Latency => "latency",
            SettingKey::Values => "values",
            SettingKey::Chunk => "chunk",
            SettingKey::Marker => "marker",
            SettingKey::Signed => "signed",
            SettingKey::Ident => "ident",
            SettingKey::Announce => "announce",
            SettingKey::Rail => "rail",
            SettingKey::Quota => "quota",
            SettingKey::Tick => "tick",
        }
    }
}

/// A line the grammar rejected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyntaxError {
    pub offset: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected input at column {}", self.offset + 1)
    }
}

impl From<ParseError<&str, ContextError>> for SyntaxError {
    fn from(error: ParseError<&str, ContextError>) -> Self {
        Self {
            offset: error.offset(),
        }
    }
}

/// Parses one console line.
///
/// # Errors
///
/// Returns the column at which the grammar stopped matching.
pub fn parse(line: &str) -> Result<Command<'_>, SyntaxError> {
    preceded(multispace0, terminated(command, (multispace0, eof)))
        .parse(line)
        .map_err(SyntaxError::from)
}

fn command<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    alt((
        preceded((Caseless("wait"), multispace1), dec_uint).map(|ms| Command::Wait { ms }),
        preceded((Caseless("set"), multispace1), setting)
            .map(|(key, value)| Command::Set { key, value }),
        preceded(Caseless("help"), opt(preceded(multispace1, topic)))
            .map(|topic| Command::Help { topic }),
        Caseless("status").value(Command::Status),
        Caseless("boot").value(Command::Boot),
        Caseless("back").value(Command::Back),
        Caseless("diag").value(Command::Diag),
        Caseless("ok").value(Command::Ok),
        alt((Caseless("exit"), Caseless("quit"))).value(Command::Quit),
    ))
    .parse_next(input)
}

fn setting(input: &mut &str) -> ModalResult<(SettingKey, u32)> {
    separated_pair(
        setting_key,
        (multispace0, '=', multispace0),
        alt((
            dec_uint,
            Caseless("on").value(1),
            Caseless("off").value(0),
        )),
    )
    .parse_next(input)
}

fn setting_key(input: &mut &str) -> ModalResult<SettingKey> {
    alt((
        Caseless("latency").value(SettingKey::Latency),
        Caseless("values").value(SettingKey::Values),
        Caseless("chunk").value(SettingKey::Chunk),
        Caseless("marker").value(SettingKey::Marker),
        Caseless("signed").value(SettingKey::Signed),
        Caseless("ident").value(SettingKey::Ident),
        Caseless("announce").value(SettingKey::Announce),
        Caseless("rail").value(SettingKey::Rail),
        Caseless("quota").value(SettingKey::Quota),
        Caseless("tick").value(SettingKey::Tick),
    ))
    .parse_next(input)
}

fn topic<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_screen_commands_case_insensitively() {
        assert_eq!(parse("boot"), Ok(Command::Boot));
        assert_eq!(parse("  DIAG "), Ok(Command::Diag));
        assert_eq!(parse("Ok"), Ok(Command::Ok));
        assert_eq!(parse("back"), Ok(Command::Back));
        assert_eq!(parse("status"), Ok(Command::Status));
        assert_eq!(parse("EXIT"), Ok(Command::Quit));
        assert_eq!(parse("quit"), Ok(Command::Quit));
    }

    #[test]
    fn setting_names_resolve_both_ways() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::from_name(key.name()), Some(key));
        }
        assert_eq!(SettingKey::from_name("QUOTA"), Some(SettingKey::Quota));
        assert_eq!(SettingKey::from_name("colour"), None);
    }

    #[test]
    fn parses_arguments() {
        assert_eq!(parse("wait 1500"), Ok(Command::Wait { ms: 1_500 }));
        assert_eq!(
            parse("set latency=820"),
            Ok(Command::Set {
                key: SettingKey::Latency,
                value: 820
            })
        );
        assert_eq!(
            parse("set signed = off"),
            Ok(Command::Set {
                key: SettingKey::Signed,
                value: 0
            })
        );
        assert_eq!(parse("help"), Ok(Command::Help { topic: None }));
        assert_eq!(
            parse("help set"),
            Ok(Command::Help { topic: Some("set") })
        );
    }

    #[test]
    fn rejects_trailing_input() {
        assert!(parse("bootx").is_err());
        assert!(parse("wait").is_err());
        assert!(parse("set colour=1").is_err());
        assert!(parse("").is_err());
    }
}
