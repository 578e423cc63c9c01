use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::ScheduleError;

/// One discrete unit of simulated time.
pub type Tick = u64;

/// The widest label a schedule may name a worker with.
pub const MAX_LABEL_LEN: usize = 9;

/// The name a schedule gives to a worker (e.g. `C1`).
///
/// A label is at most [`MAX_LABEL_LEN`] bytes and never contains whitespace.
#[derive(PartialEq, Eq, Clone, Hash, Ord, PartialOrd)]
pub struct Label(String);

impl Label {
    pub fn new(label: &str) -> Result<Label, ScheduleError> {
        if label.is_empty()
            || label.len() > MAX_LABEL_LEN
            || label.chars().any(char::is_whitespace)
        {
            return Err(ScheduleError::InvalidLabel(label.to_string()));
        }
        Ok(Label(label.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for Label {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The action a schedule asks the supervisor to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Start a new worker under the given label.
    Spawn(Label),

    /// Stop the active worker that carries the given label.
    Terminate(Label),

    /// End the simulation. Its timestamp bounds the tick loop.
    Quit,
}

impl Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Spawn(label) => write!(f, "SPAWN {}", label),
            CommandKind::Terminate(label) => write!(f, "TERMINATE {}", label),
            CommandKind::Quit => write!(f, "EXIT"),
        }
    }
}

/// A single timestamped schedule record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The tick at which the command is applied.
    pub timestamp: Tick,

    /// What to do at that tick.
    pub kind: CommandKind,
}

impl Command {
    pub fn spawn(timestamp: Tick, label: &str) -> Result<Command, ScheduleError> {
        Ok(Command {
            timestamp,
            kind: CommandKind::Spawn(Label::new(label)?),
        })
    }

    pub fn terminate(timestamp: Tick, label: &str) -> Result<Command, ScheduleError> {
        Ok(Command {
            timestamp,
            kind: CommandKind::Terminate(Label::new(label)?),
        })
    }

    pub fn quit(timestamp: Tick) -> Command {
        Command {
            timestamp,
            kind: CommandKind::Quit,
        }
    }

    pub fn is_quit(&self) -> bool {
        self.kind == CommandKind::Quit
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.timestamp, self.kind)
    }
}

/// Parses a single schedule line.
///
/// Accepted forms are `<timestamp> <label> <S|T>` and `<timestamp> EXIT`.
/// The long forms `SPAWN`, `TERMINATE` and `QUIT` are accepted as well,
/// in any case.
impl FromStr for Command {
    type Err = ScheduleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = || ScheduleError::Malformed(line.trim().to_string());
        let fields = line.split_whitespace().collect::<Vec<&str>>();

        let timestamp = fields
            .first()
            .and_then(|field| field.parse::<Tick>().ok())
            .ok_or_else(malformed)?;

        match fields[1..] {
            [word] if is_quit(word) => Ok(Command::quit(timestamp)),
            [label, kind] => match kind.to_ascii_uppercase().as_str() {
                "S" | "SPAWN" => Command::spawn(timestamp, label),
                "T" | "TERMINATE" => Command::terminate(timestamp, label),
                _ => Err(malformed()),
            },
            _ => Err(malformed()),
        }
    }
}

fn is_quit(word: &str) -> bool {
    word.eq_ignore_ascii_case("EXIT") || word.eq_ignore_ascii_case("QUIT")
}
