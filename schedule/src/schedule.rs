use std::fs;
use std::path::Path;

use log::warn;

use crate::command::{Command, Tick};
use crate::error::ScheduleError;

/// A validated, ordered list of commands.
///
/// A schedule always holds exactly one quit command; its timestamp is the
/// last tick the supervisor runs. Commands keep the order they were
/// authored in, which is also the order same-tick commands are applied in.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    commands: Vec<Command>,
    quit: Tick,
}

impl Schedule {
    /// Builds a schedule from already parsed commands.
    pub fn new(commands: Vec<Command>) -> Result<Schedule, ScheduleError> {
        let mut quit = None;
        for command in commands.iter().filter(|command| command.is_quit()) {
            match quit {
                None => quit = Some(command.timestamp),
                Some(first) => {
                    return Err(ScheduleError::DuplicateQuit {
                        first,
                        second: command.timestamp,
                    })
                }
            }
        }
        let quit = quit.ok_or(ScheduleError::MissingQuit)?;

        for command in commands.iter().filter(|command| command.timestamp > quit) {
            warn!("command `{}` is scheduled after EXIT at t = {} and will never run", command, quit);
        }

        Ok(Schedule { commands, quit })
    }

    /// Parses a schedule from its text form.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Schedule, ScheduleError> {
        let mut commands = vec![];
        for (number, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let command = trimmed
                .parse::<Command>()
                .map_err(|source| ScheduleError::AtLine {
                    line: number + 1,
                    source: Box::new(source),
                })?;
            commands.push(command);
        }
        Schedule::new(commands)
    }

    /// Reads and parses the schedule stored at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Schedule, ScheduleError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ScheduleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Schedule::parse(&text)
    }

    /// The tick of the quit command.
    pub fn quit_tick(&self) -> Tick {
        self.quit
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns the commands scheduled for `tick`, in authored order.
    pub fn at(&self, tick: Tick) -> impl Iterator<Item = &Command> {
        self.commands
            .iter()
            .filter(move |command| command.timestamp == tick)
    }
}
