use std::io;
use std::path::PathBuf;

use crate::Tick;

/// Errors produced while reading or validating a schedule.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("malformed schedule record: {0:?}")]
    Malformed(String),

    #[error("invalid worker label: {0:?}")]
    InvalidLabel(String),

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<ScheduleError>,
    },

    #[error("EXIT command not found in schedule")]
    MissingQuit,

    #[error("schedule has more than one EXIT command (ticks {first} and {second})")]
    DuplicateQuit { first: Tick, second: Tick },

    #[error("failed to read schedule {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors produced while reading a corpus.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read corpus {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {index} is out of range, the corpus has {count} lines")]
    OutOfRange { index: usize, count: usize },
}
