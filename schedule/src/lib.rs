//! A schedule library.
//!
//! This library provides the inputs of a supervisor simulation: the
//! timestamped commands that drive it and the corpus of text lines it
//! delivers to its workers.
//!
//! A schedule file holds one command per line:
//!
//! ```text
//! 0 C1 S
//! 2 C2 S
//! 5 C1 T
//! 8 EXIT
//! ```

mod command;
mod corpus;
mod error;
mod schedule;

pub use crate::command::{Command, CommandKind, Label, Tick, MAX_LABEL_LEN};
pub use crate::corpus::{Corpus, Lines, TextFile};
pub use crate::error::{CorpusError, ScheduleError};
pub use crate::schedule::Schedule;
