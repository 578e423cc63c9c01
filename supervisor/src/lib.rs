//! A supervisor simulation library
//!
//! A [`Supervisor`] drives a pool of worker threads from a
//! [`schedule::Schedule`]. On every tick it applies the commands scheduled
//! for that tick, then writes one random corpus line into the [`Mailbox`]
//! for one random active worker and waits for the worker to acknowledge it.
//!
//! ## Example
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use schedule::{Lines, Schedule};
//! use supervisor::{format_events, MemorySink};
//!
//! let schedule = Schedule::parse("0 C1 S\n2 C2 S\n5 C1 T\n8 EXIT").unwrap();
//! let corpus = Lines::new(["first line", "second line", "third line"]);
//!
//! let events = supervisor::run(&schedule, corpus, 2, MemorySink::new(), StdRng::seed_from_u64(1))
//!     .unwrap();
//!
//! println!("{}", format_events(&events));
//! ```

mod error;
mod event;
pub mod mailbox;
mod select;
mod sink;
mod slots;
mod supervisor;
pub mod worker;

pub use crate::error::SupervisorError;
pub use crate::event::{format_events, Event};
pub use crate::mailbox::{Mailbox, MailboxError, Payload, MAX_PAYLOAD_LEN};
pub use crate::select::{random_active, random_line};
pub use crate::sink::{LogDir, LogSink, MemorySink};
pub use crate::slots::{Slot, SlotIndex, SlotTable};
pub use crate::supervisor::{run, Supervisor};
pub use crate::worker::{WorkerId, WorkerReport};
