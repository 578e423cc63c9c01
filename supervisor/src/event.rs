use std::fmt::{self, Display};

use schedule::{Label, Tick};

use crate::slots::SlotIndex;
use crate::worker::{WorkerId, WorkerReport};

/// A decision taken by the supervisor, in the order it was taken.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The supervisor started processing a tick.
    TickStarted(Tick),

    /// A worker was spawned into a slot.
    Spawned {
        tick: Tick,
        slot: SlotIndex,
        label: Label,
        worker: WorkerId,
    },

    /// A spawn command was dropped because every slot is occupied.
    SpawnRejected { tick: Tick, label: Label },

    /// A corpus line was written into the mailbox.
    Delivered {
        tick: Tick,
        slot: SlotIndex,
        worker: WorkerId,
        line: String,
    },

    /// The worker targeted by the last write acknowledged it.
    Acknowledged {
        tick: Tick,
        slot: SlotIndex,
        worker: WorkerId,
    },

    /// The termination sentinel was written into the mailbox.
    TerminateSent {
        tick: Tick,
        slot: SlotIndex,
        label: Label,
    },

    /// A worker ended and its slot was freed.
    Terminated {
        tick: Tick,
        label: Label,
        report: WorkerReport,
    },

    /// A terminate command named no active worker.
    UnknownLabel { tick: Tick, label: Label },

    /// Workers are active but the corpus has no line to deliver.
    NoLines { tick: Tick },
}

impl Event {
    pub fn tick(&self) -> Tick {
        match self {
            Event::TickStarted(tick) => *tick,
            Event::Spawned { tick, .. }
            | Event::SpawnRejected { tick, .. }
            | Event::Delivered { tick, .. }
            | Event::Acknowledged { tick, .. }
            | Event::TerminateSent { tick, .. }
            | Event::Terminated { tick, .. }
            | Event::UnknownLabel { tick, .. }
            | Event::NoLines { tick } => *tick,
        }
    }

    /// Returns true for events that report a recoverable problem.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::SpawnRejected { .. } | Event::UnknownLabel { .. } | Event::NoLines { .. }
        )
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[t = {}] ", self.tick())?;
        match self {
            Event::TickStarted(_) => write!(f, "tick"),
            Event::Spawned {
                slot,
                label,
                worker,
                ..
            } => write!(f, "Spawned worker {} (Worker[{}]) in slot {}", label, worker, slot),
            Event::SpawnRejected { label, .. } => {
                write!(f, "Warning: no free slot, spawn of {} skipped", label)
            }
            Event::Delivered {
                slot, worker, line, ..
            } => write!(f, "Sent message to slot {} (Worker[{}]): {}", slot, worker, line),
            Event::Acknowledged { slot, worker, .. } => {
                write!(f, "Slot {} (Worker[{}]) acknowledged", slot, worker)
            }
            Event::TerminateSent { slot, label, .. } => {
                write!(f, "Sent TERMINATE message to slot {} ({})", slot, label)
            }
            Event::Terminated { label, report, .. } => {
                write!(
                    f,
                    "Worker {} (Worker[{}]) in slot {} has terminated, {} lines received",
                    label, report.worker, report.slot, report.lines_received
                )?;
                if let Some(span) = report.active_span() {
                    write!(f, ", active for {} steps", span)?;
                }
                Ok(())
            }
            Event::UnknownLabel { label, .. } => write!(
                f,
                "Warning: Terminate command issued for non-existent or inactive worker: {}",
                label
            ),
            Event::NoLines { .. } => write!(f, "Warning: the corpus has no lines to send"),
        }
    }
}

/// Format the [`Event`]s returned by a supervisor run to a [`String`],
/// one event per line.
pub fn format_events(events: &[Event]) -> String {
    let mut s = String::new();
    for event in events {
        s.push_str(&event.to_string());
        s.push('\n');
    }
    s
}
