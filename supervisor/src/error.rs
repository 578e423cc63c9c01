use std::io;

use schedule::{CorpusError, Label};

use crate::mailbox::MailboxError;
use crate::slots::SlotIndex;
use crate::worker::WorkerId;

/// Errors that stop a supervisor run.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("the number of slots must be a positive integer")]
    ZeroCapacity,

    #[error("failed to read a corpus line")]
    Corpus(#[from] CorpusError),

    #[error("mailbox protocol failure")]
    Mailbox(#[from] MailboxError),

    #[error("failed to open the log of Worker[{worker}]")]
    WorkerLog {
        worker: WorkerId,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn worker {label}")]
    Spawn {
        label: Label,
        #[source]
        source: io::Error,
    },

    #[error("slot {slot} has no worker to terminate")]
    EmptySlot { slot: SlotIndex },

    #[error("worker in slot {slot} panicked")]
    WorkerPanicked { slot: SlotIndex },
}
