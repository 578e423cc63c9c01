//! The single message slot shared by the supervisor and its workers.
//!
//! Every slot of the table owns one signal: a channel of capacity one that
//! wakes exactly the worker occupying the slot. All workers share a single
//! acknowledgment channel back to the supervisor. The supervisor posts at
//! most one [`Envelope`] and then waits for its [`Ack`] before posting
//! again, so a single shared acknowledgment channel is enough to tell the
//! supervisor that the targeted worker is done.
//!
//! Each endpoint also carries a guard whose only purpose is to be dropped:
//! the supervisor watches the guard of the slot it is waiting on, so a
//! worker that ends without acknowledging is reported instead of waited on
//! forever.

use std::fmt::{self, Display};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use schedule::Tick;

use crate::slots::SlotIndex;
use crate::worker::WorkerId;

/// The longest line payload, in bytes, the mailbox carries.
pub const MAX_PAYLOAD_LEN: usize = 999;

/// The contents of the mailbox.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A corpus line for the worker to log.
    Line(String),

    /// The termination sentinel. The worker logs its summary and ends.
    Terminate,
}

impl Payload {
    /// Builds a line payload, truncating it to [`MAX_PAYLOAD_LEN`] bytes
    /// on a character boundary.
    pub fn line(text: &str) -> Payload {
        let mut end = text.len().min(MAX_PAYLOAD_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Payload::Line(text[..end].to_string())
    }
}

impl Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Line(line) => write!(f, "{}", line),
            Payload::Terminate => write!(f, "TERMINATE"),
        }
    }
}

/// A message written by the supervisor into the mailbox.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub payload: Payload,

    /// The tick at which the supervisor wrote the message.
    pub tick_stamp: Tick,

    /// The slot whose worker is signaled.
    pub target_slot: SlotIndex,
}

/// The acknowledgment a worker sends once it handled an [`Envelope`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ack {
    pub slot: SlotIndex,
    pub worker: WorkerId,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum MailboxError {
    #[error("slot {target} signaled while slot {in_flight} has not acknowledged")]
    Busy {
        in_flight: SlotIndex,
        target: SlotIndex,
    },

    #[error("waiting for an acknowledgment while no message is in flight")]
    NothingInFlight,

    #[error("expected an acknowledgment from slot {expected}, got one from slot {received}")]
    UnexpectedAck {
        expected: SlotIndex,
        received: SlotIndex,
    },

    #[error("the worker in slot {slot} ended without acknowledging")]
    Disconnected { slot: SlotIndex },

    #[error("slot {0} has no signal")]
    NoSuchSlot(SlotIndex),

    #[error("the mailbox is closed")]
    Closed,
}

/// The half of the mailbox handed to a worker.
pub struct WorkerEndpoint {
    slot: SlotIndex,
    signal: Receiver<Envelope>,
    ack: Sender<Ack>,
    _alive: Sender<()>,
}

impl WorkerEndpoint {
    pub fn slot(&self) -> SlotIndex {
        self.slot
    }

    /// Blocks until the supervisor signals this slot.
    ///
    /// Returns [`None`] once the mailbox has been closed.
    pub fn wait(&self) -> Option<Envelope> {
        self.signal.recv().ok()
    }

    /// Wakes the supervisor. Returns false if the mailbox has been closed.
    pub fn acknowledge(&self, worker: WorkerId) -> bool {
        self.ack
            .send(Ack {
                slot: self.slot,
                worker,
            })
            .is_ok()
    }
}

struct Signal {
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
    // Disconnects once the endpoint of the current occupant is dropped.
    alive: Option<Receiver<()>>,
}

struct AckChannel {
    tx: Sender<Ack>,
    rx: Receiver<Ack>,
}

/// The supervisor's half of the mailbox together with the signal set.
///
/// The signals are created once and live as long as the mailbox; a worker
/// spawned into a slot reuses the signal of the previous occupant.
pub struct Mailbox {
    signals: Vec<Signal>,
    ack: Option<AckChannel>,
    in_flight: Option<SlotIndex>,
    posted: u64,
    acknowledged: u64,
}

impl Mailbox {
    /// Creates the mailbox with one signal per slot plus the shared
    /// acknowledgment signal.
    pub fn new(capacity: usize) -> Mailbox {
        let signals = (0..capacity)
            .map(|_| {
                let (tx, rx) = bounded(1);
                Signal {
                    tx,
                    rx,
                    alive: None,
                }
            })
            .collect();
        let (tx, rx) = bounded(1);
        Mailbox {
            signals,
            ack: Some(AckChannel { tx, rx }),
            in_flight: None,
            posted: 0,
            acknowledged: 0,
        }
    }

    /// Returns the number of signals, including the shared acknowledgment.
    pub fn signal_count(&self) -> usize {
        match self.ack {
            Some(_) => self.signals.len() + 1,
            None => 0,
        }
    }

    /// Returns the endpoint a worker occupying `slot` waits on.
    ///
    /// The mailbox watches the endpoint it handed out last for each slot.
    pub fn endpoint(&mut self, slot: SlotIndex) -> Result<WorkerEndpoint, MailboxError> {
        let ack = self.ack.as_ref().ok_or(MailboxError::Closed)?;
        let signal = self
            .signals
            .get_mut(slot)
            .ok_or(MailboxError::NoSuchSlot(slot))?;
        let (alive_tx, alive_rx) = bounded(0);
        signal.alive = Some(alive_rx);
        Ok(WorkerEndpoint {
            slot,
            signal: signal.rx.clone(),
            ack: ack.tx.clone(),
            _alive: alive_tx,
        })
    }

    /// Writes `envelope` and signals its target slot.
    ///
    /// Fails if the previous message has not been acknowledged yet.
    pub fn post(&mut self, envelope: Envelope) -> Result<(), MailboxError> {
        if self.ack.is_none() {
            return Err(MailboxError::Closed);
        }
        if let Some(in_flight) = self.in_flight {
            return Err(MailboxError::Busy {
                in_flight,
                target: envelope.target_slot,
            });
        }
        let target = envelope.target_slot;
        let signal = self
            .signals
            .get(target)
            .ok_or(MailboxError::NoSuchSlot(target))?;
        // The mailbox keeps a receiver for every signal, so this only fails
        // once the mailbox is closed.
        signal.tx.send(envelope).map_err(|_| MailboxError::Closed)?;
        self.in_flight = Some(target);
        self.posted += 1;
        Ok(())
    }

    /// Blocks until the worker signaled by the last [`Mailbox::post`]
    /// acknowledges.
    ///
    /// Fails with [`MailboxError::Disconnected`] if that worker drops its
    /// endpoint first.
    pub fn wait_ack(&mut self) -> Result<Ack, MailboxError> {
        let expected = self.in_flight.ok_or(MailboxError::NothingInFlight)?;
        let ack = self.ack.as_ref().ok_or(MailboxError::Closed)?;
        let alive = self
            .signals
            .get(expected)
            .and_then(|signal| signal.alive.as_ref());
        let received = match alive {
            Some(alive) => select! {
                recv(ack.rx) -> received => received.map_err(|_| MailboxError::Closed)?,
                // A worker acknowledges before it drops its endpoint, so the
                // ack may already be queued.
                recv(alive) -> _ => ack
                    .rx
                    .try_recv()
                    .map_err(|_| MailboxError::Disconnected { slot: expected })?,
            },
            None => ack.rx.recv().map_err(|_| MailboxError::Closed)?,
        };
        if received.slot != expected {
            return Err(MailboxError::UnexpectedAck {
                expected,
                received: received.slot,
            });
        }
        self.in_flight = None;
        self.acknowledged += 1;
        Ok(received)
    }

    /// Returns the slot whose acknowledgment is pending, if any.
    pub fn in_flight(&self) -> Option<SlotIndex> {
        self.in_flight
    }

    /// Returns the (posted, acknowledged) message counters.
    pub fn counters(&self) -> (u64, u64) {
        (self.posted, self.acknowledged)
    }

    /// Releases every signal.
    ///
    /// Workers blocked on their signal wake up with no message and end.
    pub fn close(&mut self) {
        self.signals.clear();
        self.ack = None;
        self.in_flight = None;
    }

    pub fn is_closed(&self) -> bool {
        self.ack.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    fn line(text: &str, slot: SlotIndex) -> Envelope {
        Envelope {
            payload: Payload::line(text),
            tick_stamp: 0,
            target_slot: slot,
        }
    }

    #[test]
    fn signal_set_size() {
        let mut mailbox = Mailbox::new(3);
        assert_eq!(mailbox.signal_count(), 4);
        mailbox.close();
        assert_eq!(mailbox.signal_count(), 0);
    }

    #[test]
    fn post_wait_ack() {
        let mut mailbox = Mailbox::new(2);
        let endpoint = mailbox.endpoint(1).unwrap();
        let worker = WorkerId::first();

        let handle = thread::spawn(move || {
            let envelope = endpoint.wait().unwrap();
            assert!(endpoint.acknowledge(worker));
            envelope
        });

        mailbox.post(line("hello", 1)).unwrap();
        assert_eq!(mailbox.in_flight(), Some(1));
        let ack = mailbox.wait_ack().unwrap();
        assert_eq!(ack, Ack { slot: 1, worker });
        assert_eq!(mailbox.in_flight(), None);
        assert_eq!(mailbox.counters(), (1, 1));

        assert_eq!(handle.join().unwrap(), line("hello", 1));
    }

    #[test]
    fn overlapping_post_is_flagged() {
        let mut mailbox = Mailbox::new(2);
        mailbox.post(line("first", 0)).unwrap();
        assert_eq!(
            mailbox.post(line("second", 1)),
            Err(MailboxError::Busy {
                in_flight: 0,
                target: 1
            })
        );
        assert_eq!(mailbox.counters(), (1, 0));
    }

    #[test]
    fn wait_without_post() {
        let mut mailbox = Mailbox::new(1);
        assert_eq!(mailbox.wait_ack(), Err(MailboxError::NothingInFlight));
    }

    #[test]
    fn ack_from_wrong_slot() {
        let mut mailbox = Mailbox::new(2);
        let stray = mailbox.endpoint(1).unwrap();
        mailbox.post(line("for slot 0", 0)).unwrap();
        assert!(stray.acknowledge(WorkerId::first()));
        assert_eq!(
            mailbox.wait_ack(),
            Err(MailboxError::UnexpectedAck {
                expected: 0,
                received: 1
            })
        );
    }

    #[test]
    fn dead_worker_is_reported() {
        let mut mailbox = Mailbox::new(2);
        let endpoint = mailbox.endpoint(1).unwrap();
        let handle = thread::spawn(move || {
            let _envelope = endpoint.wait();
            drop(endpoint);
        });

        mailbox.post(line("never acknowledged", 1)).unwrap();
        handle.join().unwrap();
        assert_eq!(
            mailbox.wait_ack(),
            Err(MailboxError::Disconnected { slot: 1 })
        );
    }

    #[test]
    fn ack_before_exit_is_kept() {
        let mut mailbox = Mailbox::new(1);
        let endpoint = mailbox.endpoint(0).unwrap();
        let worker = WorkerId::first();
        let handle = thread::spawn(move || {
            let _envelope = endpoint.wait();
            endpoint.acknowledge(worker);
        });

        mailbox.post(line("last", 0)).unwrap();
        handle.join().unwrap();
        assert_eq!(mailbox.wait_ack(), Ok(Ack { slot: 0, worker }));
    }

    #[test]
    fn unknown_slot() {
        let mut mailbox = Mailbox::new(1);
        assert!(matches!(mailbox.endpoint(1), Err(MailboxError::NoSuchSlot(1))));
        assert_eq!(mailbox.post(line("x", 4)), Err(MailboxError::NoSuchSlot(4)));
    }

    #[test]
    fn close_wakes_workers() {
        let mut mailbox = Mailbox::new(1);
        let endpoint = mailbox.endpoint(0).unwrap();
        let handle = thread::spawn(move || endpoint.wait());
        mailbox.close();
        assert_eq!(handle.join().unwrap(), None);
        assert!(mailbox.is_closed());
        assert_eq!(mailbox.post(line("late", 0)), Err(MailboxError::Closed));
    }

    #[test]
    fn payload_truncation() {
        let long = "é".repeat(MAX_PAYLOAD_LEN);
        let Payload::Line(truncated) = Payload::line(&long) else {
            unreachable!()
        };
        assert!(truncated.len() <= MAX_PAYLOAD_LEN);
        assert!(long.starts_with(&truncated));
        assert_eq!(Payload::line("short"), Payload::Line("short".to_string()));
    }
}
