use std::mem;
use std::num::NonZeroUsize;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use rand::Rng;
use schedule::{Command, CommandKind, Corpus, Label, Schedule, Tick};

use crate::error::SupervisorError;
use crate::event::Event;
use crate::mailbox::{Ack, Envelope, Mailbox, MailboxError, Payload};
use crate::select::{random_active, random_line};
use crate::sink::LogSink;
use crate::slots::{SlotIndex, SlotTable};
use crate::worker::{Worker, WorkerId, WorkerReport};

/// The supervisor of a pool of workers.
///
/// The supervisor owns the slot table and the mailbox. Every message it
/// writes into the mailbox is acknowledged before the next one is written,
/// so at most one worker is ever processing a message.
///
/// Dropping the supervisor closes the mailbox and joins every worker that
/// is still running, whether or not [`Supervisor::run`] completed.
pub struct Supervisor<C, S, R> {
    corpus: C,
    sink: S,
    rng: R,
    mailbox: Mailbox,
    slots: SlotTable<JoinHandle<WorkerReport>>,
    next_worker: WorkerId,
    events: Vec<Event>,
    reported_empty_corpus: bool,
}

impl<C, S, R> Supervisor<C, S, R>
where
    C: Corpus,
    S: LogSink,
    R: Rng,
{
    /// Creates a supervisor with `capacity` slots.
    ///
    /// * `corpus` - the lines delivered to the workers.
    /// * `sink` - where the workers write their logs.
    /// * `rng` - the source of the random worker and line choices.
    pub fn new(capacity: usize, corpus: C, sink: S, rng: R) -> Result<Self, SupervisorError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(SupervisorError::ZeroCapacity)?;
        let mailbox = Mailbox::new(capacity.get());
        debug!("Mailbox ready with {} signals", mailbox.signal_count());
        Ok(Supervisor {
            corpus,
            sink,
            rng,
            mailbox,
            slots: SlotTable::new(capacity),
            next_worker: WorkerId::first(),
            events: vec![],
            reported_empty_corpus: false,
        })
    }

    /// Runs the simulation from tick 0 up to and including the quit tick
    /// of `schedule`, then terminates the remaining workers and releases
    /// the mailbox.
    ///
    /// Returns every decision taken, in order. A supervisor runs once; the
    /// mailbox is closed afterwards.
    pub fn run(&mut self, schedule: &Schedule) -> Result<Vec<Event>, SupervisorError> {
        let quit = schedule.quit_tick();
        info!(
            "Simulating ticks 0 to {} with {} slots and {} corpus lines",
            quit,
            self.slots.capacity(),
            self.corpus.line_count()
        );

        for tick in 0..=quit {
            self.record(Event::TickStarted(tick));
            for command in schedule.at(tick) {
                self.apply(tick, command)?;
            }
            if self.slots.active_count() > 0 {
                self.deliver(tick)?;
            }
        }

        for slot in self.slots.active_slots() {
            self.terminate(quit, slot)?;
        }

        let (posted, acknowledged) = self.mailbox.counters();
        info!("Simulation done, {} messages posted, {} acknowledged", posted, acknowledged);
        self.mailbox.close();
        Ok(mem::take(&mut self.events))
    }

    pub fn slots(&self) -> &SlotTable<JoinHandle<WorkerReport>> {
        &self.slots
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    fn apply(&mut self, tick: Tick, command: &Command) -> Result<(), SupervisorError> {
        match &command.kind {
            CommandKind::Spawn(label) => self.spawn(tick, label),
            CommandKind::Terminate(label) => match self.slots.find_by_label(label) {
                Some(slot) => self.terminate(tick, slot),
                None => {
                    self.record(Event::UnknownLabel {
                        tick,
                        label: label.clone(),
                    });
                    Ok(())
                }
            },
            CommandKind::Quit => Ok(()),
        }
    }

    fn spawn(&mut self, tick: Tick, label: &Label) -> Result<(), SupervisorError> {
        let Some(slot) = self.slots.free_slot() else {
            self.record(Event::SpawnRejected {
                tick,
                label: label.clone(),
            });
            return Ok(());
        };

        let worker = self.next_worker;
        self.next_worker = worker.next();

        let log = self
            .sink
            .open(worker)
            .map_err(|source| SupervisorError::WorkerLog { worker, source })?;
        let endpoint = self.mailbox.endpoint(slot)?;
        let handle = thread::Builder::new()
            .name(format!("worker-{}", worker))
            .spawn(move || Worker::new(worker, endpoint, tick, log).run_loop())
            .map_err(|source| SupervisorError::Spawn {
                label: label.clone(),
                source,
            })?;

        let occupied = self.slots.occupy(slot, handle, label.clone(), worker, tick);
        debug_assert!(occupied, "slot {} was reported free", slot);

        self.record(Event::Spawned {
            tick,
            slot,
            label: label.clone(),
            worker,
        });
        Ok(())
    }

    fn terminate(&mut self, tick: Tick, slot: SlotIndex) -> Result<(), SupervisorError> {
        let label = self
            .slots
            .get(slot)
            .filter(|entry| entry.is_active())
            .and_then(|entry| entry.label.clone())
            .ok_or(SupervisorError::EmptySlot { slot })?;

        self.mailbox.post(Envelope {
            payload: Payload::Terminate,
            tick_stamp: tick,
            target_slot: slot,
        })?;
        self.record(Event::TerminateSent {
            tick,
            slot,
            label: label.clone(),
        });
        self.wait_ack()?;

        let handle = self
            .slots
            .release(slot, tick)
            .ok_or(SupervisorError::EmptySlot { slot })?;
        let report = handle
            .join()
            .map_err(|_| SupervisorError::WorkerPanicked { slot })?;
        if let Some(error) = &report.log_error {
            warn!("Worker[{}] could not write its log: {}", report.worker, error);
        }

        self.record(Event::Terminated {
            tick,
            label,
            report,
        });
        Ok(())
    }

    fn deliver(&mut self, tick: Tick) -> Result<(), SupervisorError> {
        let Some(slot) = random_active(&self.slots, &mut self.rng) else {
            return Ok(());
        };
        let Some(line) = random_line(&self.corpus, &mut self.rng)? else {
            if !self.reported_empty_corpus {
                self.reported_empty_corpus = true;
                self.record(Event::NoLines { tick });
            }
            return Ok(());
        };
        let worker = self
            .slots
            .get(slot)
            .and_then(|entry| entry.worker)
            .ok_or(SupervisorError::EmptySlot { slot })?;

        let payload = Payload::line(&line);
        let sent = payload.to_string();
        self.mailbox.post(Envelope {
            payload,
            tick_stamp: tick,
            target_slot: slot,
        })?;
        self.record(Event::Delivered {
            tick,
            slot,
            worker,
            line: sent,
        });

        let ack = self.wait_ack()?;
        self.record(Event::Acknowledged {
            tick,
            slot,
            worker: ack.worker,
        });
        Ok(())
    }

    /// Waits for the acknowledgment of the message in flight.
    ///
    /// A worker that ended without acknowledging is joined and reported.
    fn wait_ack(&mut self) -> Result<Ack, SupervisorError> {
        match self.mailbox.wait_ack() {
            Ok(ack) => Ok(ack),
            Err(MailboxError::Disconnected { slot }) => {
                let handle = self
                    .slots
                    .vacate(slot)
                    .ok_or(SupervisorError::EmptySlot { slot })?;
                match handle.join() {
                    Err(_) => Err(SupervisorError::WorkerPanicked { slot }),
                    Ok(_) => Err(MailboxError::Disconnected { slot }.into()),
                }
            }
            Err(error) => Err(error.into()),
        }
    }

    fn record(&mut self, event: Event) {
        match event {
            Event::TickStarted(_) | Event::Acknowledged { .. } => debug!("{}", event),
            _ if event.is_warning() => warn!("{}", event),
            _ => info!("{}", event),
        }
        self.events.push(event);
    }
}

impl<C, S, R> Drop for Supervisor<C, S, R> {
    fn drop(&mut self) {
        self.mailbox.close();
        for slot in self.slots.active_slots() {
            if let Some(handle) = self.slots.vacate(slot) {
                match handle.join() {
                    Ok(report) => debug!(
                        "Worker[{}] in slot {} stopped at teardown after {} lines",
                        report.worker, slot, report.lines_received
                    ),
                    Err(_) => warn!("worker in slot {} panicked", slot),
                }
            }
        }
    }
}

/// Runs a whole simulation: creates a supervisor with `capacity` slots,
/// runs `schedule` and tears everything down.
pub fn run<C, S, R>(
    schedule: &Schedule,
    corpus: C,
    capacity: usize,
    sink: S,
    rng: R,
) -> Result<Vec<Event>, SupervisorError>
where
    C: Corpus,
    S: LogSink,
    R: Rng,
{
    Supervisor::new(capacity, corpus, sink, rng)?.run(schedule)
}
