use std::fmt::{self, Display};
use std::io::{self, Write};
use std::num::NonZeroUsize;

use log::debug;
use schedule::Tick;

use crate::mailbox::{Payload, WorkerEndpoint};
use crate::slots::SlotIndex;

/// The identity of one worker execution context.
///
/// Identities start from 1 and are never reused, even when a worker is
/// spawned into the slot of a terminated one.
#[derive(PartialEq, Eq, Copy, Clone, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct WorkerId(NonZeroUsize);

impl WorkerId {
    pub fn new(id: usize) -> Option<WorkerId> {
        NonZeroUsize::new(id).map(WorkerId)
    }

    pub fn first() -> WorkerId {
        WorkerId(NonZeroUsize::MIN)
    }

    /// Returns the identity handed out after this one.
    pub fn next(self) -> WorkerId {
        WorkerId(self.0.saturating_add(1))
    }
}

impl PartialEq<usize> for WorkerId {
    fn eq(&self, other: &usize) -> bool {
        self.0.get() == *other
    }
}

impl Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a worker hands back to the supervisor when its thread ends.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReport {
    pub worker: WorkerId,
    pub slot: SlotIndex,

    /// The number of lines the worker received.
    pub lines_received: u64,

    /// The tick at which the worker was spawned.
    pub activation_tick: Tick,

    /// The tick stamped on the termination sentinel.
    ///
    /// This is [`None`] if the mailbox was closed before the worker
    /// received the sentinel.
    pub end_tick: Option<Tick>,

    /// The first error the worker hit while writing its log.
    pub log_error: Option<String>,
}

impl WorkerReport {
    /// Returns the number of ticks the worker was active.
    pub fn active_span(&self) -> Option<Tick> {
        self.end_tick
            .map(|end_tick| end_tick.saturating_sub(self.activation_tick))
    }
}

#[derive(Default)]
struct WorkerState {
    lines_received: u64,
    end_tick: Option<Tick>,
}

/// A worker: waits on its slot signal, logs what it receives and
/// acknowledges each message until it receives the termination sentinel.
pub struct Worker {
    id: WorkerId,
    endpoint: WorkerEndpoint,
    activation_tick: Tick,
    log: Box<dyn Write + Send>,
    log_error: Option<io::Error>,
    state: WorkerState,
}

impl Worker {
    pub fn new(
        id: WorkerId,
        endpoint: WorkerEndpoint,
        activation_tick: Tick,
        log: Box<dyn Write + Send>,
    ) -> Worker {
        Worker {
            id,
            endpoint,
            activation_tick,
            log,
            log_error: None,
            state: WorkerState::default(),
        }
    }

    /// Runs the worker until it is terminated.
    pub fn run_loop(mut self) -> WorkerReport {
        while let Some(envelope) = self.endpoint.wait() {
            let tick = envelope.tick_stamp;
            match envelope.payload {
                Payload::Terminate => {
                    debug!("[t = {}] Worker[{}] received TERMINATE", tick, self.id);
                    self.state.end_tick = Some(tick);
                    self.write_log(&format!(
                        "[t = {}] Worker[{}] received TERMINATE message. Exiting.",
                        tick, self.id
                    ));
                    self.write_summary(tick);
                    self.flush_log();
                    self.endpoint.acknowledge(self.id);
                    break;
                }
                Payload::Line(line) => {
                    debug!("[t = {}] Worker[{}] received message: {}", tick, self.id, line);
                    self.write_log(&format!(
                        "[t = {}] Worker[{}] received message: {}",
                        tick, self.id, line
                    ));
                    self.state.lines_received += 1;
                    self.flush_log();
                    if !self.endpoint.acknowledge(self.id) {
                        break;
                    }
                }
            }
        }

        if self.state.end_tick.is_none() {
            debug!("Worker[{}] stopped without a TERMINATE message", self.id);
        }

        WorkerReport {
            worker: self.id,
            slot: self.endpoint.slot(),
            lines_received: self.state.lines_received,
            activation_tick: self.activation_tick,
            end_tick: self.state.end_tick,
            log_error: self.log_error.map(|error| error.to_string()),
        }
    }

    fn write_summary(&mut self, end_tick: Tick) {
        let span = end_tick.saturating_sub(self.activation_tick);
        self.write_log(&format!(
            "Worker[{}] terminated. Total lines received: {}, Active time: {} - {} = {} steps",
            self.id, self.state.lines_received, end_tick, self.activation_tick, span
        ));
    }

    fn write_log(&mut self, line: &str) {
        if let Err(error) = writeln!(self.log, "{}", line) {
            self.log_error.get_or_insert(error);
        }
    }

    fn flush_log(&mut self) {
        if let Err(error) = self.log.flush() {
            self.log_error.get_or_insert(error);
        }
    }
}
