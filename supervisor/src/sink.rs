use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::worker::WorkerId;

/// Where workers write their logs.
pub trait LogSink {
    /// Opens a fresh log for `worker`.
    ///
    /// The supervisor opens the log of each worker once, before the worker
    /// starts.
    fn open(&self, worker: WorkerId) -> io::Result<Box<dyn Write + Send>>;
}

/// Writes one `worker[<id>].log` file per worker into a directory.
///
/// Worker identities restart from 1 on every run, so opening a log
/// replaces the file a previous run left behind.
#[derive(Debug, Clone)]
pub struct LogDir {
    dir: PathBuf,
}

impl LogDir {
    pub fn new(dir: impl Into<PathBuf>) -> LogDir {
        LogDir { dir: dir.into() }
    }

    /// Returns the path of the log file of `worker`.
    pub fn path(&self, worker: WorkerId) -> PathBuf {
        self.dir.join(format!("worker[{}].log", worker))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LogSink for LogDir {
    fn open(&self, worker: WorkerId) -> io::Result<Box<dyn Write + Send>> {
        fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.path(worker))?;
        Ok(Box::new(io::LineWriter::new(file)))
    }
}

type Buffer = Arc<Mutex<Vec<u8>>>;

/// Keeps worker logs in memory.
///
/// Clones share the same logs, so a clone can be handed to a supervisor
/// and inspected once the simulation is over.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    logs: Arc<Mutex<BTreeMap<WorkerId, Buffer>>>,
}

impl MemorySink {
    pub fn new() -> MemorySink {
        MemorySink::default()
    }

    /// Returns the log written by `worker`.
    pub fn contents(&self, worker: WorkerId) -> Option<String> {
        let logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        let buffer = logs.get(&worker)?;
        let bytes = buffer.lock().unwrap_or_else(PoisonError::into_inner);
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Returns the workers that opened a log, in order.
    pub fn workers(&self) -> Vec<WorkerId> {
        let logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        logs.keys().copied().collect()
    }
}

impl LogSink for MemorySink {
    fn open(&self, worker: WorkerId) -> io::Result<Box<dyn Write + Send>> {
        let mut logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        let buffer = logs.entry(worker).or_default().clone();
        Ok(Box::new(SharedBuffer(buffer)))
    }
}

struct SharedBuffer(Buffer);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
