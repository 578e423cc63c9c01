use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::CorpusError;

/// A line oriented text source the supervisor draws messages from.
pub trait Corpus {
    /// Returns the number of lines available.
    fn line_count(&self) -> usize;

    /// Returns the line at `index`, without its line terminator.
    fn line(&self, index: usize) -> Result<String, CorpusError>;
}

/// A corpus backed by a text file.
///
/// Only the line count is kept in memory. Every fetch re-reads the file
/// from the start up to the requested line. Bytes that are not UTF-8 are
/// replaced rather than rejected.
#[derive(Debug)]
pub struct TextFile {
    path: PathBuf,
    count: usize,
}

impl TextFile {
    /// Opens the file at `path` and counts its lines.
    pub fn open(path: impl AsRef<Path>) -> Result<TextFile, CorpusError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = TextFile::reader(&path)?;
        let mut buf = vec![];
        let mut count = 0;
        while next_line(&mut reader, &mut buf).map_err(|source| CorpusError::Io {
            path: path.clone(),
            source,
        })? {
            count += 1;
        }
        Ok(TextFile { path, count })
    }

    fn reader(path: &Path) -> Result<BufReader<File>, CorpusError> {
        File::open(path)
            .map(BufReader::new)
            .map_err(|source| CorpusError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl Corpus for TextFile {
    fn line_count(&self) -> usize {
        self.count
    }

    fn line(&self, index: usize) -> Result<String, CorpusError> {
        let out_of_range = CorpusError::OutOfRange {
            index,
            count: self.count,
        };
        if index >= self.count {
            return Err(out_of_range);
        }
        let io_error = |source| CorpusError::Io {
            path: self.path.clone(),
            source,
        };
        let mut reader = TextFile::reader(&self.path)?;
        let mut buf = vec![];
        for _ in 0..=index {
            // The file shrank since it was opened.
            if !next_line(&mut reader, &mut buf).map_err(io_error)? {
                return Err(out_of_range);
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// An in-memory corpus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lines(Vec<String>);

impl Lines {
    pub fn new<I, S>(lines: I) -> Lines
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Lines(lines.into_iter().map(Into::into).collect())
    }

    /// Returns true if `line` is one of the corpus lines.
    pub fn contains(&self, line: &str) -> bool {
        self.0.iter().any(|candidate| candidate == line)
    }
}

impl Corpus for Lines {
    fn line_count(&self) -> usize {
        self.0.len()
    }

    fn line(&self, index: usize) -> Result<String, CorpusError> {
        self.0
            .get(index)
            .cloned()
            .ok_or(CorpusError::OutOfRange {
                index,
                count: self.0.len(),
            })
    }
}

/// Reads the next line into `buf`, without its terminator.
///
/// Returns false at the end of the input.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(true)
}
