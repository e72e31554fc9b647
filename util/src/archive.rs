//! Struct archiving functionality
//!
//! To add archiving functionality to a struct implement the `Archived` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Number of records buffered before an archive is flushed to disk.
pub const DEFAULT_FLUSH_INTERVAL: usize = 50;

/// An object used to write CSV archive files.
///
/// Records are buffered and written to disk every `flush_interval` records, on `flush` and when
/// the archiver is dropped.
///
/// A default archiver is not attached to any file and discards every record, which lets modules
/// run without a session (in tests for example).
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>,
    flush_interval: usize,
    num_unflushed: usize,
}

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file: {0}")]
    CreateError(std::io::Error),

    #[error("Cannot write the archive record: {0}")]
    WriteError(#[from] csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(std::io::Error),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a csv.
///
/// To implement this trait, the struct shall have an `Archiver` member which is setup in the
/// struct's `init` or `new` functions.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;

    /// Write any buffered records to disk
    fn flush_archives(&mut self) -> Result<(), ArchiveError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        Self::from_abs_path(session.arch_root.join(path))
    }

    /// Create a new archiver writing to the given file, truncating it if it already exists.
    pub fn from_abs_path<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(ArchiveError::CreateError)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(ArchiveError::CreateError)?;

        let w = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: Some(w),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            num_unflushed: 0,
        })
    }

    /// Flush to disk every `interval` records. An interval of zero or one flushes every record.
    pub fn with_flush_interval(mut self, interval: usize) -> Self {
        self.flush_interval = interval;
        self
    }

    /// True if this archiver is writing to a file.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        if let Some(ref mut w) = self.writer {
            w.serialize(record)?;
            self.num_unflushed += 1;

            if self.num_unflushed >= self.flush_interval {
                self.flush()?;
            }
        }

        Ok(())
    }

    /// Write all buffered records to disk.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        if let Some(ref mut w) = self.writer {
            w.flush().map_err(ArchiveError::FlushError)?;
        }
        self.num_unflushed = 0;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Record {
        cycle: u64,
        accel_mps2: f64,
        pid_output: Option<f64>,
    }

    #[test]
    fn test_archiver_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long_ctrl/report.csv");

        let mut arch = Archiver::from_abs_path(&path).unwrap().with_flush_interval(1);
        assert!(arch.is_open());
        arch.serialise(Record { cycle: 0, accel_mps2: -0.2, pid_output: None }).unwrap();
        arch.serialise(Record { cycle: 1, accel_mps2: -0.5, pid_output: Some(0.5) }).unwrap();

        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["cycle,accel_mps2,pid_output", "0,-0.2,", "1,-0.5,0.5"]);
    }

    #[test]
    fn test_archiver_flushes_on_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let rec = |cycle| Record { cycle, accel_mps2: -0.2, pid_output: None };

        let mut arch = Archiver::from_abs_path(&path).unwrap().with_flush_interval(3);
        arch.serialise(rec(0)).unwrap();
        arch.serialise(rec(1)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        arch.serialise(rec(2)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);

        arch.serialise(rec(3)).unwrap();
        arch.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 5);
    }

    #[test]
    fn test_default_archiver_discards() {
        let mut arch = Archiver::default();
        assert!(!arch.is_open());
        assert!(arch.serialise(Record { cycle: 0, accel_mps2: 0.0, pid_output: None }).is_ok());
    }
}
