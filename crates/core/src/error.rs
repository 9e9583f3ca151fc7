use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Stage of the atomic write sequence that produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    OpenDirectory,
    CreateTemp,
    Write,
    SyncFile,
    CloseFile,
    Replace,
    SyncDirectory,
    CloseDirectory,
    /// The blocking task running the write panicked or was cancelled.
    Join,
}

impl Step {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenDirectory => "opening the parent directory",
            Self::CreateTemp => "creating the temporary file",
            Self::Write => "writing the temporary file",
            Self::SyncFile => "syncing the temporary file",
            Self::CloseFile => "closing the temporary file",
            Self::Replace => "replacing the destination",
            Self::SyncDirectory => "syncing the parent directory",
            Self::CloseDirectory => "closing the parent directory",
            Self::Join => "joining the write task",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single failure reported by an atomic write.
///
/// Callers that only care whether the write happened can treat every value as
/// "destination unchanged". [`AtomicWriteError::is_replaced`] separates the
/// rare case where the rename already landed but the directory entry could
/// not be confirmed durable.
#[derive(Debug, Error)]
#[error("could not write {} atomically: {step} failed", .path.display())]
pub struct AtomicWriteError {
    path: PathBuf,
    step: Step,
    #[source]
    source: io::Error,
}

impl AtomicWriteError {
    pub fn new(path: &Path, step: Step, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            step,
            source,
        }
    }

    /// Destination the write was aimed at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Underlying OS error.
    pub fn io_error(&self) -> &io::Error {
        &self.source
    }

    /// True when the destination already holds the new content and only its
    /// durability is unconfirmed.
    pub fn is_replaced(&self) -> bool {
        matches!(self.step, Step::SyncDirectory | Step::CloseDirectory)
    }
}

impl From<AtomicWriteError> for io::Error {
    fn from(err: AtomicWriteError) -> Self {
        io::Error::new(err.source.kind(), err)
    }
}
