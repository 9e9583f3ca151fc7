//! Platform primitives behind the atomic write sequence.
//!
//! The orchestrator in [`crate::write`] only talks to the [`Platform`] trait.
//! One implementation per operating system is compiled in and exported as
//! [`NativePlatform`].

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distributions::Alphanumeric;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;
#[cfg(windows)]
pub use windows::WindowsPlatform;

#[cfg(unix)]
pub type NativePlatform = UnixPlatform;
#[cfg(windows)]
pub type NativePlatform = WindowsPlatform;

/// Names tried before temp-file creation gives up.
pub const TEMP_NAME_ATTEMPTS: usize = 64;

const SUFFIX_LEN: usize = 6;

/// A freshly created, exclusively owned staging file.
#[derive(Debug)]
pub struct TempFile<F> {
    pub file: F,
    pub path: PathBuf,
}

/// Primitive operations the atomic write sequence is built from.
pub trait Platform {
    type File: Write;
    type Directory;

    /// Whether the parent directory must be flushed after the replace for the
    /// rename itself to survive a crash.
    const SYNC_DIRECTORY: bool;

    /// Open the destination's parent directory read-only.
    fn open_parent_directory(&self, path: &Path) -> io::Result<Self::Directory>;

    /// Create an empty file next to `path` under a name nobody else holds.
    fn create_temp_file(&self, path: &Path) -> io::Result<TempFile<Self::File>>;

    /// Hand the whole of `data` to the OS, resuming after short writes.
    fn write_all(&self, file: &mut Self::File, data: &[u8]) -> io::Result<()> {
        write_fully(file, data)
    }

    fn flush_file(&self, file: &mut Self::File) -> io::Result<()>;

    fn close_file(&self, file: Self::File) -> io::Result<()>;

    /// Move `temp` over `dest`, whether or not `dest` exists.
    fn atomic_replace(&self, temp: &Path, dest: &Path) -> io::Result<()>;

    fn flush_directory(&self, dir: &Self::Directory) -> io::Result<()>;

    fn close_directory(&self, dir: Self::Directory) -> io::Result<()>;

    /// Remove a staging file left behind by a failed write.
    fn remove_temp(&self, temp: &Path) -> io::Result<()> {
        fs::remove_file(temp)
    }
}

/// Directory holding `path`, with bare file names resolving to `.`.
pub fn parent_dir(path: &Path) -> io::Result<&Path> {
    if path.file_name().is_none() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} does not name a file", path.display()),
        ));
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent),
        _ => Ok(Path::new(".")),
    }
}

/// Candidate staging name: the destination's base name plus a random suffix.
pub fn temp_candidate(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} does not name a file", path.display()),
        )
    })?;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    let mut temp = OsString::from(name);
    temp.push(".");
    temp.push(suffix);
    Ok(path.with_file_name(temp))
}

/// Create a staging file next to `path` using `open`, which must refuse to
/// open an existing file. Collisions are retried with a fresh name.
pub fn create_exclusive<F>(
    path: &Path,
    mut open: impl FnMut(&Path) -> io::Result<F>,
) -> io::Result<TempFile<F>> {
    for _ in 0..TEMP_NAME_ATTEMPTS {
        let candidate = temp_candidate(path)?;
        match open(&candidate) {
            Ok(file) => {
                return Ok(TempFile {
                    file,
                    path: candidate,
                });
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(candidate = %candidate.display(), "temporary name taken");
            }
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free temporary name after {TEMP_NAME_ATTEMPTS} attempts"),
    ))
}

/// Write every byte of `data`, looping over short and interrupted writes.
pub fn write_fully<W: Write + ?Sized>(writer: &mut W, mut data: &[u8]) -> io::Result<()> {
    while !data.is_empty() {
        match writer.write(data) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "write accepted no bytes",
                ));
            }
            Ok(n) => data = &data[n..],
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
