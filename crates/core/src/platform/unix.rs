use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::fd::IntoRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use super::{Platform, TempFile, create_exclusive, parent_dir};

/// POSIX backend: `rename(2)` followed by an fsync of the parent directory.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnixPlatform;

impl Platform for UnixPlatform {
    type File = File;
    type Directory = File;

    const SYNC_DIRECTORY: bool = true;

    fn open_parent_directory(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECTORY)
            .open(parent_dir(path)?)
    }

    fn create_temp_file(&self, path: &Path) -> io::Result<TempFile<File>> {
        create_exclusive(path, |candidate| {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(candidate)
        })
    }

    // `sync_all` issues F_FULLFSYNC on Apple targets, where plain fsync stops
    // at the drive cache.
    fn flush_file(&self, file: &mut File) -> io::Result<()> {
        file.sync_all()
    }

    fn close_file(&self, file: File) -> io::Result<()> {
        close(file)
    }

    fn atomic_replace(&self, temp: &Path, dest: &Path) -> io::Result<()> {
        fs::rename(temp, dest)
    }

    fn flush_directory(&self, dir: &File) -> io::Result<()> {
        dir.sync_all()
    }

    fn close_directory(&self, dir: File) -> io::Result<()> {
        close(dir)
    }
}

/// Close the descriptor and report the result, which dropping a `File` would
/// discard.
fn close(file: File) -> io::Result<()> {
    let fd = file.into_raw_fd();
    // SAFETY: `fd` was just released by an owned `File`, so it is open and
    // closed exactly once here.
    if unsafe { libc::close(fd) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
