use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::iter;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::fs::OpenOptionsExt;
use std::os::windows::io::IntoRawHandle;
use std::path::Path;

use winapi::um::handleapi::CloseHandle;
use winapi::um::winbase::{
    FILE_FLAG_BACKUP_SEMANTICS, MOVEFILE_REPLACE_EXISTING, MOVEFILE_WRITE_THROUGH, MoveFileExW,
};
use winapi::um::winnt::HANDLE;

use super::{Platform, TempFile, create_exclusive, parent_dir};

/// Windows backend: a write-through `MoveFileExW` persists the directory
/// entry itself, so no separate directory flush is issued.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowsPlatform;

impl Platform for WindowsPlatform {
    type File = File;
    type Directory = File;

    const SYNC_DIRECTORY: bool = false;

    fn open_parent_directory(&self, path: &Path) -> io::Result<File> {
        // Directories can only be opened with backup semantics.
        OpenOptions::new()
            .read(true)
            .custom_flags(FILE_FLAG_BACKUP_SEMANTICS)
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

    // FlushFileBuffers
    fn flush_file(&self, file: &mut File) -> io::Result<()> {
        file.sync_all()
    }

    fn close_file(&self, file: File) -> io::Result<()> {
        close(file)
    }

    fn atomic_replace(&self, temp: &Path, dest: &Path) -> io::Result<()> {
        let from = wide(temp.as_os_str());
        let to = wide(dest.as_os_str());
        // SAFETY: both buffers are NUL-terminated UTF-16 and outlive the call.
        let ok = unsafe {
            MoveFileExW(
                from.as_ptr(),
                to.as_ptr(),
                MOVEFILE_REPLACE_EXISTING | MOVEFILE_WRITE_THROUGH,
            )
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn flush_directory(&self, _dir: &File) -> io::Result<()> {
        Ok(())
    }

    fn close_directory(&self, dir: File) -> io::Result<()> {
        close(dir)
    }
}

fn wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(iter::once(0)).collect()
}

fn close(file: File) -> io::Result<()> {
    let handle = file.into_raw_handle() as HANDLE;
    // SAFETY: the handle was just released by an owned `File` and is closed
    // exactly once here.
    if unsafe { CloseHandle(handle) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
