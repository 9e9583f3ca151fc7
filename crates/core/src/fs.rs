use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, debug_span, warn};

use crate::error::{AtomicWriteError, Step};
use crate::platform::{NativePlatform, Platform, TempFile};

/// Atomically replace the contents of `path` with `data`.
///
/// Writes to a temporary file beside `path`, syncs it, renames it over `path`
/// and then syncs the parent directory so the rename survives a crash. On
/// error the destination is left as it was, unless
/// [`AtomicWriteError::is_replaced`] says otherwise.
pub fn write<P, D>(path: P, data: D) -> Result<(), AtomicWriteError>
where
    P: AsRef<Path>,
    D: AsRef<[u8]>,
{
    write_with(&NativePlatform::default(), path.as_ref(), data.as_ref())
}

/// Run the atomic write sequence against an explicit [`Platform`].
pub fn write_with<P: Platform>(
    platform: &P,
    path: &Path,
    data: &[u8],
) -> Result<(), AtomicWriteError> {
    let _span = debug_span!("atomic_write", path = %path.display(), bytes = data.len()).entered();
    let fail = |step: Step| move |source: io::Error| AtomicWriteError::new(path, step, source);

    let dir = platform
        .open_parent_directory(path)
        .map_err(fail(Step::OpenDirectory))?;
    let TempFile { file, path: temp } = platform
        .create_temp_file(path)
        .map_err(fail(Step::CreateTemp))?;
    debug!(temp = %temp.display(), "staging");

    if let Err((step, source)) = stage(platform, file, data) {
        discard(platform, &temp);
        return Err(fail(step)(source));
    }
    if let Err(source) = platform.atomic_replace(&temp, path) {
        discard(platform, &temp);
        return Err(fail(Step::Replace)(source));
    }
    debug!("replaced");

    if P::SYNC_DIRECTORY {
        platform
            .flush_directory(&dir)
            .map_err(fail(Step::SyncDirectory))?;
    }
    platform
        .close_directory(dir)
        .map_err(fail(Step::CloseDirectory))?;
    Ok(())
}

/// Async wrapper running [`write`] on tokio's blocking pool.
pub async fn write_async(
    path: impl Into<PathBuf>,
    data: impl Into<Vec<u8>>,
) -> Result<(), AtomicWriteError> {
    let path = path.into();
    let data = data.into();
    let target = path.clone();
    tokio::task::spawn_blocking(move || write(&path, &data))
        .await
        .map_err(|err| AtomicWriteError::new(&target, Step::Join, io::Error::other(err)))?
}

fn stage<P: Platform>(
    platform: &P,
    mut file: P::File,
    data: &[u8],
) -> Result<(), (Step, io::Error)> {
    platform
        .write_all(&mut file, data)
        .map_err(|err| (Step::Write, err))?;
    platform
        .flush_file(&mut file)
        .map_err(|err| (Step::SyncFile, err))?;
    platform
        .close_file(file)
        .map_err(|err| (Step::CloseFile, err))
}

fn discard<P: Platform>(platform: &P, temp: &Path) {
    if let Err(err) = platform.remove_temp(temp) {
        warn!(temp = %temp.display(), error = %err, "could not remove temporary file");
    }
}
