//! Write-to-temp-then-rename file replacement
//!
//! Every persisted file goes through [`AtomicFile`]: content is written to a
//! sibling temporary file, flushed and synced, and only then renamed over the
//! target. Readers therefore see either the old file or the new one, never a
//! partial write.

use crate::storage::traits::{StorageError, StorageResult};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Path of the temporary sibling used while replacing `target`
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("checkpoint"));
    name.push(".tmp");
    target.with_file_name(name)
}

/// A pending replacement of `target`
///
/// Dropping an `AtomicFile` without calling [`commit`](AtomicFile::commit)
/// leaves the target untouched; the stale temporary file is truncated by the
/// next writer.
#[derive(Debug)]
pub struct AtomicFile {
    target: PathBuf,
    temp: PathBuf,
    writer: BufWriter<File>,
}

impl AtomicFile {
    /// Opens a fresh temporary file next to `target`
    ///
    /// The parent directory is created if it does not exist yet.
    pub fn create(target: &Path) -> StorageResult<Self> {
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        let temp = temp_path_for(target);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp)
            .map_err(|e| StorageError::io(&temp, e))?;

        Ok(Self {
            target: target.to_path_buf(),
            temp,
            writer: BufWriter::new(file),
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Flushes, syncs and renames the temporary file over the target
    pub fn commit(self) -> StorageResult<()> {
        let Self {
            target,
            temp,
            writer,
        } = self;

        let file = writer
            .into_inner()
            .map_err(|e| StorageError::io(&temp, e.into_error()))?;
        file.sync_all().map_err(|e| StorageError::io(&temp, e))?;
        drop(file);

        fs::rename(&temp, &target).map_err(|e| StorageError::io(&target, e))?;

        if let Some(parent) = target.parent() {
            if let Err(e) = sync_dir(parent) {
                tracing::debug!("Could not sync directory {}: {}", parent.display(), e);
            }
        }

        Ok(())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Persists the rename itself on filesystems that need a directory sync
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
