// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file writes: temp sibling + rename.
//!
//! Readers observe the target either as absent, as its prior content, or as
//! the complete new content, never a partial write. The temporary lives in
//! the target's directory (same filesystem, so the rename is atomic) and its
//! name carries no extension, so directory scanners ignore it as an
//! in-flight artifact. A crash leaves only the extension-less residue, which
//! runtimes sweep at startup.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempPath};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("failed to create temporary file in {dir}: {source}")]
    Create { dir: PathBuf, source: io::Error },

    #[error("failed to write temporary file for {target}: {source}")]
    Write { target: PathBuf, source: io::Error },

    #[error("failed to sync temporary file for {target}: {source}")]
    Sync { target: PathBuf, source: io::Error },

    #[error("failed to move temporary file into place at {target}: {source}")]
    Rename { target: PathBuf, source: io::Error },
}

/// In-progress atomic write.
///
/// Obtain with [`AtomicFile::begin`], write to [`AtomicFile::path`], then
/// [`AtomicFile::commit`]. Dropping without committing removes the
/// temporary and leaves the target untouched.
#[derive(Debug)]
pub struct AtomicFile {
    target: PathBuf,
    tmp: TempPath,
}

impl AtomicFile {
    /// Start an atomic write targeting `target`.
    pub fn begin(target: impl Into<PathBuf>) -> Result<Self, AtomicWriteError> {
        let target = target.into();
        let dir = match target.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)
            .map_err(|source| AtomicWriteError::Create { dir: dir.to_path_buf(), source })?
            .into_temp_path();
        Ok(Self { target, tmp })
    }

    /// Path of the temporary file to write into.
    pub fn path(&self) -> &Path {
        &self.tmp
    }

    /// Path the content will land at on commit.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flush the temporary to disk and rename it over the target.
    pub fn commit(self) -> Result<(), AtomicWriteError> {
        let file = File::open(&self.tmp).map_err(|source| AtomicWriteError::Sync {
            target: self.target.clone(),
            source,
        })?;
        file.sync_all().map_err(|source| AtomicWriteError::Sync {
            target: self.target.clone(),
            source,
        })?;
        self.tmp
            .persist(&self.target)
            .map_err(|e| AtomicWriteError::Rename { target: self.target, source: e.error })?;
        Ok(())
    }
}

/// Write `target` atomically through a callback.
///
/// The callback receives an open handle on the temporary file. On error the
/// temporary is removed and the target is left untouched.
pub fn atomic_write(
    target: impl Into<PathBuf>,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> Result<(), AtomicWriteError> {
    let pending = AtomicFile::begin(target)?;
    let mut file = File::create(pending.path()).map_err(|source| AtomicWriteError::Write {
        target: pending.target().to_path_buf(),
        source,
    })?;
    write(&mut file).map_err(|source| AtomicWriteError::Write {
        target: pending.target().to_path_buf(),
        source,
    })?;
    drop(file);
    pending.commit()
}

#[cfg(test)]
#[path = "fsio_tests.rs"]
mod tests;
