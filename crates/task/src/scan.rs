// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory scanning shared by all runtime variants.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use tf_core::ext::{is_extensionless, strip_ext, ERR_EXT};

/// Files in `input_dir` with `input_ext` whose stem has neither an output
/// nor an error report in `output_dir`.
///
/// The result may include files another in-flight operation is already
/// processing; callers needing stronger exclusion track that themselves.
/// Discovery order is whatever the filesystem yields; callers must not
/// rely on it.
pub fn unprocessed_files(
    input_dir: &Path,
    input_ext: &str,
    output_dir: &Path,
    output_ext: &str,
) -> io::Result<Vec<PathBuf>> {
    let mut processed: HashSet<String> = HashSet::new();
    for entry in std::fs::read_dir(output_dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        for ext in [output_ext, ERR_EXT] {
            if let Some(stem) = strip_ext(&name, ext) {
                processed.insert(stem.to_string());
            }
        }
    }

    let mut unprocessed = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(stem) = strip_ext(&name, input_ext) else {
            continue;
        };
        if !processed.contains(stem) {
            unprocessed.push(entry.path());
        }
    }
    Ok(unprocessed)
}

/// Delete extension-less residue left behind by a crashed writer.
pub fn remove_temporary_files(dir: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_file() && is_extensionless(&name) {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Map an input file name to its output path.
pub fn output_path(
    input: &Path,
    input_ext: &str,
    output_dir: &Path,
    output_ext: &str,
) -> Option<PathBuf> {
    let name = input.file_name()?.to_string_lossy();
    let stem = strip_ext(&name, input_ext)?;
    Some(output_dir.join(format!("{stem}{output_ext}")))
}

/// Map an output path to its `.err` sibling.
pub fn error_path(output: &Path, output_ext: &str) -> Option<PathBuf> {
    let name = output.file_name()?.to_string_lossy();
    let stem = strip_ext(&name, output_ext)?;
    Some(output.with_file_name(format!("{stem}{ERR_EXT}")))
}

/// Whether the stem of `input` already has an output or error report.
pub fn already_processed(
    input: &Path,
    input_ext: &str,
    output_dir: &Path,
    output_ext: &str,
) -> bool {
    let Some(name) = input.file_name() else {
        return false;
    };
    let name = name.to_string_lossy();
    let Some(stem) = strip_ext(&name, input_ext) else {
        return false;
    };
    output_dir.join(format!("{stem}{output_ext}")).is_file()
        || output_dir.join(format!("{stem}{ERR_EXT}")).is_file()
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
