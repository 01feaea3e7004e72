// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-extension validation and stem arithmetic.
//!
//! The *stem* of a file name is everything before the configured extension
//! suffix; it is the universal key for per-file progress. Extensions are
//! multi-part suffixes like `.txt` or `.tar.gz`, matched literally, never
//! via `Path::extension`, which only sees the last component.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Extension reserved for captured error reports.
pub const ERR_EXT: &str = ".err";

#[allow(clippy::expect_used)]
static EXT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\.[A-Za-z0-9_]+)+$").expect("constant regex pattern is valid")
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtError {
    #[error("invalid file extension {0:?}: must match (\\.[A-Za-z0-9_]+)+")]
    Malformed(String),

    #[error("invalid file extension {0:?}: '.err' is reserved for error reports")]
    Reserved(String),
}

/// Validate a configured file extension.
///
/// Accepts dotted multi-part suffixes (`.txt`, `.tar.gz`); rejects anything
/// else, and rejects suffixes ending in the reserved `.err`.
pub fn validate_file_ext(ext: &str) -> Result<(), ExtError> {
    if !EXT_PATTERN.is_match(ext) {
        return Err(ExtError::Malformed(ext.to_string()));
    }
    if ext.ends_with(ERR_EXT) {
        return Err(ExtError::Reserved(ext.to_string()));
    }
    Ok(())
}

/// Whether `name` carries the extension suffix `ext`.
pub fn has_ext(name: &str, ext: &str) -> bool {
    name.ends_with(ext)
}

/// Strip the extension suffix `ext` from `name`, yielding the stem.
///
/// Returns `None` when `name` does not end with `ext`.
pub fn strip_ext<'a>(name: &'a str, ext: &str) -> Option<&'a str> {
    name.strip_suffix(ext)
}

/// Whether `name` has no extension at all.
///
/// Extension-less files are in-flight temporaries owned by whichever
/// runtime created them; scanners and the progress reporter treat them
/// as "ongoing". A leading dot does not count as an extension separator
/// (`.tmpXYZ` is extension-less).
pub fn is_extensionless(name: &str) -> bool {
    !name[1.min(name.len())..].contains('.')
}

#[cfg(test)]
#[path = "ext_tests.rs"]
mod tests;
