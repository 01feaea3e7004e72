// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    simple    = { ".txt" },
    out       = { ".out" },
    two_part  = { ".tar.gz" },
    digits    = { ".mp3" },
    underscore = { ".raw_v2" },
)]
fn accepts_valid_extensions(ext: &str) {
    assert!(validate_file_ext(ext).is_ok());
}

#[yare::parameterized(
    no_dot        = { "txt" },
    trailing_dot  = { ".txt." },
    empty         = { "" },
    bare_dot      = { "." },
    inner_space   = { ".t xt" },
    hyphen        = { ".tar-gz" },
)]
fn rejects_malformed_extensions(ext: &str) {
    assert_eq!(
        validate_file_ext(ext),
        Err(ExtError::Malformed(ext.to_string()))
    );
}

#[yare::parameterized(
    bare     = { ".err" },
    nested   = { ".tar.err" },
)]
fn rejects_reserved_err_suffix(ext: &str) {
    assert_eq!(
        validate_file_ext(ext),
        Err(ExtError::Reserved(ext.to_string()))
    );
}

#[test]
fn strip_ext_yields_stem() {
    assert_eq!(strip_ext("sample.tar.gz", ".tar.gz"), Some("sample"));
    assert_eq!(strip_ext("sample.txt", ".out"), None);
}

#[test]
fn multi_part_stems_keep_inner_dots() {
    assert_eq!(strip_ext("a.b.txt", ".txt"), Some("a.b"));
}

#[yare::parameterized(
    plain_temp   = { "tmpXYZ123", true },
    hidden_temp  = { ".tmpXYZ123", true },
    output       = { "sample.out", false },
    err_report   = { "sample.err", false },
    hidden_ext   = { ".config.yml", false },
)]
fn extensionless_detection(name: &str, expected: bool) {
    assert_eq!(is_extensionless(name), expected);
}
