// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

#[test]
fn commit_makes_content_visible() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");

    atomic_write(&target, |f| f.write_all(b"hello")).unwrap();

    assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
}

#[test]
fn callback_error_leaves_no_target_and_no_residue() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");

    let result = atomic_write(&target, |_| {
        Err(std::io::Error::other("boom"))
    });

    assert!(matches!(result, Err(AtomicWriteError::Write { .. })));
    assert!(!target.exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "temporary not cleaned up: {leftovers:?}");
}

#[test]
fn prior_content_survives_until_commit() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");
    std::fs::write(&target, "old").unwrap();

    let pending = AtomicFile::begin(&target).unwrap();
    std::fs::write(pending.path(), "new").unwrap();

    // Target still shows the prior state mid-write.
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "old");

    pending.commit().unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
}

#[test]
fn dropped_writer_removes_temporary() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");

    {
        let pending = AtomicFile::begin(&target).unwrap();
        std::fs::write(pending.path(), "partial").unwrap();
    }

    assert!(!target.exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[test]
fn temporary_has_no_extension() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");

    let pending = AtomicFile::begin(&target).unwrap();
    let name = pending.path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(
        crate::ext::is_extensionless(&name),
        "temp name {name:?} would be picked up by scanners"
    );
}

#[test]
fn temporary_is_a_sibling_of_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");

    let pending = AtomicFile::begin(&target).unwrap();
    assert_eq!(pending.path().parent(), target.parent());
}
