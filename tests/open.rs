/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! Session-open failures that need no real `hg` binary.

use assert_matches::assert_matches;
use tempfile::tempdir;

use hgclient::{ErrorKind, HgClient, OpenOptions};

#[test]
fn open_rejects_directories_without_dot_hg() {
    let dir = tempdir().unwrap();
    let err = HgClient::open(dir.path()).unwrap_err();
    assert_matches!(
        err.downcast_ref::<ErrorKind>(),
        Some(ErrorKind::InvalidRepository(..))
    );
}

#[test]
fn open_rejects_missing_paths() {
    let dir = tempdir().unwrap();
    let err = HgClient::open(dir.path().join("nowhere")).unwrap_err();
    assert_matches!(
        err.downcast_ref::<ErrorKind>(),
        Some(ErrorKind::InvalidRepository(..))
    );
}

#[test]
fn open_reports_spawn_failures() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".hg")).unwrap();

    let options = OpenOptions {
        hg_binary: dir.path().join("no-such-binary"),
        ..Default::default()
    };
    let err = options.open(dir.path()).unwrap_err();
    assert_matches!(
        err.downcast_ref::<ErrorKind>(),
        Some(ErrorKind::ServerLaunchFailed(..))
    );
}

#[test]
fn init_reports_spawn_failures() {
    let dir = tempdir().unwrap();
    let err = HgClient::init_with(
        &dir.path().join("no-such-binary"),
        &dir.path().join("repo"),
    )
    .unwrap_err();
    assert_matches!(
        err.downcast_ref::<ErrorKind>(),
        Some(ErrorKind::ServerLaunchFailed(..))
    );
}
