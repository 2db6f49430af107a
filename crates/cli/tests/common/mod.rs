// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for CLI integration tests

use gz_core::{FakeWriter, JournalName};
use gz_recoverylog::{
    Author, EnvObserver, Fsm, Recorder, RecorderConfig, WritableFileObserver,
};
use std::path::{Path, PathBuf};

pub const JOURNAL: &str = "recovery/cli-test";

/// Record a small workload, write the log to `dir`, and return its path
/// along with the recorder which produced it
pub fn record_log(dir: &Path) -> (PathBuf, Recorder<FakeWriter>) {
    let journal = JournalName::new(JOURNAL);
    let writer = FakeWriter::new();
    let recorder = Recorder::new(
        Fsm::new(journal.clone()),
        Author(0xabc),
        RecorderConfig::new(journal.clone()),
        writer.clone(),
    )
    .unwrap();

    let mut wal = recorder.new_writable_file("/000001.log").unwrap();
    wal.append(b"batch one").unwrap();
    wal.sync().unwrap();
    recorder.new_writable_file("/MANIFEST-000002").unwrap();
    recorder.rename_file("/MANIFEST-000002", "/CURRENT").unwrap();
    recorder.delete_file("/000001.log").unwrap();

    let path = dir.join("recovery.log");
    std::fs::write(&path, writer.journal_bytes(&journal)).unwrap();
    (path, recorder)
}
