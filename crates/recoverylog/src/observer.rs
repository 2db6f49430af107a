// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem observer capabilities invoked by the storage engine
//!
//! The engine calls these synchronously at the point of each mutation, in
//! mutation order. Every error returned is fatal: the engine's harness must
//! stop the process rather than continue with state the log cannot replay.

use crate::recorder::RecorderError;

/// Observes mutations of the storage engine's environment
pub trait EnvObserver {
    type File: WritableFileObserver;

    /// A file was created (or truncated) at `path`, and opened for writing
    fn new_writable_file(&self, path: &str) -> Result<Self::File, RecorderError>;

    /// The file at `path` was deleted
    fn delete_file(&self, path: &str) -> Result<(), RecorderError>;

    /// The directory `path` was deleted
    fn delete_dir(&self, path: &str) -> Result<(), RecorderError>;

    /// A hard link of `src` was created at `target`
    fn link_file(&self, src: &str, target: &str) -> Result<(), RecorderError>;

    /// `src` was renamed to `target`, replacing any file at `target`
    fn rename_file(&self, src: &str, target: &str) -> Result<(), RecorderError>;
}

/// Observes mutations of one file opened for writing
pub trait WritableFileObserver {
    /// `data` was appended to the file
    fn append(&mut self, data: &[u8]) -> Result<(), RecorderError>;

    fn close(&mut self) -> Result<(), RecorderError>;

    fn sync(&mut self) -> Result<(), RecorderError>;

    fn fsync(&mut self) -> Result<(), RecorderError>;

    fn range_sync(&mut self, offset: u64, nbytes: u64) -> Result<(), RecorderError>;
}
