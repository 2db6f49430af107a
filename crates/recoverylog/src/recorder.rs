// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recorder of filesystem mutations into a recovery log
//!
//! The recorder observes every mutation of the storage engine's files and
//! preserves it as framed `RecordedOp`s written to the recovery log journal.
//! Control must never return to the engine after a mutation fails to be
//! recorded, as the local files would then differ from what replay of the
//! log produces. The recorder is therefore crash-only: every error it returns
//! is fatal, and after the first one it refuses all further calls.
//!
//! ## Atomicity
//!
//! One observed mutation may decompose into several ops (a rename into up to
//! three), but all ops of one mutation are framed into a single buffer and
//! written as one append.

use crate::config::{ConfigError, RecorderConfig};
use crate::fsm::{Fsm, FsmError};
use crate::hints::FsmHints;
use crate::observer::{EnvObserver, WritableFileObserver};
use crate::op::{Author, Fnode, OpKind, RecordedOp};
use crate::path::clean_path;
use gz_core::framing::{self, FramingError};
use gz_core::{AppendError, AsyncAppend, JournalName, WriteError, Writer};
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, error, info};

/// Fatal recorder errors
///
/// Every variant means the local filesystem and the recovery log can no
/// longer be kept consistent. Callers must stop the process; none may be
/// retried.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("path {path} is outside of the recorded prefix {prefix:?}")]
    PathOutsidePrefix { path: String, prefix: String },
    #[error("unexpected {action} of property path {path}")]
    UnexpectedPropertyPath { action: &'static str, path: String },
    #[error("{action} of unknown path {path}")]
    UnknownPath { action: &'static str, path: String },
    #[error("reading property file {path}: {source}")]
    ReadProperty {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("property file {0} is not valid UTF-8")]
    PropertyEncoding(PathBuf),
    #[error("recorder FSM error applying {kind} op {seq_no}: {source}")]
    Fsm {
        seq_no: u64,
        kind: &'static str,
        #[source]
        source: FsmError,
    },
    #[error("framing: {0}")]
    Framing(#[from] FramingError),
    #[error("writing op frame: {0}")]
    Write(#[from] WriteError),
    #[error("awaiting append: {0}")]
    Append(#[from] AppendError),
    #[error("recorder config: {0}")]
    Config(#[from] ConfigError),
    #[error("recorder stopped by an earlier fatal error")]
    Poisoned,
}

struct Shared<W> {
    author: Author,
    config: RecorderConfig,
    writer: W,
    state: Mutex<State>,
}

struct State {
    fsm: Fsm,
    /// A recent append, whose write head will advance the log mark once it completes
    pending_write: Option<AsyncAppend>,
    poisoned: bool,
}

/// Records filesystem mutations of a storage engine into a recovery log
pub struct Recorder<W> {
    shared: Arc<Shared<W>>,
}

impl<W> Clone for Recorder<W> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<W: Writer> Recorder<W> {
    /// Create a recorder continuing from `fsm`
    ///
    /// Blocks on an initial write barrier, whose write head becomes the lower
    /// bound of every op recorded afterwards.
    pub fn new(
        mut fsm: Fsm,
        author: Author,
        config: RecorderConfig,
        writer: W,
    ) -> Result<Self, RecorderError> {
        config.validate()?;
        fsm.set_journal(config.journal.clone());

        let recorder = Self {
            shared: Arc::new(Shared {
                author,
                config,
                writer,
                state: Mutex::new(State {
                    fsm,
                    pending_write: None,
                    poisoned: false,
                }),
            }),
        };

        let head = recorder.sync_barrier()?;
        recorder.lock().fsm.set_log_mark_offset(head);

        info!(
            author = %author,
            journal = %recorder.journal(),
            offset = head,
            "recorder started"
        );
        Ok(recorder)
    }

    pub fn author(&self) -> Author {
        self.shared.author
    }

    pub fn journal(&self) -> &JournalName {
        &self.shared.config.journal
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.shared.config
    }

    /// Build hints reflecting the most recently recorded op
    pub fn build_hints(&self) -> Result<FsmHints, RecorderError> {
        self.locked(|state, _| Ok(state.fsm.build_hints()))
    }

    /// Inspect the recorder's state machine
    pub fn with_fsm<T>(&self, f: impl FnOnce(&Fsm) -> T) -> T {
        f(&self.lock().fsm)
    }

    /// Issue an empty append
    ///
    /// Once the returned append completes, everything recorded before the
    /// barrier is also durable.
    pub fn write_barrier(&self) -> Result<AsyncAppend, RecorderError> {
        self.locked(|state, shared| state.record_frame(shared, Vec::new()))
    }

    /// Issue a write barrier and block until it completes, returning its write head
    pub fn sync_barrier(&self) -> Result<u64, RecorderError> {
        let barrier = self.write_barrier()?;
        barrier
            .wait()
            .map_err(|err| self.poison(RecorderError::Append(err)))
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn poison(&self, err: RecorderError) -> RecorderError {
        self.lock().poisoned = true;
        error!(author = %self.shared.author, error = %err, "recorder fatal error");
        err
    }

    /// Run `f` under the recorder lock, poisoning the recorder if it fails
    fn locked<T>(
        &self,
        f: impl FnOnce(&mut State, &Shared<W>) -> Result<T, RecorderError>,
    ) -> Result<T, RecorderError> {
        let mut state = self.lock();
        if state.poisoned {
            return Err(RecorderError::Poisoned);
        }
        let result = f(&mut state, &self.shared);
        if let Err(err) = &result {
            state.poisoned = true;
            error!(author = %self.shared.author, error = %err, "recorder fatal error");
        }
        result
    }
}

impl<W> Shared<W> {
    fn normalize(&self, path: &str) -> Result<String, RecorderError> {
        let prefix = self.config.strip_prefix.as_str();
        let outside = || RecorderError::PathOutsidePrefix {
            path: path.to_string(),
            prefix: prefix.to_string(),
        };

        let rest = path.strip_prefix(prefix).ok_or_else(outside)?;
        if !prefix.is_empty() && !prefix.ends_with('/') && !rest.is_empty() && !rest.starts_with('/') {
            return Err(outside());
        }
        Ok(clean_path(&format!("/{rest}")))
    }

    fn reject_property(&self, action: &'static str, path: &str) -> Result<(), RecorderError> {
        if self.config.is_property(path) {
            return Err(RecorderError::UnexpectedPropertyPath {
                action,
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

impl State {
    /// Sequence `kind` as the next op, frame it onto `frame`, and apply it
    fn process(
        &mut self,
        author: Author,
        kind: OpKind,
        frame: &mut Vec<u8>,
    ) -> Result<u64, RecorderError> {
        let op = RecordedOp {
            seq_no: self.fsm.next_seq_no(),
            checksum: self.fsm.next_checksum(),
            author,
            op: kind,
        };
        let payload = framing::encode(&op, frame)?;

        self.fsm
            .apply(&op, &frame[payload])
            .map_err(|source| RecorderError::Fsm {
                seq_no: op.seq_no,
                kind: op.op.name(),
                source,
            })?;

        debug!(seq_no = op.seq_no, kind = op.op.name(), "recorded op");
        Ok(op.seq_no)
    }

    fn record_frame<W: Writer>(
        &mut self,
        shared: &Shared<W>,
        frame: Vec<u8>,
    ) -> Result<AsyncAppend, RecorderError> {
        let append = shared.writer.write(&shared.config.journal, frame)?;
        self.update_write_head(&append)?;
        Ok(append)
    }

    fn record_from_reader<W: Writer>(
        &mut self,
        shared: &Shared<W>,
        reader: &mut dyn Read,
    ) -> Result<AsyncAppend, RecorderError> {
        let append = shared.writer.read_from(&shared.config.journal, reader)?;
        self.update_write_head(&append)?;
        Ok(append)
    }

    /// Tighten the log mark from a completed append, without blocking
    ///
    /// At most one append is retained. If it has completed, its write head
    /// becomes the log mark offset and `write` is retained in its place.
    /// Otherwise `write` is dropped, and the log mark lags until a later
    /// append observes the retained one complete.
    fn update_write_head(&mut self, write: &AsyncAppend) -> Result<(), RecorderError> {
        let pending = self.pending_write.get_or_insert_with(|| write.clone());

        match pending.outcome() {
            Some(Ok(head)) => {
                self.fsm.set_log_mark_offset(head);
                self.pending_write = Some(write.clone());
                Ok(())
            }
            Some(Err(err)) => Err(RecorderError::Append(err)),
            None => Ok(()),
        }
    }
}

impl<W: Writer> EnvObserver for Recorder<W> {
    type File = FileRecorder<W>;

    fn new_writable_file(&self, path: &str) -> Result<FileRecorder<W>, RecorderError> {
        let fnode = self.locked(|state, shared| {
            let path = shared.normalize(path)?;
            shared.reject_property("open", &path)?;

            // Unlink the file previously at |path|, then create its replacement.
            let mut frame = Vec::new();
            if let Some(prev) = state.fsm.link(&path) {
                state.process(shared.author, OpKind::unlink(prev, path.clone()), &mut frame)?;
            }
            let seq_no = state.process(shared.author, OpKind::create(path), &mut frame)?;

            state.record_frame(shared, frame)?;
            Ok(Fnode(seq_no))
        })?;

        Ok(FileRecorder {
            recorder: self.clone(),
            fnode,
            offset: 0,
        })
    }

    fn delete_file(&self, path: &str) -> Result<(), RecorderError> {
        self.locked(|state, shared| {
            let path = shared.normalize(path)?;
            shared.reject_property("delete", &path)?;

            let fnode = state.fsm.link(&path).ok_or(RecorderError::UnknownPath {
                action: "delete",
                path: path.clone(),
            })?;

            let mut frame = Vec::new();
            state.process(shared.author, OpKind::unlink(fnode, path), &mut frame)?;
            state.record_frame(shared, frame)?;
            Ok(())
        })
    }

    fn delete_dir(&self, _path: &str) -> Result<(), RecorderError> {
        // Directories are implied by the paths of files, and aren't tracked.
        Ok(())
    }

    fn link_file(&self, src: &str, target: &str) -> Result<(), RecorderError> {
        self.locked(|state, shared| {
            let src = shared.normalize(src)?;
            let target = shared.normalize(target)?;
            shared.reject_property("link", &target)?;

            let fnode = state.fsm.link(&src).ok_or(RecorderError::UnknownPath {
                action: "link",
                path: src.clone(),
            })?;

            let mut frame = Vec::new();
            state.process(shared.author, OpKind::link(fnode, target), &mut frame)?;
            state.record_frame(shared, frame)?;
            Ok(())
        })
    }

    fn rename_file(&self, src_path: &str, target_path: &str) -> Result<(), RecorderError> {
        self.locked(|state, shared| {
            let src = shared.normalize(src_path)?;
            let target = shared.normalize(target_path)?;

            let fnode = state.fsm.link(&src).ok_or(RecorderError::UnknownPath {
                action: "rename",
                path: src.clone(),
            })?;
            if src == target {
                return Ok(());
            }

            // Decompose the rename into:
            //  * Unlinking the file previously at |target|, if any.
            //  * Recording the content of |target| if it's a property, or else
            //    linking |fnode| at |target|.
            //  * Unlinking |fnode| from |src|.
            let mut frame = Vec::new();
            if let Some(prev) = state.fsm.link(&target) {
                state.process(shared.author, OpKind::unlink(prev, target.clone()), &mut frame)?;
            }
            let kind = if shared.config.is_property(&target) {
                OpKind::property(target, read_property(target_path)?)
            } else {
                OpKind::link(fnode, target)
            };
            state.process(shared.author, kind, &mut frame)?;
            state.process(shared.author, OpKind::unlink(fnode, src), &mut frame)?;

            state.record_frame(shared, frame)?;
            Ok(())
        })
    }
}

fn read_property(path: &str) -> Result<String, RecorderError> {
    let bytes = std::fs::read(path).map_err(|source| RecorderError::ReadProperty {
        path: PathBuf::from(path),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| RecorderError::PropertyEncoding(PathBuf::from(path)))
}

/// Records mutations of one file opened for writing
pub struct FileRecorder<W> {
    recorder: Recorder<W>,
    fnode: Fnode,
    /// Next write offset within the file
    offset: u64,
}

impl<W> FileRecorder<W> {
    pub fn fnode(&self) -> Fnode {
        self.fnode
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<W: Writer> WritableFileObserver for FileRecorder<W> {
    fn append(&mut self, data: &[u8]) -> Result<(), RecorderError> {
        let (fnode, offset) = (self.fnode, self.offset);
        let length = data.len() as u64;

        self.recorder.locked(|state, shared| {
            let mut frame = Vec::new();
            state.process(shared.author, OpKind::write(fnode, offset, length), &mut frame)?;

            // The op and its data are written as one append.
            state.record_from_reader(shared, &mut frame.as_slice().chain(data))?;
            Ok(())
        })?;

        self.offset += length;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        Ok(())
    }

    fn sync(&mut self) -> Result<(), RecorderError> {
        self.recorder.sync_barrier().map(drop)
    }

    fn fsync(&mut self) -> Result<(), RecorderError> {
        self.recorder.sync_barrier().map(drop)
    }

    fn range_sync(&mut self, _offset: u64, _nbytes: u64) -> Result<(), RecorderError> {
        self.recorder.sync_barrier().map(drop)
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
