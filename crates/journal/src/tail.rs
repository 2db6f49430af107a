// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serving reads against the growing tail of a journal
//!
//! A `Tail` owns the `FragmentSet` of one journal, fed by a stream of
//! Fragment updates, and answers `ReadOp`s from it. Reads of offsets not yet
//! covered either fail immediately or, if blocking, park until an update
//! covers them or the update stream closes.
//!
//! ```text
//! updates ─→ ┌──────────┐
//!            │ tail loop│ ─→ ReadResult (per op)
//! reads ───→ └──────────┘
//! ```
//!
//! The loop drains every pending update before it serves a read, so a read
//! never misses a fragment which was already published when it arrived.

use gz_core::{Fragment, FragmentSet, JournalName};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Capacity of the read queue
pub const READ_OP_BUFFER_SIZE: usize = 10;

/// Read offset resolved to the first available byte
pub const OFFSET_EARLIEST: i64 = 0;

/// Read offset resolved to the current end of the journal
pub const OFFSET_TAIL: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("read of wrong journal")]
    WrongJournal,
    #[error("offset {offset} not yet available (write head {write_head})")]
    NotYetAvailable { offset: u64, write_head: u64 },
    #[error("invalid read offset {0}")]
    InvalidOffset(i64),
    #[error("tail stopped")]
    Stopped,
}

/// A fragment covering a requested offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    /// Resolved offset of the read
    pub offset: u64,
    /// End offset of the tail when the read was served
    pub write_head: u64,
    pub fragment: Fragment,
}

pub type ReadResult = Result<ReadResponse, ReadError>;

/// A request to read a journal at an offset
#[derive(Debug)]
pub struct ReadOp {
    pub journal: JournalName,
    /// Byte offset, or `OFFSET_EARLIEST` / `OFFSET_TAIL`
    pub offset: i64,
    /// Whether to wait for the offset to become available
    pub blocking: bool,
    /// Receives exactly one result
    pub result: oneshot::Sender<ReadResult>,
}

impl ReadOp {
    pub fn new(
        journal: impl Into<JournalName>,
        offset: i64,
        blocking: bool,
    ) -> (Self, oneshot::Receiver<ReadResult>) {
        let (result, rx) = oneshot::channel();
        let op = Self {
            journal: journal.into(),
            offset,
            blocking,
            result,
        };
        (op, rx)
    }
}

/// Handle to a running tail loop
pub struct Tail {
    journal: JournalName,
    read_ops: mpsc::Sender<ReadOp>,
    end_offset_probes: mpsc::Sender<oneshot::Sender<u64>>,
    handle: JoinHandle<()>,
}

impl Tail {
    /// Start serving reads of `journal` on the current runtime
    pub fn start(journal: impl Into<JournalName>, updates: mpsc::UnboundedReceiver<Fragment>) -> Self {
        let journal = journal.into();
        let (read_ops, read_rx) = mpsc::channel(READ_OP_BUFFER_SIZE);
        let (end_offset_probes, probe_rx) = mpsc::channel(1);

        let state = TailState {
            journal: journal.clone(),
            fragments: FragmentSet::new(),
            blocked_reads: Vec::new(),
            updates_open: true,
        };
        let handle = tokio::spawn(state.run(updates, read_rx, probe_rx));

        Self {
            journal,
            read_ops,
            end_offset_probes,
            handle,
        }
    }

    pub fn journal(&self) -> &JournalName {
        &self.journal
    }

    /// Queue `op`, waiting for room in the read queue
    ///
    /// If the loop has exited, `op` is dropped and its receiver observes a
    /// closed channel.
    pub async fn read(&self, op: ReadOp) -> Result<(), ReadError> {
        self.read_ops.send(op).await.map_err(|_| ReadError::Stopped)
    }

    /// Read this tail's journal at `offset`, awaiting the result
    pub async fn read_at(&self, offset: i64, blocking: bool) -> ReadResult {
        let (op, rx) = ReadOp::new(self.journal.clone(), offset, blocking);
        self.read(op).await?;
        rx.await.unwrap_or(Err(ReadError::Stopped))
    }

    /// Current end offset of the tail, or zero once the loop has exited
    pub async fn end_offset(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self.end_offset_probes.send(tx).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Close the read queue and wait for the loop to exit
    ///
    /// The loop exits once the update stream has also closed.
    pub async fn stop(self) {
        let Self {
            read_ops, handle, ..
        } = self;
        drop(read_ops);
        if let Err(err) = handle.await {
            error!(error = %err, "tail loop panicked");
        }
    }
}

struct TailState {
    journal: JournalName,
    fragments: FragmentSet,
    /// Reads which can't (yet) be served by a fragment
    blocked_reads: Vec<ReadOp>,
    updates_open: bool,
}

impl TailState {
    async fn run(
        mut self,
        mut updates: mpsc::UnboundedReceiver<Fragment>,
        mut read_ops: mpsc::Receiver<ReadOp>,
        mut probes: mpsc::Receiver<oneshot::Sender<u64>>,
    ) {
        let mut reads_open = true;
        let mut probes_open = true;

        while self.updates_open || reads_open {
            // Consume available updates prior to serving reads.
            if self.updates_open {
                if let Ok(fragment) = updates.try_recv() {
                    self.on_update(fragment);
                    continue;
                }
            }

            tokio::select! {
                biased;

                update = updates.recv(), if self.updates_open => match update {
                    Some(fragment) => self.on_update(fragment),
                    None => {
                        self.updates_open = false;
                        // Remaining blocked reads now fail.
                        self.wake_blocked_reads();
                    }
                },
                op = read_ops.recv(), if reads_open => match op {
                    Some(op) => self.on_read(op),
                    None => reads_open = false,
                },
                probe = probes.recv(), if probes_open => match probe {
                    Some(reply) => {
                        let _ = reply.send(self.fragments.end_offset());
                    }
                    None => probes_open = false,
                },
            }
        }

        info!(journal = %self.journal, "tail loop exiting");
    }

    fn on_update(&mut self, fragment: Fragment) {
        if fragment.journal != self.journal {
            error!(
                fragment_journal = %fragment.journal,
                tail_journal = %self.journal,
                "unexpected fragment journal"
            );
            return;
        }
        debug!(journal = %self.journal, begin = fragment.begin, end = fragment.end, "tail update");
        self.fragments.add(fragment);
        self.wake_blocked_reads();
    }

    fn on_read(&mut self, mut op: ReadOp) {
        if op.journal != self.journal {
            let _ = op.result.send(Err(ReadError::WrongJournal));
            return;
        }

        let offset = match op.offset {
            OFFSET_EARLIEST => self.fragments.begin_offset(),
            OFFSET_TAIL => self.fragments.end_offset(),
            offset => match u64::try_from(offset) {
                Ok(offset) => offset,
                Err(_) => {
                    let _ = op.result.send(Err(ReadError::InvalidOffset(offset)));
                    return;
                }
            },
        };
        let write_head = self.fragments.end_offset();

        match self.fragments.covering(offset) {
            Some(fragment) => {
                let _ = op.result.send(Ok(ReadResponse {
                    offset,
                    write_head,
                    fragment: fragment.clone(),
                }));
            }
            None if op.blocking && self.updates_open => {
                // Block at the resolved offset, not the one requested.
                op.offset = i64::try_from(offset).unwrap_or(i64::MAX);
                self.blocked_reads.push(op);
            }
            None => {
                let _ = op
                    .result
                    .send(Err(ReadError::NotYetAvailable { offset, write_head }));
            }
        }
    }

    fn wake_blocked_reads(&mut self) {
        for op in std::mem::take(&mut self.blocked_reads) {
            self.on_read(op);
        }
    }
}

#[cfg(test)]
#[path = "tail_tests.rs"]
mod tests;
