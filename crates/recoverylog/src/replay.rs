// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay of recovery log content through an `Fsm`

use crate::fsm::{Fsm, FsmError};
use crate::op::{Author, OpKind, RecordedOp};
use gz_core::framing::{self, FrameReader, FramingError};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors which abort replay
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("decoding op at offset {offset}: {source}")]
    Decode {
        offset: u64,
        #[source]
        source: FramingError,
    },
    #[error("applying op {seq_no} at offset {offset}: {source}")]
    Fsm {
        offset: u64,
        seq_no: u64,
        #[source]
        source: FsmError,
    },
}

/// An op which did not continue the replayed sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOp {
    pub offset: u64,
    pub seq_no: u64,
    pub author: Author,
    pub reason: FsmError,
}

/// Summary of one replay pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Ops applied to the state machine
    pub applied: u64,
    /// Ops preceding the seeding hints, which were not applied
    pub preceding: u64,
    /// Diverging ops, which were not applied
    pub skipped: Vec<SkippedOp>,
    /// Bytes skipped while resynchronizing to a frame
    pub resync_bytes: u64,
    /// Whether the content ended within a frame
    pub truncated: bool,
    /// Offset at which replay stopped; the next read should begin here
    pub end_offset: u64,
}

/// Apply the ops framed in `bytes`, which begin at journal offset `base_offset`
///
/// Ops out of sequence for `fsm` (written by a recorder which lost a race,
/// or duplicated) are skipped and reported. A trailing partial frame ends
/// replay at its offset, so the pass can be resumed once more content is
/// available.
pub fn replay(fsm: &mut Fsm, bytes: &[u8], base_offset: u64) -> Result<ReplayReport, ReplayError> {
    let mut reader = FrameReader::new(bytes, base_offset);
    let mut report = ReplayReport::default();
    let mut end_offset = base_offset + bytes.len() as u64;

    while let Some(next) = reader.next() {
        let frame = match next {
            Ok(frame) => frame,
            Err(FramingError::Truncated { .. }) => {
                report.truncated = true;
                end_offset = reader.offset();
                break;
            }
            Err(source) => {
                return Err(ReplayError::Decode {
                    offset: reader.offset(),
                    source,
                })
            }
        };

        let op: RecordedOp = framing::decode(frame.payload).map_err(|source| ReplayError::Decode {
            offset: frame.offset,
            source,
        })?;

        // Write ops are followed by their data, which must be complete.
        if let OpKind::Write { length, .. } = op.op {
            if reader.skip_bytes(length).is_err() {
                report.truncated = true;
                end_offset = frame.offset;
                break;
            }
        }

        // Replay from hints begins at a lower bound, which may precede the first hinted op.
        if op.seq_no < fsm.hinted_first_seq_no() {
            report.preceding += 1;
            continue;
        }

        fsm.set_log_mark_offset(frame.offset);
        match fsm.apply(&op, frame.payload) {
            Ok(()) => {
                debug!(offset = frame.offset, seq_no = op.seq_no, kind = op.op.name(), "replayed op");
                report.applied += 1;
            }
            Err(reason) if reason.is_sequencing() => {
                warn!(
                    offset = frame.offset,
                    seq_no = op.seq_no,
                    author = %op.author,
                    error = %reason,
                    "skipping diverging op"
                );
                report.skipped.push(SkippedOp {
                    offset: frame.offset,
                    seq_no: op.seq_no,
                    author: op.author,
                    reason,
                });
            }
            Err(source) => {
                return Err(ReplayError::Fsm {
                    offset: frame.offset,
                    seq_no: op.seq_no,
                    source,
                })
            }
        }
    }

    report.resync_bytes = reader.resync_bytes();
    report.end_offset = end_offset;
    fsm.set_log_mark_offset(end_offset);
    Ok(report)
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
