// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery log state machine
//!
//! The `Fsm` tracks which file exists at which path, which Fnode backs it, and
//! how much was written to it, driven by a strictly ordered, checksummed
//! stream of `RecordedOp`s. Recording and replay advance it through the same
//! validation, so both arrive at the same state for the same ops.

use crate::hints::{FnodeSegments, FsmHints, Segment};
use crate::op::{Fnode, OpKind, RecordedOp};
use gz_core::{JournalName, Mark};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Error applying an op to the state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsmError {
    #[error("wrong sequence number: expected {expected}, got {actual}")]
    WrongSeqNo { expected: u64, actual: u64 },
    #[error("wrong checksum: expected {expected:#010x}, got {actual:#010x}")]
    WrongChecksum { expected: u32, actual: u32 },
    #[error("path already linked: {0}")]
    LinkExists(String),
    #[error("fnode not tracked: {0}")]
    FnodeNotTracked(Fnode),
    #[error("{fnode} is not hard-linked at {path}")]
    NotHardLinked { fnode: Fnode, path: String },
    #[error("property {0} already exists with different content")]
    PropertyExists(String),
}

impl FsmError {
    /// Whether the op was out of sequence for this lineage, rather than invalid for its state
    pub fn is_sequencing(&self) -> bool {
        matches!(self, Self::WrongSeqNo { .. } | Self::WrongChecksum { .. })
    }
}

/// Continue a rolling CRC-32 over `bytes`
pub fn roll_checksum(checksum: u32, bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(checksum);
    hasher.update(bytes);
    hasher.finalize()
}

#[derive(Debug, Clone, Default)]
struct LiveNode {
    links: BTreeSet<String>,
    size: u64,
    segments: Vec<Segment>,
}

impl LiveNode {
    fn track(&mut self, op: &RecordedOp, offset: u64) {
        match self.segments.last_mut() {
            Some(segment) if segment.author == op.author => segment.last_seq_no = op.seq_no,
            _ => self.segments.push(Segment {
                author: op.author,
                first_seq_no: op.seq_no,
                first_checksum: op.checksum,
                first_offset: offset,
                last_seq_no: op.seq_no,
            }),
        }
    }
}

/// In-memory view of a recorded filesystem
#[derive(Debug, Clone)]
pub struct Fsm {
    log_mark: Mark,
    next_seq_no: u64,
    next_checksum: u32,
    links: BTreeMap<String, Fnode>,
    live_nodes: BTreeMap<Fnode, LiveNode>,
    properties: BTreeMap<String, String>,
    /// Untracked Fnodes older than this were already dead when seeding hints were taken
    hinted_first_seq_no: u64,
}

impl Fsm {
    /// A state machine for an empty log of `journal`
    pub fn new(journal: JournalName) -> Self {
        Self {
            log_mark: Mark::new(journal, 0),
            next_seq_no: 1,
            next_checksum: 0,
            links: BTreeMap::new(),
            live_nodes: BTreeMap::new(),
            properties: BTreeMap::new(),
            hinted_first_seq_no: 0,
        }
    }

    /// A state machine seeded for bounded replay from `hints`
    ///
    /// Links are empty until replay re-applies the ops of live Fnodes.
    pub fn from_hints(hints: &FsmHints) -> Self {
        Self {
            log_mark: hints.log_mark.clone(),
            next_seq_no: hints.first_seq_no,
            next_checksum: hints.first_checksum,
            links: BTreeMap::new(),
            live_nodes: BTreeMap::new(),
            properties: hints.properties.clone(),
            hinted_first_seq_no: hints.first_seq_no,
        }
    }

    /// Apply `op`, whose serialized form is `payload`
    ///
    /// On error nothing is mutated, and the expected sequence number and
    /// checksum do not advance.
    pub fn apply(&mut self, op: &RecordedOp, payload: &[u8]) -> Result<(), FsmError> {
        if op.seq_no != self.next_seq_no {
            return Err(FsmError::WrongSeqNo {
                expected: self.next_seq_no,
                actual: op.seq_no,
            });
        }
        if op.checksum != self.next_checksum {
            return Err(FsmError::WrongChecksum {
                expected: self.next_checksum,
                actual: op.checksum,
            });
        }

        match &op.op {
            OpKind::Create { path } => self.apply_create(op, path)?,
            OpKind::Link { fnode, path } => self.apply_link(op, *fnode, path)?,
            OpKind::Unlink { fnode, path } => self.apply_unlink(op, *fnode, path)?,
            OpKind::Write {
                fnode,
                offset,
                length,
            } => self.apply_write(op, *fnode, offset.saturating_add(*length))?,
            OpKind::Property { path, content } => self.apply_property(path, content)?,
        }

        self.next_seq_no += 1;
        self.next_checksum = roll_checksum(self.next_checksum, payload);
        Ok(())
    }

    fn apply_create(&mut self, op: &RecordedOp, path: &str) -> Result<(), FsmError> {
        if self.links.contains_key(path) {
            return Err(FsmError::LinkExists(path.to_string()));
        }
        let fnode = Fnode(op.seq_no);
        let mut node = LiveNode::default();
        node.links.insert(path.to_string());
        node.track(op, self.log_mark.offset);

        self.live_nodes.insert(fnode, node);
        self.links.insert(path.to_string(), fnode);
        Ok(())
    }

    fn apply_link(&mut self, op: &RecordedOp, fnode: Fnode, path: &str) -> Result<(), FsmError> {
        if self.is_dead_at_hints(fnode) {
            return Ok(());
        }
        if self.links.contains_key(path) {
            return Err(FsmError::LinkExists(path.to_string()));
        }
        let offset = self.log_mark.offset;
        let node = self
            .live_nodes
            .get_mut(&fnode)
            .ok_or(FsmError::FnodeNotTracked(fnode))?;

        node.links.insert(path.to_string());
        node.track(op, offset);
        self.links.insert(path.to_string(), fnode);
        Ok(())
    }

    fn apply_unlink(&mut self, op: &RecordedOp, fnode: Fnode, path: &str) -> Result<(), FsmError> {
        if self.is_dead_at_hints(fnode) {
            return Ok(());
        }
        if !self.live_nodes.contains_key(&fnode) {
            return Err(FsmError::FnodeNotTracked(fnode));
        }
        if self.links.get(path) != Some(&fnode) {
            return Err(FsmError::NotHardLinked {
                fnode,
                path: path.to_string(),
            });
        }

        self.links.remove(path);
        let offset = self.log_mark.offset;
        if let Some(node) = self.live_nodes.get_mut(&fnode) {
            node.links.remove(path);
            node.track(op, offset);
            if node.links.is_empty() {
                self.live_nodes.remove(&fnode);
            }
        }
        Ok(())
    }

    fn apply_write(&mut self, op: &RecordedOp, fnode: Fnode, end: u64) -> Result<(), FsmError> {
        if self.is_dead_at_hints(fnode) {
            return Ok(());
        }
        let offset = self.log_mark.offset;
        let node = self
            .live_nodes
            .get_mut(&fnode)
            .ok_or(FsmError::FnodeNotTracked(fnode))?;

        node.size = node.size.max(end);
        node.track(op, offset);
        Ok(())
    }

    fn apply_property(&mut self, path: &str, content: &str) -> Result<(), FsmError> {
        match self.properties.get(path) {
            Some(existing) if existing != content => {
                Err(FsmError::PropertyExists(path.to_string()))
            }
            _ => {
                self.properties
                    .insert(path.to_string(), content.to_string());
                Ok(())
            }
        }
    }

    /// Whether `fnode` belongs to a file which was dead when seeding hints were taken
    fn is_dead_at_hints(&self, fnode: Fnode) -> bool {
        fnode.0 < self.hinted_first_seq_no && !self.live_nodes.contains_key(&fnode)
    }

    /// Build hints sufficient to reconstruct the current state by bounded replay
    pub fn build_hints(&self) -> FsmHints {
        let first = self
            .live_nodes
            .values()
            .filter_map(|node| node.segments.first())
            .min_by_key(|segment| segment.first_seq_no);

        let (log_mark, first_seq_no, first_checksum) = match first {
            Some(segment) => (
                Mark::new(self.log_mark.journal.clone(), segment.first_offset),
                segment.first_seq_no,
                segment.first_checksum,
            ),
            None => (self.log_mark.clone(), self.next_seq_no, self.next_checksum),
        };

        FsmHints {
            log_mark,
            first_seq_no,
            first_checksum,
            live_nodes: self
                .live_nodes
                .iter()
                .map(|(fnode, node)| FnodeSegments {
                    fnode: *fnode,
                    segments: node.segments.clone(),
                })
                .collect(),
            properties: self.properties.clone(),
        }
    }

    /// Position from which the next applied op is known to lie
    pub fn log_mark(&self) -> &Mark {
        &self.log_mark
    }

    pub(crate) fn set_journal(&mut self, journal: JournalName) {
        self.log_mark.journal = journal;
    }

    pub(crate) fn set_log_mark_offset(&mut self, offset: u64) {
        self.log_mark.offset = offset;
    }

    pub fn next_seq_no(&self) -> u64 {
        self.next_seq_no
    }

    pub fn next_checksum(&self) -> u32 {
        self.next_checksum
    }

    /// First sequence number of the hints this machine was seeded from, or zero
    pub fn hinted_first_seq_no(&self) -> u64 {
        self.hinted_first_seq_no
    }

    /// Current path → Fnode view
    pub fn links(&self) -> &BTreeMap<String, Fnode> {
        &self.links
    }

    pub fn link(&self, path: &str) -> Option<Fnode> {
        self.links.get(path).copied()
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Bytes written to a live Fnode
    pub fn fnode_size(&self, fnode: Fnode) -> Option<u64> {
        self.live_nodes.get(&fnode).map(|node| node.size)
    }

    /// Paths linking a live Fnode
    pub fn fnode_links(&self, fnode: Fnode) -> Option<&BTreeSet<String>> {
        self.live_nodes.get(&fnode).map(|node| &node.links)
    }

    pub fn live_fnodes(&self) -> impl Iterator<Item = Fnode> + '_ {
        self.live_nodes.keys().copied()
    }
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;
