// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hints bounding replay of a recovery log
//!
//! Hints are a snapshot of an `Fsm` taken by the recorder. They name the
//! earliest log position (and op sequence) still needed to rebuild every live
//! file, so that replay need not scan from the start of the journal.

use crate::op::{Author, Fnode};
use gz_core::Mark;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A run of ops by one author which touched an Fnode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub author: Author,
    pub first_seq_no: u64,
    /// Checksum carried by the op at `first_seq_no`
    pub first_checksum: u32,
    /// Lower bound on the log offset of the op at `first_seq_no`
    pub first_offset: u64,
    pub last_seq_no: u64,
}

/// Segments of a live Fnode, in log order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FnodeSegments {
    pub fnode: Fnode,
    pub segments: Vec<Segment>,
}

/// Snapshot sufficient to bound replay of a recovery log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsmHints {
    /// Position from which replay must begin
    pub log_mark: Mark,
    /// Sequence number of the first op replay must apply
    pub first_seq_no: u64,
    /// Checksum expected of the op at `first_seq_no`
    pub first_checksum: u32,
    pub live_nodes: Vec<FnodeSegments>,
    pub properties: BTreeMap<String, String>,
}

impl FsmHints {
    /// Hints of an empty log
    pub fn empty(log_mark: Mark) -> Self {
        Self {
            log_mark,
            first_seq_no: 1,
            first_checksum: 0,
            live_nodes: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}
