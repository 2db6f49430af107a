// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recorded filesystem operations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a unique file content stream
///
/// An Fnode is the `seq_no` of the `Create` op which created it. It survives
/// renames and links, but not delete followed by re-create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fnode(pub u64);

impl fmt::Display for Fnode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fnode-{}", self.0)
    }
}

/// Random per-recorder identity, disambiguating concurrent writers of a log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Author(pub u32);

impl Author {
    /// Draw a new, non-zero random author
    pub fn random() -> Self {
        loop {
            let id = (uuid::Uuid::new_v4().as_u128() & u128::from(u32::MAX)) as u32;
            if id != 0 {
                return Self(id);
            }
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// The state transition carried by a recorded op
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Create a new Fnode, linked at `path`
    Create { path: String },
    /// Add a hard link of `fnode` at `path`
    Link { fnode: Fnode, path: String },
    /// Remove the link of `fnode` at `path`
    Unlink { fnode: Fnode, path: String },
    /// Write `length` bytes at `offset` of `fnode`; the bytes follow the op's frame
    Write { fnode: Fnode, offset: u64, length: u64 },
    /// Set the full content of a property file
    Property { path: String, content: String },
}

impl OpKind {
    pub fn create(path: impl Into<String>) -> Self {
        Self::Create { path: path.into() }
    }

    pub fn link(fnode: Fnode, path: impl Into<String>) -> Self {
        Self::Link {
            fnode,
            path: path.into(),
        }
    }

    pub fn unlink(fnode: Fnode, path: impl Into<String>) -> Self {
        Self::Unlink {
            fnode,
            path: path.into(),
        }
    }

    pub fn write(fnode: Fnode, offset: u64, length: u64) -> Self {
        Self::Write {
            fnode,
            offset,
            length,
        }
    }

    pub fn property(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Property {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Short name of the op kind, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Link { .. } => "link",
            Self::Unlink { .. } => "unlink",
            Self::Write { .. } => "write",
            Self::Property { .. } => "property",
        }
    }

    /// The existing Fnode this op references, if any
    pub fn fnode(&self) -> Option<Fnode> {
        match self {
            Self::Link { fnode, .. } | Self::Unlink { fnode, .. } | Self::Write { fnode, .. } => {
                Some(*fnode)
            }
            Self::Create { .. } | Self::Property { .. } => None,
        }
    }
}

/// A single sequenced, checksummed state transition of the recovery log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedOp {
    /// Monotonically increasing sequence number
    pub seq_no: u64,
    /// Rolling checksum of all prior op payloads of this lineage
    pub checksum: u32,
    pub author: Author,
    pub op: OpKind,
}
