// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal names and log marks

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a journal, e.g. `recovery/shard-000`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalName(String);

impl JournalName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for JournalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JournalName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for JournalName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A byte position within a journal
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mark {
    pub journal: JournalName,
    pub offset: u64,
}

impl Mark {
    pub fn new(journal: JournalName, offset: u64) -> Self {
        Self { journal, offset }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.journal, self.offset)
    }
}
