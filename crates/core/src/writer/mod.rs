// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal writer seam
//!
//! Recorders issue appends through `Writer`; the journal's storage layer
//! provides the implementation.

use crate::append::AsyncAppend;
use crate::journal::JournalName;
use std::io::Read;
use std::sync::Arc;
use thiserror::Error;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWriter, WriteCall};

/// Errors submitting an append
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("journal writer is closed")]
    Closed,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Appends bytes to journals
///
/// The bytes of each call are appended atomically, and in submission order
/// relative to other calls on the same writer. Both methods return as soon as
/// the append is queued; the returned handle resolves once it is durable.
pub trait Writer: Send + Sync {
    /// Append `frame` to `journal`
    fn write(&self, journal: &JournalName, frame: Vec<u8>) -> Result<AsyncAppend, WriteError>;

    /// Append everything readable from `reader` to `journal`, as one append
    fn read_from(
        &self,
        journal: &JournalName,
        reader: &mut dyn Read,
    ) -> Result<AsyncAppend, WriteError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        self.write(journal, buf)
    }
}

impl<W: Writer + ?Sized> Writer for Arc<W> {
    fn write(&self, journal: &JournalName, frame: Vec<u8>) -> Result<AsyncAppend, WriteError> {
        (**self).write(journal, frame)
    }

    fn read_from(
        &self,
        journal: &JournalName,
        reader: &mut dyn Read,
    ) -> Result<AsyncAppend, WriteError> {
        (**self).read_from(journal, reader)
    }
}
