// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake journal writer for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{WriteError, Writer};
use crate::append::{AppendSignal, AsyncAppend};
use crate::journal::JournalName;
use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::sync::{Arc, Mutex};

/// Recorded writer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub journal: JournalName,
    pub bytes: Vec<u8>,
    /// Whether the bytes were submitted through `read_from`
    pub from_reader: bool,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<WriteCall>,
    heads: HashMap<JournalName, u64>,
    hold: bool,
    closed: bool,
    held: VecDeque<(AppendSignal, u64)>,
}

/// Fake journal writer for testing
///
/// Appends resolve immediately with their write head unless completions are
/// held, in which case they stay pending until released in submission order.
#[derive(Clone, Default)]
pub struct FakeWriter {
    state: Arc<Mutex<FakeState>>,
}

impl FakeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep subsequent appends pending until released
    pub fn hold_completions(&self, hold: bool) {
        self.lock().hold = hold;
    }

    /// Refuse all subsequent appends with `WriteError::Closed`
    pub fn set_closed(&self, closed: bool) {
        self.lock().closed = closed;
    }

    /// Resolve the oldest held append; returns false if none was held
    pub fn release_next(&self) -> bool {
        let next = self.lock().held.pop_front();
        match next {
            Some((signal, head)) => {
                signal.resolve(head);
                true
            }
            None => false,
        }
    }

    /// Resolve all held appends, returning how many were released
    pub fn release_all(&self) -> usize {
        let held: Vec<_> = self.lock().held.drain(..).collect();
        let count = held.len();
        for (signal, head) in held {
            signal.resolve(head);
        }
        count
    }

    /// Number of appends currently held
    pub fn held(&self) -> usize {
        self.lock().held.len()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<WriteCall> {
        self.lock().calls.clone()
    }

    /// Concatenated bytes appended to `journal`
    pub fn journal_bytes(&self, journal: &JournalName) -> Vec<u8> {
        self.lock()
            .calls
            .iter()
            .filter(|c| &c.journal == journal)
            .flat_map(|c| c.bytes.iter().copied())
            .collect()
    }

    /// Current write head of `journal`
    pub fn write_head(&self, journal: &JournalName) -> u64 {
        self.lock().heads.get(journal).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn append(
        &self,
        journal: &JournalName,
        bytes: Vec<u8>,
        from_reader: bool,
    ) -> Result<AsyncAppend, WriteError> {
        let mut state = self.lock();
        if state.closed {
            return Err(WriteError::Closed);
        }

        let head = state.heads.entry(journal.clone()).or_insert(0);
        *head += bytes.len() as u64;
        let head = *head;

        state.calls.push(WriteCall {
            journal: journal.clone(),
            bytes,
            from_reader,
        });

        let (append, signal) = AsyncAppend::pending();
        if state.hold || !state.held.is_empty() {
            state.held.push_back((signal, head));
        } else {
            signal.resolve(head);
        }
        Ok(append)
    }
}

impl Writer for FakeWriter {
    fn write(&self, journal: &JournalName, frame: Vec<u8>) -> Result<AsyncAppend, WriteError> {
        self.append(journal, frame, false)
    }

    fn read_from(
        &self,
        journal: &JournalName,
        reader: &mut dyn Read,
    ) -> Result<AsyncAppend, WriteError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        self.append(journal, buf, true)
    }
}
