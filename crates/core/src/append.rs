// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handles to pending durable appends
//!
//! A journal writer returns an `AsyncAppend` for every submitted write, and
//! keeps the paired `AppendSignal` until the write is durable. The handle can
//! be polled without blocking, or waited on from a synchronous caller.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Errors completing an append
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppendError {
    #[error("journal writer closed before the append completed")]
    Closed,
    #[error("append failed: {0}")]
    Failed(String),
}

type Outcome = Result<u64, AppendError>;

#[derive(Debug, Default)]
struct Shared {
    outcome: Mutex<Option<Outcome>>,
    ready: Condvar,
}

impl Shared {
    /// Record the outcome, unless one was already recorded
    fn complete(&self, outcome: Outcome) {
        let mut guard = self.outcome.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            *guard = Some(outcome);
        }
        self.ready.notify_all();
    }
}

/// A pending durable write
///
/// Once ready, carries the journal write head: the absolute end offset of the
/// journal after this write landed.
#[derive(Debug, Clone)]
pub struct AsyncAppend {
    shared: Arc<Shared>,
}

/// Completes an `AsyncAppend`; held by the journal writer
///
/// Dropping an unresolved signal fails its append with `AppendError::Closed`.
#[derive(Debug)]
pub struct AppendSignal {
    shared: Arc<Shared>,
}

impl AsyncAppend {
    /// Create a pending append and the signal which completes it
    pub fn pending() -> (AsyncAppend, AppendSignal) {
        let shared = Arc::new(Shared::default());
        (
            AsyncAppend {
                shared: Arc::clone(&shared),
            },
            AppendSignal { shared },
        )
    }

    /// An append which already landed at `write_head`
    pub fn resolved(write_head: u64) -> Self {
        let (append, signal) = Self::pending();
        signal.resolve(write_head);
        append
    }

    /// Whether the append completed, successfully or not
    pub fn is_ready(&self) -> bool {
        self.outcome().is_some()
    }

    /// Write head of a successfully completed append
    pub fn write_head(&self) -> Option<u64> {
        self.outcome().and_then(Result::ok)
    }

    /// Outcome of the append, if completed
    pub fn outcome(&self) -> Option<Outcome> {
        self.shared
            .outcome
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Block until the append completes
    pub fn wait(&self) -> Outcome {
        let mut guard = self
            .shared
            .outcome
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            guard = self
                .shared
                .ready
                .wait(guard)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Block until the append completes or `timeout` elapses
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome> {
        let guard = self
            .shared
            .outcome
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let (guard, _status) = self
            .shared
            .ready
            .wait_timeout_while(guard, timeout, |outcome| outcome.is_none())
            .unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }
}

impl AppendSignal {
    /// Mark the append durable at `write_head`
    pub fn resolve(self, write_head: u64) {
        self.shared.complete(Ok(write_head));
    }

    /// Mark the append failed
    pub fn fail(self, err: AppendError) {
        self.shared.complete(Err(err));
    }
}

impl Drop for AppendSignal {
    fn drop(&mut self) {
        self.shared.complete(Err(AppendError::Closed));
    }
}

#[cfg(test)]
#[path = "append_tests.rs"]
mod tests;
