// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! gz-core: shared types of the journal store
//!
//! This crate provides:
//! - Journal names and log marks
//! - Fragments and ordered fragment sets for offset lookup
//! - Fixed-header framing of messages written to a journal
//! - Handles to pending durable appends, and the `Writer` seam that issues them

pub mod append;
pub mod fragment;
pub mod framing;
pub mod journal;
pub mod writer;

pub use append::{AppendError, AppendSignal, AsyncAppend};
pub use fragment::{Fragment, FragmentSet};
pub use framing::{Frame, FrameReader, FramingError, FIXED_FRAME_HEADER_LENGTH, FRAME_MAGIC};
pub use journal::{JournalName, Mark};
pub use writer::{WriteError, Writer};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use writer::{FakeWriter, WriteCall};
