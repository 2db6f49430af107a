// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gz-journal: local journal storage and tail reads
//!
//! `FileWriter` appends to journal files and publishes durable Fragments;
//! `Tail` serves reads against the Fragments published for one journal.

pub mod file;
pub mod tail;

pub use file::{journal_path, read_fragment, FileWriter, FileWriterConfig, FileWriterError};
pub use tail::{
    ReadError, ReadOp, ReadResponse, ReadResult, Tail, OFFSET_EARLIEST, OFFSET_TAIL,
    READ_OP_BUFFER_SIZE,
};
