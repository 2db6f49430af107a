// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gz-recoverylog: recording and replay of a storage engine's filesystem
//!
//! ## Architecture
//!
//! ```text
//! storage engine ─→ Recorder ─→ RecordedOp frames ─→ Writer ─→ journal
//!                      │                                          │
//!                      └─→ Fsm (local view)      replay() ←───────┘
//!                                                    │
//!                                                    └─→ Fsm ─→ FsmHints
//! ```
//!
//! Every filesystem mutation observed by the `Recorder` is decomposed into
//! `RecordedOp`s, applied to the recorder's `Fsm`, and written to the
//! recovery log as one atomic append. Replaying those appends through a fresh
//! `Fsm` (optionally seeded from `FsmHints`) reconstructs the same view.

pub mod config;
pub mod fsm;
pub mod hints;
pub mod observer;
pub mod op;
pub mod path;
pub mod recorder;
pub mod replay;

pub use config::{ConfigError, RecorderConfig};
pub use fsm::{Fsm, FsmError};
pub use hints::{FnodeSegments, FsmHints, Segment};
pub use observer::{EnvObserver, WritableFileObserver};
pub use op::{Author, Fnode, OpKind, RecordedOp};
pub use recorder::{FileRecorder, Recorder, RecorderError};
pub use replay::{replay, ReplayError, ReplayReport, SkippedOp};
