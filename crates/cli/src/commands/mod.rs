// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod dump;
pub mod replay;

use anyhow::{Context, Result};
use std::path::Path;

/// Read a recovery log file, beginning at offset `from`
pub fn read_log(path: &Path, from: u64) -> Result<Vec<u8>> {
    let mut bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let start = usize::try_from(from)
        .ok()
        .filter(|start| *start <= bytes.len())
        .with_context(|| format!("offset {from} is beyond the end of {} ({} bytes)", path.display(), bytes.len()))?;
    Ok(bytes.split_off(start))
}
