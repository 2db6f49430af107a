// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gzlog replay <log>` - Rebuild recorder state from a recovery log

use crate::output::print_json;
use anyhow::{Context, Result};
use clap::Args;
use gz_recoverylog::{replay, Fsm, FsmHints, RecorderConfig};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ReplayArgs {
    /// Recovery log file
    pub log: PathBuf,

    /// Hints (JSON) to seed replay from
    #[arg(long)]
    pub hints: Option<PathBuf>,

    /// Byte offset to begin reading from (default: the hinted log mark)
    #[arg(long)]
    pub from: Option<u64>,
}

fn load_hints(path: &Path) -> Result<FsmHints> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing hints {}", path.display()))
}

pub fn handle(args: ReplayArgs, config: &RecorderConfig) -> Result<()> {
    let (mut fsm, hinted_offset) = match &args.hints {
        Some(path) => {
            let hints = load_hints(path)?;
            (Fsm::from_hints(&hints), hints.log_mark.offset)
        }
        None => (Fsm::new(config.journal.clone()), 0),
    };
    let from = args.from.unwrap_or(hinted_offset);

    let bytes = super::read_log(&args.log, from)?;
    let report = replay(&mut fsm, &bytes, from)
        .with_context(|| format!("replaying {}", args.log.display()))?;

    for skipped in &report.skipped {
        eprintln!(
            "skipped op #{} by {} at offset {}: {}",
            skipped.seq_no, skipped.author, skipped.offset, skipped.reason
        );
    }
    if report.resync_bytes > 0 {
        eprintln!("skipped {} bytes not belonging to a frame", report.resync_bytes);
    }
    if report.truncated {
        eprintln!("log ends within a frame at offset {}", report.end_offset);
    }
    eprintln!(
        "applied {} ops, skipped {} ({} preceding hints), next seq_no {}",
        report.applied,
        report.skipped.len(),
        report.preceding,
        fsm.next_seq_no()
    );

    print_json(&fsm.build_hints())
}
