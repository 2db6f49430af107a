// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gzlog dump <log>` - Print the ops of a recovery log

use crate::output::{print_line, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use gz_core::framing::{self, FrameReader, FramingError};
use gz_recoverylog::{OpKind, RecordedOp};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct DumpArgs {
    /// Recovery log file
    pub log: PathBuf,

    /// Byte offset to begin reading from
    #[arg(long, default_value = "0")]
    pub from: u64,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct DumpEntry {
    offset: u64,
    op: RecordedOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_len: Option<u64>,
}

impl fmt::Display for DumpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>10}  #{:<6} {:<8} {}",
            self.offset,
            self.op.seq_no,
            self.op.author,
            self.op.op.name()
        )?;
        match &self.op.op {
            OpKind::Create { path } => write!(f, " {path}"),
            OpKind::Link { fnode, path } | OpKind::Unlink { fnode, path } => {
                write!(f, " {fnode} {path}")
            }
            OpKind::Write {
                fnode,
                offset,
                length,
            } => write!(f, " {fnode} [{offset}, {})", offset.saturating_add(*length)),
            OpKind::Property { path, .. } => write!(f, " {path}"),
        }
    }
}

pub fn handle(args: DumpArgs) -> Result<()> {
    let bytes = super::read_log(&args.log, args.from)?;
    let mut reader = FrameReader::new(&bytes, args.from);

    while let Some(next) = reader.next() {
        let frame = match next {
            Ok(frame) => frame,
            Err(FramingError::Truncated { need, have }) => {
                eprintln!(
                    "log ends within a frame at offset {} ({have} of {need} bytes)",
                    reader.offset()
                );
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let op: RecordedOp = framing::decode(frame.payload)
            .with_context(|| format!("decoding op at offset {}", frame.offset))?;

        let data_len = match op.op {
            OpKind::Write { length, .. } => {
                if reader.skip_bytes(length).is_err() {
                    eprintln!("log ends within the data of write op at offset {}", frame.offset);
                    break;
                }
                Some(length)
            }
            _ => None,
        };

        print_line(
            &DumpEntry {
                offset: frame.offset,
                op,
                data_len,
            },
            args.format,
        );
    }

    if reader.resync_bytes() > 0 {
        eprintln!("skipped {} bytes not belonging to a frame", reader.resync_bytes());
    }
    Ok(())
}
