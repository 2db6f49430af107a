// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-header framing of journal messages
//!
//! Each frame is an 8-byte header followed by a JSON payload:
//!
//! ```text
//! +------------------+--------------------+-------------------+
//! | magic (4 bytes)  | payload len (u32le)| payload (len)     |
//! +------------------+--------------------+-------------------+
//! ```
//!
//! The magic word lets a reader that starts at an arbitrary offset, or that
//! encounters corrupt bytes, resynchronize onto the next frame boundary.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::Range;
use thiserror::Error;

/// Magic word beginning every frame
pub const FRAME_MAGIC: [u8; 4] = [0x66, 0x33, 0x93, 0x36];

/// Length of the fixed frame header (magic + payload length)
pub const FIXED_FRAME_HEADER_LENGTH: usize = 8;

/// Largest payload accepted by `encode` and `FrameReader`
pub const MAX_FRAME_LEN: usize = 16 << 20;

/// Errors encoding or decoding frames
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("frame magic mismatch: {0:02x?}")]
    BadMagic([u8; 4]),
    #[error("frame payload of {0} bytes exceeds maximum of {MAX_FRAME_LEN}")]
    TooLarge(usize),
    #[error("frame truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append a frame holding `msg` to `buf`
///
/// Returns the range of `buf` holding the serialized payload.
pub fn encode<T: Serialize>(msg: &T, buf: &mut Vec<u8>) -> Result<Range<usize>, FramingError> {
    let payload = serde_json::to_vec(msg)?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len as usize <= MAX_FRAME_LEN)
        .ok_or(FramingError::TooLarge(payload.len()))?;

    buf.reserve(FIXED_FRAME_HEADER_LENGTH + payload.len());
    buf.extend_from_slice(&FRAME_MAGIC);
    buf.extend_from_slice(&len.to_le_bytes());
    let start = buf.len();
    buf.extend_from_slice(&payload);
    Ok(start..buf.len())
}

/// Validate a frame header, returning the payload length
pub fn decode_header(header: &[u8]) -> Result<usize, FramingError> {
    if header.len() < FIXED_FRAME_HEADER_LENGTH {
        return Err(FramingError::Truncated {
            need: FIXED_FRAME_HEADER_LENGTH,
            have: header.len(),
        });
    }
    let magic = [header[0], header[1], header[2], header[3]];
    if magic != FRAME_MAGIC {
        return Err(FramingError::BadMagic(magic));
    }
    let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if len > MAX_FRAME_LEN {
        return Err(FramingError::TooLarge(len));
    }
    Ok(len)
}

/// Deserialize a frame payload
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, FramingError> {
    serde_json::from_slice(payload).map_err(FramingError::from)
}

/// A frame located within a byte buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Absolute offset of the frame header
    pub offset: u64,
    pub payload: &'a [u8],
}

/// Iterates frames of a byte buffer read from a journal
///
/// Bytes which do not begin a valid frame are skipped by scanning forward to
/// the next magic word; the count of skipped bytes is kept in
/// `resync_bytes()`. A frame cut short by the end of the buffer yields
/// `FramingError::Truncated` once, and the reader stays positioned at it.
pub struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
    base_offset: u64,
    resync_bytes: u64,
    exhausted: bool,
}

impl<'a> FrameReader<'a> {
    /// Read frames of `buf`, which begins at journal offset `base_offset`
    pub fn new(buf: &'a [u8], base_offset: u64) -> Self {
        Self {
            buf,
            pos: 0,
            base_offset,
            resync_bytes: 0,
            exhausted: false,
        }
    }

    /// Absolute offset of the next unread byte
    pub fn offset(&self) -> u64 {
        self.base_offset + self.pos as u64
    }

    /// Total bytes skipped while resynchronizing
    pub fn resync_bytes(&self) -> u64 {
        self.resync_bytes
    }

    /// Skip `len` raw bytes which follow the last frame
    pub fn skip_bytes(&mut self, len: u64) -> Result<(), FramingError> {
        let have = self.buf.len() - self.pos;
        match usize::try_from(len) {
            Ok(len) if len <= have => {
                self.pos += len;
                Ok(())
            }
            _ => Err(FramingError::Truncated {
                need: usize::try_from(len).unwrap_or(usize::MAX),
                have,
            }),
        }
    }

    /// Take `len` raw bytes which follow the last frame
    pub fn take_bytes(&mut self, len: u64) -> Result<&'a [u8], FramingError> {
        let start = self.pos;
        self.skip_bytes(len)?;
        Ok(&self.buf[start..self.pos])
    }

    fn resync(&mut self) {
        let from = self.pos + 1;
        let next = self.buf[from.min(self.buf.len())..]
            .windows(FRAME_MAGIC.len())
            .position(|w| w == FRAME_MAGIC)
            .map_or(self.buf.len(), |i| from + i);

        tracing::debug!(
            offset = self.offset(),
            skipped = next - self.pos,
            "resynchronizing frame reader"
        );
        self.resync_bytes += (next - self.pos) as u64;
        self.pos = next;
    }
}

impl<'a> Iterator for FrameReader<'a> {
    type Item = Result<Frame<'a>, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.exhausted || self.pos == self.buf.len() {
                return None;
            }
            let rest = &self.buf[self.pos..];

            let len = match decode_header(rest) {
                Ok(len) => len,
                // A short tail is a cut-off header only if it could still be one.
                Err(err @ FramingError::Truncated { .. })
                    if rest.starts_with(&FRAME_MAGIC[..rest.len().min(FRAME_MAGIC.len())]) =>
                {
                    self.exhausted = true;
                    return Some(Err(err));
                }
                Err(_) => {
                    self.resync();
                    continue;
                }
            };

            let need = FIXED_FRAME_HEADER_LENGTH + len;
            if rest.len() < need {
                self.exhausted = true;
                return Some(Err(FramingError::Truncated {
                    need,
                    have: rest.len(),
                }));
            }

            let frame = Frame {
                offset: self.offset(),
                payload: &rest[FIXED_FRAME_HEADER_LENGTH..need],
            };
            self.pos += need;
            return Some(Ok(frame));
        }
    }
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
