//! Child → host output reader
//!
//! The child answers each `frame` request with a block:
//!
//! ```text
//! begin frame
//! argb <key> <hex8>
//! end frame
//! ```
//!
//! Anything outside a block is ignored except `end run`, which marks the end
//! of the animation.

use tracing::trace;

use crate::encoding::parse_hex_u32;
use crate::error::ProtocolError;

/// Something the host needs to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildEvent {
    /// A completed frame: per-key ARGB values in the order reported
    Frame(Vec<(String, u32)>),
    /// The animation finished; no more frames will follow
    EndRun,
}

/// Parse one `argb <key> <hex>` line.
pub fn parse_argb(line: &str) -> Result<(String, u32), ProtocolError> {
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() != 3 || parts[0] != "argb" {
        return Err(ProtocolError::MalformedColor(line.to_string()));
    }
    let value = parse_hex_u32(parts[2])
        .ok_or_else(|| ProtocolError::InvalidHex(parts[2].to_string()))?;
    Ok((parts[1].to_string(), value))
}

/// Incremental parser fed one stdout line at a time
#[derive(Debug, Default)]
pub struct FrameReader {
    in_frame: bool,
    pending: Vec<(String, u32)>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any partially read frame.
    pub fn reset(&mut self) {
        self.in_frame = false;
        self.pending.clear();
    }

    /// Feed one line; returns an event when a block completes or the run ends.
    pub fn feed(&mut self, line: &str) -> Option<ChildEvent> {
        let line = line.trim();
        if !self.in_frame {
            match line {
                "begin frame" => self.in_frame = true,
                "end run" => return Some(ChildEvent::EndRun),
                _ => trace!("ignoring output outside frame: {line:?}"),
            }
            return None;
        }

        if line == "end frame" {
            self.in_frame = false;
            return Some(ChildEvent::Frame(std::mem::take(&mut self.pending)));
        }

        match parse_argb(line) {
            Ok(entry) => self.pending.push(entry),
            Err(e) => trace!("dropping frame line: {e}"),
        }
        None
    }
}
