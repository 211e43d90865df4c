//! Info-mode probing of candidate scripts.
//!
//! The candidate runs with `--ckb-info` and must exit within the timeout;
//! a hung candidate is killed and rejected.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use anim_protocol::INFO_FLAG;
use tracing::{debug, trace};

use crate::descriptor::Descriptor;
use crate::error::AnimError;
use crate::process::{spawn_line_reader, wait_timeout};

/// How long a candidate may take to print its declarations
pub const DEFAULT_INFO_TIMEOUT: Duration = Duration::from_secs(1);

/// Extra time allowed for output still buffered in the pipe after exit
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Run `path --ckb-info` and build a descriptor from its output.
pub fn probe(path: &Path, timeout: Duration) -> Result<Descriptor, AnimError> {
    let start = Instant::now();
    let mut child = Command::new(path)
        .arg(INFO_FLAG)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| AnimError::Spawn {
            path: path.to_path_buf(),
            source,
        })?;

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        if let Err(e) = spawn_line_reader("anim-info", stdout, tx) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e.into());
        }
    }

    if wait_timeout(&mut child, timeout)?.is_none() {
        let _ = child.kill();
        let _ = child.wait();
        return Err(AnimError::ProbeTimeout {
            path: path.to_path_buf(),
            timeout_ms: timeout.as_millis() as u64,
        });
    }

    // The process has exited; collect what it wrote. A stray grandchild
    // holding the pipe open must not stall discovery.
    let deadline = Instant::now() + DRAIN_GRACE;
    let mut lines = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(line) => {
                trace!("info: {line}");
                lines.push(line);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                debug!("{}: output still open after exit", path.display());
                break;
            }
        }
    }

    debug!(
        "Probed {} in {}ms ({} lines)",
        path.display(),
        start.elapsed().as_millis(),
        lines.len()
    );
    Ok(Descriptor::from_declarations(lines)?.with_path(path))
}
