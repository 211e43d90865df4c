//! Child process transport for running scripts.
//!
//! A session talks to its script through [`AnimProcess`]: write one line,
//! collect whatever output lines have arrived, kill. [`ChildProcess`] is the
//! real implementation; its stdout is drained on a reader thread into a
//! channel so [`AnimProcess::poll`] never blocks.

use std::io::{self, BufRead, BufReader, LineWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anim_protocol::RUN_FLAG;
use tracing::{debug, warn};

use crate::error::AnimError;

/// How often a bounded wait checks whether the child exited
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Bidirectional line channel to one running script
pub trait AnimProcess: Send {
    /// Write one line (newline appended).
    fn send(&mut self, line: &str) -> io::Result<()>;

    /// Take all complete output lines received so far, without blocking.
    fn poll(&mut self) -> Vec<String>;

    /// Kill the process; its exit is reaped in the background.
    fn kill(self: Box<Self>);

    /// Kill the process and wait up to `timeout` for it to exit.
    fn kill_wait(self: Box<Self>, timeout: Duration);
}

/// Launches scripts in run mode
pub trait Spawner: Send + Sync {
    fn spawn(&self, path: &Path) -> Result<Box<dyn AnimProcess>, AnimError>;
}

/// Spawns real child processes with `--ckb-run`
#[derive(Debug, Default, Clone, Copy)]
pub struct ChildSpawner;

impl Spawner for ChildSpawner {
    fn spawn(&self, path: &Path) -> Result<Box<dyn AnimProcess>, AnimError> {
        Ok(Box::new(ChildProcess::spawn(path)?))
    }
}

/// A script running as a child process
pub struct ChildProcess {
    path: PathBuf,
    child: Option<Child>,
    stdin: Option<LineWriter<ChildStdin>>,
    lines: Receiver<String>,
}

impl ChildProcess {
    pub fn spawn(path: &Path) -> Result<Self, AnimError> {
        let mut child = Command::new(path)
            .arg(RUN_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| AnimError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = child.stdin.take().map(LineWriter::new);
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;

        let (tx, rx) = mpsc::channel();
        if let Err(e) = spawn_line_reader("anim-stdout", stdout, tx) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e.into());
        }

        Ok(Self {
            path: path.to_path_buf(),
            child: Some(child),
            stdin,
            lines: rx,
        })
    }

    /// OS process id, while the child is attached.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    fn reap_in_background(&mut self) {
        self.stdin = None;
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.kill() {
            debug!("kill {}: {e}", self.path.display());
        }
        let reaper = thread::Builder::new()
            .name("anim-reaper".to_string())
            .spawn(move || {
                let _ = child.wait();
            });
        if let Err(e) = reaper {
            warn!("Could not reap {}: {e}", self.path.display());
        }
    }
}

impl AnimProcess for ChildProcess {
    fn send(&mut self, line: &str) -> io::Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => writeln!(stdin, "{line}"),
            None => Err(io::ErrorKind::BrokenPipe.into()),
        }
    }

    fn poll(&mut self) -> Vec<String> {
        self.lines.try_iter().collect()
    }

    fn kill(mut self: Box<Self>) {
        self.reap_in_background();
    }

    fn kill_wait(mut self: Box<Self>, timeout: Duration) {
        self.stdin = None;
        let Some(mut child) = self.child.take() else {
            return;
        };
        let _ = child.kill();
        match wait_timeout(&mut child, timeout) {
            Ok(Some(_)) => {}
            Ok(None) => warn!(
                "{} still running {}ms after kill",
                self.path.display(),
                timeout.as_millis()
            ),
            Err(e) => warn!("wait {}: {e}", self.path.display()),
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        self.reap_in_background();
    }
}

/// Forward each line `reader` produces to `tx` from a named thread.
///
/// Bytes that are not UTF-8 are replaced, so one bad line does not end the
/// stream. The thread exits at EOF or once the receiver is gone.
pub(crate) fn spawn_line_reader<R>(
    name: &str,
    reader: R,
    tx: Sender<String>,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    let label = name.to_string();
    thread::Builder::new().name(label.clone()).spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("{label}: read failed: {e}");
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.strip_suffix('\n').unwrap_or(&line);
            let line = line.strip_suffix('\r').unwrap_or(line);
            if tx.send(line.to_string()).is_err() {
                break;
            }
        }
    })
}

/// Wait for `child` to exit, giving up after `timeout`.
///
/// Returns `Ok(None)` if the child is still running.
pub fn wait_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL_INTERVAL.min(deadline - now));
    }
}
