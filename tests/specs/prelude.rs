//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

// Aggressive timeouts for fast tests.
const SWO_TIMEOUT_ACK_MS: &str = "2000";
const SWOD_WATCH_POLL_MS: &str = "50";

pub const SPEC_POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const SPEC_WAIT_MAX: Duration = Duration::from_secs(3);

/// Returns the path to a built binary, resolving relative to the test
/// binary itself when CARGO_MANIFEST_DIR is stale (e.g. a shared
/// target directory).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where swo and swod are built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn swo_binary() -> PathBuf {
    binary_path("swo")
}

pub fn swod_binary() -> PathBuf {
    binary_path("swod")
}

/// A `swo` invocation against a specific socket path.
pub fn swo_cmd(socket: &Path) -> Command {
    let mut cmd = Command::new(swo_binary());
    cmd.env("THEOLDSWITCHEROO_SOCKET", socket);
    cmd.env("SWO_TIMEOUT_ACK_MS", SWO_TIMEOUT_ACK_MS);
    cmd.env_remove("BASE_DIR");
    cmd
}

/// A running bus daemon with pumped stdio.
pub struct Daemon {
    child: Child,
    pub socket: PathBuf,
    stdin: Option<std::process::ChildStdin>,
    stdout_rx: mpsc::Receiver<String>,
    stderr_rx: mpsc::Receiver<String>,
}

impl Daemon {
    /// Start `swod` against `<dir>/daemon.sock` and wait for the
    /// socket to appear.
    pub fn start(dir: &Path) -> Daemon {
        let socket = dir.join("daemon.sock");
        let mut child = Command::new(swod_binary())
            .env("THEOLDSWITCHEROO_SOCKET", &socket)
            .env("SWOD_WATCH_POLL_MS", SWOD_WATCH_POLL_MS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn swod");

        let stdin = child.stdin.take();
        let stdout_rx = pump_lines(child.stdout.take().expect("swod stdout"));
        let stderr_rx = pump_lines(child.stderr.take().expect("swod stderr"));

        let daemon = Daemon {
            child,
            socket,
            stdin,
            stdout_rx,
            stderr_rx,
        };
        daemon.wait_for_socket();
        daemon
    }

    fn wait_for_socket(&self) {
        let start = Instant::now();
        while start.elapsed() < SPEC_WAIT_MAX {
            if self.socket.exists() {
                return;
            }
            std::thread::sleep(SPEC_POLL_INTERVAL);
        }
        panic!("swod never created its socket at {}", self.socket.display());
    }

    /// Next event line the daemon wrote to its stdout.
    pub fn next_event(&self, timeout: Duration) -> Option<String> {
        self.stdout_rx.recv_timeout(timeout).ok()
    }

    /// Collected stderr so far.
    pub fn drain_stderr(&self) -> Vec<String> {
        self.stderr_rx.try_iter().collect()
    }

    /// Write one line to the daemon's stdin (controller -> clients).
    pub fn broadcast(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("daemon stdin already closed");
        writeln!(stdin, "{line}").expect("write to swod stdin");
        stdin.flush().expect("flush swod stdin");
    }

    /// Close the daemon's stdin (controller gone).
    pub fn close_stdin(&mut self) {
        self.stdin.take();
    }

    /// Wait for the daemon to exit, returning true if it did.
    pub fn wait_exit(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Ok(Some(_)) = self.child.try_wait() {
                return true;
            }
            std::thread::sleep(SPEC_POLL_INTERVAL);
        }
        false
    }

    pub fn send_sigterm(&self) {
        let _ = Command::new("kill")
            .args(["-15", &self.child.id().to_string()])
            .status();
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Pump a reader's lines into a channel from a background thread.
fn pump_lines<R: std::io::Read + Send + 'static>(reader: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let buf = BufReader::new(reader);
        for line in buf.lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

/// Connect a raw client to the daemon socket.
pub fn raw_client(socket: &Path) -> std::os::unix::net::UnixStream {
    let stream = std::os::unix::net::UnixStream::connect(socket).expect("connect to swod");
    stream
        .set_read_timeout(Some(SPEC_WAIT_MAX))
        .expect("set read timeout");
    stream
}
