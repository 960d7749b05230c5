//! Helpers for running external tools with timeouts and bounded output.

use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

use super::transcript::Transcript;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Exited zero within the timeout.
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    /// Stdout followed by stderr, with truncation notices.
    pub fn combined(&self) -> Vec<u8> {
        let mut buf = self.stdout.clone();
        if self.stdout_truncated > 0 {
            buf.extend_from_slice(
                format!("\n[stdout truncated {} bytes]\n", self.stdout_truncated).as_bytes(),
            );
        }
        buf.extend_from_slice(&self.stderr);
        if self.stderr_truncated > 0 {
            buf.extend_from_slice(
                format!("\n[stderr truncated {} bytes]\n", self.stderr_truncated).as_bytes(),
            );
        }
        if self.timed_out {
            buf.extend_from_slice(b"\n[timed out]\n");
        }
        buf
    }
}

/// How long the pipe readers may keep draining once the child has exited or been killed.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

type ReadResult = Result<(Vec<u8>, usize)>;

/// Build a `Command` from an argv vector.
pub fn command_from_argv(argv: &[String]) -> Result<Command> {
    let Some((program, args)) = argv.split_first() else {
        bail!("empty command");
    };
    let mut cmd = Command::new(program);
    cmd.args(args);
    Ok(cmd)
}

/// Space-joined argv for transcript labels.
pub fn describe(argv: &[String]) -> String {
    argv.join(" ")
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
///
/// On Unix the child leads its own process group, and a timeout kills the whole group so
/// helpers it spawned (`sh -c`, package managers, build daemons) go down with it. Readers
/// still blocked after [`DRAIN_GRACE`] are abandoned.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    debug!(program = ?cmd.get_program(), "spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            debug!(err = %e, program = ?cmd.get_program(), "failed to spawn command");
            return Err(e).with_context(|| format!("spawn {:?}", cmd.get_program()));
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_rx = spawn_reader(stdout, output_limit_bytes);
    let stderr_rx = spawn_reader(stderr, output_limit_bytes);

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            kill_process_group(child.id());
            if let Err(e) = child.kill() {
                debug!(err = %e, "kill after group kill");
            }
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = collect_output(&stdout_rx, "stdout")?;
    let (stderr, stderr_truncated) = collect_output(&stderr_rx, "stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

/// Run `argv` in `workdir` and append everything it printed to the transcript file.
///
/// A tool that cannot be spawned is reported as `Err`; callers treat that like a
/// failed step.
pub fn run_logged(
    argv: &[String],
    workdir: &Path,
    timeout: Duration,
    output_limit_bytes: usize,
    transcript: &mut Transcript,
) -> Result<CommandOutput> {
    let mut cmd = command_from_argv(argv)?;
    cmd.current_dir(workdir);
    let label = describe(argv);
    let output = match run_command_with_timeout(cmd, timeout, output_limit_bytes) {
        Ok(output) => output,
        Err(err) => {
            transcript.tool_output(&label, format!("{err:#}").as_bytes());
            return Err(err);
        }
    };
    transcript.tool_output(&label, &output.combined());
    Ok(output)
}

fn spawn_reader<R: Read + Send + 'static>(reader: R, limit: usize) -> Receiver<ReadResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone only if the reader was abandoned.
        let _ = tx.send(read_stream_limited(reader, limit));
    });
    rx
}

/// Wait for a reader to hit EOF, giving up after [`DRAIN_GRACE`].
fn collect_output(rx: &Receiver<ReadResult>, stream: &str) -> Result<(Vec<u8>, usize)> {
    match rx.recv_timeout(DRAIN_GRACE) {
        Ok(result) => result.with_context(|| format!("read {stream}")),
        Err(RecvTimeoutError::Timeout) => {
            warn!(stream, "pipe still held open by a descendant, output abandoned");
            Ok((Vec::new(), 0))
        }
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("{stream} reader thread panicked")),
    }
}

/// Kill every process in the group led by `pid`. Best effort.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let group = format!("-{pid}");
    let result = Command::new("kill")
        .args(["-KILL", "--", group.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = result {
        debug!(err = %e, pid, "process group kill failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
