use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at};
use tracing::{debug, warn};

use crate::error::{Result, WrapperError};
use crate::types::CheckStatus;

/// How long a killed child gets to be reaped before we give up on it.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// How long to keep draining stdout and stderr, together, after the child is gone.
///
/// A process that left the child's process group can hold the pipes open
/// indefinitely; whatever was read by then is kept.
const IO_CAPTURE_TIMEOUT: Duration = Duration::from_secs(2);

/// Maximum bytes captured per stream; the rest is drained and dropped.
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub struct ExecOutcome {
    pub status: CheckStatus,
    /// stdout when the command succeeded, stderr otherwise.
    pub output: String,
    /// `None` when the process was terminated by a signal or could not be reaped.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
}

/// Run `program` with `args`, killing it if it is still running after `limit`.
///
/// Only failures of the wrapper itself are errors: the program cannot be
/// spawned, or waiting on it fails. Everything the program does, including
/// running past the deadline, is folded into the returned status.
///
/// On Unix the program runs in its own process group. Once the program has
/// exited or been killed, anything it left behind in that group is killed too.
pub async fn execute(program: &str, args: &[String], limit: Duration) -> Result<ExecOutcome> {
    let start = Instant::now();
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|source| WrapperError::Spawn {
        program: program.to_string(),
        source,
    })?;
    let pid = child.id();

    debug!(
        program,
        pid,
        timeout_secs = limit.as_secs(),
        "spawned check command"
    );

    let stdout = child.stdout.take().map(Capture::start);
    let stderr = child.stderr.take().map(Capture::start);

    let waited = timeout(limit, child.wait()).await;
    let (exit_code, timed_out) = match waited {
        Ok(Ok(status)) => (status.code(), false),
        Ok(Err(source)) => {
            kill_process_group(pid, program);
            return Err(WrapperError::Wait {
                program: program.to_string(),
                source,
            });
        }
        Err(_) => {
            warn!(
                program,
                timeout_secs = limit.as_secs(),
                "command timed out; killing"
            );
            kill_process_group(pid, program);
            if let Err(err) = child.start_kill() {
                warn!(program, error = %err, "failed to kill timed-out command");
            }
            match timeout(KILL_GRACE, child.wait()).await {
                Ok(Ok(status)) => (status.code(), true),
                Ok(Err(err)) => {
                    warn!(program, error = %err, "failed to reap killed command");
                    (None, true)
                }
                Err(_) => {
                    warn!(program, "killed command was not reaped within grace period");
                    (None, true)
                }
            }
        }
    };

    // Leftover background processes would otherwise keep the pipes open.
    if !timed_out {
        kill_process_group(pid, program);
    }

    let deadline = tokio::time::Instant::now() + IO_CAPTURE_TIMEOUT;
    let (stdout, stderr) = tokio::join!(
        Capture::finish(stdout, "stdout", deadline),
        Capture::finish(stderr, "stderr", deadline),
    );

    let status = CheckStatus::from_exit_code(exit_code);
    let captured = if status == CheckStatus::Ok { stdout } else { stderr };

    Ok(ExecOutcome {
        status,
        output: String::from_utf8_lossy(&captured).into_owned(),
        exit_code,
        timed_out,
        duration: start.elapsed(),
    })
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>, program: &str) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pgid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(err) => warn!(program, pgid, error = %err, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>, _program: &str) {}

/// Bytes read from one stream so far, shared with the task reading it.
type Shared = Arc<Mutex<Vec<u8>>>;

struct Capture {
    buf: Shared,
    task: JoinHandle<std::io::Result<()>>,
}

impl Capture {
    fn start<R: AsyncRead + Unpin + Send + 'static>(reader: R) -> Self {
        let buf = Shared::default();
        let task = tokio::spawn(read_bounded(reader, Arc::clone(&buf), MAX_OUTPUT_BYTES));
        Capture { buf, task }
    }

    /// Wait for EOF until `deadline`, then return what was read either way.
    async fn finish(capture: Option<Self>, stream: &str, deadline: tokio::time::Instant) -> Vec<u8> {
        let Some(Capture { buf, mut task }) = capture else {
            return Vec::new();
        };
        match timeout_at(deadline, &mut task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => warn!(stream, error = %err, "output capture failed"),
            Ok(Err(err)) => warn!(stream, error = %err, "output reader panicked"),
            Err(_) => {
                task.abort();
                warn!(stream, "output capture timed out; keeping partial output");
            }
        }
        std::mem::take(&mut *lock(&buf))
    }
}

fn lock(buf: &Shared) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read a stream to EOF into `buf`, keeping at most `max_bytes`.
async fn read_bounded<R: AsyncRead + Unpin>(mut reader: R, buf: Shared, max_bytes: usize) -> std::io::Result<()> {
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let mut held = lock(&buf);
        let remaining = max_bytes.saturating_sub(held.len());
        if remaining < n {
            truncated = true;
        }
        held.extend_from_slice(&chunk[..n.min(remaining)]);
    }

    if truncated {
        warn!(max_bytes, "command output exceeded limit, truncating");
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    async fn sh(script: &str, limit: Duration) -> ExecOutcome {
        execute("sh", &["-c".to_string(), script.to_string()], limit)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let outcome = sh("echo healthy; echo noise >&2", Duration::from_secs(5)).await;
        assert_eq!(outcome.status, CheckStatus::Ok);
        assert_eq!(outcome.output, "healthy\n");
        assert_eq!(outcome.exit_code, Some(0));
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn test_success_without_output_is_empty() {
        let outcome = sh("true", Duration::from_secs(5)).await;
        assert_eq!(outcome.status, CheckStatus::Ok);
        assert_eq!(outcome.output, "");
    }

    #[tokio::test]
    async fn test_warning_captures_stderr() {
        let outcome = sh("echo fine; echo 'disk at 85%' >&2; exit 1", Duration::from_secs(5)).await;
        assert_eq!(outcome.status, CheckStatus::Warning);
        assert_eq!(outcome.output, "disk at 85%\n");
    }

    #[tokio::test]
    async fn test_unknown_passes_through() {
        let outcome = sh("echo 'cannot stat' >&2; exit 3", Duration::from_secs(5)).await;
        assert_eq!(outcome.status, CheckStatus::Unknown);
        assert_eq!(outcome.exit_code, Some(3));
    }

    #[tokio::test]
    async fn test_out_of_domain_exit_is_critical() {
        let outcome = sh("echo broken >&2; exit 4", Duration::from_secs(5)).await;
        assert_eq!(outcome.status, CheckStatus::Critical);
        assert_eq!(outcome.exit_code, Some(4));
        assert_eq!(outcome.output, "broken\n");
    }

    #[tokio::test]
    async fn test_signal_termination_is_critical() {
        let outcome = sh("kill -9 $$", Duration::from_secs(5)).await;
        assert_eq!(outcome.status, CheckStatus::Critical);
        assert_eq!(outcome.exit_code, None);
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let outcome = execute("sleep", &["30".to_string()], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcome.status, CheckStatus::Critical);
        assert!(outcome.timed_out);
        assert!(
            outcome.duration < Duration::from_secs(3),
            "took {:?}",
            outcome.duration
        );
    }

    #[tokio::test]
    async fn test_timeout_kills_grandchildren_holding_pipes() {
        let outcome = sh("echo starting >&2; sleep 30; true", Duration::from_secs(1)).await;
        assert_eq!(outcome.status, CheckStatus::Critical);
        assert!(outcome.timed_out);
        assert_eq!(outcome.output, "starting\n");
        assert!(
            outcome.duration < Duration::from_secs(3),
            "took {:?}",
            outcome.duration
        );
    }

    #[tokio::test]
    async fn test_background_process_does_not_swallow_output() {
        let outcome = sh("sleep 8 & echo hi", Duration::from_secs(5)).await;
        assert_eq!(outcome.status, CheckStatus::Ok);
        assert_eq!(outcome.output, "hi\n");
        assert!(!outcome.timed_out);
        assert!(
            outcome.duration < Duration::from_secs(3),
            "took {:?}",
            outcome.duration
        );
    }

    #[tokio::test]
    async fn test_finish_keeps_partial_output_after_deadline() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let capture = Capture::start(reader);
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"partial").await.unwrap();
        timeout(Duration::from_secs(5), async {
            while lock(&capture.buf).is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_millis(200);
        let captured = Capture::finish(Some(capture), "stdout", deadline).await;
        assert_eq!(captured, b"partial");
        drop(writer);
    }

    #[tokio::test]
    async fn test_output_is_truncated_at_limit() {
        let outcome = sh("head -c 2000000 /dev/zero", Duration::from_secs(10)).await;
        assert_eq!(outcome.status, CheckStatus::Ok);
        assert_eq!(outcome.output.len(), MAX_OUTPUT_BYTES);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = execute("/nonexistent/check_thing", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, WrapperError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/check_thing"));
    }
}
