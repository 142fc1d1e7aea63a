//! Process runner: spawns an external interpreter/compiler/binary, drains
//! stdout and stderr under a byte cap, and enforces a hard wall-clock
//! deadline. On Unix each child gets its own process group so a timeout
//! kill also reaps descendants.

use std::ffi::OsStr;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use crucible_common::error::ExecError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Captured streams of one finished process. A non-zero exit is not a
/// runner failure; it shows up as stderr content for the caller to judge.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

enum Drained {
    Finished {
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        status: std::process::ExitStatus,
    },
    Overflowed,
}

/// Drain failure. Overflow must short-circuit the sibling stream read, so
/// it travels as an error through `try_join!` rather than as a length check
/// after both streams close.
enum DrainError {
    Overflow,
    Io(io::Error),
}

impl From<io::Error> for DrainError {
    fn from(e: io::Error) -> Self {
        DrainError::Io(e)
    }
}

/// Run `command` with `args`, optionally feeding `stdin`, until it exits or
/// `timeout` expires.
///
/// Errors: [`ExecError::Spawn`] if the command cannot launch,
/// [`ExecError::Timeout`] if the deadline expires (the process group is
/// killed first), [`ExecError::OutputLimit`] if either stream exceeds
/// `max_output_bytes`.
pub async fn run<C, S>(
    command: C,
    args: &[S],
    stdin: Option<&str>,
    timeout: Duration,
    max_output_bytes: usize,
) -> Result<ProcessOutput, ExecError>
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    // Paths come straight off the temp filesystem and need not be UTF-8;
    // the lossy form is for diagnostics only.
    let command = command.as_ref();
    let cmd_display = command.to_string_lossy();
    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // New process group, so the timeout path can kill the whole tree.
    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setpgid(0, 0);
            Ok(())
        });
    }

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        command: cmd_display.to_string(),
        source,
    })?;
    let pid = child.id();
    debug!(command = %cmd_display, pid, "spawned process");

    let stdin_pipe = child.stdin.take();
    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout not captured"))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr not captured"))?;

    let child_ref = &mut child;
    let drain = async move {
        // The child may never read stdin, so the write shares the deadline
        // with the stream drains rather than preceding them.
        let feed = async {
            if let (Some(mut pipe), Some(input)) = (stdin_pipe, stdin) {
                match pipe.write_all(input.as_bytes()).await {
                    // Child exited without reading; its streams still
                    // decide the outcome.
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                    other => other.map_err(DrainError::Io)?,
                }
                // Dropping the handle closes the pipe so the child sees EOF.
            }
            Ok(())
        };
        let joined = tokio::try_join!(
            feed,
            read_capped(&mut stdout_pipe, max_output_bytes),
            read_capped(&mut stderr_pipe, max_output_bytes),
        );
        match joined {
            Ok(((), stdout, stderr)) => {
                let status = child_ref.wait().await?;
                Ok(Drained::Finished {
                    stdout,
                    stderr,
                    status,
                })
            }
            Err(DrainError::Overflow) => Ok(Drained::Overflowed),
            Err(DrainError::Io(e)) => Err(e),
        }
    };

    match tokio::time::timeout(timeout, drain).await {
        Ok(Ok(Drained::Finished {
            stdout,
            stderr,
            status,
        })) => {
            let stdout = String::from_utf8_lossy(&stdout).into_owned();
            let mut stderr = String::from_utf8_lossy(&stderr).into_owned();
            if !status.success() && stderr.is_empty() {
                // Surface the exit status so callers never see a silent
                // failure with empty streams.
                stderr = match status.code() {
                    Some(code) => format!("Process exited with code {code}"),
                    None => "Process terminated by signal".to_string(),
                };
            }
            debug!(command = %cmd_display, code = status.code(), "process finished");
            Ok(ProcessOutput { stdout, stderr })
        }
        Ok(Ok(Drained::Overflowed)) => {
            warn!(command = %cmd_display, pid, limit = max_output_bytes, "output cap exceeded, killing");
            terminate(&mut child, pid).await;
            Err(ExecError::OutputLimit {
                limit_bytes: max_output_bytes,
            })
        }
        Ok(Err(e)) => {
            terminate(&mut child, pid).await;
            Err(ExecError::Io(e))
        }
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            warn!(command = %cmd_display, pid, timeout_ms, "deadline expired, killing process group");
            terminate(&mut child, pid).await;
            Err(ExecError::Timeout { timeout_ms })
        }
    }
}

/// Read one stream to EOF, failing as soon as it crosses `cap` bytes.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: &mut R,
    cap: usize,
) -> Result<Vec<u8>, DrainError> {
    let mut buf = Vec::new();
    reader.take(cap as u64 + 1).read_to_end(&mut buf).await?;
    if buf.len() > cap {
        return Err(DrainError::Overflow);
    }
    Ok(buf)
}

/// Kill the child and, on Unix, its whole process group, then reap it.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.start_kill() {
        if e.kind() != io::ErrorKind::InvalidInput {
            warn!(error = %e, "failed to kill child");
        }
    }
    let _ = child.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const CAP: usize = 1024 * 1024;

    #[tokio::test]
    async fn captures_stdout() {
        let out = run("echo", &["hello"], None, Duration::from_secs(5), CAP)
            .await
            .unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "");
    }

    #[tokio::test]
    async fn feeds_stdin_to_child() {
        let out = run("cat", &[] as &[&str], Some("piped in"), Duration::from_secs(5), CAP)
            .await
            .unwrap();
        assert_eq!(out.stdout, "piped in");
    }

    #[tokio::test]
    async fn nonzero_exit_synthesizes_stderr_line() {
        let out = run("sh", &["-c", "exit 3"], None, Duration::from_secs(5), CAP)
            .await
            .unwrap();
        assert_eq!(out.stderr, "Process exited with code 3");
    }

    #[tokio::test]
    async fn nonzero_exit_keeps_real_stderr() {
        let out = run(
            "sh",
            &["-c", "echo boom >&2; exit 1"],
            None,
            Duration::from_secs(5),
            CAP,
        )
        .await
        .unwrap();
        assert_eq!(out.stderr, "boom\n");
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let err = run(
            "crucible-no-such-binary",
            &[] as &[&str],
            None,
            Duration::from_secs(1),
            CAP,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[tokio::test]
    async fn timeout_kills_within_grace_period() {
        let started = Instant::now();
        let err = run("sleep", &["10"], None, Duration::from_millis(300), CAP)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { timeout_ms: 300 }));
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn stdin_write_respects_the_deadline() {
        // The child never reads stdin, so a large write blocks on the pipe;
        // the deadline must still fire.
        let big = "x".repeat(2 * 1024 * 1024);
        let started = Instant::now();
        let err = run(
            "sh",
            &["-c", "sleep 10"],
            Some(&big),
            Duration::from_millis(300),
            CAP,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { timeout_ms: 300 }));
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn early_exit_without_reading_stdin_is_not_an_error() {
        let out = run(
            "sh",
            &["-c", "echo done"],
            Some(&"x".repeat(2 * 1024 * 1024)),
            Duration::from_secs(5),
            CAP,
        )
        .await
        .unwrap();
        assert_eq!(out.stdout, "done\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_path_need_not_be_utf8() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let dir = tempfile::tempdir().unwrap();
        let link = dir
            .path()
            .join(OsString::from_vec(b"crucible-\xff-sh".to_vec()));
        std::os::unix::fs::symlink("/bin/sh", &link).unwrap();

        let out = run(
            link.as_os_str(),
            &[OsStr::new("-c"), OsStr::new("echo ok")],
            None,
            Duration::from_secs(5),
            CAP,
        )
        .await
        .unwrap();
        assert_eq!(out.stdout, "ok\n");
    }

    #[tokio::test]
    async fn runaway_output_hits_the_cap() {
        let err = run("yes", &[] as &[&str], None, Duration::from_secs(10), 4096)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::OutputLimit { limit_bytes: 4096 }));
    }
}
