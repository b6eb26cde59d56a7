//! Running a rendered script as a child process
//!
//! The child shares the standard streams of cmdx. While it runs, its exit is
//! raced against the duration timer, the caller's cancellation token and,
//! once the child was asked to stop, the kill-after timer.

use crate::config::types::Timeout;
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::signal::CancelToken;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Shell used when a task does not override it
pub const DEFAULT_SHELL: &[&str] = &["sh", "-c"];

/// Everything needed to run one script
#[derive(Debug, Clone)]
pub struct ScriptParams<'a> {
    pub script: &'a str,
    /// Program and leading arguments; the script is appended as the last argument
    pub shell: &'a [String],
    pub working_dir: &'a Path,
    /// Added to the environment of cmdx; later entries win
    pub env: &'a [(String, String)],
    pub quiet: bool,
    pub dry_run: bool,
    pub timeout: Timeout,
}

/// Why the child was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Timeout,
    Cancelled,
}

/// Run a script and wait for it to finish
pub async fn run_script(
    params: &ScriptParams<'_>,
    cancel: &mut CancelToken,
) -> ExecutionResult<()> {
    if !params.quiet {
        eprintln!("+ {}", params.script);
    }
    if params.dry_run {
        return Ok(());
    }

    let shell: Vec<String> = if params.shell.is_empty() {
        DEFAULT_SHELL.iter().map(|s| s.to_string()).collect()
    } else {
        params.shell.to_vec()
    };

    let mut command = Command::new(&shell[0]);
    command
        .args(&shell[1..])
        .arg(params.script)
        .current_dir(params.working_dir)
        .envs(params.env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
        shell: shell.join(" "),
        source,
    })?;
    debug!(pid = ?child.id(), shell = ?shell, "spawned script");

    let timeout = params.timeout;
    let kill_after = Duration::from_secs(timeout.kill_after);
    let mut deadline = after(Duration::from_secs(timeout.duration));
    let mut kill_at: Option<Instant> = None;
    let mut stop: Option<StopReason> = None;

    let status = loop {
        tokio::select! {
            res = child.wait() => break res.map_err(ExecutionError::Wait)?,

            _ = sleep_until_opt(deadline), if stop.is_none() => {
                eprintln!("command is terminated by timeout: {} seconds", timeout.duration);
                deadline = None;
                stop = Some(StopReason::Timeout);
                interrupt(&mut child);
                kill_at = schedule_kill(kill_after);
            }

            _ = cancel.cancelled(), if stop.is_none() => {
                info!("cancellation requested, interrupting script");
                stop = Some(StopReason::Cancelled);
                interrupt(&mut child);
                kill_at = schedule_kill(kill_after);
            }

            _ = sleep_until_opt(kill_at) => {
                if let Some(pid) = child.id() {
                    eprintln!("send SIGKILL to {}", pid);
                }
                kill_at = None;
                if let Err(e) = child.start_kill() {
                    warn!(error = %e, "failed to kill the script");
                }
            }
        }
    };

    outcome(status, stop, timeout)
}

async fn sleep_until_opt(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// A zero grace period never escalates to a forced kill
fn schedule_kill(kill_after: Duration) -> Option<Instant> {
    after(kill_after)
}

/// `None` for a zero delay or one too far away to represent
fn after(delay: Duration) -> Option<Instant> {
    if delay.is_zero() {
        return None;
    }
    Instant::now().checked_add(delay)
}

/// Ask the child to stop gracefully
#[cfg(unix)]
fn interrupt(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGINT) {
        warn!(pid, error = %e, "failed to send SIGINT");
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "failed to stop the script");
    }
}

fn outcome(status: ExitStatus, stop: Option<StopReason>, timeout: Timeout) -> ExecutionResult<()> {
    debug!(?status, ?stop, "script finished");
    if status.success() {
        return Ok(());
    }

    match stop {
        Some(StopReason::Timeout) => Err(ExecutionError::TimedOut {
            duration: Duration::from_secs(timeout.duration),
            exit: status.code(),
        }),
        Some(StopReason::Cancelled) => Err(ExecutionError::Interrupted {
            exit: status.code(),
        }),
        None => match status.code() {
            Some(code) => Err(ExecutionError::Exited { code }),
            None => Err(terminated_by_signal(status)),
        },
    }
}

#[cfg(unix)]
fn terminated_by_signal(status: ExitStatus) -> ExecutionError {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => ExecutionError::Signaled { signal },
        None => ExecutionError::Exited { code: 1 },
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_status: ExitStatus) -> ExecutionError {
    ExecutionError::Exited { code: 1 }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    fn params<'a>(script: &'a str, dir: &'a Path) -> ScriptParams<'a> {
        ScriptParams {
            script,
            shell: &[],
            working_dir: dir,
            env: &[],
            quiet: true,
            dry_run: false,
            timeout: Timeout {
                duration: 60,
                kill_after: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_dry_run_does_not_spawn() {
        let dir = TempDir::new().unwrap();
        let mut p = params("touch created", dir.path());
        p.dry_run = true;
        run_script(&p, &mut CancelToken::never()).await.unwrap();
        assert!(!dir.path().join("created").exists());
    }

    #[tokio::test]
    async fn test_success() {
        let dir = env::temp_dir();
        run_script(&params("true", &dir), &mut CancelToken::never())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failure_carries_exit_code() {
        let dir = env::temp_dir();
        let err = run_script(&params("false", &dir), &mut CancelToken::never())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Exited { code: 1 }));

        let err = run_script(&params("exit 7", &dir), &mut CancelToken::never())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(7));
    }

    #[tokio::test]
    async fn test_working_dir_and_env() {
        let dir = TempDir::new().unwrap();
        let env = vec![("CMDX_EXEC_TEST".to_string(), "hello".to_string())];
        let mut p = params("printf '%s' \"$CMDX_EXEC_TEST\" > out.txt", dir.path());
        p.env = &env;
        run_script(&p, &mut CancelToken::never()).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "hello");
    }

    #[tokio::test]
    async fn test_custom_shell() {
        let dir = env::temp_dir();
        let shell = vec!["sh".to_string(), "-e".to_string(), "-c".to_string()];
        let mut p = params("false; true", &dir);
        p.shell = &shell;
        let err = run_script(&p, &mut CancelToken::never()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Exited { .. }));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let dir = env::temp_dir();
        let shell = vec!["cmdx-no-such-shell".to_string()];
        let mut p = params("true", &dir);
        p.shell = &shell;
        let err = run_script(&p, &mut CancelToken::never()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_terminates_script() {
        let dir = env::temp_dir();
        let mut p = params("sleep 5", &dir);
        p.timeout = Timeout {
            duration: 1,
            kill_after: 1,
        };

        let started = std::time::Instant::now();
        let err = run_script(&p, &mut CancelToken::never()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::TimedOut { .. }), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(err.to_string(), "command is terminated by timeout: 1 seconds");
    }

    #[tokio::test]
    async fn test_kill_after_escalates_when_interrupt_is_ignored() {
        let dir = env::temp_dir();
        let mut p = params("trap '' INT; exec sleep 6", &dir);
        p.timeout = Timeout {
            duration: 1,
            kill_after: 1,
        };

        let started = std::time::Instant::now();
        let err = run_script(&p, &mut CancelToken::never()).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(
            matches!(err, ExecutionError::TimedOut { exit: None, .. }),
            "{:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_zero_kill_after_never_kills() {
        let dir = env::temp_dir();
        let mut p = params("trap '' INT; exec sleep 3", &dir);
        p.timeout = Timeout {
            duration: 1,
            kill_after: 0,
        };

        let started = std::time::Instant::now();
        run_script(&p, &mut CancelToken::never()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(2900));
    }

    #[tokio::test]
    async fn test_huge_timeouts_mean_no_deadline() {
        let dir = env::temp_dir();
        let mut p = params("true", &dir);
        p.timeout = Timeout {
            duration: u64::MAX,
            kill_after: u64::MAX,
        };
        run_script(&p, &mut CancelToken::never()).await.unwrap();

        let mut p = params("sleep 5", &dir);
        p.timeout.kill_after = u64::MAX;
        let (handle, mut token) = CancelToken::pair();
        handle.cancel();
        let err = run_script(&p, &mut token).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Interrupted { .. }), "{:?}", err);
    }

    #[test]
    fn test_after() {
        assert_eq!(after(Duration::ZERO), None);
        assert_eq!(after(Duration::from_secs(u64::MAX)), None);
        assert!(after(Duration::from_secs(1)).is_some());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_script() {
        let dir = env::temp_dir();
        let mut p = params("sleep 5", &dir);
        p.timeout.kill_after = 1;

        let (handle, mut token) = CancelToken::pair();
        handle.cancel();
        let err = run_script(&p, &mut token).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Interrupted { .. }), "{:?}", err);
    }
}
