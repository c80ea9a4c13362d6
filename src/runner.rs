//! External command execution
//!
//! Runs exactly one child process per call and hands back whatever text it
//! produced. Interpretation of that text (and of failures) belongs to the
//! caller; the runner never returns an error of its own.

use std::future::Future;
use std::os::fd::OwnedFd;
use std::process::Stdio;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};

use crate::config::DEFAULT_TIMEOUT;

/// How the child's output streams are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// stdout and stderr share one stream so failure diagnostics reach the caller
    Merged,
    /// stdout only; stderr is logged on failure and otherwise dropped
    Stdout,
}

/// A fully-built command line plus how to run it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub argv: Vec<String>,
    /// Prefix with the runner's fixed elevation wrapper
    pub elevate: bool,
    pub capture: Capture,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            elevate: false,
            capture: Capture::Stdout,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn elevated(mut self, elevate: bool) -> Self {
        self.elevate = elevate;
        self
    }

    pub fn capture(mut self, capture: Capture) -> Self {
        self.capture = capture;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shell-quoted form of argv, for logs and error messages
    pub fn display(&self) -> String {
        display_argv(&self.argv)
    }
}

fn display_argv(argv: &[String]) -> String {
    shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "))
}

/// Outcome of one external invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_ok: bool,
    /// None when the process never ran, was killed by a signal, or timed out
    pub exit_code: Option<i32>,
    pub output: String,
    pub timed_out: bool,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_ok: true,
            exit_code: Some(0),
            output: output.into(),
            timed_out: false,
        }
    }

    pub fn failure(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            exit_ok: false,
            exit_code,
            output: output.into(),
            timed_out: false,
        }
    }

    fn timed_out(program: &str, timeout: Duration) -> Self {
        Self {
            exit_ok: false,
            exit_code: None,
            output: format!("{} timed out after {:?}", program, timeout),
            timed_out: true,
        }
    }
}

/// Executes invocations. Implemented by [`SystemRunner`] in production and by
/// canned stubs in tests.
pub trait CommandRunner: Send + Sync + 'static {
    fn run(&self, invocation: &Invocation) -> impl Future<Output = CommandResult> + Send;
}

/// Runs commands on the host with `tokio::process`.
///
/// Each child leads its own process group. An elapsed timeout or a dropped
/// request future signals that whole group, so
/// nothing the command forked outlives the call.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    elevate: Vec<String>,
}

impl SystemRunner {
    /// `elevate` is the fixed wrapper (e.g. `["sudo"]`) placed in front of
    /// elevated invocations. It comes from startup configuration only.
    pub fn new(elevate: Vec<String>) -> Self {
        Self { elevate }
    }

    /// The argv actually executed for an invocation
    pub fn command_line(&self, invocation: &Invocation) -> Vec<String> {
        if invocation.elevate {
            self.elevate
                .iter()
                .chain(invocation.argv.iter())
                .cloned()
                .collect()
        } else {
            invocation.argv.clone()
        }
    }
}

impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> CommandResult {
        let argv = self.command_line(invocation);
        let Some((program, args)) = argv.split_first() else {
            return CommandResult::failure(None, "empty command line");
        };

        log::debug!("running {}", display_argv(&argv));

        let result = match invocation.capture {
            Capture::Merged => run_merged(program, args, invocation.timeout).await,
            Capture::Stdout => run_stdout(program, args, invocation.timeout).await,
        };

        if result.timed_out {
            log::warn!("{}", result.output);
        } else if !result.exit_ok {
            log::warn!(
                "{} failed (exit code {:?})",
                display_argv(&argv),
                result.exit_code
            );
        }

        result
    }
}

async fn run_stdout(program: &str, args: &[String], timeout: Duration) -> CommandResult {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return spawn_failure(program, e),
    };
    let mut group = ProcessGroupGuard::new(&child);

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            group.disarm();
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.trim().is_empty() {
                    log::warn!("{} stderr: {}", program, stderr.trim());
                }
            }
            CommandResult {
                exit_ok: output.status.success(),
                exit_code: output.status.code(),
                output: String::from_utf8_lossy(&output.stdout).into_owned(),
                timed_out: false,
            }
        }
        Ok(Err(e)) => {
            group.terminate().await;
            CommandResult::failure(None, format!("failed to wait for {}: {}", program, e))
        }
        Err(_) => {
            group.terminate().await;
            CommandResult::timed_out(program, timeout)
        }
    }
}

async fn run_merged(program: &str, args: &[String], timeout: Duration) -> CommandResult {
    let (read_end, write_end) = match merged_pipe() {
        Ok(fds) => fds,
        Err(e) => return CommandResult::failure(None, format!("failed to create output pipe: {}", e)),
    };

    let spawned = {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).process_group(0);
        match write_end.try_clone() {
            Ok(stderr_end) => {
                cmd.stdout(Stdio::from(write_end)).stderr(Stdio::from(stderr_end));
                cmd.spawn()
            }
            Err(e) => Err(e),
        }
        // cmd drops here, closing our copies of the write end so the read
        // side sees EOF once the child exits
    };

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => return spawn_failure(program, e),
    };
    let mut group = ProcessGroupGuard::new(&child);

    let collect = async move {
        let mut reader = pipe::Receiver::from_owned_fd(read_end)?;
        let mut output = Vec::new();
        reader.read_to_end(&mut output).await?;
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, output))
    };

    match tokio::time::timeout(timeout, collect).await {
        Ok(Ok((status, output))) => {
            group.disarm();
            CommandResult {
                exit_ok: status.success(),
                exit_code: status.code(),
                output: String::from_utf8_lossy(&output).into_owned(),
                timed_out: false,
            }
        }
        Ok(Err(e)) => {
            group.terminate().await;
            CommandResult::failure(None, format!("failed to read output of {}: {}", program, e))
        }
        Err(_) => {
            group.terminate().await;
            CommandResult::timed_out(program, timeout)
        }
    }
}

/// Time a process group gets between SIGTERM and SIGKILL
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Owns the process group of a spawned child until disarmed.
///
/// The child is spawned with `process_group(0)`, so its pid is also the group
/// id and everything it forks (the tool behind `sudo`, or a grandchild of a
/// shell wrapper) shares the group. SIGTERM goes first since `sudo` relays it
/// to the command it runs; SIGKILL cannot be relayed and only follows after
/// [`KILL_GRACE`]. Dropping an armed guard does the same, which covers a
/// request future dropped mid-flight.
struct ProcessGroupGuard {
    pgid: Option<Pid>,
}

impl ProcessGroupGuard {
    fn new(child: &Child) -> Self {
        let pgid = child
            .id()
            .and_then(|id| i32::try_from(id).ok())
            .map(Pid::from_raw);
        Self { pgid }
    }

    /// The child exited on its own; leave the group alone
    fn disarm(&mut self) {
        self.pgid = None;
    }

    /// Signal the group and wait for it to drain, escalating to SIGKILL
    async fn terminate(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        signal_group(pgid, Signal::SIGTERM);

        let deadline = Instant::now() + KILL_GRACE;
        while Instant::now() < deadline {
            if group_gone(pgid) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        signal_group(pgid, Signal::SIGKILL);
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        signal_group(pgid, Signal::SIGTERM);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(KILL_GRACE).await;
                    if !group_gone(pgid) {
                        signal_group(pgid, Signal::SIGKILL);
                    }
                });
            }
            Err(_) => signal_group(pgid, Signal::SIGKILL),
        }
    }
}

fn signal_group(pgid: Pid, signal: Signal) {
    match killpg(pgid, signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => log::warn!("failed to send {} to process group {}: {}", signal, pgid, e),
    }
}

fn group_gone(pgid: Pid) -> bool {
    matches!(killpg(pgid, None), Err(Errno::ESRCH))
}

/// Anonymous pipe with close-on-exec set on both ends, so concurrently
/// spawned children never inherit another request's write end.
fn merged_pipe() -> std::io::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(OFlag::O_CLOEXEC).map_err(std::io::Error::from)
}

fn spawn_failure(program: &str, e: std::io::Error) -> CommandResult {
    CommandResult::failure(None, format!("failed to spawn {}: {}", program, e))
}
