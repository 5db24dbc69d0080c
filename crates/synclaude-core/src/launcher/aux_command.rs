//! Timeout-guarded auxiliary commands
//!
//! Short probes such as `claude --version` run under a timer. Three events
//! race to settle the result: the child closing, the spawn failing, and the
//! timer expiring. [`AuxSupervisor`] honors the first and turns the rest into
//! no-ops. The timer is cancelled on every non-timeout path before the result
//! is produced, so a late timer can never kill an exited process.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::process_utils::captured_command;

/// Default limit for an auxiliary command
pub const DEFAULT_AUX_TIMEOUT: Duration = Duration::from_millis(5000);

/// Exit code reported when the command could not be started
pub const SPAWN_ERROR_CODE: i32 = -1;

/// Result of one auxiliary command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxOutcome {
    pub success: bool,
    /// `None` when the command timed out or was ended by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl AuxOutcome {
    fn closed(code: Option<i32>, stdout: String, stderr: String) -> Self {
        Self {
            success: code == Some(0),
            code,
            stdout,
            stderr,
            timed_out: false,
        }
    }

    fn errored(message: String) -> Self {
        Self {
            success: false,
            code: Some(SPAWN_ERROR_CODE),
            stdout: String::new(),
            stderr: message,
            timed_out: false,
        }
    }

    fn timed_out() -> Self {
        Self {
            success: false,
            code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        }
    }
}

/// Terminal events for an auxiliary command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuxEvent {
    Closed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    Errored(String),
    TimedOut,
}

/// Handle to the pending timeout.
pub trait TimerGuard: Send {
    fn cancel(&mut self);
}

/// Force-kill hook for the running child.
pub trait ChildKiller: Send {
    fn kill(&mut self);
}

impl TimerGuard for JoinHandle<()> {
    fn cancel(&mut self) {
        self.abort();
    }
}

/// Asks the task that owns the child to kill it.
pub struct KillSwitch {
    tx: Option<oneshot::Sender<()>>,
}

impl KillSwitch {
    pub fn new(tx: oneshot::Sender<()>) -> Self {
        Self { tx: Some(tx) }
    }
}

impl ChildKiller for KillSwitch {
    fn kill(&mut self) {
        if let Some(tx) = self.tx.take()
            && tx.send(()).is_err()
        {
            debug!("Kill requested after the child was already reaped");
        }
    }
}

/// Settles an auxiliary command exactly once.
pub struct AuxSupervisor {
    timer: Option<Box<dyn TimerGuard>>,
    killer: Option<Box<dyn ChildKiller>>,
    settled: bool,
}

impl AuxSupervisor {
    pub fn new(timer: Box<dyn TimerGuard>, killer: Box<dyn ChildKiller>) -> Self {
        Self {
            timer: Some(timer),
            killer: Some(killer),
            settled: false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    fn cancel_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Apply `event`. Returns the outcome for the first event only.
    pub fn handle(&mut self, event: AuxEvent) -> Option<AuxOutcome> {
        if self.settled {
            debug!("Ignoring {:?}; auxiliary command already settled", event);
            return None;
        }
        self.settled = true;

        let outcome = match event {
            AuxEvent::Closed {
                code,
                stdout,
                stderr,
            } => {
                self.cancel_timer();
                self.killer = None;
                AuxOutcome::closed(code, stdout, stderr)
            }
            AuxEvent::Errored(message) => {
                self.cancel_timer();
                self.killer = None;
                AuxOutcome::errored(message)
            }
            AuxEvent::TimedOut => {
                // The timer already fired; nothing left to cancel
                self.timer = None;
                if let Some(mut killer) = self.killer.take() {
                    killer.kill();
                }
                AuxOutcome::timed_out()
            }
        };
        Some(outcome)
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf).await {
        debug!("Failed to read child output: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn watch_child(mut child: Child, kill_rx: oneshot::Receiver<()>) -> AuxEvent {
    let stdout = tokio::spawn(read_pipe(child.stdout.take()));
    let stderr = tokio::spawn(read_pipe(child.stderr.take()));

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => AuxEvent::Closed {
                code: status.code(),
                stdout: stdout.await.unwrap_or_default(),
                stderr: stderr.await.unwrap_or_default(),
            },
            Err(e) => AuxEvent::Errored(e.to_string()),
        },
        Ok(()) = kill_rx => {
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill timed-out command: {}", e);
            }
            if let Err(e) = child.wait().await {
                debug!("Failed to reap killed command: {}", e);
            }
            AuxEvent::TimedOut
        }
    }
}

/// Human-readable reason for a failed spawn.
pub fn describe_spawn_error(program: &str, error: &std::io::Error) -> String {
    match error.kind() {
        std::io::ErrorKind::NotFound => format!("executable '{}' not found", program),
        std::io::ErrorKind::PermissionDenied => {
            format!("permission denied running '{}'", program)
        }
        _ => format!("failed to start '{}': {}", program, error),
    }
}

/// Run `program args...` with captured output, giving up after `timeout`.
///
/// Never fails: spawn errors and timeouts come back as unsuccessful outcomes.
pub async fn run_aux_command(program: &str, args: &[&str], timeout: Duration) -> AuxOutcome {
    let (tx, mut rx) = mpsc::channel::<AuxEvent>(3);

    let timer_tx = tx.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let _ = timer_tx.send(AuxEvent::TimedOut).await;
    });
    let (kill_tx, kill_rx) = oneshot::channel();
    let mut supervisor = AuxSupervisor::new(Box::new(timer), Box::new(KillSwitch::new(kill_tx)));

    debug!("Running {} {:?} (timeout {:?})", program, args, timeout);
    let child = match captured_command(program, args).spawn() {
        Ok(child) => child,
        Err(e) => {
            let message = describe_spawn_error(program, &e);
            return supervisor
                .handle(AuxEvent::Errored(message.clone()))
                .unwrap_or_else(|| AuxOutcome::errored(message));
        }
    };

    let watcher_tx = tx;
    tokio::spawn(async move {
        let event = watch_child(child, kill_rx).await;
        let _ = watcher_tx.send(event).await;
    });

    while let Some(event) = rx.recv().await {
        if let Some(outcome) = supervisor.handle(event) {
            if outcome.timed_out {
                warn!("{} timed out after {:?}", program, timeout);
            }
            return outcome;
        }
    }

    // Both senders are gone without an event; only possible if a task panicked
    AuxOutcome::errored(format!("'{}' ended without reporting a result", program))
}
