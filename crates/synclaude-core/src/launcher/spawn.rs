//! Supervised launch of Claude Code
//!
//! The launch moves `Spawning -> Running` or `Spawning -> Failed` exactly
//! once. `Running` is terminal here: the child owns the terminal and its exit
//! is only observed if the caller waits on the returned [`LaunchedProcess`].

use std::sync::Arc;

use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::process_utils::interactive_command;
use crate::tool::ToolStatus;

use super::aux_command::describe_spawn_error;
use super::environment::{
    compose_environment, Endpoint, LaunchEnvironment, LaunchRequest, DEFAULT_MODEL_VAR,
    THINKING_MODEL_VAR,
};

/// Result of a launch attempt. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub success: bool,
    pub pid: Option<u32>,
    pub error: Option<String>,
}

impl LaunchOutcome {
    pub fn started(pid: Option<u32>) -> Self {
        Self {
            success: true,
            pid,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            pid: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchState {
    Spawning,
    Running { pid: Option<u32> },
    Failed { error: String },
}

/// Signals the OS can deliver for a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchSignal {
    Started { pid: Option<u32> },
    SpawnError(String),
}

fn transition(signal: LaunchSignal) -> (LaunchState, LaunchOutcome) {
    match signal {
        LaunchSignal::Started { pid } => (LaunchState::Running { pid }, LaunchOutcome::started(pid)),
        LaunchSignal::SpawnError(error) => (
            LaunchState::Failed {
                error: error.clone(),
            },
            LaunchOutcome::failure(error),
        ),
    }
}

/// Settles a launch on the first signal and ignores the rest.
#[derive(Debug)]
pub struct LaunchSupervisor {
    state: LaunchState,
}

impl Default for LaunchSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchSupervisor {
    pub fn new() -> Self {
        Self {
            state: LaunchState::Spawning,
        }
    }

    /// A supervisor already settled by `signal`, with the outcome it settled on.
    pub fn settled_by(signal: LaunchSignal) -> (Self, LaunchOutcome) {
        let (state, outcome) = transition(signal);
        (Self { state }, outcome)
    }

    pub fn state(&self) -> &LaunchState {
        &self.state
    }

    pub fn is_settled(&self) -> bool {
        self.state != LaunchState::Spawning
    }

    /// Apply `signal`. Returns the outcome only for the settling signal.
    pub fn handle(&mut self, signal: LaunchSignal) -> Option<LaunchOutcome> {
        if self.is_settled() {
            debug!("Ignoring {:?}; launch already settled as {:?}", signal, self.state);
            return None;
        }

        let (state, outcome) = transition(signal);
        self.state = state;
        Some(outcome)
    }
}

/// A launch that has settled. Holds the child when it started.
#[derive(Debug)]
pub struct LaunchedProcess {
    pub outcome: LaunchOutcome,
    child: Option<Child>,
}

impl LaunchedProcess {
    fn failed(error: String) -> Self {
        Self {
            outcome: LaunchOutcome::failure(error),
            child: None,
        }
    }

    /// Wait for the child to exit and return its exit code.
    ///
    /// `None` if the launch failed, the child was ended by a signal, or the
    /// wait itself failed.
    pub async fn wait(self) -> Option<i32> {
        let mut child = self.child?;
        match child.wait().await {
            Ok(status) => {
                debug!("Claude Code exited with {}", status);
                status.code()
            }
            Err(e) => {
                warn!("Failed to wait for Claude Code: {}", e);
                None
            }
        }
    }
}

/// Starts Claude Code pointed at the configured endpoint.
pub struct ProcessLauncher {
    executable: String,
    endpoint: Endpoint,
    tool: Option<Arc<dyn ToolStatus>>,
}

impl ProcessLauncher {
    pub fn new(executable: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            executable: executable.into(),
            endpoint,
            tool: None,
        }
    }

    /// Check `tool.is_installed()` before spawning.
    pub fn with_tool_status(mut self, tool: Arc<dyn ToolStatus>) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Compose the child environment on top of this process's environment.
    ///
    /// Parent entries that are not valid UTF-8 are left out of the result;
    /// the child still inherits them unchanged.
    pub fn compose_environment(
        &self,
        request: &LaunchRequest,
    ) -> crate::error::Result<LaunchEnvironment> {
        let parent = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        compose_environment(parent, &self.endpoint, request)
    }

    /// Spawn Claude Code with inherited stdio.
    pub async fn launch(&self, request: &LaunchRequest) -> LaunchedProcess {
        let env = match self.compose_environment(request) {
            Ok(env) => env,
            Err(e) => return LaunchedProcess::failed(e.to_string()),
        };

        if let Some(tool) = &self.tool
            && !tool.is_installed().await
        {
            return LaunchedProcess::failed(format!(
                "Claude Code is not installed or '{}' is not runnable",
                self.executable
            ));
        }

        // Overlay on the inherited environment so entries that are not
        // valid UTF-8 pass through untouched.
        let mut cmd = interactive_command(&self.executable, &request.args);
        cmd.envs(env.iter());
        if !env.contains(THINKING_MODEL_VAR) {
            cmd.env_remove(THINKING_MODEL_VAR);
        }

        let (signal, child) = match cmd.spawn() {
            Ok(child) => (LaunchSignal::Started { pid: child.id() }, Some(child)),
            Err(e) => (
                LaunchSignal::SpawnError(describe_spawn_error(&self.executable, &e)),
                None,
            ),
        };
        self.settle(signal, child, &env)
    }

    fn settle(
        &self,
        signal: LaunchSignal,
        child: Option<Child>,
        env: &LaunchEnvironment,
    ) -> LaunchedProcess {
        let (supervisor, outcome) = LaunchSupervisor::settled_by(signal);
        debug!("Launch settled as {:?}", supervisor.state());
        if outcome.success {
            info!(
                "Launched {} (pid {:?}) with model {}",
                self.executable,
                outcome.pid,
                env.get(DEFAULT_MODEL_VAR).unwrap_or("?")
            );
        } else if let Some(error) = &outcome.error {
            warn!("Launch failed: {}", error);
        }
        LaunchedProcess { outcome, child }
    }
}
