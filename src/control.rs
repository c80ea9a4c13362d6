//! Service control: action dispatch and read-only queries
//!
//! Every call here validates its input, builds one command line, runs it
//! through a [`CommandRunner`] and routes the captured text through the
//! matching parser. Nothing is cached or queued between calls.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::parse::{parse_journal, parse_status, parse_units, StatusRecord, UnitRecord};
use crate::runner::{Capture, CommandResult, CommandRunner, Invocation};

/// Lifecycle verbs accepted from clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Restart,
    Status,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Start, Action::Stop, Action::Restart, Action::Status];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Status => "status",
        }
    }

    /// State-changing actions run through the elevation wrapper
    pub fn needs_elevation(&self) -> bool {
        !matches!(self, Self::Status)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ActionError::InvalidRequest(format!("unknown action '{}'", s)))
    }
}

/// Inbound write request, exactly as the client sent it.
///
/// Missing fields deserialize as empty strings and are rejected by
/// [`ServiceControl::dispatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionRequest {
    pub service: String,
    pub action: String,
}

impl ActionRequest {
    pub fn new(service: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            action: action.into(),
        }
    }

    /// Check the request and resolve its action
    pub fn validate(&self) -> Result<Action, ActionError> {
        if self.service.is_empty() {
            return Err(ActionError::InvalidRequest("service must not be empty".into()));
        }
        if self.service.starts_with('-') {
            return Err(ActionError::InvalidRequest(format!(
                "invalid service name '{}'",
                self.service
            )));
        }
        self.action.parse()
    }
}

/// Result of a successful dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionOutcome {
    /// Parsed `status` report
    Status(StatusRecord),
    /// Raw tool output of start/stop/restart
    Output(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{output}")]
    CommandFailed { command: String, output: String },
}

/// Front door to the service manager and the journal
pub struct ServiceControl<R> {
    runner: R,
    systemctl: String,
    journalctl: String,
    timeout: Duration,
    log_lines: usize,
}

impl<R: CommandRunner> ServiceControl<R> {
    pub fn new(runner: R, config: &Config) -> Self {
        Self {
            runner,
            systemctl: config.systemctl.clone(),
            journalctl: config.journalctl.clone(),
            timeout: config.timeout,
            log_lines: config.log_lines,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run a lifecycle action.
    ///
    /// `status` runs unprivileged and returns the parsed report; the other
    /// actions run elevated and return the tool's combined output verbatim.
    pub async fn dispatch(&self, request: &ActionRequest) -> Result<ActionOutcome, ActionError> {
        let action = request.validate()?;

        let invocation = Invocation::new([
            self.systemctl.as_str(),
            action.as_str(),
            request.service.as_str(),
        ])
        .elevated(action.needs_elevation())
        .capture(Capture::Merged)
        .timeout(self.timeout);

        log::info!("{} {}", action, request.service);
        let output = self.execute(&invocation).await?;

        Ok(match action {
            Action::Status => ActionOutcome::Status(parse_status(&output)),
            _ => ActionOutcome::Output(output),
        })
    }

    /// Loaded service units, in the service manager's order
    pub async fn list_units(&self) -> Result<Vec<UnitRecord>, ActionError> {
        let invocation = Invocation::new([
            self.systemctl.as_str(),
            "list-units",
            "--type=service",
            "--no-pager",
        ])
        .timeout(self.timeout);

        let output = self.execute(&invocation).await?;
        Ok(parse_units(&output))
    }

    /// Most recent journal entries, system-wide or for one unit.
    /// An empty unit name counts as no filter.
    pub async fn journal(&self, unit: Option<&str>) -> Result<Vec<String>, ActionError> {
        let lines = self.log_lines.to_string();
        let mut argv = vec![
            self.journalctl.as_str(),
            "--no-pager",
            "-n",
            lines.as_str(),
        ];
        if let Some(unit) = unit.filter(|u| !u.is_empty()) {
            argv.extend(["-u", unit]);
        }

        let invocation = Invocation::new(argv).timeout(self.timeout);
        let output = self.execute(&invocation).await?;
        Ok(parse_journal(&output))
    }

    async fn execute(&self, invocation: &Invocation) -> Result<String, ActionError> {
        let result = self.runner.run(invocation).await;
        if result.exit_ok {
            return Ok(result.output);
        }
        Err(command_failed(invocation, result))
    }
}

fn command_failed(invocation: &Invocation, result: CommandResult) -> ActionError {
    let command = invocation.display();
    let output = if result.output.trim().is_empty() {
        match result.exit_code {
            Some(code) => format!("{} exited with status {}", command, code),
            None => format!("{} failed", command),
        }
    } else {
        result.output
    };
    ActionError::CommandFailed { command, output }
}
