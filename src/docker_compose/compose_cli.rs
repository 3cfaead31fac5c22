use crate::error::{ComposeError, InfraError, Result};
use crate::services::ServiceDir;
use std::process::{Command, Output, Stdio};
use tracing::debug;

pub const DEFAULT_COMPOSE_COMMAND: &str = "docker compose";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Child output goes straight to our stdout/stderr.
    Streamed,
    /// Child output is buffered and only surfaced when the command fails.
    Captured,
}

impl OutputMode {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            OutputMode::Streamed
        } else {
            OutputMode::Captured
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposeAction {
    Up,
    Down { remove_volumes: bool },
}

impl ComposeAction {
    pub fn args(&self) -> Vec<&'static str> {
        match self {
            ComposeAction::Up => vec!["up", "-d"],
            ComposeAction::Down { remove_volumes: false } => vec!["down"],
            ComposeAction::Down { remove_volumes: true } => vec!["down", "-v"],
        }
    }

    /// "Starting" / "Stopping"
    pub fn progressive(&self) -> &'static str {
        match self {
            ComposeAction::Up => "Starting",
            ComposeAction::Down { .. } => "Stopping",
        }
    }

    /// "started" / "stopped"
    pub fn past(&self) -> &'static str {
        match self {
            ComposeAction::Up => "started",
            ComposeAction::Down { .. } => "stopped",
        }
    }
}

/// Starts and stops a service's containers.
pub trait ComposeRunner {
    fn up(&self, service: &ServiceDir, mode: OutputMode) -> std::result::Result<(), ComposeError>;

    fn down(
        &self,
        service: &ServiceDir,
        remove_volumes: bool,
        mode: OutputMode,
    ) -> std::result::Result<(), ComposeError>;

    fn apply(
        &self,
        action: ComposeAction,
        service: &ServiceDir,
        mode: OutputMode,
    ) -> std::result::Result<(), ComposeError> {
        match action {
            ComposeAction::Up => self.up(service, mode),
            ComposeAction::Down { remove_volumes } => self.down(service, remove_volumes, mode),
        }
    }
}

/// Shells out to the compose executable, e.g. `docker compose` or `docker-compose`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposeCli {
    program: String,
    base_args: Vec<String>,
}

impl ComposeCli {
    /// Splits a command line such as `"docker compose"` on whitespace.
    pub fn new(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(InfraError::EmptyComposeCommand)?;

        Ok(ComposeCli {
            program,
            base_args: parts.collect(),
        })
    }

    fn display_name(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.base_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self, service: &ServiceDir, action: ComposeAction) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .args(action.args())
            .current_dir(&service.dir);
        command
    }

    fn invoke(
        &self,
        service: &ServiceDir,
        action: ComposeAction,
        mode: OutputMode,
    ) -> std::result::Result<(), ComposeError> {
        let mut command = self.command(service, action);
        debug!(
            service = %service.name,
            dir = %service.dir.display(),
            command = %self.display_name(),
            args = ?action.args(),
            ?mode,
            "running compose"
        );

        let spawn_error = |source| ComposeError::Spawn {
            program: self.program.clone(),
            source,
        };

        match mode {
            OutputMode::Streamed => {
                let status = command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .map_err(spawn_error)?;

                if status.success() {
                    return Ok(());
                }
                Err(ComposeError::Failed {
                    program: self.display_name(),
                    status,
                    output: String::new(),
                })
            }
            OutputMode::Captured => {
                let output = command.stdin(Stdio::null()).output().map_err(spawn_error)?;

                if output.status.success() {
                    return Ok(());
                }
                Err(ComposeError::Failed {
                    program: self.display_name(),
                    status: output.status,
                    output: combined_output(&output),
                })
            }
        }
    }
}

impl Default for ComposeCli {
    fn default() -> Self {
        ComposeCli {
            program: "docker".to_string(),
            base_args: vec!["compose".to_string()],
        }
    }
}

impl ComposeRunner for ComposeCli {
    fn up(&self, service: &ServiceDir, mode: OutputMode) -> std::result::Result<(), ComposeError> {
        self.invoke(service, ComposeAction::Up, mode)
    }

    fn down(
        &self,
        service: &ServiceDir,
        remove_volumes: bool,
        mode: OutputMode,
    ) -> std::result::Result<(), ComposeError> {
        self.invoke(service, ComposeAction::Down { remove_volumes }, mode)
    }
}

fn combined_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !combined.is_empty() && !stderr.is_empty() && !combined.ends_with('\n') {
        combined.push('\n');
    }
    combined.push_str(&stderr);
    combined
}
