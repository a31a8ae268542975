use std::process::{Command, ExitStatus};

/// Why an external diagnostic command produced no usable output.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program could not be started at all, usually because it is not installed.
    #[error("{0}")]
    Spawn(#[from] std::io::Error),
    #[error("{status}")]
    Status { status: ExitStatus, stderr: String },
}

impl CommandError {
    /// What the program printed on stderr before exiting unsuccessfully.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Spawn(_) => None,
            Self::Status { stderr, .. } => Some(stderr),
        }
    }
}

/// Runs an external program to completion and hands back its standard output.
pub trait Runner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, CommandError>;
}

/// Spawns real child processes and blocks until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, CommandError> {
        tracing::debug!(program, ?args, "spawning diagnostic command");
        let output = Command::new(program).args(args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CommandError::Status { status: output.status, stderr });
        }

        // Diagnostic tools are not guaranteed to emit valid UTF-8.
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
