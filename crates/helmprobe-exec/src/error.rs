//! Execution error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use helmprobe_core::CoreError;

/// Text preceding the persisted stdout path in [`ExecError::CommandUnexpectedlySucceeded`]
pub const PERSISTED_OUTPUT_PREFIX: &str = "Output written to file '";

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Command `{command}` failed ({}):\n{stderr}", describe_exit(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error(
        "Command `{command}` succeeded but was expected to fail. {}{}'",
        PERSISTED_OUTPUT_PREFIX,
        .output_path.display()
    )]
    CommandUnexpectedlySucceeded { command: String, output_path: PathBuf },

    #[error("Failed to execute `{command}`: {source}")]
    ProcessExecutionFailure {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` timed out after {}s and was killed:\n{stderr}", .timeout.as_secs_f64())]
    Timeout {
        command: String,
        timeout: Duration,
        stderr: String,
    },

    #[error("Failed to stage '{}': {source}", .path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ExecError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Where the unexpected success's stdout was saved, if this is that error
    pub fn persisted_output_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::CommandUnexpectedlySucceeded { output_path, .. } => Some(output_path),
            _ => None,
        }
    }

    /// Captured stderr of a failed or timed out command
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stderr, .. } | Self::Timeout { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Recover the persisted output path from a rendered error message
///
/// Works on any text that embeds the message, e.g. a test failure report.
pub fn persisted_output_path_from_message(message: &str) -> Option<PathBuf> {
    let start = message.find(PERSISTED_OUTPUT_PREFIX)? + PERSISTED_OUTPUT_PREFIX.len();
    let rest = &message[start..];
    let end = rest.find('\'')?;
    Some(PathBuf::from(&rest[..end]))
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;
