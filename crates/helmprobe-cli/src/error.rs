//! CLI error types with exit code handling
//!
//! Library errors are folded into a few user-facing categories, each with its
//! own exit code.

use helmprobe_core::CoreError;
use helmprobe_exec::ExecError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Rendered output or chart values failed a check
    #[error("Verification failed: {message}")]
    #[diagnostic(code(helmprobe::cli::verification))]
    Verification {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// helm could not render the chart
    #[error("Render error: {message}")]
    #[diagnostic(code(helmprobe::cli::render))]
    Render {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Chart layout or values schema problem
    #[error("Chart error: {message}")]
    #[diagnostic(code(helmprobe::cli::chart))]
    Chart {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Invalid usage: {message}")]
    #[diagnostic(code(helmprobe::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(helmprobe::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(helmprobe::cli::error))]
    Other { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Verification { .. } => exit_codes::VERIFICATION_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn verification_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Verification {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::InvalidArgument { .. } => CliError::Chart {
                message,
                help: Some("Pass the path of a chart directory or packaged chart".to_string()),
            },
            CoreError::SchemaFileNotFound { .. } => CliError::Chart {
                message,
                help: Some("Add a values.schema.json declaring every value the templates use".to_string()),
            },
            CoreError::SchemaWalk { .. } => CliError::Chart { message, help: None },
            CoreError::ReadFile { .. } | CoreError::ReadTemplates { .. } => CliError::Io { message },
            CoreError::ManifestParse { .. } | CoreError::YamlParse(_) => CliError::Render {
                message,
                help: Some("helm produced output that is not valid YAML".to_string()),
            },
            CoreError::UnrecognizedKind {
                suggestion: Some(ref s),
                ..
            } => CliError::Usage {
                help: Some(format!("Did you mean '{}'?", s)),
                message,
            },
            _ => CliError::Other { message },
        }
    }
}

impl From<ExecError> for CliError {
    fn from(err: ExecError) -> Self {
        let message = err.to_string();
        match err {
            ExecError::Core(core) => core.into(),
            ExecError::InvalidArgument { .. } => CliError::Usage {
                message,
                help: Some("Use --helm <path> or set HELMPROBE_HELM".to_string()),
            },
            ExecError::Timeout { .. } => CliError::Render {
                message,
                help: Some("Raise the limit with --timeout or HELMPROBE_TIMEOUT_SECS".to_string()),
            },
            ExecError::CommandFailed { .. }
            | ExecError::CommandUnexpectedlySucceeded { .. }
            | ExecError::ProcessExecutionFailure { .. } => CliError::Render { message, help: None },
            ExecError::Staging { .. } => CliError::Io { message },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        let missing_helm: CliError = ExecError::InvalidArgument {
            message: "no helm".to_string(),
        }
        .into();
        assert_eq!(missing_helm.exit_code(), exit_codes::USAGE_ERROR);

        let failed: CliError = ExecError::CommandFailed {
            command: "helm template".to_string(),
            exit_code: Some(1),
            stderr: String::new(),
        }
        .into();
        assert_eq!(failed.exit_code(), exit_codes::RENDER_ERROR);

        let schema: CliError = CoreError::SchemaWalk { errors: vec![] }.into();
        assert_eq!(schema.exit_code(), exit_codes::CHART_ERROR);

        assert_eq!(
            CliError::verification_with_help("x", "y").exit_code(),
            exit_codes::VERIFICATION_ERROR
        );
    }

    #[test]
    fn test_unreadable_templates_are_io_errors() {
        let err: CliError = CoreError::ReadTemplates {
            path: "templates/locked".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
    }

    #[test]
    fn test_wrapped_core_error_keeps_category() {
        let err: CliError = ExecError::Core(CoreError::ManifestParse {
            index: 2,
            message: "bad".to_string(),
        })
        .into();
        assert!(matches!(err, CliError::Render { .. }));
    }
}
