//! Core error types

use std::path::PathBuf;
use thiserror::Error;

use crate::object::TypedObjectError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error(
        "Expected at most one rendered Kubernetes object to match the provided predicate, but found {count}"
    )]
    AmbiguousMatch { count: usize },

    #[error("No rendered Kubernetes object matches {description}")]
    NotFound { description: String },

    #[error(
        "Kind '{kind}' is not recognised as a workload kind{}{}",
        context_suffix(.context),
        suggestion_suffix(.suggestion)
    )]
    UnrecognizedKind {
        kind: String,
        context: Option<String>,
        suggestion: Option<String>,
    },

    #[error("Workload {workload} does not define any containers")]
    NoContainers { workload: String },

    #[error(
        "Cannot read values from non-existent schema file '{}'. Create it and try again.",
        .path.display()
    )]
    SchemaFileNotFound { path: PathBuf },

    #[error("Errors while traversing values schema:\n{}", .errors.join("\n"))]
    SchemaWalk { errors: Vec<String> },

    #[error("Failed to parse rendered document {index}: {message}")]
    ManifestParse { index: usize, message: String },

    #[error(transparent)]
    Typed(#[from] TypedObjectError),

    #[error("{kind} '{name}' has no data under key '{key}'")]
    MissingData {
        kind: String,
        name: String,
        key: String,
    },

    #[error("Failed to read '{}': {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read templates directory '{}': {source}", .path.display())]
    ReadTemplates {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(c) => format!(" ({})", c),
        None => String::new(),
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(". Did you mean '{}'?", s),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_kind_message() {
        let err = CoreError::UnrecognizedKind {
            kind: "deployment".to_string(),
            context: Some("my-app".to_string()),
            suggestion: Some("Deployment".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Kind 'deployment' is not recognised as a workload kind (my-app). Did you mean 'Deployment'?"
        );

        let err = CoreError::UnrecognizedKind {
            kind: "Service".to_string(),
            context: None,
            suggestion: None,
        };
        assert_eq!(
            err.to_string(),
            "Kind 'Service' is not recognised as a workload kind"
        );
    }

    #[test]
    fn test_schema_walk_message_joins_errors() {
        let err = CoreError::SchemaWalk {
            errors: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(err.to_string(), "Errors while traversing values schema:\nfirst\nsecond");
    }
}
