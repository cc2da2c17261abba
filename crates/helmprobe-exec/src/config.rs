//! Execution settings read once at the process boundary
//!
//! Nothing below [`ExecConfig`] consults the environment; executors receive the
//! resolved executable, timeout and staging directory as plain parameters.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ExecError, Result};

/// Path of the helm executable
pub const HELM_ENV: &str = "HELMPROBE_HELM";
/// Process timeout in whole seconds
pub const TIMEOUT_ENV: &str = "HELMPROBE_TIMEOUT_SECS";
/// Directory receiving staged values files and persisted output
pub const STAGING_DIR_ENV: &str = "HELMPROBE_STAGING_DIR";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Executable named by the environment, if any
    pub helm_executable: Option<PathBuf>,
    pub timeout: Duration,
    pub staging_dir: PathBuf,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            helm_executable: None,
            timeout: DEFAULT_TIMEOUT,
            staging_dir: std::env::temp_dir(),
        }
    }
}

impl ExecConfig {
    /// Read the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = read(HELM_ENV) {
            config.helm_executable = Some(PathBuf::from(path));
        }

        if let Some(raw) = read(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ExecError::invalid_argument(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    TIMEOUT_ENV, raw
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(dir) = read(STAGING_DIR_ENV) {
            config.staging_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Pick the executable to run
    ///
    /// The environment-provided path wins over `explicit`. The chosen path
    /// must be an existing file.
    pub fn resolve_executable(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let chosen = self
            .helm_executable
            .as_deref()
            .or(explicit)
            .ok_or_else(|| {
                ExecError::invalid_argument(format!(
                    "No helm executable configured. Set {} or pass an explicit path.",
                    HELM_ENV
                ))
            })?;

        if !chosen.is_file() {
            let shown = std::path::absolute(chosen).unwrap_or_else(|_| chosen.to_path_buf());
            return Err(ExecError::invalid_argument(format!(
                "Helm executable '{}' does not exist.",
                shown.display()
            )));
        }

        Ok(chosen.to_path_buf())
    }
}
