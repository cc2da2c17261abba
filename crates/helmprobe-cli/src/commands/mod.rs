//! CLI commands

pub mod parity;
pub mod template;
pub mod values;
pub mod verify;
pub mod version;

use helmprobe_core::Chart;
use helmprobe_exec::{ExecConfig, HelmExecutor};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::HelmOptions;
use crate::error::{CliError, Result};

/// Environment settings with the command-line timeout applied on top
pub(crate) fn exec_config(options: &HelmOptions) -> Result<ExecConfig> {
    let mut config = ExecConfig::from_env()?;
    if let Some(secs) = options.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

pub(crate) fn helm_executor(options: &HelmOptions, chart: &Path) -> Result<HelmExecutor> {
    let config = exec_config(options)?;
    let chart = Chart::new(chart)?;
    let helm = HelmExecutor::from_config(&config, options.helm.as_deref(), chart)?;
    tracing::debug!(
        "using {} (timeout {:?}, staging in {})",
        helm.executable().display(),
        config.timeout,
        config.staging_dir.display()
    );
    Ok(helm)
}

/// Read values files as overlay contents, keeping their order
pub(crate) fn read_values_files(files: &[PathBuf]) -> Result<Vec<String>> {
    files
        .iter()
        .map(|file| {
            std::fs::read_to_string(file).map_err(|e| {
                CliError::io(format!("Failed to read values file {}: {}", file.display(), e))
            })
        })
        .collect()
}
