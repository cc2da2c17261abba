//! `helm template` and `helm version` front end

use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use helmprobe_core::{Chart, Manifests};

use crate::config::ExecConfig;
use crate::error::{ExecError, Result};
use crate::process::{Expect, ProcessExecutor};
use crate::staging::Stager;

static VERSION_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Version:"v?([^"]+)""#).expect("valid regex"));

/// Runs one helm executable against one chart
#[derive(Debug, Clone)]
pub struct HelmExecutor {
    executable: PathBuf,
    chart: Chart,
    process: ProcessExecutor,
}

impl HelmExecutor {
    pub fn new(executable: impl Into<PathBuf>, chart: Chart, process: ProcessExecutor) -> Self {
        Self {
            executable: executable.into(),
            chart,
            process,
        }
    }

    /// Resolve the executable and build the process executor from `config`
    pub fn from_config(config: &ExecConfig, explicit: Option<&Path>, chart: Chart) -> Result<Self> {
        let executable = config.resolve_executable(explicit)?;
        let process = ProcessExecutor::new(config.timeout, Stager::new(&config.staging_dir));
        Ok(Self::new(executable, chart, process))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    /// Raw output of `helm version`, trimmed
    pub fn version(&self) -> Result<String> {
        helm_version(&self.process, &self.executable)
    }

    /// Version number parsed from `helm version`
    pub fn semver(&self) -> Result<semver::Version> {
        let raw = self.version()?;
        parse_version(&raw)
    }

    /// Render the chart with its default values
    pub fn template(&self) -> Result<Manifests> {
        self.template_with::<&str>(&[])
    }

    /// Render the chart with one values overlay
    pub fn template_with_values(&self, values: &str) -> Result<Manifests> {
        self.template_with(&[values])
    }

    /// Render the chart with overlays applied in order; later ones win
    pub fn template_with<S: AsRef<str>>(&self, overlays: &[S]) -> Result<Manifests> {
        let args = self.template_args(overlays)?;
        let output = self.process.run(&self.executable, &args, Expect::Success)?;
        Ok(Manifests::parse(&output.stdout)?)
    }

    /// Render with one overlay, expecting failure; returns the captured stderr
    pub fn template_error(&self, values: &str) -> Result<String> {
        self.template_error_with(&[values])
    }

    /// Render with overlays, expecting failure; returns the captured stderr
    ///
    /// A render that succeeds fails with
    /// [`ExecError::CommandUnexpectedlySucceeded`], whose output file holds the
    /// rendered manifests.
    pub fn template_error_with<S: AsRef<str>>(&self, overlays: &[S]) -> Result<String> {
        let args = self.template_args(overlays)?;
        let output = self.process.run(&self.executable, &args, Expect::Failure)?;
        Ok(output.stderr)
    }

    fn template_args<S: AsRef<str>>(&self, overlays: &[S]) -> Result<Vec<OsString>> {
        let mut args: Vec<OsString> = vec!["template".into(), self.chart.path().into()];
        for path in self.process.stager().stage_values(overlays)? {
            args.push("--values".into());
            args.push(path.into());
        }
        Ok(args)
    }
}

/// Raw output of `<executable> version`, trimmed
///
/// Needs no chart; [`HelmExecutor::version`] goes through here as well.
pub fn helm_version(process: &ProcessExecutor, executable: &Path) -> Result<String> {
    let output = process.run(executable, &["version"], Expect::Success)?;
    Ok(output.stdout.trim().to_string())
}

/// Extract the version number from `helm version` output
pub fn parse_version(raw: &str) -> Result<semver::Version> {
    let version = VERSION_FIELD
        .captures(raw)
        .map(|captures| captures[1].to_string())
        .ok_or_else(|| {
            ExecError::invalid_argument(format!("No version found in helm output '{}'", raw))
        })?;

    semver::Version::parse(&version).map_err(|e| {
        ExecError::invalid_argument(format!("Invalid helm version '{}': {}", version, e))
    })
}
