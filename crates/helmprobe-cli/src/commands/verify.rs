//! Verify command - checksum annotations of every rendered workload

use console::style;
use std::path::{Path, PathBuf};

use crate::HelmOptions;
use crate::display;
use crate::error::{CliError, Result};

pub fn run(options: &HelmOptions, chart: &Path, values_files: &[PathBuf]) -> Result<()> {
    let helm = super::helm_executor(options, chart)?;
    let overlays = super::read_values_files(values_files)?;

    let manifests = helm.template_with(&overlays)?;
    let workloads = manifests.find_all_workloads();
    println!(
        "{} Verifying checksum annotations of {} workload(s)",
        style("→").blue(),
        workloads.len()
    );

    let verification = manifests.verify_all_checksum_annotations();
    if verification.success {
        println!("{} All checksum annotations are consistent", style("✓").green());
        return Ok(());
    }

    display::print_checksum_findings(&verification);
    Err(CliError::verification_with_help(
        format!(
            "{} checksum annotation problem(s) found",
            verification.findings.len()
        ),
        "Annotate pod templates with checksum/<name> for every ConfigMap and Secret they mount",
    ))
}
