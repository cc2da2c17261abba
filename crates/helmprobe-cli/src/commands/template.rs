//! Template command - render a chart through helm

use console::style;
use std::path::{Path, PathBuf};

use crate::HelmOptions;
use crate::display;
use crate::error::Result;

pub fn run(
    options: &HelmOptions,
    chart: &Path,
    values_files: &[PathBuf],
    expect_error: bool,
) -> Result<()> {
    let helm = super::helm_executor(options, chart)?;
    let overlays = super::read_values_files(values_files)?;

    println!(
        "{} Rendering {} with {}",
        style("→").blue(),
        helm.chart().path().display(),
        helm.executable().display()
    );

    if expect_error {
        let stderr = helm.template_error_with(&overlays)?;
        println!("{} Rendering failed as expected:", style("✓").green());
        for line in stderr.lines() {
            println!("  {}", line);
        }
        return Ok(());
    }

    let manifests = helm.template_with(&overlays)?;
    println!(
        "{} Rendered {} object(s)",
        style("✓").green(),
        manifests.len()
    );
    display::print_objects(&manifests);

    Ok(())
}
