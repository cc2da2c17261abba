//! Parity command - template value references against the values schema

use console::style;
use helmprobe_core::Chart;
use std::path::Path;

use crate::display;
use crate::error::{CliError, Result};

pub fn run(chart: &Path) -> Result<()> {
    let chart = Chart::new(chart)?;
    println!(
        "{} Comparing {} with {}",
        style("→").blue(),
        chart.templates_dir().display(),
        chart.schema_file().display()
    );

    let parity = chart.value_parity()?;
    if parity.is_consistent() {
        println!(
            "{} Templates and values schema agree",
            style("✓").green()
        );
        return Ok(());
    }

    display::print_parity(&parity);
    Err(CliError::verification_with_help(
        format!(
            "{} value path(s) differ between templates and schema",
            parity.only_in_templates.len() + parity.only_in_schema.len()
        ),
        "Declare every referenced value in values.schema.json and drop unused ones",
    ))
}
