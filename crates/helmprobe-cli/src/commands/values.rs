//! Values command - list value paths of a chart

use console::style;
use helmprobe_core::Chart;
use std::path::Path;

use crate::ValueSource;
use crate::display;
use crate::error::Result;

pub fn run(chart: &Path, source: ValueSource) -> Result<()> {
    let chart = Chart::new(chart)?;

    let (paths, origin) = match source {
        ValueSource::Templates => (chart.values_from_templates()?, "referenced by templates"),
        ValueSource::Schema => (chart.values_from_schema()?, "declared by the schema"),
    };

    println!(
        "{} {} value path(s) {}",
        style("→").blue(),
        paths.len(),
        origin
    );
    display::print_paths(&paths);

    Ok(())
}
