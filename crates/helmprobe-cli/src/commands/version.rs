//! Version command - report the helm executable in use

use console::style;
use helmprobe_exec::{ProcessExecutor, Stager, helm_version, parse_version};

use crate::HelmOptions;
use crate::error::Result;

pub fn run(options: &HelmOptions) -> Result<()> {
    let config = super::exec_config(options)?;
    let executable = config.resolve_executable(options.helm.as_deref())?;
    let process = ProcessExecutor::new(config.timeout, Stager::new(&config.staging_dir));

    let raw = helm_version(&process, &executable)?;
    let version = parse_version(&raw)?;

    println!("{} {}", style("helm").bold(), version);
    println!("  {}", style(executable.display()).dim());
    println!("  {}", raw);

    Ok(())
}
