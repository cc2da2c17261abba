//! helmprobe CLI - render Helm charts and check what comes out

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "helmprobe")]
#[command(version)]
#[command(about = "Render Helm charts and verify the rendered manifests", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Path of the helm executable (HELMPROBE_HELM takes precedence)
    #[arg(long, global = true)]
    helm: Option<PathBuf>,

    /// Kill helm after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a chart and list the objects it produced
    Template {
        /// Chart path
        chart: PathBuf,

        /// Values file(s) applied in order
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Expect rendering to fail and print helm's error output
        #[arg(long)]
        expect_error: bool,
    },

    /// Render a chart and verify checksum annotations of every workload
    Verify {
        /// Chart path
        chart: PathBuf,

        /// Values file(s) applied in order
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,
    },

    /// List value paths used by templates or declared by the schema
    Values {
        /// Chart path
        #[arg(default_value = ".")]
        chart: PathBuf,

        /// Where to read value paths from
        #[arg(long, value_enum, default_value_t = ValueSource::Templates)]
        source: ValueSource,
    },

    /// Compare template value references with the values schema
    Parity {
        /// Chart path
        #[arg(default_value = ".")]
        chart: PathBuf,
    },

    /// Show the helm version in use
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ValueSource {
    Templates,
    Schema,
}

/// Global options shared by the commands that run helm
pub struct HelmOptions {
    pub helm: Option<PathBuf>,
    pub timeout: Option<u64>,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    miette::set_panic_hook();
    // helm errors carry long single-line messages; keep them intact
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().wrap_lines(false).build())
    }));

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let options = HelmOptions {
        helm: cli.helm,
        timeout: cli.timeout,
    };

    let result = match cli.command {
        Commands::Template {
            chart,
            values,
            expect_error,
        } => commands::template::run(&options, &chart, &values, expect_error),

        Commands::Verify { chart, values } => commands::verify::run(&options, &chart, &values),

        Commands::Values { chart, source } => commands::values::run(&chart, source),

        Commands::Parity { chart } => commands::parity::run(&chart),

        Commands::Version => commands::version::run(&options),
    };

    if let Err(e) = result {
        let code = e.exit_code();
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(code);
    }
}
