mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::projection::{ProjectArgs, ReportArgs, SnapshotArgs};
use commands::scenarios::{CompareArgs, ScenarioArgs};
use commands::ModelArgs;

/// Monthly cashflow, runway and tax projections
#[derive(Parser)]
#[command(
    name = "runway",
    version,
    about = "Monthly cashflow, runway and tax projections",
    long_about = "A CLI for projecting month-by-month cash, runway, taxes and balance \
                  snapshots for a small business model, with exact minor-unit money \
                  and what-if scenarios."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Project monthly cash in, cash out and ending cash
    Project(ProjectArgs),
    /// Months of runway and headline cash figures
    Runway(ModelArgs),
    /// Monthly VAT, percentage tax and income tax
    Taxes(ModelArgs),
    /// Balance snapshot for a single month
    Snapshot(SnapshotArgs),
    /// Re-project the model with field overrides applied to a copy
    Scenario(ScenarioArgs),
    /// Probability-weighted comparison of several scenarios
    Compare(CompareArgs),
    /// Full projection report from a request document
    Report(ReportArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// Log to stderr so stdout stays machine readable. `RUNWAY_LOG` takes
/// the usual `EnvFilter` directives.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("RUNWAY_LOG")
        .unwrap_or_else(|_| EnvFilter::new("runway_core=warn,runway=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::projection::run_project(args),
        Commands::Runway(args) => commands::projection::run_runway(args),
        Commands::Taxes(args) => commands::projection::run_taxes(args),
        Commands::Snapshot(args) => commands::projection::run_snapshot(args),
        Commands::Scenario(args) => commands::scenarios::run_scenario(args),
        Commands::Compare(args) => commands::scenarios::run_compare(args),
        Commands::Report(args) => commands::projection::run_report(args),
        Commands::Version => {
            println!("runway {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
