//! Tonescope CLI - run the dual-tone analyzer on recordings and inspect the
//! synthesizer tables.

mod commands;
mod config;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tonescope")]
#[command(author, version, about = "Dual-tone analyzer and DDS toolkit", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure the two strongest tones in a recording, frame by frame
    Analyze(commands::analyze::AnalyzeArgs),

    /// Write a two-tone test recording
    Generate(commands::generate::GenerateArgs),

    /// Run the full instrument loop over a recording
    Simulate(commands::simulate::SimulateArgs),

    /// Show the DDS table and timer settings for a waveform
    Lut(commands::lut::LutArgs),

    /// Print or write the default analyzer configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Lut(args) => commands::lut::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
