//! Default analyzer configuration.

use clap::Args;
use std::path::PathBuf;
use tonescope_core::AnalyzerConfig;

use crate::config::{load_config, save_config, to_toml};

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the configuration here instead of printing it
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Check an existing configuration file instead
    #[arg(long, value_name = "FILE", conflicts_with = "output")]
    check: Option<PathBuf>,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    if let Some(path) = &args.check {
        let config = load_config(path)?;
        println!("{}: ok", path.display());
        print!("{}", to_toml(&config)?);
        return Ok(());
    }

    let config = AnalyzerConfig::default();
    match &args.output {
        Some(path) => {
            save_config(path, &config)?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => print!("{}", to_toml(&config)?),
    }
    Ok(())
}
