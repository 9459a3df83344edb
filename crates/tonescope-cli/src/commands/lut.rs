//! DDS table and timer inspection.

use anyhow::Context;
use clap::Args;
use std::fmt::Write as _;
use std::path::PathBuf;
use tonescope_core::{
    LUT_LENGTH, TIMER_CLOCK_HZ, TimingConfig, WaveConfig, WaveKind, WaveTable,
};

#[derive(Args)]
pub struct LutArgs {
    /// Waveform shape (sine, square, triangle, rectangular)
    #[arg(short, long, default_value = "sine")]
    kind: WaveKind,

    /// Output frequency in Hz
    #[arg(short, long, default_value_t = 1000.0)]
    frequency: f32,

    /// Peak-to-peak swing in volts
    #[arg(short, long, default_value_t = 1.0)]
    amplitude: f32,

    /// High fraction of the period (triangle, rectangular)
    #[arg(long, default_value_t = 0.5)]
    duty: f32,

    /// DC offset in volts
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    offset: f32,

    /// Phase in radians
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    phase: f32,

    /// Print every code
    #[arg(long)]
    dump: bool,

    /// Write index,code,volts rows to a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
}

pub fn run(args: LutArgs) -> anyhow::Result<()> {
    let config = WaveConfig {
        kind: args.kind,
        frequency: args.frequency,
        amplitude: args.amplitude,
        duty: args.duty,
        offset: args.offset,
        phase: args.phase,
    };
    config.validate()?;
    let timing = TimingConfig::for_frequency(config.frequency)?;
    let table = WaveTable::build(&config);
    let (lo, hi) = table.extent();

    println!("Waveform: {} at {} Hz", config.kind, config.frequency);
    println!();
    println!("Timer ({} MHz clock):", TIMER_CLOCK_HZ / 1_000_000);
    println!("  Divider:   {}", timing.divider);
    println!("  Prescaler: {}", timing.prescaler());
    println!("  Reload:    {}", timing.reload);
    println!(
        "  Actual:    {:.3} Hz ({:+.3} Hz)",
        timing.actual_frequency(),
        timing.actual_frequency() - config.frequency
    );
    if !timing.in_safe_band() {
        println!("  Warning: reload outside the recommended band");
    }
    println!();
    println!("Table ({LUT_LENGTH} entries):");
    println!(
        "  Codes:     {lo}..{hi} ({:.3} V..{:.3} V)",
        WaveTable::code_to_volts(lo),
        WaveTable::code_to_volts(hi)
    );

    if args.dump {
        println!();
        for row in table.codes().chunks(16) {
            let line = row.iter().fold(String::new(), |mut line, code| {
                let _ = write!(line, "{code:5}");
                line
            });
            println!(" {line}");
        }
    }

    if let Some(path) = &args.csv {
        let mut csv = String::from("index,code,volts\n");
        for (i, &code) in table.codes().iter().enumerate() {
            let _ = writeln!(csv, "{i},{code},{:.5}", WaveTable::code_to_volts(code));
        }
        std::fs::write(path, csv).with_context(|| format!("writing {}", path.display()))?;
        println!();
        println!("Wrote table to {}", path.display());
    }

    Ok(())
}
