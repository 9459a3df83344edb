//! Two-tone test recordings.
//!
//! Each tone is `a·cos(2πft − φ)`, the form `analyze` reports, so a tone
//! generated with `--phi1 φ` reads back with phase `φ` at the first frame.

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tonescope_core::SAMPLE_RATE;

use crate::wav::{DEFAULT_SPAN, volts_to_sample, write_recording};

#[derive(Args)]
pub struct GenerateArgs {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Primary tone frequency in Hz
    #[arg(long, default_value_t = 1000.0)]
    f1: f64,

    /// Primary tone peak amplitude in volts
    #[arg(long, default_value_t = 0.8)]
    a1: f64,

    /// Primary tone phase in radians, as `analyze` reports it
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    phi1: f64,

    /// Secondary tone frequency in Hz (omit for a single tone)
    #[arg(long)]
    f2: Option<f64>,

    /// Secondary tone peak amplitude in volts
    #[arg(long, default_value_t = 0.3)]
    a2: f64,

    /// Secondary tone phase in radians, as `analyze` reports it
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    phi2: f64,

    /// Duration in seconds
    #[arg(short, long, default_value_t = 1.0)]
    duration: f64,

    /// Uniform noise amplitude in volts
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    /// Volts at digital full scale
    #[arg(long, default_value_t = DEFAULT_SPAN)]
    span: f32,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    if !(args.duration.is_finite() && args.duration > 0.0) {
        anyhow::bail!("--duration must be positive");
    }
    if !(args.span.is_finite() && args.span > 0.0) {
        anyhow::bail!("--span must be a positive voltage");
    }

    let mut tones = vec![(args.f1, args.a1, args.phi1)];
    if let Some(f2) = args.f2 {
        tones.push((f2, args.a2, args.phi2));
    }
    let nyquist = f64::from(SAMPLE_RATE) / 2.0;
    for &(f, a, _) in &tones {
        if !(f > 0.0 && f < nyquist) {
            anyhow::bail!("tone frequency {f} Hz outside (0, {nyquist}) Hz");
        }
        if !(a.is_finite() && a >= 0.0) {
            anyhow::bail!("tone amplitude {a} V must be non-negative");
        }
    }

    let num_samples = (args.duration * f64::from(SAMPLE_RATE)) as usize;
    let mut noise = Noise::new(0x1234_5678);
    let samples: Vec<f32> = (0..num_samples)
        .map(|n| {
            let t = n as f64 / f64::from(SAMPLE_RATE);
            let ac: f64 = tones
                .iter()
                .map(|&(f, a, phi)| a * (std::f64::consts::TAU * f * t - phi).cos())
                .sum();
            let volts = f64::from(crate::wav::MID_RAIL) + ac + args.noise * noise.next_bipolar();
            volts_to_sample(volts as f32, args.span)
        })
        .collect();

    if samples.iter().any(|s| s.abs() > 1.0) {
        tracing::warn!("signal exceeds the converter range and will clip on analysis");
    }

    write_recording(&args.output, &samples, super::sample_rate_hz())
        .with_context(|| format!("writing {}", args.output.display()))?;

    for (k, (f, a, phi)) in tones.iter().enumerate() {
        println!("Tone {}: {f} Hz, {a} V, {phi} rad", k + 1);
    }
    println!(
        "Wrote {} samples ({:.2}s) to {}",
        samples.len(),
        args.duration,
        args.output.display()
    );

    Ok(())
}

/// Xorshift noise, reproducible across runs.
struct Noise(u32);

impl Noise {
    fn new(seed: u32) -> Self {
        Self(seed)
    }

    /// Uniform in [-1, 1].
    fn next_bipolar(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        f64::from(x) / f64::from(u32::MAX) * 2.0 - 1.0
    }
}
