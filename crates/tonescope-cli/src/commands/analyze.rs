//! Frame-by-frame tone measurement of a recording.

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tonescope_core::{
    Analyzer, CrossCheck, DemodMethod, FRAME_PERIOD, Frame, Tone, ToneReport, WindowKind,
};

use crate::wav::{DEFAULT_SPAN, frames, read_recording};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input WAV file, mono or mixed down, 40 kHz
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Analyzer configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window function, overrides the config file
    #[arg(long)]
    window: Option<WindowKind>,

    /// Demodulation method (joint or correlation), overrides the config file
    #[arg(long)]
    method: Option<DemodMethod>,

    /// Volts at digital full scale
    #[arg(long, default_value_t = DEFAULT_SPAN)]
    span: f32,

    /// Analyze at most this many frames
    #[arg(long)]
    frames: Option<usize>,

    /// Also run both demodulators on each detected pair and report how far
    /// they disagree
    #[arg(long)]
    cross_check: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Write JSON to a file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct FrameRecord {
    frame: usize,
    time: f32,
    #[serde(flatten)]
    report: ToneReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    cross_check: Option<CrossCheckRecord>,
}

#[derive(Serialize)]
struct CrossCheckRecord {
    least_squares: Option<[Tone; 2]>,
    correlation: [Tone; 2],
    amplitude_disagreement: Option<[f32; 2]>,
    phase_disagreement: Option<[f32; 2]>,
}

impl From<CrossCheck> for CrossCheckRecord {
    fn from(check: CrossCheck) -> Self {
        let [f1, f2] = check.frequencies;
        let tones = |q: [tonescope_core::Quadrature; 2]| {
            [
                Tone::from_quadrature(f1, q[0]),
                Tone::from_quadrature(f2, q[1]),
            ]
        };
        Self {
            least_squares: check.least_squares.ok().map(tones),
            correlation: tones(check.correlation),
            amplitude_disagreement: check.amplitude_disagreement(),
            phase_disagreement: check.phase_disagreement(),
        }
    }
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    if !(args.span.is_finite() && args.span > 0.0) {
        anyhow::bail!("--span must be a positive voltage");
    }

    let mut config = super::analyzer_config(args.config.as_deref())?;
    if let Some(window) = args.window {
        config.window = window;
    }
    if let Some(method) = args.method {
        config.demod.method = method;
    }
    config.validate()?;

    let samples = read_recording(&args.input, super::sample_rate_hz())
        .with_context(|| format!("reading {}", args.input.display()))?;
    let mut frames = frames(&samples, args.span);
    if let Some(limit) = args.frames {
        frames.truncate(limit);
    }

    let mut analyzer = Box::new(Analyzer::new(config));
    let mut records = Vec::with_capacity(frames.len());
    for (index, codes) in frames.iter().enumerate() {
        let report = analyzer.process(Frame::new(codes));
        let cross_check = match (args.cross_check, report.primary, report.secondary) {
            (true, Some(p), Some(s)) => {
                Some(analyzer.cross_check(p.frequency, s.frequency).into())
            }
            _ => None,
        };
        records.push(FrameRecord {
            frame: index,
            time: index as f32 * FRAME_PERIOD,
            report,
            cross_check,
        });
    }
    tracing::debug!(frames = records.len(), "analysis complete");

    if args.json || args.output.is_some() {
        let json = serde_json::to_string_pretty(&records)?;
        if let Some(path) = &args.output {
            std::fs::write(path, json)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} frame reports to {}", records.len(), path.display());
        } else {
            println!("{json}");
        }
        return Ok(());
    }

    println!("Input: {}", args.input.display());
    println!(
        "Frames: {} x {} samples, window {}, {} demodulation",
        records.len(),
        tonescope_core::FFT_SIZE,
        config.window,
        config.demod.method
    );
    println!();

    for record in &records {
        println!(
            "[{:4}] {:7.3} s  {}",
            record.frame, record.time, record.report
        );
        if let Some(check) = &record.cross_check {
            match (check.amplitude_disagreement, check.phase_disagreement) {
                (Some(da), Some(dp)) => println!(
                    "       cross-check  dA1={:.4}  dA2={:.4}  dphi1={:.4}  dphi2={:.4}",
                    da[0], da[1], dp[0], dp[1]
                ),
                _ => println!("       cross-check  joint fit singular"),
            }
        }
    }

    let tracked = records
        .iter()
        .filter(|r| r.report.diagnostics.tracked[0])
        .count();
    let detected = records.iter().filter(|r| r.report.primary.is_some()).count();
    println!();
    println!(
        "Detected a tone in {detected}/{} frames, phase-tracked {tracked}",
        records.len()
    );

    Ok(())
}
