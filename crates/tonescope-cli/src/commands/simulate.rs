//! The instrument loop run against a recording.
//!
//! Frames are fed to the instrument two at a time, the way the acquisition
//! DMA fills both halves of its buffer before the main loop runs. The output
//! stage and the panel are replaced by in-memory stand-ins: the output
//! records every table it is asked to play, and the panel keeps the text it
//! was asked to draw so the final screen can be printed.

use anyhow::Context;
use clap::Args;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::PathBuf;
use tonescope_core::{
    Color, DoubleBuffer, FFT_SIZE, Half, Instrument, LUT_LENGTH, OutputDevice, Panel, ReadyFlag,
    ReadoutConfig, SAMPLE_RATE, TimingConfig, WaveTable,
};

use crate::wav::{DEFAULT_SPAN, frames, read_recording, write_recording};

#[derive(Args)]
pub struct SimulateArgs {
    /// Input WAV file, 40 kHz
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Analyzer configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Volts at digital full scale
    #[arg(long, default_value_t = DEFAULT_SPAN)]
    span: f32,

    /// Displayed volts per measured volt
    #[arg(long, default_value_t = ReadoutConfig::default().amplitude_scale)]
    amplitude_scale: f32,

    /// Write what the DDS output would have played to this WAV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the final panel contents
    #[arg(long)]
    screen: bool,
}

/// One `start` call on the output.
#[derive(Debug, Clone)]
struct Playback {
    table: WaveTable,
    timing: TimingConfig,
}

/// Output stage that records what it is told to play.
#[derive(Debug, Default)]
struct RecordingOutput {
    stops: usize,
    playing: Option<Playback>,
}

impl OutputDevice for RecordingOutput {
    type Error = Infallible;

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.stops += 1;
        self.playing = None;
        Ok(())
    }

    fn start(&mut self, table: &WaveTable, timing: &TimingConfig) -> Result<(), Self::Error> {
        self.playing = Some(Playback {
            table: table.clone(),
            timing: *timing,
        });
        Ok(())
    }
}

/// Panel that keeps the last text drawn at each position.
#[derive(Debug, Default)]
struct TextPanel {
    cells: BTreeMap<(u16, u16), String>,
}

impl TextPanel {
    /// Screen rows top to bottom, cells left to right.
    fn rows(&self) -> Vec<String> {
        let mut rows: BTreeMap<u16, Vec<&str>> = BTreeMap::new();
        for ((y, _x), text) in &self.cells {
            rows.entry(*y).or_default().push(text);
        }
        rows.into_values().map(|cells| cells.join(" ")).collect()
    }
}

impl Panel for TextPanel {
    type Error = Infallible;

    fn fill(&mut self, _: Color) -> Result<(), Self::Error> {
        self.cells.clear();
        Ok(())
    }

    fn draw_text(&mut self, x: u16, y: u16, _: Color, _: u8, text: &str) -> Result<(), Self::Error> {
        self.cells.insert((y, x), text.to_owned());
        Ok(())
    }

    fn draw_decimal(
        &mut self,
        x: u16,
        y: u16,
        _: Color,
        _: u8,
        value: f64,
        _int_digits: u8,
        frac_digits: u8,
    ) -> Result<(), Self::Error> {
        self.cells
            .insert((y, x), format!("{value:.prec$}", prec = usize::from(frac_digits)));
        Ok(())
    }
}

/// Render `count` samples of what the output plays, continuing from `phase`
/// (in periods). Silence while stopped.
fn render(playing: Option<&Playback>, phase: &mut f32, count: usize, span: f32, out: &mut Vec<f32>) {
    let Some(playback) = playing else {
        out.extend(std::iter::repeat_n(0.0, count));
        return;
    };
    let codes = playback.table.codes();
    let mean = codes
        .iter()
        .map(|&c| WaveTable::code_to_volts(c))
        .sum::<f32>()
        / LUT_LENGTH as f32;
    let step = playback.timing.actual_frequency() / SAMPLE_RATE;
    for _ in 0..count {
        let volts = WaveTable::code_to_volts(playback.table.code_at(*phase));
        out.push((volts - mean) / span);
        *phase = (*phase + step).fract();
    }
}

pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    if !(args.span.is_finite() && args.span > 0.0) {
        anyhow::bail!("--span must be a positive voltage");
    }
    let config = super::analyzer_config(args.config.as_deref())?;
    let readout = ReadoutConfig {
        amplitude_scale: args.amplitude_scale,
    };

    let samples = read_recording(&args.input, super::sample_rate_hz())
        .with_context(|| format!("reading {}", args.input.display()))?;
    let frames = frames(&samples, args.span);
    if frames.len() < 2 {
        anyhow::bail!("need at least two frames ({} samples)", 2 * FFT_SIZE);
    }

    let mut instrument = Instrument::new(
        config,
        readout,
        RecordingOutput::default(),
        TextPanel::default(),
    );
    instrument.draw_static()?;

    let mut buffer = Box::new(DoubleBuffer::new());
    let ready = ReadyFlag::new();
    let mut resynth = Vec::new();
    let mut phase = 0.0f32;

    println!("Input: {}", args.input.display());
    println!();

    for (step, pair) in frames.chunks_exact(2).enumerate() {
        buffer.half_mut(Half::First).copy_from_slice(&pair[0][..]);
        buffer.half_mut(Half::Second).copy_from_slice(&pair[1][..]);
        ready.signal();

        let Some(reports) = instrument.poll(&buffer, &ready)? else {
            continue;
        };
        for (half, report) in reports.iter().enumerate() {
            println!("[{:4}] {}", 2 * step + half, report);
        }

        let synth = instrument.synthesizer();
        match (synth.config(), synth.timing()) {
            (Some(wave), Some(timing)) => println!(
                "       output {} {:.3} Hz (timer {:.3} Hz, div {} arr {}), {:.3} Vpp, phase {:.3}",
                wave.kind,
                wave.frequency,
                timing.actual_frequency(),
                timing.divider,
                timing.reload,
                wave.amplitude,
                wave.phase
            ),
            _ => println!("       output idle"),
        }

        if args.output.is_some() {
            let playing = synth.device().playing.as_ref();
            render(playing, &mut phase, 2 * FFT_SIZE, args.span, &mut resynth);
        }
    }

    let (output, panel) = instrument.into_parts();
    println!();
    println!("Output retuned {} times", output.stops);

    if args.screen {
        println!();
        for row in panel.rows() {
            println!("  {row}");
        }
    }

    if let Some(path) = &args.output {
        write_recording(path, &resynth, super::sample_rate_hz())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {} samples of DDS output to {}", resynth.len(), path.display());
    }

    Ok(())
}
