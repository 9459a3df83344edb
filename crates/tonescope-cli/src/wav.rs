//! WAV recordings of the analog input and the DDS output.
//!
//! A recording holds the AC part of the signal: a sample of `s` stands for
//! `MID_RAIL + s * span` volts at the converter, where `span` is the voltage
//! at digital full scale.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use tonescope_core::{ADC_FULL_SCALE, FFT_SIZE};

/// Bias point of the analog front end.
pub const MID_RAIL: f32 = ADC_FULL_SCALE / 2.0;

/// Default voltage at digital full scale: a full-scale recording swings
/// rail to rail.
pub const DEFAULT_SPAN: f32 = MID_RAIL;

/// Errors from WAV I/O.
#[derive(Debug, thiserror::Error)]
pub enum WavError {
    /// WAV encoding or decoding failed.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// The recording was not captured at the analyzer's sample rate.
    #[error("expected {expected} Hz, got {actual} Hz")]
    SampleRate {
        /// Required rate.
        expected: u32,
        /// Rate found in the file.
        actual: u32,
    },

    /// Fewer samples than one analysis frame.
    #[error("recording holds {0} samples, need at least one 4096-sample frame")]
    TooShort(usize),
}

/// Mono 32-bit float at `sample_rate`, the format recordings are written in.
pub fn mono_float(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

/// Read a recording as mono samples in `[-1, 1]`, requiring the analyzer's
/// sample rate and at least one frame. Integer files are scaled to full
/// scale; extra channels are averaged.
pub fn read_recording(path: &Path, sample_rate: u32) -> Result<Vec<f32>, WavError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate != sample_rate {
        return Err(WavError::SampleRate {
            expected: sample_rate,
            actual: spec.sample_rate,
        });
    }

    let interleaved = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|code| code as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    let samples = mix_to_mono(interleaved, spec.channels);

    if samples.len() < FFT_SIZE {
        return Err(WavError::TooShort(samples.len()));
    }
    tracing::debug!(
        path = %path.display(),
        samples = samples.len(),
        channels = spec.channels,
        "read recording"
    );
    Ok(samples)
}

fn mix_to_mono(interleaved: Vec<f32>, channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved;
    }
    interleaved
        .chunks_exact(usize::from(channels))
        .map(|frame| frame.iter().sum::<f32>() / f32::from(channels))
        .collect()
}

/// Write mono samples as a float recording at `sample_rate`.
pub fn write_recording(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), WavError> {
    let mut writer = WavWriter::create(path, mono_float(sample_rate))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Quantize one recording sample the way the 12-bit ADC would.
pub fn sample_to_code(sample: f32, span: f32) -> u16 {
    let volts = MID_RAIL + sample * span;
    (volts / ADC_FULL_SCALE * 4096.0).round().clamp(0.0, 4095.0) as u16
}

/// Volts at the converter back to a recording sample.
pub fn volts_to_sample(volts: f32, span: f32) -> f32 {
    (volts - MID_RAIL) / span
}

/// Cut a recording into whole analysis frames of ADC codes. A trailing
/// partial frame is dropped.
pub fn frames(samples: &[f32], span: f32) -> Vec<Box<[u16; FFT_SIZE]>> {
    samples
        .chunks_exact(FFT_SIZE)
        .map(|chunk| {
            let mut codes = Box::new([0u16; FFT_SIZE]);
            for (code, &s) in codes.iter_mut().zip(chunk) {
                *code = sample_to_code(s, span);
            }
            codes
        })
        .collect()
}
