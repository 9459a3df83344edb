//! Spectral transform: codes to volts, DC removal, windowing, real FFT.

use num_complex::Complex32;

use crate::frame::Frame;
use crate::window::WindowTable;
use crate::{BIN_COUNT, FFT_SIZE};

/// ADC reference voltage.
pub const ADC_FULL_SCALE: f32 = 3.3;

/// Number of ADC codes (12-bit converter).
pub const ADC_CODES: u16 = 4096;

/// Volts per ADC code.
pub const VOLTS_PER_CODE: f32 = ADC_FULL_SCALE / ADC_CODES as f32;

/// One-sided spectrum of a frame.
#[derive(Clone)]
pub struct Spectrum {
    bins: [Complex32; BIN_COUNT],
    magnitudes: [f32; BIN_COUNT],
}

impl Spectrum {
    /// An all-zero spectrum.
    pub fn new() -> Self {
        Self {
            bins: [Complex32::new(0.0, 0.0); BIN_COUNT],
            magnitudes: [0.0; BIN_COUNT],
        }
    }

    /// Build from precomputed bins, deriving the magnitudes.
    pub fn from_bins(bins: [Complex32; BIN_COUNT]) -> Self {
        let mut spectrum = Self {
            bins,
            magnitudes: [0.0; BIN_COUNT],
        };
        spectrum.update_magnitudes();
        spectrum
    }

    fn update_magnitudes(&mut self) {
        for (mag, bin) in self.magnitudes.iter_mut().zip(self.bins.iter()) {
            *mag = libm::sqrtf(bin.re * bin.re + bin.im * bin.im);
        }
    }

    /// Complex bins `0..N/2`. Bin 0 is pure DC.
    pub fn bins(&self) -> &[Complex32; BIN_COUNT] {
        &self.bins
    }

    /// Bin magnitudes.
    pub fn magnitudes(&self) -> &[f32; BIN_COUNT] {
        &self.magnitudes
    }
}

impl Default for Spectrum {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Spectrum {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Spectrum").finish_non_exhaustive()
    }
}

/// Runs the per-frame transform and keeps its buffers.
///
/// After [`process`](Self::process), [`samples`](Self::samples) holds the
/// DC-removed, unwindowed frame in volts for the demodulator.
#[derive(Clone)]
pub struct SpectralTransform {
    samples: [f32; FFT_SIZE],
    scratch: [f32; FFT_SIZE],
    spectrum: Spectrum,
}

impl SpectralTransform {
    /// Zeroed buffers.
    pub fn new() -> Self {
        Self {
            samples: [0.0; FFT_SIZE],
            scratch: [0.0; FFT_SIZE],
            spectrum: Spectrum::new(),
        }
    }

    /// Transform one frame.
    pub fn process(&mut self, frame: Frame<'_>, window: &WindowTable) -> &Spectrum {
        let mut sum = 0.0f32;
        for (v, &code) in self.samples.iter_mut().zip(frame.codes().iter()) {
            *v = code as f32 * VOLTS_PER_CODE;
            sum += *v;
        }
        let mean = sum / FFT_SIZE as f32;

        for ((s, out), &w) in self
            .samples
            .iter_mut()
            .zip(self.scratch.iter_mut())
            .zip(window.coefficients().iter())
        {
            *s -= mean;
            *out = *s * w;
        }

        let bins = microfft::real::rfft_4096(&mut self.scratch);
        // microfft packs the Nyquist term into the imaginary part of bin 0.
        bins[0].im = 0.0;
        self.spectrum.bins = *bins;
        self.spectrum.update_magnitudes();

        &self.spectrum
    }

    /// DC-removed, unwindowed samples of the last frame, in volts.
    pub fn samples(&self) -> &[f32; FFT_SIZE] {
        &self.samples
    }

    /// Spectrum of the last frame.
    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }
}

impl Default for SpectralTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpectralTransform").finish_non_exhaustive()
    }
}
