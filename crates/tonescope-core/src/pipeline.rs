//! Frame-to-tones analysis pipeline.
//!
//! [`Analyzer`] owns every buffer and all cross-frame state, so separate
//! instances analyze separate inputs without interfering. Per frame:
//!
//! 1. [`SpectralTransform`] turns codes into a windowed spectrum and keeps the
//!    DC-removed samples.
//! 2. [`find_peaks`] picks the primary and optional secondary bin.
//! 3. [`FrequencyRefiner`] refines both bins to sub-bin frequencies.
//! 4. [`Demodulator`] recovers amplitude and phase at those frequencies.

use crate::demod::{CrossCheck, DemodConfig, Demodulator, Tone};
use crate::error::Error;
use crate::frame::Frame;
use crate::peaks::{PeakConfig, PeakPair, find_peaks};
use crate::refine::{FrequencyRefiner, RefineConfig};
use crate::spectrum::{SpectralTransform, Spectrum};
use crate::window::{WindowKind, WindowTable};
use crate::{BIN_COUNT, FFT_SIZE};

/// All analyzer settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalyzerConfig {
    /// Window applied before the FFT.
    pub window: WindowKind,
    /// Peak detection.
    pub peaks: PeakConfig,
    /// Frequency refinement.
    pub refine: RefineConfig,
    /// Demodulation.
    pub demod: DemodConfig,
}

impl AnalyzerConfig {
    /// Check every section.
    pub fn validate(&self) -> Result<(), Error> {
        self.peaks.validate()?;
        if self.peaks.min_bin >= BIN_COUNT {
            return Err(Error::InvalidConfig("peak min_bin beyond the spectrum"));
        }
        if self.peaks.guard >= BIN_COUNT {
            return Err(Error::InvalidConfig("peak guard wider than the spectrum"));
        }
        self.demod.validate()
    }
}

/// Per-frame details behind a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostics {
    /// Detected bins; absent for a silent frame.
    pub peaks: Option<PeakPair>,
    /// Whether phase tracking refined each slot.
    pub tracked: [bool; 2],
    /// Whether the joint fit was singular.
    pub singular: bool,
}

/// Result of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ToneReport {
    /// Strongest tone; absent for a silent frame.
    pub primary: Option<Tone>,
    /// Second tone; absent when not detected or not resolvable.
    pub secondary: Option<Tone>,
    /// How the report was obtained.
    pub diagnostics: Diagnostics,
}

impl ToneReport {
    /// Both slots, primary first.
    pub fn tones(&self) -> [Option<Tone>; 2] {
        [self.primary, self.secondary]
    }
}

impl core::fmt::Display for ToneReport {
    /// `f1=%8.3f Hz  A1=%6.3f  phi1=%7.3f  |  f2=...`, dashes for absent tones.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (slot, tone) in self.tones().into_iter().enumerate() {
            let n = slot + 1;
            if slot > 0 {
                f.write_str("  |  ")?;
            }
            match tone {
                Some(t) => write!(
                    f,
                    "f{n}={:8.3} Hz  A{n}={:6.3}  phi{n}={:7.3}",
                    t.frequency, t.amplitude, t.phase
                )?,
                None => write!(f, "f{n}={:>8} Hz  A{n}={:>6}  phi{n}={:>7}", "-", "-", "-")?,
            }
        }
        Ok(())
    }
}

/// The analysis pipeline and its cross-frame state.
#[derive(Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
    window: WindowTable,
    transform: SpectralTransform,
    refiner: FrequencyRefiner,
    demodulator: Demodulator,
    tones: [Tone; 2],
}

impl Analyzer {
    /// A cold analyzer. The config is used as given; see
    /// [`AnalyzerConfig::validate`].
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            window: WindowTable::new(config.window),
            transform: SpectralTransform::new(),
            refiner: FrequencyRefiner::new(config.refine),
            demodulator: Demodulator::new(config.demod),
            tones: [Tone::default(); 2],
        }
    }

    /// Analyze one frame.
    pub fn process(&mut self, frame: Frame<'_>) -> ToneReport {
        self.transform.process(frame, &self.window);
        let spectrum = self.transform.spectrum();
        let samples = self.transform.samples();

        let Some(peaks) = find_peaks(spectrum.magnitudes(), &self.config.peaks) else {
            #[cfg(feature = "tracing")]
            tracing::debug!("silent frame");
            self.refiner.reset();
            return ToneReport::default();
        };

        let (first, second) = self.refiner.refine_pair(
            peaks.primary,
            peaks.secondary,
            spectrum.bins(),
            spectrum.magnitudes(),
        );
        let demod = self.demodulator.demodulate(
            samples,
            first.frequency,
            second.map(|r| r.frequency),
        );

        // Below the demodulation floor the primary keeps its last amplitude
        // and phase.
        let held = &mut self.tones[0];
        held.frequency = first.frequency;
        if let Some(q) = demod.primary {
            held.amplitude = q.amplitude();
            held.phase = q.phase();
        }
        let primary = *held;

        let secondary = match (second, demod.secondary) {
            (Some(r), Some(q)) => {
                let tone = Tone::from_quadrature(r.frequency, q);
                self.tones[1] = tone;
                Some(tone)
            }
            _ => None,
        };

        let report = ToneReport {
            primary: Some(primary),
            secondary,
            diagnostics: Diagnostics {
                peaks: Some(peaks),
                tracked: [first.tracked, second.is_some_and(|r| r.tracked)],
                singular: demod.singular,
            },
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            k1 = peaks.primary,
            k2 = ?peaks.secondary,
            tracked = ?report.diagnostics.tracked,
            singular = demod.singular,
            "frame analyzed"
        );

        report
    }

    /// Change the window; the table is rebuilt only if the kind differs.
    pub fn set_window(&mut self, kind: WindowKind) {
        self.config.window = kind;
        self.window.rebuild(kind);
    }

    /// Replace all settings after validating them. Tracking history is kept.
    pub fn set_config(&mut self, config: AnalyzerConfig) -> Result<(), Error> {
        config.validate()?;
        self.set_window(config.window);
        self.refiner.set_config(config.refine);
        self.demodulator.set_config(config.demod);
        self.config = config;
        Ok(())
    }

    /// Current settings.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// The active window table.
    pub fn window(&self) -> &WindowTable {
        &self.window
    }

    /// Spectrum of the last frame.
    pub fn spectrum(&self) -> &Spectrum {
        self.transform.spectrum()
    }

    /// DC-removed samples of the last frame, in volts.
    pub fn samples(&self) -> &[f32; FFT_SIZE] {
        self.transform.samples()
    }

    /// Latest estimate held in each slot.
    pub fn tones(&self) -> &[Tone; 2] {
        &self.tones
    }

    /// Run both demodulation methods on the last frame at the given
    /// frequencies.
    pub fn cross_check(&self, primary: f32, secondary: f32) -> CrossCheck {
        CrossCheck::run(self.transform.samples(), primary, secondary)
    }

    /// Drop tracking history and held estimates.
    pub fn reset(&mut self) {
        self.refiner.reset();
        self.tones = [Tone::default(); 2];
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl core::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .field("refiner", &self.refiner)
            .field("tones", &self.tones)
            .finish_non_exhaustive()
    }
}
