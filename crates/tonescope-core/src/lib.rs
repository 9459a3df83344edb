//! Tonescope Core - dual-tone analysis and DDS synthesis pipeline
//!
//! This crate holds everything the analyzer firmware computes: it takes
//! frames of raw ADC codes, identifies up to two superposed sinusoids
//! (frequency, amplitude, phase), and rebuilds one of them as a DAC lookup
//! table with matching timer settings.
//!
//! # Pipeline
//!
//! One acquisition cycle flows one way through these stages:
//!
//! - [`window`] - Window coefficient tables ([`WindowTable`])
//! - [`spectrum`] - DC removal, windowing, and the 4096-point real FFT ([`SpectralTransform`])
//! - [`peaks`] - Two-peak detection with a guard band ([`find_peaks`])
//! - [`refine`] - Sub-bin refinement with parabolic interpolation and
//!   cross-frame phase tracking ([`FrequencyRefiner`])
//! - [`demod`] - Amplitude/phase recovery by joint least squares or direct
//!   correlation ([`Demodulator`])
//! - [`dds`] / [`synth`] - Waveform tables, timer tiers, and the
//!   stop-rebuild-start output transaction ([`Synthesizer`])
//!
//! [`Analyzer`] strings the analysis stages together and owns all state that
//! survives between frames. [`Instrument`] is one iteration of the firmware
//! main loop: wait for the acquisition ready flag, analyze both halves of the
//! double buffer, retune the synthesizer, refresh the panel.
//!
//! # Hardware collaborators
//!
//! The crate never touches peripherals. Output and display hardware are
//! reached through the [`OutputDevice`] and [`Panel`] traits; acquisition is a
//! [`DoubleBuffer`] plus a [`ReadyFlag`] set from interrupt context.
//!
//! # Example
//!
//! ```rust
//! use tonescope_core::{Analyzer, AnalyzerConfig, Frame, FFT_SIZE};
//!
//! let mut analyzer = Analyzer::new(AnalyzerConfig::default());
//!
//! // Mid-rail 12-bit ADC codes with a 1 V tone on bin 50.
//! let mut codes = [0u16; FFT_SIZE];
//! for (n, code) in codes.iter_mut().enumerate() {
//!     let phase = 2.0 * core::f32::consts::PI * 50.0 * n as f32 / FFT_SIZE as f32;
//!     *code = ((1.65 + libm::sinf(phase)) / 3.3 * 4096.0) as u16;
//! }
//!
//! let report = analyzer.process(Frame::new(&codes));
//! let tone = report.primary.unwrap();
//! assert!((tone.frequency - 488.28).abs() < 0.5);
//! ```
//!
//! # no_std Support
//!
//! The crate is `no_std` and allocation free; every buffer is a fixed-size
//! array sized by [`FFT_SIZE`] and [`LUT_LENGTH`]. Disable the default `std`
//! feature for firmware builds:
//!
//! ```toml
//! [dependencies]
//! tonescope-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod dds;
pub mod demod;
pub mod error;
pub mod frame;
pub mod instrument;
pub mod linalg;
pub mod peaks;
pub mod pipeline;
pub mod readout;
pub mod refine;
pub mod spectrum;
pub mod synth;
pub mod window;

/// Number of samples per acquisition frame and FFT length.
pub const FFT_SIZE: usize = 4096;

/// Number of complex bins produced by the real FFT.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

/// ADC sample rate in Hz.
pub const SAMPLE_RATE: f32 = 40_000.0;

/// Width of one FFT bin in Hz (≈ 9.7656 Hz).
pub const BIN_WIDTH: f32 = SAMPLE_RATE / FFT_SIZE as f32;

/// Duration of one frame in seconds (0.1024 s).
pub const FRAME_PERIOD: f32 = FFT_SIZE as f32 / SAMPLE_RATE;

// Re-export main types at crate root
pub use dds::{
    DAC_FULL_SCALE, DAC_MAX_CODE, LUT_LENGTH, TIMER_CLOCK_HZ, TimingConfig, WaveConfig, WaveKind,
    WaveTable,
};
pub use demod::{
    CrossCheck, DemodConfig, DemodMethod, Demodulation, Demodulator, Quadrature, Tone, correlate,
    least_squares, least_squares_single,
};
pub use error::Error;
pub use frame::{DoubleBuffer, Frame, Half, ReadyFlag};
pub use instrument::{Instrument, InstrumentError};
pub use linalg::{SingularMatrix, solve};
pub use peaks::{PeakConfig, PeakPair, find_peaks};
pub use pipeline::{Analyzer, AnalyzerConfig, Diagnostics, ToneReport};
pub use readout::{Color, Panel, Readout, ReadoutConfig, integer_digits};
pub use refine::{
    BinState, FrequencyRefiner, RefineConfig, Refined, Slot, TrackingMode, parabolic_offset,
    wrap_phase,
};
pub use spectrum::{ADC_FULL_SCALE, SpectralTransform, Spectrum};
pub use synth::{OutputDevice, SynthError, Synthesizer};
pub use window::{WindowKind, WindowTable};
