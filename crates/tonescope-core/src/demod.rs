//! Amplitude and phase recovery at known frequencies.
//!
//! Both methods project the DC-removed, unwindowed samples onto cosine and
//! sine references generated by an angle-increment recurrence. Results are
//! [`Quadrature`] pairs `x[n] ≈ I·cos ωn + Q·sin ωn`; the reported phase is
//! `θ = atan2(Q, I)`, so `x[n] = A·cos(ωn − θ)`.
//!
//! - [`least_squares`] fits both tones jointly through the 4×4 normal
//!   equations, so leakage between close tones cancels.
//! - [`correlate`] projects onto one tone at a time with `2/N` scaling. Exact
//!   on bin centres, biased by the other tone's leakage elsewhere.

use core::f32::consts::{FRAC_PI_2, PI};

use crate::SAMPLE_RATE;
use crate::error::Error;
use crate::linalg::{SingularMatrix, solve};
use crate::refine::wrap_phase;

/// Cosine/sine coefficients of one tone.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quadrature {
    /// Cosine coefficient (`A·cos θ`).
    pub i: f32,
    /// Sine coefficient (`A·sin θ`).
    pub q: f32,
}

impl Quadrature {
    /// Peak amplitude.
    pub fn amplitude(&self) -> f32 {
        libm::sqrtf(self.i * self.i + self.q * self.q)
    }

    /// `atan2(Q, I)`: the lag `θ` of `A·cos(ωn − θ)`, in `(-π, π]`.
    pub fn phase(&self) -> f32 {
        libm::atan2f(self.q, self.i)
    }
}

/// One identified tone.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tone {
    /// Frequency in Hz.
    pub frequency: f32,
    /// Peak amplitude in volts.
    pub amplitude: f32,
    /// Phase in radians, `atan2(Q, I)`.
    pub phase: f32,
}

impl Tone {
    /// Combine a frequency with its demodulated coefficients.
    pub fn from_quadrature(frequency: f32, quadrature: Quadrature) -> Self {
        Self {
            frequency,
            amplitude: quadrature.amplitude(),
            phase: quadrature.phase(),
        }
    }

    /// The same phase as the offset `φ` of `A·sin(ωn + φ)`, which is how a
    /// sine table is rotated to reproduce the tone.
    pub fn sine_phase(&self) -> f32 {
        wrap_phase(FRAC_PI_2 - self.phase)
    }
}

/// Cosine/sine reference generator: `(cos ωn, sin ωn)` for `n = 0, 1, ...`.
#[derive(Debug, Clone, Copy)]
struct Phasor {
    cos: f32,
    sin: f32,
    step_cos: f32,
    step_sin: f32,
}

impl Phasor {
    fn new(frequency: f32) -> Self {
        let w = 2.0 * PI * frequency / SAMPLE_RATE;
        Self {
            cos: 1.0,
            sin: 0.0,
            step_cos: libm::cosf(w),
            step_sin: libm::sinf(w),
        }
    }

    fn step(&mut self) -> (f32, f32) {
        let out = (self.cos, self.sin);
        let cos = self.cos * self.step_cos - self.sin * self.step_sin;
        let sin = self.sin * self.step_cos + self.cos * self.step_sin;
        self.cos = cos;
        self.sin = sin;
        out
    }
}

impl Iterator for Phasor {
    type Item = (f32, f32);

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.step())
    }
}

/// Correlate the samples with one tone, scaled by `2/N`.
pub fn correlate(samples: &[f32], frequency: f32) -> Quadrature {
    let (acc_cos, acc_sin) = samples
        .iter()
        .zip(Phasor::new(frequency))
        .fold((0.0f32, 0.0f32), |(ac, as_), (&x, (c, s))| {
            (ac + x * c, as_ + x * s)
        });
    let scale = 2.0 / samples.len() as f32;
    Quadrature {
        i: acc_cos * scale,
        q: acc_sin * scale,
    }
}

/// Accumulate the normal equations `Hᵀ·H`, `Hᵀ·x` for a basis produced one
/// row per sample.
fn normal_equations<const K: usize>(
    samples: &[f32],
    mut basis: impl FnMut() -> [f32; K],
) -> ([[f32; K]; K], [f32; K]) {
    let mut h = [[0.0f32; K]; K];
    let mut proj = [0.0f32; K];
    for &x in samples {
        let row = basis();
        for i in 0..K {
            proj[i] += x * row[i];
            for j in i..K {
                h[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..K {
        for j in 0..i {
            h[i][j] = h[j][i];
        }
    }
    (h, proj)
}

/// Jointly fit two tones. Coefficients come out in volts without scaling.
pub fn least_squares(
    samples: &[f32],
    f1: f32,
    f2: f32,
) -> Result<[Quadrature; 2], SingularMatrix> {
    let mut p1 = Phasor::new(f1);
    let mut p2 = Phasor::new(f2);
    let (h, proj) = normal_equations::<4>(samples, || {
        let (c1, s1) = p1.step();
        let (c2, s2) = p2.step();
        [c1, s1, c2, s2]
    });
    let [i1, q1, i2, q2] = solve(h, proj)?;
    Ok([Quadrature { i: i1, q: q1 }, Quadrature { i: i2, q: q2 }])
}

/// Fit a single tone by least squares.
pub fn least_squares_single(samples: &[f32], frequency: f32) -> Result<Quadrature, SingularMatrix> {
    let mut p = Phasor::new(frequency);
    let (h, proj) = normal_equations::<2>(samples, || {
        let (c, s) = p.step();
        [c, s]
    });
    let [i, q] = solve(h, proj)?;
    Ok(Quadrature { i, q })
}

/// Demodulation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DemodMethod {
    /// Joint least squares when both tones are valid, correlation otherwise.
    #[default]
    Joint,
    /// Per-tone correlation.
    Correlation,
}

impl DemodMethod {
    /// Lower-case name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            DemodMethod::Joint => "joint",
            DemodMethod::Correlation => "correlation",
        }
    }
}

impl core::fmt::Display for DemodMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl core::str::FromStr for DemodMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("joint") {
            Ok(DemodMethod::Joint)
        } else if s.eq_ignore_ascii_case("correlation") {
            Ok(DemodMethod::Correlation)
        } else {
            Err(Error::UnknownName("demodulation method"))
        }
    }
}

/// Demodulator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DemodConfig {
    /// Which method to use.
    pub method: DemodMethod,
    /// Tones at or below this frequency (Hz) are not demodulated.
    pub min_frequency: f32,
}

impl Default for DemodConfig {
    fn default() -> Self {
        Self {
            method: DemodMethod::Joint,
            min_frequency: 100.0,
        }
    }
}

impl DemodConfig {
    /// Check the settings.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.min_frequency.is_finite() || self.min_frequency < 0.0 {
            return Err(Error::InvalidConfig(
                "demod min_frequency must be finite and non-negative",
            ));
        }
        if self.min_frequency >= SAMPLE_RATE / 2.0 {
            return Err(Error::InvalidConfig("demod min_frequency must be below Nyquist"));
        }
        Ok(())
    }
}

/// Coefficients for the tones that could be demodulated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Demodulation {
    /// Primary tone, absent when below the minimum frequency.
    pub primary: Option<Quadrature>,
    /// Secondary tone, absent when missing, too low, or unresolved.
    pub secondary: Option<Quadrature>,
    /// The joint fit was singular and fell back to correlation.
    pub singular: bool,
}

/// Applies a [`DemodConfig`] to a frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Demodulator {
    config: DemodConfig,
}

impl Demodulator {
    /// A demodulator with the given settings.
    pub fn new(config: DemodConfig) -> Self {
        Self { config }
    }

    /// Current settings.
    pub fn config(&self) -> DemodConfig {
        self.config
    }

    /// Replace the settings.
    pub fn set_config(&mut self, config: DemodConfig) {
        self.config = config;
    }

    /// Whether a tone at `frequency` is demodulated.
    pub fn accepts(&self, frequency: f32) -> bool {
        frequency > self.config.min_frequency
    }

    /// Recover coefficients for the primary and optional secondary tone.
    pub fn demodulate(&self, samples: &[f32], primary: f32, secondary: Option<f32>) -> Demodulation {
        let primary_ok = self.accepts(primary);
        let secondary = secondary.filter(|&f| self.accepts(f));

        if self.config.method == DemodMethod::Joint
            && primary_ok
            && let Some(f2) = secondary
        {
            return match least_squares(samples, primary, f2) {
                Ok([q1, q2]) => Demodulation {
                    primary: Some(q1),
                    secondary: Some(q2),
                    singular: false,
                },
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(f1 = primary, f2, error = %_err, "joint fit singular, correlating primary");
                    Demodulation {
                        primary: Some(correlate(samples, primary)),
                        secondary: None,
                        singular: true,
                    }
                }
            };
        }

        Demodulation {
            primary: primary_ok.then(|| correlate(samples, primary)),
            secondary: secondary.map(|f| correlate(samples, f)),
            singular: false,
        }
    }
}

/// Both methods evaluated at the same frequencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossCheck {
    /// Frequencies the methods were run at.
    pub frequencies: [f32; 2],
    /// Joint least-squares estimate.
    pub least_squares: Result<[Quadrature; 2], SingularMatrix>,
    /// Per-tone correlation estimate.
    pub correlation: [Quadrature; 2],
}

impl CrossCheck {
    /// Run both methods.
    pub fn run(samples: &[f32], f1: f32, f2: f32) -> Self {
        Self {
            frequencies: [f1, f2],
            least_squares: least_squares(samples, f1, f2),
            correlation: [correlate(samples, f1), correlate(samples, f2)],
        }
    }

    /// `|A_ls − A_corr|` per tone, absent if the fit was singular.
    pub fn amplitude_disagreement(&self) -> Option<[f32; 2]> {
        let ls = self.least_squares.ok()?;
        Some([0, 1].map(|k| (ls[k].amplitude() - self.correlation[k].amplitude()).abs()))
    }

    /// Wrapped phase difference per tone, absent if the fit was singular.
    pub fn phase_disagreement(&self) -> Option<[f32; 2]> {
        let ls = self.least_squares.ok()?;
        Some([0, 1].map(|k| wrap_phase(ls[k].phase() - self.correlation[k].phase()).abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BIN_WIDTH, FFT_SIZE};

    fn signal(tones: &[(f64, f64, f64)]) -> Vec<f32> {
        (0..FFT_SIZE)
            .map(|n| {
                let t = n as f64 / SAMPLE_RATE as f64;
                tones
                    .iter()
                    .map(|&(f, a, phi)| a * (2.0 * core::f64::consts::PI * f * t + phi).sin())
                    .sum::<f64>() as f32
            })
            .collect()
    }

    /// `atan2(Q, I)` for a tone synthesized as `A·sin(ωn + φ)`.
    fn lag(phi: f64) -> f32 {
        wrap_phase(FRAC_PI_2 - phi as f32)
    }

    #[test]
    fn cosine_input_has_zero_phase() {
        let x: Vec<f32> = (0..FFT_SIZE)
            .map(|n| libm::cosf(2.0 * PI * 700.0 * n as f32 / SAMPLE_RATE))
            .collect();
        let q = least_squares_single(&x, 700.0).unwrap();
        assert!((q.i - 1.0).abs() < 1e-3, "I {}", q.i);
        assert!(q.q.abs() < 1e-3, "Q {}", q.q);
        assert!(q.phase().abs() < 1e-3, "phase {}", q.phase());

        let sine = signal(&[(700.0, 1.0, 0.0)]);
        let tone = Tone::from_quadrature(700.0, least_squares_single(&sine, 700.0).unwrap());
        assert!((tone.phase - FRAC_PI_2).abs() < 1e-3, "phase {}", tone.phase);
        assert!(tone.sine_phase().abs() < 1e-3, "sine phase {}", tone.sine_phase());
    }

    #[test]
    fn phasor_tracks_direct_evaluation() {
        let f = 1234.5f32;
        let w = 2.0 * core::f64::consts::PI * f as f64 / SAMPLE_RATE as f64;
        for (n, (c, s)) in Phasor::new(f).take(FFT_SIZE).enumerate() {
            let (want_s, want_c) = (w * n as f64).sin_cos();
            assert!((c as f64 - want_c).abs() < 2e-3, "cos drift at {n}");
            assert!((s as f64 - want_s).abs() < 2e-3, "sin drift at {n}");
        }
    }

    #[test]
    fn correlation_on_bin_centre() {
        let f = 50.0 * BIN_WIDTH as f64;
        let x = signal(&[(f, 1.0, 0.7)]);
        let q = correlate(&x, f as f32);
        assert!((q.amplitude() - 1.0).abs() < 1e-3, "A {}", q.amplitude());
        assert!((q.phase() - lag(0.7)).abs() < 1e-3, "phi {}", q.phase());
    }

    #[test]
    fn least_squares_separates_two_tones() {
        let x = signal(&[(1000.0, 1.0, 0.3), (1500.0, 0.4, -1.2)]);
        let [t1, t2] = least_squares(&x, 1000.0, 1500.0).unwrap();
        assert!((t1.amplitude() - 1.0).abs() < 1e-3);
        assert!((t1.phase() - lag(0.3)).abs() < 1e-3);
        assert!((t2.amplitude() - 0.4).abs() < 1e-3);
        assert!((t2.phase() - lag(-1.2)).abs() < 1e-3);
    }

    #[test]
    fn least_squares_beats_correlation_off_bin() {
        // Close tones between bin centres leak into each other's correlation.
        let x = signal(&[(1003.0, 1.0, 0.0), (1041.0, 0.5, 1.0)]);
        let truth = Quadrature {
            i: 0.5 * 1.0f32.sin(),
            q: 0.5 * 1.0f32.cos(),
        };
        let error = |est: Quadrature| libm::hypotf(est.i - truth.i, est.q - truth.q);

        let check = CrossCheck::run(&x, 1003.0, 1041.0);
        let ls_err = error(check.least_squares.unwrap()[1]);
        let corr_err = error(check.correlation[1]);
        assert!(ls_err < 1e-3, "ls error {ls_err}");
        assert!(corr_err > 5.0 * ls_err, "corr error {corr_err}");
    }

    #[test]
    fn single_fit_matches_correlation_on_bin() {
        let f = 120.0 * BIN_WIDTH;
        let x = signal(&[(f as f64, 0.5, -2.0)]);
        let single = least_squares_single(&x, f).unwrap();
        let corr = correlate(&x, f);
        assert!((single.amplitude() - corr.amplitude()).abs() < 1e-3);
        assert!(wrap_phase(single.phase() - corr.phase()).abs() < 1e-3);
    }

    #[test]
    fn coincident_frequencies_are_singular() {
        let x = signal(&[(1000.0, 1.0, 0.0)]);
        assert!(least_squares(&x, 1000.0, 1000.0).is_err());
    }

    #[test]
    fn joint_falls_back_on_singular_fit() {
        let x = signal(&[(1000.0, 1.0, 0.0)]);
        let demod = Demodulator::default();
        let out = demod.demodulate(&x, 1000.0, Some(1000.0));
        assert!(out.singular);
        assert!(out.primary.is_some());
        assert!(out.secondary.is_none());
    }

    #[test]
    fn low_tones_are_skipped() {
        let x = signal(&[(1000.0, 1.0, 0.0), (60.0, 0.5, 0.0)]);
        let demod = Demodulator::default();
        let out = demod.demodulate(&x, 1000.0, Some(60.0));
        assert!(out.primary.is_some());
        assert!(out.secondary.is_none());
        let out = demod.demodulate(&x, 60.0, None);
        assert!(out.primary.is_none());
    }

    #[test]
    fn correlation_policy_never_solves() {
        let x = signal(&[(1000.0, 1.0, 0.0)]);
        let demod = Demodulator::new(DemodConfig {
            method: DemodMethod::Correlation,
            ..DemodConfig::default()
        });
        let out = demod.demodulate(&x, 1000.0, Some(1000.0));
        assert!(!out.singular);
        assert!(out.secondary.is_some());
    }

    #[test]
    fn cross_check_reports_disagreement() {
        let x = signal(&[(1000.0, 1.0, 0.3), (2500.0, 0.6, 0.1)]);
        let check = CrossCheck::run(&x, 1000.0, 2500.0);
        let amp = check.amplitude_disagreement().unwrap();
        let phase = check.phase_disagreement().unwrap();
        // Well separated tones: both methods agree closely.
        assert!(amp.iter().all(|&d| d < 0.02), "{amp:?}");
        assert!(phase.iter().all(|&d| d < 0.05), "{phase:?}");
    }

    #[test]
    fn method_names_parse() {
        assert_eq!("joint".parse::<DemodMethod>(), Ok(DemodMethod::Joint));
        assert_eq!(
            "Correlation".parse::<DemodMethod>(),
            Ok(DemodMethod::Correlation)
        );
        assert!("fft".parse::<DemodMethod>().is_err());
    }
}
