//! Window coefficient tables.
//!
//! Coefficients use the symmetric form with an `N - 1` denominator, so both
//! endpoints sit at the window minimum. The table is only rebuilt when the
//! selected kind changes.

use core::f32::consts::PI;
use core::str::FromStr;

use crate::FFT_SIZE;
use crate::error::Error;

/// Window function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum WindowKind {
    /// Hann window (raised cosine)
    Hanning,
    /// Hamming window
    Hamming,
    /// Exact Blackman window
    Blackman,
    /// 4-term Blackman-Harris window (best sidelobe suppression)
    #[default]
    BlackmanHarris,
}

impl WindowKind {
    /// All kinds, in declaration order.
    pub const ALL: [WindowKind; 4] = [
        WindowKind::Hanning,
        WindowKind::Hamming,
        WindowKind::Blackman,
        WindowKind::BlackmanHarris,
    ];

    /// Evaluate the window at index `i` of a length-`n` table.
    pub fn coefficient(self, i: usize, n: usize) -> f32 {
        let x = 2.0 * PI * i as f32 / (n - 1) as f32;
        match self {
            WindowKind::Hanning => 0.5 * (1.0 - libm::cosf(x)),
            WindowKind::Hamming => 0.54 - 0.46 * libm::cosf(x),
            WindowKind::Blackman => {
                0.42323 - 0.49755 * libm::cosf(x) + 0.07922 * libm::cosf(2.0 * x)
            }
            WindowKind::BlackmanHarris => {
                0.35875 - 0.48829 * libm::cosf(x) + 0.14128 * libm::cosf(2.0 * x)
                    - 0.01168 * libm::cosf(3.0 * x)
            }
        }
    }

    /// Kebab-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            WindowKind::Hanning => "hanning",
            WindowKind::Hamming => "hamming",
            WindowKind::Blackman => "blackman",
            WindowKind::BlackmanHarris => "blackman-harris",
        }
    }
}

impl FromStr for WindowKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindowKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or(Error::UnknownName("window"))
    }
}

impl core::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Precomputed window coefficients for one frame.
#[derive(Clone)]
pub struct WindowTable {
    kind: WindowKind,
    coefficients: [f32; FFT_SIZE],
    coherent_gain: f32,
}

impl WindowTable {
    /// Build the table for `kind`.
    pub fn new(kind: WindowKind) -> Self {
        let mut table = Self {
            kind,
            coefficients: [0.0; FFT_SIZE],
            coherent_gain: 0.0,
        };
        table.fill();
        table
    }

    /// Switch to `kind`. Returns `true` if the coefficients were recomputed.
    pub fn rebuild(&mut self, kind: WindowKind) -> bool {
        if kind == self.kind {
            return false;
        }
        self.kind = kind;
        self.fill();
        true
    }

    fn fill(&mut self) {
        let mut sum = 0.0f32;
        for (i, w) in self.coefficients.iter_mut().enumerate() {
            *w = self.kind.coefficient(i, FFT_SIZE);
            sum += *w;
        }
        self.coherent_gain = sum / FFT_SIZE as f32;

        #[cfg(feature = "tracing")]
        tracing::debug!(kind = %self.kind, coherent_gain = self.coherent_gain, "window rebuilt");
    }

    /// Current window kind.
    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    /// The coefficients.
    pub fn coefficients(&self) -> &[f32; FFT_SIZE] {
        &self.coefficients
    }

    /// Arithmetic mean of the coefficients.
    ///
    /// Not applied to measured amplitudes; the demodulator works on the
    /// unwindowed samples.
    pub fn coherent_gain(&self) -> f32 {
        self.coherent_gain
    }
}

impl Default for WindowTable {
    fn default() -> Self {
        Self::new(WindowKind::default())
    }
}

impl core::fmt::Debug for WindowTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WindowTable")
            .field("kind", &self.kind)
            .field("coherent_gain", &self.coherent_gain)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hanning_endpoints_are_zero() {
        let table = WindowTable::new(WindowKind::Hanning);
        let w = table.coefficients();
        assert!(w[0].abs() < 1e-6);
        assert!(w[FFT_SIZE - 1].abs() < 1e-6);
    }

    #[test]
    fn hamming_endpoints() {
        let table = WindowTable::new(WindowKind::Hamming);
        let w = table.coefficients();
        assert!((w[0] - 0.08).abs() < 1e-5);
        assert!((w[FFT_SIZE - 1] - 0.08).abs() < 1e-5);
    }

    #[test]
    fn windows_are_symmetric() {
        for kind in WindowKind::ALL {
            let table = WindowTable::new(kind);
            let w = table.coefficients();
            for i in 0..FFT_SIZE / 2 {
                assert!(
                    (w[i] - w[FFT_SIZE - 1 - i]).abs() < 1e-4,
                    "{kind} asymmetric at {i}"
                );
            }
        }
    }

    #[test]
    fn coherent_gain_matches_leading_term() {
        let expected = [
            (WindowKind::Hanning, 0.5),
            (WindowKind::Hamming, 0.54),
            (WindowKind::Blackman, 0.42323),
            (WindowKind::BlackmanHarris, 0.35875),
        ];
        for (kind, a0) in expected {
            let gain = WindowTable::new(kind).coherent_gain();
            assert!((gain - a0).abs() < 1e-3, "{kind}: {gain} vs {a0}");
        }
    }

    #[test]
    fn rebuild_only_on_change() {
        let mut table = WindowTable::default();
        assert_eq!(table.kind(), WindowKind::BlackmanHarris);
        assert!(!table.rebuild(WindowKind::BlackmanHarris));
        assert!(table.rebuild(WindowKind::Hanning));
        assert_eq!(table.kind(), WindowKind::Hanning);
        assert!(table.coefficients()[0].abs() < 1e-6);
    }

    #[test]
    fn parse_names() {
        assert_eq!(
            "blackman-harris".parse::<WindowKind>(),
            Ok(WindowKind::BlackmanHarris)
        );
        assert_eq!("Hanning".parse::<WindowKind>(), Ok(WindowKind::Hanning));
        assert!("kaiser".parse::<WindowKind>().is_err());
    }
}
