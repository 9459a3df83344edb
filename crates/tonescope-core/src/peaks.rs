//! Two-peak detection over a magnitude spectrum.

use crate::error::Error;

/// Peak search parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PeakConfig {
    /// First bin searched; bins below it are DC leakage.
    pub min_bin: usize,
    /// A peak must exceed this magnitude.
    pub floor: f32,
    /// Bins within this distance of the primary are excluded from the
    /// secondary search.
    pub guard: usize,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            min_bin: 2,
            floor: 10.0,
            guard: 4,
        }
    }
}

impl PeakConfig {
    /// Check the settings.
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_bin == 0 {
            return Err(Error::InvalidConfig("peak min_bin must skip the DC bin"));
        }
        if !self.floor.is_finite() || self.floor < 0.0 {
            return Err(Error::InvalidConfig("peak floor must be finite and non-negative"));
        }
        Ok(())
    }
}

/// Detected bins, primary first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PeakPair {
    /// Strongest bin.
    pub primary: usize,
    /// Strongest bin outside the guard band, if any exceeds the floor.
    pub secondary: Option<usize>,
}

/// Find the strongest bin and the strongest bin outside its guard band.
///
/// Comparisons are strict, so the lowest bin wins a tie. Returns `None` when
/// nothing exceeds the floor.
pub fn find_peaks(magnitudes: &[f32], config: &PeakConfig) -> Option<PeakPair> {
    let primary = strongest(magnitudes, config, |_| true)?;
    let secondary = strongest(magnitudes, config, |k| k.abs_diff(primary) > config.guard);

    #[cfg(feature = "tracing")]
    tracing::trace!(primary, ?secondary, "peaks");

    Some(PeakPair { primary, secondary })
}

fn strongest(
    magnitudes: &[f32],
    config: &PeakConfig,
    include: impl Fn(usize) -> bool,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut level = config.floor;
    for (k, &m) in magnitudes.iter().enumerate().skip(config.min_bin) {
        if m > level && include(k) {
            level = m;
            best = Some(k);
        }
    }
    best
}
