//! Sub-bin frequency refinement.
//!
//! A detected bin only pins a tone to within one bin width (≈ 9.77 Hz). Two
//! refinements narrow that down:
//!
//! - **Parabolic interpolation** fits a parabola through the peak magnitude
//!   and its neighbours and takes the vertex offset. Works from a single
//!   frame.
//! - **Phase tracking** compares the bin's phase with the same bin one frame
//!   earlier. For contiguous frames a tone at `(k + d)` bins advances the
//!   bin phase by `2πd` per frame, so the wrapped difference measures `d`
//!   directly and far more precisely than the magnitude shape.
//!
//! Tracking needs the slot's previous bin to match the current one, so each
//! slot is a two-state machine: cold start (no matching history, parabolic
//! only) and tracking. By default the phase correction is added on top of
//! the parabolic offset, `f = (k + d)·Δf + Δφ/(2π·T)`. Repeating the same
//! frame gives `Δφ = 0` and leaves the estimate where the parabola put it.
//! For contiguous capture [`TrackingMode::Supersede`] drops the parabola
//! once tracking fires, since `Δφ` then already measures the whole offset.

use core::f32::consts::PI;

use num_complex::Complex32;

use crate::{BIN_WIDTH, FRAME_PERIOD};

/// Parabolic fits with a smaller curvature than this give no offset.
pub const CURVATURE_EPSILON: f32 = 1e-12;

/// Which tone slot a bin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Strongest tone.
    Primary,
    /// Second tone.
    Secondary,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::Primary => 0,
            Slot::Secondary => 1,
        }
    }
}

/// How the phase correction combines with the parabolic offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TrackingMode {
    /// `offset = d + Δφ/(2π·T·Δf)`.
    #[default]
    Additive,
    /// `offset = Δφ/(2π·T·Δf)` once tracking fires. Only meaningful when
    /// consecutive frames are contiguous in time.
    Supersede,
}

/// Enables for the two refinement stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RefineConfig {
    /// Apply the parabolic vertex offset.
    pub interpolate: bool,
    /// Apply cross-frame phase correction.
    pub track_phase: bool,
    /// Combination rule for the two stages.
    pub tracking: TrackingMode,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            interpolate: true,
            track_phase: true,
            tracking: TrackingMode::Additive,
        }
    }
}

/// A slot's bin from the previous frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinState {
    /// Complex bin value.
    pub value: Complex32,
    /// Bin index.
    pub bin: usize,
}

/// Refined frequency estimate for one bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refined {
    /// Detected bin.
    pub bin: usize,
    /// Frequency in Hz.
    pub frequency: f32,
    /// Offset from the bin centre, in bins.
    pub offset: f32,
    /// Whether the phase correction was applied.
    pub tracked: bool,
}

/// Vertex offset of the parabola through three equally spaced points, in
/// bins relative to the centre point.
pub fn parabolic_offset(left: f32, center: f32, right: f32) -> f32 {
    let denom = 2.0 * (left - 2.0 * center + right);
    if denom.abs() < CURVATURE_EPSILON {
        0.0
    } else {
        (left - right) / denom
    }
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_phase(phase: f32) -> f32 {
    let two_pi = 2.0 * PI;
    let mut wrapped = libm::remainderf(phase, two_pi);
    if wrapped <= -PI {
        wrapped += two_pi;
    } else if wrapped > PI {
        wrapped -= two_pi;
    }
    wrapped
}

fn arg(z: Complex32) -> f32 {
    libm::atan2f(z.im, z.re)
}

/// Holds the per-slot history and refines detected bins.
#[derive(Debug, Clone, Default)]
pub struct FrequencyRefiner {
    config: RefineConfig,
    previous: [Option<BinState>; 2],
}

impl FrequencyRefiner {
    /// A refiner in cold start.
    pub fn new(config: RefineConfig) -> Self {
        Self {
            config,
            previous: [None; 2],
        }
    }

    /// Current settings.
    pub fn config(&self) -> RefineConfig {
        self.config
    }

    /// Replace the settings, keeping history.
    pub fn set_config(&mut self, config: RefineConfig) {
        self.config = config;
    }

    /// The stored bin for `slot`, if any.
    pub fn previous(&self, slot: Slot) -> Option<BinState> {
        self.previous[slot.index()]
    }

    /// Refine bin `bin` of a spectrum for `slot`, then store it as the slot's
    /// history.
    pub fn refine(
        &mut self,
        slot: Slot,
        bin: usize,
        bins: &[Complex32],
        magnitudes: &[f32],
    ) -> Refined {
        let value = bins[bin];
        let mut offset = 0.0;
        let mut tracked = false;

        if self.config.interpolate && bin > 0 && bin + 1 < magnitudes.len() {
            offset = parabolic_offset(magnitudes[bin - 1], magnitudes[bin], magnitudes[bin + 1]);
        }

        if self.config.track_phase
            && let Some(prev) = self.previous[slot.index()]
            && prev.bin == bin
        {
            let delta = wrap_phase(arg(value) - arg(prev.value));
            // Δφ / (2π·T) Hz, expressed in bins.
            let correction = delta / (2.0 * PI * FRAME_PERIOD) / BIN_WIDTH;
            offset = match self.config.tracking {
                TrackingMode::Additive => offset + correction,
                TrackingMode::Supersede => correction,
            };
            tracked = true;
        }

        self.previous[slot.index()] = Some(BinState { value, bin });

        let frequency = (bin as f32 + offset) * BIN_WIDTH;

        #[cfg(feature = "tracing")]
        tracing::trace!(?slot, bin, offset, tracked, frequency, "refined");

        Refined {
            bin,
            frequency,
            offset,
            tracked,
        }
    }

    /// Refine both slots. An absent secondary resets its history.
    pub fn refine_pair(
        &mut self,
        primary: usize,
        secondary: Option<usize>,
        bins: &[Complex32],
        magnitudes: &[f32],
    ) -> (Refined, Option<Refined>) {
        let first = self.refine(Slot::Primary, primary, bins, magnitudes);
        let second = match secondary {
            Some(bin) => Some(self.refine(Slot::Secondary, bin, bins, magnitudes)),
            None => {
                self.forget(Slot::Secondary);
                None
            }
        };
        (first, second)
    }

    /// Drop the history of one slot.
    pub fn forget(&mut self, slot: Slot) {
        self.previous[slot.index()] = None;
    }

    /// Return both slots to cold start.
    pub fn reset(&mut self) {
        self.previous = [None; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f32, im: f32) -> Complex32 {
        Complex32::new(re, im)
    }

    #[test]
    fn parabolic_symmetric_peak_has_zero_offset() {
        assert_eq!(parabolic_offset(1.0, 2.0, 1.0), 0.0);
    }

    #[test]
    fn parabolic_recovers_known_vertex() {
        // y = -(x - 0.25)^2 sampled at -1, 0, 1
        let y = |x: f32| -(x - 0.25) * (x - 0.25);
        let d = parabolic_offset(y(-1.0), y(0.0), y(1.0));
        assert!((d - 0.25).abs() < 1e-6, "d = {d}");
    }

    #[test]
    fn parabolic_flat_is_zero() {
        assert_eq!(parabolic_offset(3.0, 3.0, 3.0), 0.0);
    }

    #[test]
    fn wrap_phase_range() {
        assert!((wrap_phase(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_phase(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
        assert!((wrap_phase(PI) - PI).abs() < 1e-6);
        assert!((wrap_phase(-PI) - PI).abs() < 1e-6);
        assert!((wrap_phase(0.3) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn cold_start_uses_parabolic_offset() {
        let mut refiner = FrequencyRefiner::default();
        let mags = [0.0, 1.0, 4.0, 2.0, 0.0];
        let bins = [c(0.0, 0.0); 5];
        let r = refiner.refine(Slot::Primary, 2, &bins, &mags);
        assert!(!r.tracked);
        let d = parabolic_offset(1.0, 4.0, 2.0);
        assert!((r.offset - d).abs() < 1e-6);
        assert!((r.frequency - (2.0 + d) * BIN_WIDTH).abs() < 1e-3);
        assert_eq!(refiner.previous(Slot::Primary).map(|s| s.bin), Some(2));
    }

    #[test]
    fn tracking_uses_phase_advance() {
        let mut refiner = FrequencyRefiner::default();
        let mags = [0.0, 1.0, 4.0, 2.0, 0.0];
        let mut bins = [c(1.0, 0.0); 5];
        refiner.refine(Slot::Primary, 2, &bins, &mags);

        // Advance by 2π·0.3: a tone 0.3 bins above centre.
        let advance = 2.0 * PI * 0.3;
        bins[2] = c(libm::cosf(advance), libm::sinf(advance));
        let r = refiner.refine(Slot::Primary, 2, &bins, &mags);
        assert!(r.tracked);
        let d = parabolic_offset(1.0, 4.0, 2.0);
        assert!((r.offset - (d + 0.3)).abs() < 1e-4, "offset {}", r.offset);
        assert!((r.frequency - (2.0 + d + 0.3) * BIN_WIDTH).abs() < 1e-3);
    }

    #[test]
    fn repeated_frame_keeps_parabolic_estimate() {
        let mut refiner = FrequencyRefiner::default();
        let mags = [0.0, 1.0, 4.0, 2.0, 0.0];
        let bins = [c(0.6, -0.8); 5];
        let first = refiner.refine(Slot::Primary, 2, &bins, &mags);
        let second = refiner.refine(Slot::Primary, 2, &bins, &mags);
        assert!(!first.tracked);
        assert!(second.tracked);
        assert!((second.frequency - first.frequency).abs() < 1e-4);
        assert!((second.offset - parabolic_offset(1.0, 4.0, 2.0)).abs() < 1e-6);
    }

    #[test]
    fn supersede_mode_replaces_parabolic_offset() {
        let mut refiner = FrequencyRefiner::new(RefineConfig {
            tracking: TrackingMode::Supersede,
            ..RefineConfig::default()
        });
        let mags = [0.0, 1.0, 4.0, 2.0, 0.0];
        let mut bins = [c(1.0, 0.0); 5];
        let cold = refiner.refine(Slot::Primary, 2, &bins, &mags);
        assert!((cold.offset - parabolic_offset(1.0, 4.0, 2.0)).abs() < 1e-6);

        let advance = 2.0 * PI * 0.3;
        bins[2] = c(libm::cosf(advance), libm::sinf(advance));
        let r = refiner.refine(Slot::Primary, 2, &bins, &mags);
        assert!(r.tracked);
        assert!((r.offset - 0.3).abs() < 1e-4, "offset {}", r.offset);
    }

    #[test]
    fn bin_change_returns_to_cold_start() {
        let mut refiner = FrequencyRefiner::new(RefineConfig {
            interpolate: false,
            ..RefineConfig::default()
        });
        let mags = [1.0; 8];
        let bins = [c(1.0, 0.0); 8];
        refiner.refine(Slot::Primary, 3, &bins, &mags);
        let r = refiner.refine(Slot::Primary, 4, &bins, &mags);
        assert!(!r.tracked);
        assert_eq!(r.frequency, 4.0 * BIN_WIDTH);
    }

    #[test]
    fn slots_are_independent() {
        let mut refiner = FrequencyRefiner::default();
        let mags = [1.0; 8];
        let bins = [c(1.0, 0.0); 8];
        refiner.refine(Slot::Primary, 3, &bins, &mags);
        let r = refiner.refine(Slot::Secondary, 3, &bins, &mags);
        assert!(!r.tracked);
    }

    #[test]
    fn absent_secondary_forgets_history() {
        let mut refiner = FrequencyRefiner::default();
        let mags = [1.0; 16];
        let bins = [c(1.0, 0.0); 16];
        refiner.refine_pair(3, Some(10), &bins, &mags);
        assert!(refiner.previous(Slot::Secondary).is_some());
        let (_, second) = refiner.refine_pair(3, None, &bins, &mags);
        assert!(second.is_none());
        assert!(refiner.previous(Slot::Secondary).is_none());
        let (_, second) = refiner.refine_pair(3, Some(10), &bins, &mags);
        assert!(!second.unwrap().tracked);
    }

    #[test]
    fn disabled_stages_give_bin_centre() {
        let mut refiner = FrequencyRefiner::new(RefineConfig {
            interpolate: false,
            track_phase: false,
            tracking: TrackingMode::Additive,
        });
        let mags = [0.0, 1.0, 4.0, 2.0, 0.0];
        let bins = [c(1.0, 0.0); 5];
        refiner.refine(Slot::Primary, 2, &bins, &mags);
        let r = refiner.refine(Slot::Primary, 2, &bins, &mags);
        assert_eq!(r.offset, 0.0);
        assert!(!r.tracked);
    }
}
