//! Lookup-table waveform synthesis (DDS).
//!
//! One output period is held as [`LUT_LENGTH`] DAC codes. A timer paces the
//! DAC through the table; the timer's divider and reload come from
//! [`TimingConfig::for_frequency`], which picks a divider tier so the reload
//! stays in a range with good frequency resolution.

use core::f32::consts::PI;
use core::str::FromStr;

use crate::error::Error;

/// Entries in one waveform period.
pub const LUT_LENGTH: usize = 256;

/// Largest DAC code (12-bit converter).
pub const DAC_MAX_CODE: u16 = 4095;

/// DAC output voltage at [`DAC_MAX_CODE`].
pub const DAC_FULL_SCALE: f32 = 3.3;

/// Timer input clock in Hz.
pub const TIMER_CLOCK_HZ: u32 = 168_000_000;

/// Smallest reload with acceptable frequency resolution.
pub const SAFE_RELOAD_MIN: u32 = 100;

/// Largest reload the 16-bit counter holds.
pub const SAFE_RELOAD_MAX: u32 = 65_535;

/// Output waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum WaveKind {
    /// Sine spanning `0..amplitude`.
    #[default]
    Sine,
    /// 50% square.
    Square,
    /// Triangle rising for `duty` of the period.
    Triangle,
    /// Pulse high for `duty` of the period.
    Rectangular,
}

impl WaveKind {
    /// All kinds, in declaration order.
    pub const ALL: [WaveKind; 4] = [
        WaveKind::Sine,
        WaveKind::Square,
        WaveKind::Triangle,
        WaveKind::Rectangular,
    ];

    /// Lower-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            WaveKind::Sine => "sine",
            WaveKind::Square => "square",
            WaveKind::Triangle => "triangle",
            WaveKind::Rectangular => "rectangular",
        }
    }
}

impl FromStr for WaveKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WaveKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or(Error::UnknownName("waveform"))
    }
}

impl core::fmt::Display for WaveKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Requested output waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaveConfig {
    /// Shape.
    pub kind: WaveKind,
    /// Output frequency in Hz.
    pub frequency: f32,
    /// Peak-to-peak span in volts.
    pub amplitude: f32,
    /// High (rectangular) or rising (triangle) fraction of the period.
    pub duty: f32,
    /// DC offset in volts added to every entry.
    pub offset: f32,
    /// Start phase in radians; rotates the table.
    pub phase: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            kind: WaveKind::Sine,
            frequency: 1000.0,
            amplitude: 1.0,
            duty: 0.5,
            offset: 0.0,
            phase: 0.0,
        }
    }
}

impl WaveConfig {
    /// Check the settings the table builder and timer depend on.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(Error::InvalidFrequency(self.frequency));
        }
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(Error::InvalidAmplitude(self.amplitude));
        }
        if !(0.0..=1.0).contains(&self.duty) {
            return Err(Error::InvalidDuty(self.duty));
        }
        if !self.offset.is_finite() {
            return Err(Error::InvalidConfig("offset must be finite"));
        }
        if !self.phase.is_finite() {
            return Err(Error::InvalidConfig("phase must be finite"));
        }
        Ok(())
    }
}

fn volts_to_code(volts: f32) -> f32 {
    volts / DAC_FULL_SCALE * DAC_MAX_CODE as f32
}

/// DAC codes for one period.
#[derive(Clone, PartialEq, Eq)]
pub struct WaveTable {
    codes: [u16; LUT_LENGTH],
}

impl WaveTable {
    /// Build the table for `config`. Duty is clamped to `[0, 1]`; codes are
    /// clamped to the DAC range.
    pub fn build(config: &WaveConfig) -> Self {
        let len = LUT_LENGTH as f32;
        let peak = volts_to_code(config.amplitude);
        let offset = volts_to_code(config.offset);
        let edge = ((len * config.duty.clamp(0.0, 1.0)) as usize).min(LUT_LENGTH);

        let mut levels = [0.0f32; LUT_LENGTH];
        match config.kind {
            WaveKind::Sine => {
                let step = 2.0 * PI / (len - 1.0);
                for (i, v) in levels.iter_mut().enumerate() {
                    *v = peak * (libm::sinf(step * i as f32) + 1.0) / 2.0;
                }
            }
            WaveKind::Square => {
                levels[..LUT_LENGTH / 2].fill(peak);
            }
            WaveKind::Rectangular => {
                levels[..edge].fill(peak);
            }
            WaveKind::Triangle => {
                let fall = (LUT_LENGTH - edge) as f32;
                for (i, v) in levels.iter_mut().enumerate() {
                    *v = if i < edge {
                        peak * i as f32 / edge as f32
                    } else {
                        peak * (1.0 - (i - edge) as f32 / fall)
                    };
                }
            }
        }

        let mut codes = [0u16; LUT_LENGTH];
        for (code, &level) in codes.iter_mut().zip(levels.iter()) {
            *code = libm::roundf(level + offset).clamp(0.0, DAC_MAX_CODE as f32) as u16;
        }

        let turns = config.phase / (2.0 * PI);
        let shift = libm::roundf((turns - libm::floorf(turns)) * len) as usize % LUT_LENGTH;
        codes.rotate_left(shift);

        Self { codes }
    }

    /// The codes.
    pub fn codes(&self) -> &[u16; LUT_LENGTH] {
        &self.codes
    }

    /// Code at a position within the period, `0.0..1.0`.
    pub fn code_at(&self, position: f32) -> u16 {
        let frac = position - libm::floorf(position);
        let index = (frac * LUT_LENGTH as f32) as usize;
        self.codes[index.min(LUT_LENGTH - 1)]
    }

    /// Output voltage for a DAC code.
    pub fn code_to_volts(code: u16) -> f32 {
        code as f32 / DAC_MAX_CODE as f32 * DAC_FULL_SCALE
    }

    /// Smallest and largest code.
    pub fn extent(&self) -> (u16, u16) {
        self.codes
            .iter()
            .fold((u16::MAX, 0), |(lo, hi), &c| (lo.min(c), hi.max(c)))
    }
}

impl core::fmt::Debug for WaveTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (lo, hi) = self.extent();
        f.debug_struct("WaveTable")
            .field("min", &lo)
            .field("max", &hi)
            .finish_non_exhaustive()
    }
}

/// Timer divider and reload for one output frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingConfig {
    /// Clock divider (prescaler + 1).
    pub divider: u32,
    /// Counter reload value.
    pub reload: u32,
}

impl TimingConfig {
    /// Pick the divider tier for `frequency` and compute the reload.
    ///
    /// | Frequency        | Divider |
    /// |------------------|---------|
    /// | `f ≤ 100 Hz`     | 42      |
    /// | `100 < f ≤ 1000` | 3       |
    /// | `f > 1000 Hz`    | 1       |
    pub fn for_frequency(frequency: f32) -> Result<Self, Error> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(Error::InvalidFrequency(frequency));
        }
        let divider = if frequency <= 100.0 {
            42
        } else if frequency <= 1000.0 {
            3
        } else {
            1
        };
        let ticks = 2.0 * f64::from(TIMER_CLOCK_HZ)
            / LUT_LENGTH as f64
            / f64::from(divider)
            / f64::from(frequency);
        let reload = libm::floor(ticks) - 1.0;
        if !(1.0..=f64::from(SAFE_RELOAD_MAX)).contains(&reload) {
            return Err(Error::ReloadOutOfRange { frequency, reload });
        }
        Ok(Self {
            divider,
            reload: reload as u32,
        })
    }

    /// Prescaler register value.
    pub fn prescaler(&self) -> u32 {
        self.divider - 1
    }

    /// Frequency the quantized reload actually produces.
    pub fn actual_frequency(&self) -> f32 {
        (2.0 * f64::from(TIMER_CLOCK_HZ)
            / LUT_LENGTH as f64
            / f64::from(self.divider)
            / f64::from(self.reload + 1)) as f32
    }

    /// Whether the reload sits in `[SAFE_RELOAD_MIN, SAFE_RELOAD_MAX]`.
    pub fn in_safe_band(&self) -> bool {
        (SAFE_RELOAD_MIN..=SAFE_RELOAD_MAX).contains(&self.reload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: WaveKind) -> WaveConfig {
        WaveConfig {
            kind,
            ..WaveConfig::default()
        }
    }

    #[test]
    fn sine_spans_configured_amplitude() {
        let table = WaveTable::build(&WaveConfig {
            amplitude: 2.0,
            ..config(WaveKind::Sine)
        });
        let (lo, hi) = table.extent();
        let span = WaveTable::code_to_volts(hi) - WaveTable::code_to_volts(lo);
        assert!((span - 2.0).abs() < 0.01, "span {span}");
        assert!(lo <= 1);
    }

    #[test]
    fn square_has_two_levels_half_each() {
        let table = WaveTable::build(&config(WaveKind::Square));
        let (lo, hi) = table.extent();
        assert_ne!(lo, hi);
        let highs = table.codes().iter().filter(|&&c| c == hi).count();
        let lows = table.codes().iter().filter(|&&c| c == lo).count();
        assert_eq!(highs, LUT_LENGTH / 2);
        assert_eq!(lows, LUT_LENGTH / 2);
    }

    #[test]
    fn rectangular_follows_duty() {
        let table = WaveTable::build(&WaveConfig {
            duty: 0.25,
            ..config(WaveKind::Rectangular)
        });
        let (_, hi) = table.extent();
        let highs = table.codes().iter().filter(|&&c| c == hi).count();
        assert_eq!(highs, LUT_LENGTH / 4);
        assert!(table.codes()[..LUT_LENGTH / 4].iter().all(|&c| c == hi));
    }

    #[test]
    fn triangle_reaches_peak_for_any_duty() {
        for duty in [0.0, 0.2, 0.5, 0.9, 1.0] {
            let table = WaveTable::build(&WaveConfig {
                duty,
                ..config(WaveKind::Triangle)
            });
            let (lo, hi) = table.extent();
            let peak = libm::roundf(volts_to_code(1.0)) as u16;
            assert!(lo <= 16, "duty {duty}: lo {lo}");
            assert!(hi + 16 >= peak, "duty {duty}: hi {hi}");
        }
    }

    #[test]
    fn offset_is_clamped_to_dac_range() {
        let table = WaveTable::build(&WaveConfig {
            amplitude: 3.0,
            offset: 1.0,
            ..config(WaveKind::Sine)
        });
        let (lo, hi) = table.extent();
        assert_eq!(hi, DAC_MAX_CODE);
        assert!(lo >= volts_to_code(1.0) as u16 - 1);
    }

    #[test]
    fn phase_rotates_table() {
        let base = WaveTable::build(&config(WaveKind::Square));
        let quarter = WaveTable::build(&WaveConfig {
            phase: PI / 2.0,
            ..config(WaveKind::Square)
        });
        assert_eq!(quarter.codes()[0], base.codes()[LUT_LENGTH / 4]);
        let full = WaveTable::build(&WaveConfig {
            phase: 2.0 * PI,
            ..config(WaveKind::Square)
        });
        assert_eq!(full, base);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad_freq = WaveConfig {
            frequency: 0.0,
            ..WaveConfig::default()
        };
        assert_eq!(bad_freq.validate(), Err(Error::InvalidFrequency(0.0)));
        let bad_duty = WaveConfig {
            duty: 1.5,
            ..WaveConfig::default()
        };
        assert_eq!(bad_duty.validate(), Err(Error::InvalidDuty(1.5)));
        let bad_amp = WaveConfig {
            amplitude: -1.0,
            ..WaveConfig::default()
        };
        assert_eq!(bad_amp.validate(), Err(Error::InvalidAmplitude(-1.0)));
        assert!(WaveConfig::default().validate().is_ok());
    }

    #[test]
    fn tier_boundaries() {
        let t = TimingConfig::for_frequency(100.0).unwrap();
        assert_eq!(t.divider, 42);
        assert_eq!(t.prescaler(), 41);
        assert_eq!(t.reload, 311);
        assert!(t.in_safe_band());

        let t = TimingConfig::for_frequency(100.5).unwrap();
        assert_eq!(t.divider, 3);
        assert!(t.in_safe_band());

        let t = TimingConfig::for_frequency(1000.0).unwrap();
        assert_eq!(t.divider, 3);
        assert_eq!(t.reload, 436);
        assert!(t.in_safe_band());

        let t = TimingConfig::for_frequency(1000.5).unwrap();
        assert_eq!(t.divider, 1);
        assert!(t.in_safe_band());
    }

    #[test]
    fn actual_frequency_is_close() {
        for f in [5.0, 100.0, 440.0, 1000.0, 2500.0, 10_000.0] {
            let t = TimingConfig::for_frequency(f).unwrap();
            let actual = t.actual_frequency();
            assert!((actual - f).abs() / f < 0.01, "{f}: {actual}");
        }
    }

    #[test]
    fn unreachable_frequencies_error() {
        assert!(matches!(
            TimingConfig::for_frequency(0.1),
            Err(Error::ReloadOutOfRange { .. })
        ));
        assert!(matches!(
            TimingConfig::for_frequency(2_000_000.0),
            Err(Error::ReloadOutOfRange { .. })
        ));
        assert!(matches!(
            TimingConfig::for_frequency(f32::NAN),
            Err(Error::InvalidFrequency(_))
        ));
    }

    #[test]
    fn parse_wave_kind() {
        assert_eq!("Triangle".parse::<WaveKind>(), Ok(WaveKind::Triangle));
        assert!("saw".parse::<WaveKind>().is_err());
    }
}
