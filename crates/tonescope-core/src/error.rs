//! Configuration and synthesis errors.

/// Errors raised when a configuration cannot be honoured.
///
/// Numeric degeneracies inside the pipeline (flat peaks, singular fits) are
/// not errors; they are resolved locally and show up as absent tones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// Output frequency is not a positive finite number.
    InvalidFrequency(f32),
    /// Output amplitude is negative or not finite.
    InvalidAmplitude(f32),
    /// Duty cycle is outside `[0, 1]`.
    InvalidDuty(f32),
    /// The timer reload for this frequency does not fit the 16-bit counter.
    ReloadOutOfRange {
        /// Requested output frequency in Hz.
        frequency: f32,
        /// Reload value the frequency would need.
        reload: f64,
    },
    /// An analyzer setting is out of range.
    InvalidConfig(&'static str),
    /// A name did not match any known variant.
    UnknownName(&'static str),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidFrequency(hz) => write!(f, "invalid output frequency {hz} Hz"),
            Self::InvalidAmplitude(v) => write!(f, "invalid output amplitude {v} V"),
            Self::InvalidDuty(d) => write!(f, "duty cycle {d} outside [0, 1]"),
            Self::ReloadOutOfRange { frequency, reload } => write!(
                f,
                "{frequency} Hz needs timer reload {reload:.0}, outside the 16-bit counter"
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid analyzer config: {msg}"),
            Self::UnknownName(kind) => write!(f, "unknown {kind} name"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
