//! Output reconfiguration against an abstract DAC/timer device.

use crate::dds::{TimingConfig, WaveConfig, WaveTable};
use crate::error::Error;

/// DAC + timer pair that plays a [`WaveTable`] cyclically.
pub trait OutputDevice {
    /// Device failure.
    type Error;

    /// Halt playback. The table may be rewritten afterwards.
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// Start cycling through `table` at the pace set by `timing`.
    fn start(&mut self, table: &WaveTable, timing: &TimingConfig) -> Result<(), Self::Error>;
}

/// Failure to reconfigure the output.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthError<E> {
    /// The requested waveform was rejected; the device was not touched.
    Config(Error),
    /// The device failed.
    Device(E),
}

impl<E: core::fmt::Display> core::fmt::Display for SynthError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "waveform rejected: {e}"),
            Self::Device(e) => write!(f, "output device error: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: std::error::Error + 'static> std::error::Error for SynthError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Device(e) => Some(e),
        }
    }
}

/// Owns the output device and the table it plays.
///
/// [`configure`](Self::configure) is a single transaction: the request is
/// validated and timed first, then playback stops, the table is rebuilt, and
/// playback restarts. The device never plays a partly written table.
pub struct Synthesizer<D: OutputDevice> {
    device: D,
    config: Option<WaveConfig>,
    table: Option<WaveTable>,
    timing: Option<TimingConfig>,
}

impl<D: OutputDevice> Synthesizer<D> {
    /// Wrap an idle device.
    pub fn new(device: D) -> Self {
        Self {
            device,
            config: None,
            table: None,
            timing: None,
        }
    }

    /// Switch the output to `config`.
    pub fn configure(&mut self, config: WaveConfig) -> Result<(), SynthError<D::Error>> {
        config.validate().map_err(SynthError::Config)?;
        let timing = TimingConfig::for_frequency(config.frequency).map_err(SynthError::Config)?;

        self.device.stop().map_err(SynthError::Device)?;
        let table = self.table.insert(WaveTable::build(&config));
        self.config = Some(config);
        self.timing = Some(timing);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            kind = %config.kind,
            frequency = config.frequency,
            amplitude = config.amplitude,
            divider = timing.divider,
            reload = timing.reload,
            "output reconfigured"
        );

        self.device.start(table, &timing).map_err(SynthError::Device)
    }

    /// Stop the output.
    pub fn stop(&mut self) -> Result<(), D::Error> {
        self.device.stop()
    }

    /// Last accepted waveform.
    pub fn config(&self) -> Option<&WaveConfig> {
        self.config.as_ref()
    }

    /// Table currently loaded.
    pub fn table(&self) -> Option<&WaveTable> {
        self.table.as_ref()
    }

    /// Timing currently loaded.
    pub fn timing(&self) -> Option<&TimingConfig> {
        self.timing.as_ref()
    }

    /// The device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The device, mutably.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Give the device back.
    pub fn into_device(self) -> D {
        self.device
    }
}

impl<D: OutputDevice + core::fmt::Debug> core::fmt::Debug for Synthesizer<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("device", &self.device)
            .field("config", &self.config)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}
