//! One iteration of the instrument's main loop.

use crate::dds::{WaveConfig, WaveKind};
use crate::frame::{DoubleBuffer, ReadyFlag};
use crate::pipeline::{Analyzer, AnalyzerConfig, ToneReport};
use crate::readout::{Panel, Readout, ReadoutConfig};
use crate::synth::{OutputDevice, SynthError, Synthesizer};

/// Hardware failure during a poll.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentError<DE, PE> {
    /// The output device failed.
    Output(DE),
    /// The panel failed.
    Panel(PE),
}

impl<DE: core::fmt::Display, PE: core::fmt::Display> core::fmt::Display
    for InstrumentError<DE, PE>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Output(e) => write!(f, "output device error: {e}"),
            Self::Panel(e) => write!(f, "panel error: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl<DE, PE> std::error::Error for InstrumentError<DE, PE>
where
    DE: std::error::Error + 'static,
    PE: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Output(e) => Some(e),
            Self::Panel(e) => Some(e),
        }
    }
}

/// Analyzer, synthesizer, and readout wired together.
///
/// Each [`poll`](Self::poll) that finds the ready flag set analyzes both
/// halves of the acquisition buffer, retunes the output to reproduce the
/// primary tone, and refreshes the panel.
pub struct Instrument<D: OutputDevice, P: Panel> {
    analyzer: Analyzer,
    synth: Synthesizer<D>,
    readout: Readout,
    panel: P,
}

impl<D: OutputDevice, P: Panel> Instrument<D, P> {
    /// Wire up the collaborators. Call [`draw_static`](Self::draw_static)
    /// once before polling.
    pub fn new(config: AnalyzerConfig, readout: ReadoutConfig, device: D, panel: P) -> Self {
        Self {
            analyzer: Analyzer::new(config),
            synth: Synthesizer::new(device),
            readout: Readout::new(readout),
            panel,
        }
    }

    /// Draw the fixed screen labels.
    pub fn draw_static(&mut self) -> Result<(), P::Error> {
        self.readout.draw_static(&mut self.panel)
    }

    /// Run one main-loop iteration. Returns `None` if no buffer was ready.
    pub fn poll(
        &mut self,
        buffer: &DoubleBuffer,
        ready: &ReadyFlag,
    ) -> Result<Option<[ToneReport; 2]>, InstrumentError<D::Error, P::Error>> {
        if !ready.is_set() {
            return Ok(None);
        }

        let reports = buffer.halves().map(|frame| {
            let report = self.analyzer.process(frame);
            #[cfg(feature = "tracing")]
            tracing::debug!(%report, "frame analyzed");
            report
        });
        ready.clear();

        let latest = &reports[1];
        if let Some(tone) = latest.primary {
            let request = WaveConfig {
                kind: WaveKind::Sine,
                frequency: tone.frequency,
                amplitude: tone.amplitude * 2.0,
                duty: 0.5,
                offset: 0.0,
                phase: tone.sine_phase(),
            };
            match self.synth.configure(request) {
                Ok(()) => {}
                Err(SynthError::Config(_err)) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_err, "output not retuned");
                }
                Err(SynthError::Device(e)) => return Err(InstrumentError::Output(e)),
            }
        }

        self.readout
            .update(&mut self.panel, latest)
            .map_err(InstrumentError::Panel)?;

        Ok(Some(reports))
    }

    /// The analyzer.
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// The analyzer, mutably (to change settings between polls).
    pub fn analyzer_mut(&mut self) -> &mut Analyzer {
        &mut self.analyzer
    }

    /// The synthesizer.
    pub fn synthesizer(&self) -> &Synthesizer<D> {
        &self.synth
    }

    /// The panel.
    pub fn panel(&self) -> &P {
        &self.panel
    }

    /// Give back the device and panel.
    pub fn into_parts(self) -> (D, P) {
        (self.synth.into_device(), self.panel)
    }
}
