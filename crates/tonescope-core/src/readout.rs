//! Fixed-layout measurement readout on a character panel.
//!
//! The screen carries a title and two blocks, one per tone slot:
//!
//! ```text
//! Succeed!
//! U1
//!     FREQ:  1000.02 Hz
//!     Vopp:  4.99 V
//! U2
//!     FREQ:  2500.00 Hz
//!     Vopp:  2.50 V
//! ```
//!
//! Labels are drawn once by [`Readout::draw_static`]; [`Readout::update`]
//! only redraws the numbers and unit suffixes.

use crate::pipeline::ToneReport;

/// RGB565 colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u16);

impl Color {
    /// Black.
    pub const BLACK: Color = Color(0x0000);
    /// White.
    pub const WHITE: Color = Color(0xFFFF);
}

/// Character display with a built-in font.
pub trait Panel {
    /// Display failure.
    type Error;

    /// Fill the whole screen.
    fn fill(&mut self, color: Color) -> Result<(), Self::Error>;

    /// Draw `text` with its top-left corner at `(x, y)`; `scale` multiplies
    /// the glyph size.
    fn draw_text(
        &mut self,
        x: u16,
        y: u16,
        color: Color,
        scale: u8,
        text: &str,
    ) -> Result<(), Self::Error>;

    /// Draw `value` with `int_digits` integer and `frac_digits` fractional
    /// digits.
    #[allow(clippy::too_many_arguments)]
    fn draw_decimal(
        &mut self,
        x: u16,
        y: u16,
        color: Color,
        scale: u8,
        value: f64,
        int_digits: u8,
        frac_digits: u8,
    ) -> Result<(), Self::Error>;
}

/// Readout settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReadoutConfig {
    /// Multiplier from measured peak amplitude to displayed volts (front-end
    /// attenuation).
    pub amplitude_scale: f32,
}

impl Default for ReadoutConfig {
    fn default() -> Self {
        Self {
            amplitude_scale: 10.0,
        }
    }
}

const TITLE: &str = "Succeed!";
const LABEL_SCALE: u8 = 3;
const ROW_SCALE: u8 = 2;
const ROW_X: u16 = 30;
const VALUE_X: u16 = 100;
const HZ_X: u16 = 145;
const VOLT_X: u16 = 155;
const DIGIT_ADVANCE: u16 = 10;

struct Block {
    label: &'static str,
    label_y: u16,
    freq_y: u16,
    amp_y: u16,
}

const BLOCKS: [Block; 2] = [
    Block {
        label: "U1",
        label_y: 50,
        freq_y: 80,
        amp_y: 105,
    },
    Block {
        label: "U2",
        label_y: 150,
        freq_y: 180,
        amp_y: 205,
    },
];

/// Number of digits in the integer part of `value`; zero below 1.
pub fn integer_digits(value: f64) -> u8 {
    let mut whole = value as u64;
    let mut digits = 0;
    while whole > 0 {
        digits += 1;
        whole /= 10;
    }
    digits
}

/// Draws tone reports onto a [`Panel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Readout {
    config: ReadoutConfig,
}

impl Readout {
    /// A readout with the given settings.
    pub fn new(config: ReadoutConfig) -> Self {
        Self { config }
    }

    /// Current settings.
    pub fn config(&self) -> ReadoutConfig {
        self.config
    }

    /// Clear the screen and draw the labels.
    pub fn draw_static<P: Panel>(&self, panel: &mut P) -> Result<(), P::Error> {
        panel.fill(Color::WHITE)?;
        panel.draw_text(10, 10, Color::BLACK, LABEL_SCALE, TITLE)?;
        for block in &BLOCKS {
            panel.draw_text(15, block.label_y, Color::BLACK, LABEL_SCALE, block.label)?;
            panel.draw_text(ROW_X, block.freq_y, Color::BLACK, ROW_SCALE, "FREQ: ")?;
            panel.draw_text(ROW_X, block.amp_y, Color::BLACK, ROW_SCALE, "Vopp: ")?;
        }
        Ok(())
    }

    /// Redraw the values. An absent tone leaves its block as last drawn.
    pub fn update<P: Panel>(&self, panel: &mut P, report: &ToneReport) -> Result<(), P::Error> {
        for (block, tone) in BLOCKS.iter().zip([report.primary, report.secondary]) {
            let Some(tone) = tone else { continue };

            let frequency = f64::from(tone.frequency);
            let digits = integer_digits(frequency);
            panel.draw_decimal(VALUE_X, block.freq_y, Color::BLACK, ROW_SCALE, frequency, digits, 2)?;
            panel.draw_text(
                HZ_X + u16::from(digits) * DIGIT_ADVANCE,
                block.freq_y,
                Color::BLACK,
                ROW_SCALE,
                "Hz",
            )?;

            let volts = f64::from(tone.amplitude * self.config.amplitude_scale);
            panel.draw_decimal(VALUE_X, block.amp_y, Color::BLACK, ROW_SCALE, volts, 1, 2)?;
            panel.draw_text(VOLT_X, block.amp_y, Color::BLACK, ROW_SCALE, "V")?;
        }
        Ok(())
    }
}
