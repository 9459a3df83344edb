//! Acquisition frames and the DMA double buffer.
//!
//! The acquisition device writes one contiguous region of `2 * FFT_SIZE`
//! codes. An interrupt raises the [`ReadyFlag`] once both halves hold fresh
//! data; the main loop then reads each half as a [`Frame`] and clears the flag.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::FFT_SIZE;

/// One frame of raw 12-bit ADC codes, borrowed for one analysis cycle.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    codes: &'a [u16; FFT_SIZE],
}

impl<'a> Frame<'a> {
    /// Wrap a full frame of codes.
    pub fn new(codes: &'a [u16; FFT_SIZE]) -> Self {
        Self { codes }
    }

    /// Wrap a slice, returning `None` unless it holds exactly `FFT_SIZE` codes.
    pub fn from_slice(codes: &'a [u16]) -> Option<Self> {
        codes.try_into().ok().map(Self::new)
    }

    /// The raw codes.
    pub fn codes(&self) -> &'a [u16; FFT_SIZE] {
        self.codes
    }
}

/// Which half of the double buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    /// Samples `0..FFT_SIZE`.
    First,
    /// Samples `FFT_SIZE..2 * FFT_SIZE`.
    Second,
}

impl Half {
    fn index(self) -> usize {
        match self {
            Half::First => 0,
            Half::Second => 1,
        }
    }
}

/// Storage for two consecutive frames.
#[derive(Clone)]
pub struct DoubleBuffer {
    storage: [[u16; FFT_SIZE]; 2],
}

impl DoubleBuffer {
    /// A zeroed buffer.
    pub const fn new() -> Self {
        Self {
            storage: [[0; FFT_SIZE]; 2],
        }
    }

    /// Read-only view of one half.
    pub fn half(&self, half: Half) -> Frame<'_> {
        Frame::new(&self.storage[half.index()])
    }

    /// Both halves in acquisition order.
    pub fn halves(&self) -> [Frame<'_>; 2] {
        [self.half(Half::First), self.half(Half::Second)]
    }

    /// Mutable access to one half.
    pub fn half_mut(&mut self, half: Half) -> &mut [u16; FFT_SIZE] {
        &mut self.storage[half.index()]
    }

    /// The whole region as the device sees it.
    pub fn as_flattened_mut(&mut self) -> &mut [u16] {
        self.storage.as_flattened_mut()
    }
}

impl Default for DoubleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Set from interrupt context when the double buffer is full.
#[derive(Debug, Default)]
pub struct ReadyFlag(AtomicBool);

impl ReadyFlag {
    /// A cleared flag.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Mark the buffer ready.
    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the buffer is ready.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Hand the buffer back to the device.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_map_to_flattened_region() {
        let mut buf = DoubleBuffer::new();
        {
            let region = buf.as_flattened_mut();
            assert_eq!(region.len(), 2 * FFT_SIZE);
            region[0] = 11;
            region[FFT_SIZE] = 22;
            region[2 * FFT_SIZE - 1] = 33;
        }
        let [first, second] = buf.halves();
        assert_eq!(first.codes()[0], 11);
        assert_eq!(second.codes()[0], 22);
        assert_eq!(second.codes()[FFT_SIZE - 1], 33);
    }

    #[test]
    fn half_mut_writes_one_half() {
        let mut buf = DoubleBuffer::default();
        buf.half_mut(Half::Second).fill(7);
        assert!(buf.half(Half::First).codes().iter().all(|&c| c == 0));
        assert!(buf.half(Half::Second).codes().iter().all(|&c| c == 7));
    }

    #[test]
    fn frame_from_slice_checks_length() {
        let codes = [0u16; FFT_SIZE + 1];
        assert!(Frame::from_slice(&codes[..FFT_SIZE]).is_some());
        assert!(Frame::from_slice(&codes).is_none());
        assert!(Frame::from_slice(&codes[..10]).is_none());
    }

    #[test]
    fn ready_flag_take() {
        let flag = ReadyFlag::new();
        assert!(!flag.take());
        flag.signal();
        assert!(flag.is_set());
        assert!(flag.take());
        assert!(!flag.is_set());
        flag.signal();
        flag.clear();
        assert!(!flag.is_set());
    }
}
