//! Property-based tests for tonescope-core.
//!
//! Covers the invariants that must hold for any input: table codes stay in the
//! DAC range, accepted frequencies get a reload the counter can hold, detected
//! peaks are separated by more than the guard, and phase wrapping stays in
//! range.

use proptest::prelude::*;
use tonescope_core::{
    DAC_MAX_CODE, PeakConfig, TimingConfig, WaveConfig, WaveKind, WaveTable, find_peaks,
    parabolic_offset, solve, wrap_phase,
};

fn wave_kind() -> impl Strategy<Value = WaveKind> {
    prop_oneof![
        Just(WaveKind::Sine),
        Just(WaveKind::Square),
        Just(WaveKind::Triangle),
        Just(WaveKind::Rectangular),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Any amplitude/offset combination produces codes inside the DAC range.
    #[test]
    fn table_codes_within_dac_range(
        kind in wave_kind(),
        amplitude in 0.0f32..10.0,
        offset in -5.0f32..5.0,
        duty in 0.0f32..=1.0,
        phase in -20.0f32..20.0,
    ) {
        let table = WaveTable::build(&WaveConfig {
            kind,
            frequency: 1000.0,
            amplitude,
            duty,
            offset,
            phase,
        });
        prop_assert!(table.codes().iter().all(|&c| c <= DAC_MAX_CODE));
    }

    /// Every frequency from 1 Hz to 20 kHz is reachable and its reload fits
    /// the 16-bit counter.
    #[test]
    fn reload_within_counter(frequency in 1.0f32..20_000.0) {
        let timing = TimingConfig::for_frequency(frequency).unwrap();
        prop_assert!(timing.reload >= 1);
        prop_assert!(timing.reload <= 65_535);
        let expected = if frequency <= 100.0 { 42 } else if frequency <= 1000.0 { 3 } else { 1 };
        prop_assert_eq!(timing.divider, expected);
    }

    /// Whenever the timer accepts a frequency, the reload is in range.
    #[test]
    fn accepted_reload_in_range(frequency in 0.01f32..3_000_000.0) {
        if let Ok(timing) = TimingConfig::for_frequency(frequency) {
            prop_assert!((1..=65_535).contains(&timing.reload));
        }
    }

    /// The two detected peaks are always farther apart than the guard and
    /// both exceed the floor.
    #[test]
    fn peaks_separated_by_more_than_guard(
        mags in prop::collection::vec(0.0f32..100.0, 16..512),
        guard in 0usize..10,
    ) {
        let config = PeakConfig { guard, ..PeakConfig::default() };
        if let Some(pair) = find_peaks(&mags, &config) {
            prop_assert!(pair.primary >= config.min_bin);
            prop_assert!(mags[pair.primary] > config.floor);
            if let Some(secondary) = pair.secondary {
                prop_assert!(secondary.abs_diff(pair.primary) > guard);
                prop_assert!(mags[secondary] <= mags[pair.primary]);
                prop_assert!(mags[secondary] > config.floor);
            }
        }
    }

    /// Wrapped phases land in (-π, π] and differ from the input by whole turns.
    #[test]
    fn wrap_phase_in_range(phase in -100.0f32..100.0) {
        let wrapped = wrap_phase(phase);
        prop_assert!(wrapped > -core::f32::consts::PI - 1e-5);
        prop_assert!(wrapped <= core::f32::consts::PI + 1e-5);
        let turns = (phase - wrapped) / core::f32::consts::TAU;
        prop_assert!((turns - turns.round()).abs() < 1e-3);
    }

    /// The parabolic vertex of a true peak lies within half a bin.
    #[test]
    fn parabolic_offset_bounded(
        center in 1.0f32..1000.0,
        left_frac in 0.0f32..1.0,
        right_frac in 0.0f32..1.0,
    ) {
        let d = parabolic_offset(center * left_frac, center, center * right_frac);
        prop_assert!(d.abs() <= 0.5 + 1e-4, "d = {d}");
    }

    /// Diagonally dominant systems always solve and satisfy the equations.
    #[test]
    fn solver_residual_small(
        off in prop::array::uniform12(-1.0f32..1.0),
        b in prop::array::uniform4(-10.0f32..10.0),
    ) {
        let mut a = [[0.0f32; 4]; 4];
        let mut k = 0;
        for i in 0..4 {
            for j in 0..4 {
                if i == j {
                    a[i][j] = 5.0;
                } else {
                    a[i][j] = off[k];
                    k += 1;
                }
            }
        }
        let x = solve(a, b).unwrap();
        for i in 0..4 {
            let lhs: f32 = (0..4).map(|j| a[i][j] * x[j]).sum();
            prop_assert!((lhs - b[i]).abs() < 1e-3, "row {i}: {lhs} vs {}", b[i]);
        }
    }
}
