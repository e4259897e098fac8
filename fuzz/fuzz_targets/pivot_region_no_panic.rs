// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use cpsi_inference::{SelectionRegion, log_standard_normal_mass, truncated_normal_cdf};
use libfuzzer_sys::fuzz_target;

fn build_bound(cursor: &mut common::ByteCursor<'_>) -> f64 {
    match cursor.next_u8() % 8 {
        0 => f64::NEG_INFINITY,
        1 => f64::INFINITY,
        2 => f64::NAN,
        3 => cursor.next_f64(),
        _ => common::scaled(cursor.next_i16(), 60.0),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);

    let pieces = common::bounded(cursor.next_u8(), 0, 12);
    let mut intervals = Vec::with_capacity(pieces);
    for _ in 0..pieces {
        let lo = build_bound(&mut cursor);
        let hi = build_bound(&mut cursor);
        let mass = log_standard_normal_mass(lo, hi);
        assert!(mass.is_nan() || mass <= 1.0e-12, "log mass {mass} exceeds zero");
        intervals.push((lo, hi));
    }

    let x = build_bound(&mut cursor);
    let mean = common::scaled(cursor.next_i16(), 10.0);
    let sd = match cursor.next_u8() % 4 {
        0 => 0.0,
        1 => -1.0,
        _ => 0.01 + f64::from(cursor.next_u8()) / 16.0,
    };

    if let Ok(cdf) = truncated_normal_cdf(x, &intervals, mean, sd) {
        assert!((0.0..=1.0).contains(&cdf.value), "pivot {} outside [0, 1]", cdf.value);
    }

    if let Ok(region) = SelectionRegion::from_intervals(intervals) {
        let merged = region.intervals();
        for pair in merged.windows(2) {
            assert!(pair[0].1 < pair[1].0, "merged intervals overlap or touch");
        }
    }
});
