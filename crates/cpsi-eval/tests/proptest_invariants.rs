// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cpsi_eval::{empirical_cdf, kolmogorov_p_value, ks_uniform_statistic};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        ..ProptestConfig::default()
    })]

    #[test]
    fn ks_statistic_is_bounded_by_half_step_and_one(
        samples in prop::collection::vec(0.0f64..=1.0, 1..200),
    ) {
        let d = ks_uniform_statistic(&samples).expect("samples are in range");
        let n = samples.len() as f64;
        prop_assert!(d >= 0.5 / n - 1.0e-12);
        prop_assert!(d <= 1.0);
    }

    #[test]
    fn p_value_is_monotone_in_the_statistic(
        n in 1usize..2000,
        d in 0.0f64..1.0,
        delta in 0.0f64..0.5,
    ) {
        let lower = kolmogorov_p_value(d, n);
        let higher = kolmogorov_p_value(d + delta, n);
        prop_assert!((0.0..=1.0).contains(&lower));
        prop_assert!(higher <= lower + 1.0e-12);
    }

    #[test]
    fn empirical_cdf_is_non_decreasing(
        samples in prop::collection::vec(-10.0f64..10.0, 1..100),
        mut points in prop::collection::vec(-12.0f64..12.0, 1..50),
    ) {
        points.sort_by(f64::total_cmp);
        let cdf = empirical_cdf(&samples, &points).expect("finite samples");
        for pair in cdf.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
        prop_assert!(cdf.iter().all(|value| (0.0..=1.0).contains(value)));
    }
}
