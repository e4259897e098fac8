// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Standard-normal special functions that stay accurate in the far tails.
//!
//! `erf` uses its Maclaurin-type series below [`SERIES_CUTOFF`]; above it the
//! complementary function comes from the Laplace continued fraction evaluated
//! in log space, so `log_ndtr(-40)` is still finite and accurate.

use std::f64::consts::{FRAC_2_SQRT_PI, LN_2, PI, SQRT_2};

const SERIES_CUTOFF: f64 = 2.5;
const CONTINUED_FRACTION_TERMS: u32 = 200;
const SERIES_MAX_TERMS: u32 = 500;
const SERIES_RELATIVE_EPS: f64 = 1.0e-17;
/// Above this point `log Φ(x)` is computed as `ln(1 − Q(x))`.
const UPPER_TAIL_SWITCH: f64 = 5.0;

/// Positive-term series `erf(x) = 2/√π·e^{−x²}·Σ 2ⁿx^{2n+1}/(1·3·…·(2n+1))`.
fn erf_series(x: f64) -> f64 {
    let x_sq = x * x;
    let mut term = x;
    let mut sum = x;
    for n in 1..SERIES_MAX_TERMS {
        term *= 2.0 * x_sq / f64::from(2 * n + 1);
        sum += term;
        if term.abs() <= SERIES_RELATIVE_EPS * sum.abs() {
            break;
        }
    }
    FRAC_2_SQRT_PI * (-x_sq).exp() * sum
}

/// `ln erfc(x)` for `x ≥ SERIES_CUTOFF`, backward-evaluated continued fraction.
fn log_erfc_tail(x: f64) -> f64 {
    let mut denominator = x;
    for k in (1..=CONTINUED_FRACTION_TERMS).rev() {
        denominator = x + (f64::from(k) / 2.0) / denominator;
    }
    -x * x - 0.5 * PI.ln() - denominator.ln()
}

pub fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x == 0.0 {
        return x;
    }
    let magnitude = x.abs();
    let value = if magnitude < SERIES_CUTOFF {
        erf_series(magnitude)
    } else {
        1.0 - log_erfc_tail(magnitude).exp()
    };
    value.copysign(x)
}

pub fn erfc(x: f64) -> f64 {
    if x >= SERIES_CUTOFF {
        log_erfc_tail(x).exp()
    } else {
        1.0 - erf(x)
    }
}

pub fn log_erfc(x: f64) -> f64 {
    if x >= SERIES_CUTOFF {
        log_erfc_tail(x)
    } else {
        (1.0 - erf(x)).ln()
    }
}

/// Standard normal CDF `Φ(x)`.
pub fn ndtr(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// `ln Φ(x)`, finite for every finite `x`.
pub fn log_ndtr(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x > UPPER_TAIL_SWITCH {
        return (-0.5 * erfc(x / SQRT_2)).ln_1p();
    }
    -LN_2 + log_erfc(-x / SQRT_2)
}

/// `ln(1 − eᵃ)` for `a ≤ 0`.
pub fn log1mexp(a: f64) -> f64 {
    if a > -LN_2 {
        (-a.exp_m1()).ln()
    } else {
        (-a.exp()).ln_1p()
    }
}

/// `ln(eᵃ − eᵇ)` for `a ≥ b`.
pub fn log_diff_exp(a: f64, b: f64) -> f64 {
    if b == f64::NEG_INFINITY {
        return a;
    }
    a + log1mexp(b - a)
}

pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|value| (value - max).exp()).sum();
    max + sum.ln()
}

#[cfg(test)]
mod tests {
    use super::{erf, erfc, log_diff_exp, log_erfc, log_ndtr, log_sum_exp, log1mexp, ndtr};

    fn assert_relative(actual: f64, expected: f64, tolerance: f64) {
        let scale = expected.abs().max(f64::MIN_POSITIVE);
        assert!(
            ((actual - expected) / scale).abs() <= tolerance,
            "actual={actual}, expected={expected}"
        );
    }

    #[test]
    fn erf_matches_reference_values() {
        assert_eq!(erf(0.0), 0.0);
        assert_relative(erf(0.5), 0.520_499_877_813_046_5, 1.0e-13);
        assert_relative(erf(1.0), 0.842_700_792_949_714_9, 1.0e-13);
        assert_relative(erf(-2.0), -0.995_322_265_018_952_7, 1.0e-13);
        assert_relative(erf(3.0), 0.999_977_909_503_001_4, 1.0e-13);
        assert!(erf(f64::NAN).is_nan());
        assert_eq!(erf(f64::INFINITY), 1.0);
    }

    #[test]
    fn erfc_is_accurate_on_both_sides_of_the_switch() {
        assert_relative(erfc(2.49), 4.292_878_677_339_129e-4, 1.0e-11);
        assert_relative(erfc(2.5), 4.069_520_174_449_59e-4, 1.0e-12);
        assert_relative(erfc(5.0), 1.537_459_794_428_035e-12, 1.0e-12);
        assert_relative(erfc(10.0), 2.088_487_583_762_545e-45, 1.0e-12);
        assert_relative(erfc(-1.0), 1.842_700_792_949_715, 1.0e-13);
    }

    #[test]
    fn log_erfc_survives_where_erfc_underflows() {
        assert_eq!(erfc(30.0), 0.0);
        let value = log_erfc(30.0);
        // ln erfc(x) ≈ −x² − ln(x√π) for large x.
        let asymptotic = -900.0 - (30.0 * std::f64::consts::PI.sqrt()).ln();
        assert!((value - asymptotic).abs() < 1.0e-3, "log_erfc(30)={value}");
    }

    #[test]
    fn log_ndtr_is_stable_in_both_tails() {
        assert_relative(log_ndtr(0.0), -std::f64::consts::LN_2, 1.0e-14);
        assert_relative(log_ndtr(-1.0), -1.841_021_645_009_264, 1.0e-12);
        assert_relative(log_ndtr(-10.0), -53.231_285_150_512_04, 1.0e-12);
        assert_relative(log_ndtr(-40.0), -804.608_442_013_753_6, 1.0e-12);
        assert_relative(log_ndtr(6.0), -9.865_876_455_243_757e-10, 1.0e-12);
        assert!(log_ndtr(40.0) <= 0.0);
        assert_eq!(log_ndtr(f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(log_ndtr(f64::INFINITY), 0.0);
        assert_relative(ndtr(1.96), 0.975_002_104_851_780, 1.0e-12);
    }

    #[test]
    fn log_space_helpers_agree_with_direct_evaluation() {
        assert_relative(log1mexp(-0.1), (1.0 - (-0.1f64).exp()).ln(), 1.0e-12);
        assert_relative(log1mexp(-5.0), (1.0 - (-5.0f64).exp()).ln(), 1.0e-12);
        assert_eq!(log1mexp(0.0), f64::NEG_INFINITY);
        assert_relative(log_diff_exp(2.0, 1.0), (2.0f64.exp() - 1.0f64.exp()).ln(), 1.0e-12);
        assert_eq!(log_diff_exp(-3.0, f64::NEG_INFINITY), -3.0);
        assert_relative(
            log_sum_exp(&[-1000.0, -1000.0]),
            -1000.0 + std::f64::consts::LN_2,
            1.0e-14,
        );
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }
}
