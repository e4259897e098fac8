// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::normal::{erf, log_diff_exp, log_ndtr, log_sum_exp};
use cpsi_core::CpsiError;
use std::f64::consts::SQRT_2;

/// Log-space numerator and denominator of a truncated-normal CDF.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TruncatedNormalCdf {
    pub value: f64,
    pub log_numerator: f64,
    pub log_denominator: f64,
}

/// `ln P(lo < Z < hi)` for a standard normal `Z`.
///
/// Intervals entirely in the upper tail are differenced through the survival
/// function, intervals in the lower tail through the CDF, and intervals that
/// straddle zero through `erf`, so neither side cancels catastrophically.
pub fn log_standard_normal_mass(lo: f64, hi: f64) -> f64 {
    if lo.is_nan() || hi.is_nan() || hi <= lo {
        return f64::NEG_INFINITY;
    }
    if lo >= 0.0 {
        log_diff_exp(log_ndtr(-lo), log_ndtr(-hi))
    } else if hi <= 0.0 {
        log_diff_exp(log_ndtr(hi), log_ndtr(lo))
    } else {
        (0.5 * (erf(hi / SQRT_2) + erf(-lo / SQRT_2))).ln()
    }
}

/// `P(T ≤ x)` for `T ~ N(mean, sd²)` conditioned on `T ∈ ⋃ [lo_k, hi_k]`.
///
/// Interval-wise masses are accumulated with log-sum-exp in both the
/// numerator and the denominator; the result is clamped to `[0, 1]`.
pub fn truncated_normal_cdf(
    x: f64,
    intervals: &[(f64, f64)],
    mean: f64,
    sd: f64,
) -> Result<TruncatedNormalCdf, CpsiError> {
    if !x.is_finite() || !mean.is_finite() {
        return Err(CpsiError::invalid_input(format!(
            "truncated normal CDF requires finite x and mean; got x={x}, mean={mean}"
        )));
    }
    if !sd.is_finite() || sd <= 0.0 {
        return Err(CpsiError::invalid_input(format!(
            "truncated normal CDF requires finite sd > 0; got {sd}"
        )));
    }
    if intervals.is_empty() {
        return Err(CpsiError::empty_selection_region(
            "truncated normal CDF over an empty union of intervals",
        ));
    }

    let standardized_x = (x - mean) / sd;
    let mut denominator_terms = Vec::with_capacity(intervals.len());
    let mut numerator_terms = Vec::with_capacity(intervals.len());
    for &(lo, hi) in intervals {
        let a = (lo - mean) / sd;
        let b = (hi - mean) / sd;
        denominator_terms.push(log_standard_normal_mass(a, b));
        if a < standardized_x {
            numerator_terms.push(log_standard_normal_mass(a, b.min(standardized_x)));
        }
    }

    let log_denominator = log_sum_exp(&denominator_terms);
    let log_numerator = log_sum_exp(&numerator_terms);
    if log_denominator == f64::NEG_INFINITY || log_denominator.is_nan() || log_numerator.is_nan() {
        return Err(CpsiError::numerical_issue(format!(
            "truncation region carries no representable mass: log_numerator={log_numerator}, log_denominator={log_denominator}"
        )));
    }

    let value = (log_numerator - log_denominator).exp().clamp(0.0, 1.0);
    Ok(TruncatedNormalCdf {
        value,
        log_numerator,
        log_denominator,
    })
}
