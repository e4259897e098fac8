// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpsiError;
use std::ops::Range;

/// Extracts the changepoint list of a piecewise-constant coefficient vector.
///
/// The result always starts with `0` and ends with `beta.len()`. An interior
/// entry `k` means `|beta[k] - beta[k - 1]| > tolerance`, so segment `j` is the
/// half-open range `[list[j - 1], list[j])`.
pub fn find_changepoints(beta: &[f64], tolerance: f64) -> Result<Vec<usize>, CpsiError> {
    if beta.is_empty() {
        return Err(CpsiError::invalid_input(
            "changepoint extraction requires a non-empty beta",
        ));
    }
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(CpsiError::invalid_input(format!(
            "changepoint tolerance must be finite and >= 0; got {tolerance}"
        )));
    }
    if let Some(idx) = beta.iter().position(|value| !value.is_finite()) {
        return Err(CpsiError::invalid_input(format!(
            "beta[{idx}] is not finite: {}",
            beta[idx]
        )));
    }

    let mut changepoints = Vec::with_capacity(8);
    changepoints.push(0);
    for (k, pair) in beta.windows(2).enumerate() {
        if (pair[1] - pair[0]).abs() > tolerance {
            changepoints.push(k + 1);
        }
    }
    changepoints.push(beta.len());
    Ok(changepoints)
}

/// Checks the changepoint-list invariants for a coefficient vector of length `p`.
pub fn validate_changepoints(changepoints: &[usize], p: usize) -> Result<(), CpsiError> {
    if changepoints.len() < 2 {
        return Err(CpsiError::invalid_input(format!(
            "changepoint list must hold at least the two sentinels; got len={}",
            changepoints.len()
        )));
    }
    if changepoints[0] != 0 {
        return Err(CpsiError::invalid_input(format!(
            "changepoint list must start with 0; got {}",
            changepoints[0]
        )));
    }
    let last = changepoints[changepoints.len() - 1];
    if last != p {
        return Err(CpsiError::invalid_input(format!(
            "changepoint list must end with p={p}; got {last}"
        )));
    }
    for pair in changepoints.windows(2) {
        if pair[1] <= pair[0] {
            return Err(CpsiError::invalid_input(format!(
                "changepoint list must be strictly increasing; found {} then {}",
                pair[0], pair[1]
            )));
        }
    }
    Ok(())
}

/// Half-open index ranges of the constant segments.
pub fn segments_from_changepoints(changepoints: &[usize]) -> Vec<Range<usize>> {
    changepoints
        .windows(2)
        .map(|pair| pair[0]..pair[1])
        .collect()
}
