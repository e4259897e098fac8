// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cpsi_core::CpsiError;
use cpsi_parametric::ParametricPath;

/// Set of `z` whose traced changepoint list equals the observed one.
///
/// Stored as sorted, pairwise-disjoint intervals; intervals that touch are
/// merged so a contiguous region is a single entry.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionRegion {
    intervals: Vec<(f64, f64)>,
}

impl SelectionRegion {
    pub fn from_path(path: &ParametricPath, observed: &[usize]) -> Result<Self, CpsiError> {
        let matching: Vec<(f64, f64)> = path
            .intervals
            .iter()
            .filter(|interval| interval.changepoints == observed)
            .map(|interval| (interval.z_lo, interval.z_hi))
            .collect();
        if matching.is_empty() {
            return Err(CpsiError::empty_selection_region(format!(
                "no traced interval carries the observed changepoint list {observed:?} ({} intervals traced)",
                path.intervals.len()
            )));
        }
        Self::from_intervals(matching)
    }

    pub fn from_intervals(mut intervals: Vec<(f64, f64)>) -> Result<Self, CpsiError> {
        if let Some(&(lo, hi)) = intervals
            .iter()
            .find(|(lo, hi)| lo.is_nan() || hi.is_nan() || hi <= lo)
        {
            return Err(CpsiError::invalid_input(format!(
                "selection region intervals must satisfy lo < hi; got [{lo}, {hi}]"
            )));
        }
        if intervals.is_empty() {
            return Err(CpsiError::empty_selection_region(
                "selection region needs at least one interval",
            ));
        }

        intervals.sort_by(|left, right| left.0.total_cmp(&right.0));
        let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
        for (lo, hi) in intervals {
            match merged.last_mut() {
                Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        Ok(Self { intervals: merged })
    }

    pub fn intervals(&self) -> &[(f64, f64)] {
        &self.intervals
    }

    /// Closed-interval membership.
    pub fn contains(&self, z: f64) -> bool {
        self.intervals.iter().any(|&(lo, hi)| lo <= z && z <= hi)
    }

    pub fn is_connected(&self) -> bool {
        self.intervals.len() == 1
    }

    pub fn min(&self) -> f64 {
        self.intervals[0].0
    }

    pub fn max(&self) -> f64 {
        self.intervals[self.intervals.len() - 1].1
    }

    pub fn total_length(&self) -> f64 {
        self.intervals.iter().map(|(lo, hi)| hi - lo).sum()
    }
}
