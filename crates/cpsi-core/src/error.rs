// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Error taxonomy shared by every cpsi crate.
///
/// Every variant aborts the current trial; none of them is retried internally.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CpsiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("infeasible: {0}")]
    Infeasible(String),
    #[error("solver error: {0}")]
    SolverError(String),
    #[error("stalled trace at z={z}: {message}")]
    StalledTrace { z: f64, message: String },
    #[error("trace overflow: more than {max_intervals} intervals before reaching z={z}")]
    TraceOverflow { max_intervals: usize, z: f64 },
    #[error("empty selection region: {0}")]
    EmptySelectionRegion(String),
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
    #[error("cancelled")]
    Cancelled,
}

impl CpsiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn infeasible(message: impl Into<String>) -> Self {
        Self::Infeasible(message.into())
    }

    pub fn solver(message: impl Into<String>) -> Self {
        Self::SolverError(message.into())
    }

    pub fn stalled(z: f64, message: impl Into<String>) -> Self {
        Self::StalledTrace {
            z,
            message: message.into(),
        }
    }

    pub fn trace_overflow(max_intervals: usize, z: f64) -> Self {
        Self::TraceOverflow { max_intervals, z }
    }

    pub fn empty_selection_region(message: impl Into<String>) -> Self {
        Self::EmptySelectionRegion(message.into())
    }

    pub fn numerical_issue(message: impl Into<String>) -> Self {
        Self::NumericalIssue(message.into())
    }

    pub fn cancelled() -> Self {
        Self::Cancelled
    }

    /// Oracle failures: the QP itself could not be solved.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(self, Self::Infeasible(_) | Self::SolverError(_))
    }

    /// Invariant violations that point at a defect rather than bad input.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::EmptySelectionRegion(_))
    }
}
