// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::borrow::Cow;

/// Diagnostics schema version for trace metadata.
pub const TRACE_DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured diagnostics captured from one parametric trace.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct TraceDiagnostics {
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub oracle: Cow<'static, str>,
    pub variables: usize,
    pub inequality_constraints: usize,
    pub equality_constraints: usize,
    pub z_threshold: f64,
    pub oracle_solves: usize,
    pub raw_intervals: usize,
    pub emitted_intervals: usize,
    pub merged_breakpoints: usize,
    pub gap_refinements: usize,
    pub runtime_ms: Option<u64>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for TraceDiagnostics {
    fn default() -> Self {
        Self {
            schema_version: TRACE_DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            oracle: Cow::Borrowed(""),
            variables: 0,
            inequality_constraints: 0,
            equality_constraints: 0,
            z_threshold: 0.0,
            oracle_solves: 0,
            raw_intervals: 0,
            emitted_intervals: 0,
            merged_breakpoints: 0,
            gap_refinements: 0,
            runtime_ms: None,
            notes: vec![],
            warnings: vec![],
        }
    }
}
