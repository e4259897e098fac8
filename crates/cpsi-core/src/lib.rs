// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod changepoints;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod execution_context;
pub mod observability;
pub mod tolerances;

pub use changepoints::{find_changepoints, segments_from_changepoints, validate_changepoints};
pub use control::CancelToken;
pub use diagnostics::{TRACE_DIAGNOSTICS_SCHEMA_VERSION, TraceDiagnostics};
pub use error::CpsiError;
pub use execution_context::ExecutionContext;
pub use observability::{ProgressSink, TelemetrySink};
pub use tolerances::Tolerances;
