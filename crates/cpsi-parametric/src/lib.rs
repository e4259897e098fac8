// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod affine;
pub mod config;
pub mod path;
pub mod tracer;

pub use affine::{AffineKktSolution, BreakpointBounds};
pub use config::TraceConfig;
pub use path::{ParametricPath, ParametricQp, PathInterval};
pub use tracer::ParametricPathTracer;
