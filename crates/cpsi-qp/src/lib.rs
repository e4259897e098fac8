// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Dense QP building blocks: instances, KKT factorization, the active-set
//! oracle, and fused-lasso assembly.

pub mod active_set;
pub mod fused_lasso;
pub mod kkt;
pub mod linalg;
pub mod oracle;
pub mod problem;

pub use active_set::{ActiveSetConfig, ActiveSetSolver};
pub use fused_lasso::{FusedLassoLayout, FusedLassoProblem, first_difference_operator};
pub use kkt::{KktSolution, KktSystem, RowBasis};
pub use linalg::{DenseMatrix, LuFactor, dot, max_abs};
pub use oracle::{QpOracle, QpSolution};
pub use problem::QpProblem;
