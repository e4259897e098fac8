// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::linalg::{DenseMatrix, dot};
use cpsi_core::CpsiError;

const SYMMETRY_TOLERANCE: f64 = 1.0e-9;

/// Static convex QP: `min ½xᵀPx + qᵀx  s.t.  Gx ≤ h, Ax = b`.
///
/// Absent constraint blocks are represented by `0 × n` matrices.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct QpProblem {
    p: DenseMatrix,
    q: Vec<f64>,
    g: DenseMatrix,
    h: Vec<f64>,
    a: DenseMatrix,
    b: Vec<f64>,
}

impl QpProblem {
    pub fn new(
        p: DenseMatrix,
        q: Vec<f64>,
        g: DenseMatrix,
        h: Vec<f64>,
        a: DenseMatrix,
        b: Vec<f64>,
    ) -> Result<Self, CpsiError> {
        let problem = Self { p, q, g, h, a, b };
        problem.validate()?;
        Ok(problem)
    }

    fn validate(&self) -> Result<(), CpsiError> {
        let n = self.q.len();
        if n == 0 {
            return Err(CpsiError::invalid_input("QP must have at least one variable"));
        }
        if self.p.rows() != n || self.p.cols() != n {
            return Err(CpsiError::invalid_input(format!(
                "P must be {n}x{n} to match q; got {}x{}",
                self.p.rows(),
                self.p.cols()
            )));
        }
        if self.g.cols() != n {
            return Err(CpsiError::invalid_input(format!(
                "G must have {n} columns; got {}",
                self.g.cols()
            )));
        }
        if self.g.rows() != self.h.len() {
            return Err(CpsiError::invalid_input(format!(
                "G has {} rows but h has {} entries",
                self.g.rows(),
                self.h.len()
            )));
        }
        if self.a.cols() != n {
            return Err(CpsiError::invalid_input(format!(
                "A must have {n} columns; got {}",
                self.a.cols()
            )));
        }
        if self.a.rows() != self.b.len() {
            return Err(CpsiError::invalid_input(format!(
                "A has {} rows but b has {} entries",
                self.a.rows(),
                self.b.len()
            )));
        }

        let blocks: [(&str, bool); 6] = [
            ("P", self.p.is_finite()),
            ("q", self.q.iter().all(|value| value.is_finite())),
            ("G", self.g.is_finite()),
            ("h", self.h.iter().all(|value| value.is_finite())),
            ("A", self.a.is_finite()),
            ("b", self.b.iter().all(|value| value.is_finite())),
        ];
        if let Some((name, _)) = blocks.iter().find(|(_, finite)| !finite) {
            return Err(CpsiError::invalid_input(format!(
                "QP block {name} contains non-finite values"
            )));
        }

        if !self.p.is_symmetric(SYMMETRY_TOLERANCE) {
            return Err(CpsiError::invalid_input("P must be symmetric"));
        }
        Ok(())
    }

    /// Same instance with a different linear cost term.
    pub fn with_linear_term(&self, q: Vec<f64>) -> Result<Self, CpsiError> {
        if q.len() != self.q.len() {
            return Err(CpsiError::invalid_input(format!(
                "linear term length mismatch: expected {}, got {}",
                self.q.len(),
                q.len()
            )));
        }
        if let Some(idx) = q.iter().position(|value| !value.is_finite()) {
            return Err(CpsiError::invalid_input(format!(
                "linear term entry {idx} is not finite: {}",
                q[idx]
            )));
        }
        Ok(Self {
            q,
            ..self.clone()
        })
    }

    pub fn dim(&self) -> usize {
        self.q.len()
    }

    pub fn inequality_count(&self) -> usize {
        self.h.len()
    }

    pub fn equality_count(&self) -> usize {
        self.b.len()
    }

    pub fn p(&self) -> &DenseMatrix {
        &self.p
    }

    pub fn q(&self) -> &[f64] {
        &self.q
    }

    pub fn g(&self) -> &DenseMatrix {
        &self.g
    }

    pub fn h(&self) -> &[f64] {
        &self.h
    }

    pub fn a(&self) -> &DenseMatrix {
        &self.a
    }

    pub fn b(&self) -> &[f64] {
        &self.b
    }

    pub fn objective(&self, x: &[f64]) -> f64 {
        let px = self.p.mul_vec(x);
        0.5 * dot(x, &px) + dot(&self.q, x)
    }

    /// `Px + q`.
    pub fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut gradient = self.p.mul_vec(x);
        for (value, linear) in gradient.iter_mut().zip(&self.q) {
            *value += linear;
        }
        gradient
    }

    /// `h_i − G_i x`; non-negative when constraint `i` holds.
    pub fn inequality_slack(&self, i: usize, x: &[f64]) -> f64 {
        self.h[i] - dot(self.g.row(i), x)
    }

    /// Largest violation of `Gx ≤ h` and `Ax = b` at `x`.
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let inequality = (0..self.inequality_count())
            .map(|i| (-self.inequality_slack(i, x)).max(0.0))
            .fold(0.0, f64::max);
        let equality = (0..self.equality_count())
            .map(|i| (dot(self.a.row(i), x) - self.b[i]).abs())
            .fold(0.0, f64::max);
        inequality.max(equality)
    }
}
