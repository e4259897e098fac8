// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Fused-lasso QP assembly.
//!
//! `min ½‖y − Xβ‖² + λ‖Dβ‖₁` is rewritten with the split `Dβ = u − v`,
//! `u, v ≥ 0`, giving a QP over `x = (β, u, v)`:
//!
//! - `P = [X 0]ᵀ[X 0]`, `q = λ·[0, 1, 1] − [Xᵀy, 0]`
//! - `G = [0 | −I]`, `h = 0`
//! - `A = [−D | I | −I]`, `b = 0`

use crate::linalg::DenseMatrix;
use crate::problem::QpProblem;
use cpsi_core::CpsiError;

/// `(p − 1) × p` first-difference operator: row `k` is `e_{k+1} − e_k`.
pub fn first_difference_operator(p: usize) -> Result<DenseMatrix, CpsiError> {
    if p < 2 {
        return Err(CpsiError::invalid_input(format!(
            "first-difference operator needs p >= 2; got p={p}"
        )));
    }
    let mut d = DenseMatrix::zeros(p - 1, p);
    for k in 0..p - 1 {
        d.set(k, k, -1.0);
        d.set(k, k + 1, 1.0);
    }
    Ok(d)
}

/// Column layout of `x = (β, u, v)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FusedLassoLayout {
    pub beta_dim: usize,
    pub penalty_rows: usize,
}

impl FusedLassoLayout {
    pub fn variables(&self) -> usize {
        self.beta_dim + 2 * self.penalty_rows
    }

    pub fn u_offset(&self) -> usize {
        self.beta_dim
    }

    pub fn v_offset(&self) -> usize {
        self.beta_dim + self.penalty_rows
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FusedLassoProblem {
    design: DenseMatrix,
    response: Vec<f64>,
    lambda: f64,
    difference: DenseMatrix,
}

impl FusedLassoProblem {
    /// Fused lasso with the first-difference penalty on the columns of `design`.
    pub fn new(design: DenseMatrix, response: Vec<f64>, lambda: f64) -> Result<Self, CpsiError> {
        let difference = first_difference_operator(design.cols())?;
        Self::with_difference(design, response, lambda, difference)
    }

    pub fn with_difference(
        design: DenseMatrix,
        response: Vec<f64>,
        lambda: f64,
        difference: DenseMatrix,
    ) -> Result<Self, CpsiError> {
        if design.rows() == 0 || design.cols() == 0 {
            return Err(CpsiError::invalid_input(format!(
                "design must be non-empty; got {}x{}",
                design.rows(),
                design.cols()
            )));
        }
        if response.len() != design.rows() {
            return Err(CpsiError::invalid_input(format!(
                "response length {} does not match design rows {}",
                response.len(),
                design.rows()
            )));
        }
        if difference.cols() != design.cols() {
            return Err(CpsiError::invalid_input(format!(
                "difference operator has {} columns; design has {}",
                difference.cols(),
                design.cols()
            )));
        }
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(CpsiError::invalid_input(format!(
                "lambda must be finite and >= 0; got {lambda}"
            )));
        }
        if !design.is_finite() || !difference.is_finite() {
            return Err(CpsiError::invalid_input(
                "design and difference operator must be finite",
            ));
        }
        if let Some(idx) = response.iter().position(|value| !value.is_finite()) {
            return Err(CpsiError::invalid_input(format!(
                "response[{idx}] is not finite"
            )));
        }
        Ok(Self {
            design,
            response,
            lambda,
            difference,
        })
    }

    pub fn design(&self) -> &DenseMatrix {
        &self.design
    }

    pub fn response(&self) -> &[f64] {
        &self.response
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn difference(&self) -> &DenseMatrix {
        &self.difference
    }

    pub fn layout(&self) -> FusedLassoLayout {
        FusedLassoLayout {
            beta_dim: self.design.cols(),
            penalty_rows: self.difference.rows(),
        }
    }

    /// Assembles `(P, q, G, h, A, b)` for the current response.
    pub fn to_qp(&self) -> Result<QpProblem, CpsiError> {
        let layout = self.layout();
        let n = layout.variables();
        let p = layout.beta_dim;
        let m = layout.penalty_rows;

        let mut hessian = DenseMatrix::zeros(n, n);
        let gram = self.design.gram();
        for i in 0..p {
            hessian.row_mut(i)[..p].copy_from_slice(gram.row(i));
        }

        let mut g = DenseMatrix::zeros(2 * m, n);
        for k in 0..2 * m {
            g.set(k, p + k, -1.0);
        }

        let mut a = DenseMatrix::zeros(m, n);
        for k in 0..m {
            let row = a.row_mut(k);
            for (slot, value) in row[..p].iter_mut().zip(self.difference.row(k)) {
                *slot = -value;
            }
            row[layout.u_offset() + k] = 1.0;
            row[layout.v_offset() + k] = -1.0;
        }

        QpProblem::new(
            hessian,
            self.linear_term(&self.response),
            g,
            vec![0.0; 2 * m],
            a,
            vec![0.0; m],
        )
    }

    /// QP cost line `(c, d)` induced by the response line `y(z) = a + b·z`.
    pub fn cost_line(
        &self,
        intercept: &[f64],
        slope: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>), CpsiError> {
        let rows = self.design.rows();
        if intercept.len() != rows || slope.len() != rows {
            return Err(CpsiError::invalid_input(format!(
                "response line must have length {rows}; got a={}, b={}",
                intercept.len(),
                slope.len()
            )));
        }
        let c = self.linear_term(intercept);
        let p = self.layout().beta_dim;
        let mut d = vec![0.0; self.layout().variables()];
        for (slot, value) in d[..p]
            .iter_mut()
            .zip(self.design.transpose_mul_vec(slope))
        {
            *slot = -value;
        }
        Ok((c, d))
    }

    /// Extracts `β` from a full QP solution.
    pub fn beta<'x>(&self, x: &'x [f64]) -> &'x [f64] {
        &x[..self.layout().beta_dim]
    }

    fn linear_term(&self, response: &[f64]) -> Vec<f64> {
        let layout = self.layout();
        let mut q = vec![self.lambda; layout.variables()];
        for (slot, value) in q[..layout.beta_dim]
            .iter_mut()
            .zip(self.design.transpose_mul_vec(response))
        {
            *slot = -value;
        }
        q
    }
}

#[cfg(test)]
mod tests {
    use super::{FusedLassoProblem, first_difference_operator};
    use crate::linalg::DenseMatrix;

    #[test]
    fn first_difference_rows_sum_to_zero() {
        let d = first_difference_operator(4).expect("p=4 is valid");
        assert_eq!((d.rows(), d.cols()), (3, 4));
        assert_eq!(d.row(1), &[0.0, -1.0, 1.0, 0.0]);
        for k in 0..3 {
            assert_eq!(d.row(k).iter().sum::<f64>(), 0.0);
        }
        assert!(first_difference_operator(1).is_err());
    }

    #[test]
    fn qp_blocks_follow_the_split_formulation() {
        let problem = FusedLassoProblem::new(DenseMatrix::identity(3), vec![1.0, 2.0, 3.0], 0.5)
            .expect("valid fused lasso");
        let qp = problem.to_qp().expect("assembly succeeds");
        let layout = problem.layout();

        assert_eq!(layout.variables(), 7);
        assert_eq!(qp.dim(), 7);
        assert_eq!(qp.inequality_count(), 4);
        assert_eq!(qp.equality_count(), 2);
        assert_eq!(qp.q(), &[-1.0, -2.0, -3.0, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(qp.a().row(0), &[1.0, -1.0, 0.0, 1.0, 0.0, -1.0, 0.0]);
        assert_eq!(qp.g().row(3), &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0]);
        assert_eq!(qp.p().get(1, 1), 1.0);
        assert_eq!(qp.p().get(4, 4), 0.0);
    }

    #[test]
    fn cost_line_matches_linear_term_along_the_response_line() {
        let design = DenseMatrix::from_row_major(3, 2, vec![1.0, 0.0, 1.0, 1.0, 0.0, 2.0])
            .expect("valid shape");
        let intercept = vec![0.5, -1.0, 2.0];
        let slope = vec![1.0, 0.0, -0.5];
        let problem =
            FusedLassoProblem::new(design.clone(), intercept.clone(), 1.5).expect("valid");
        let (c, d) = problem.cost_line(&intercept, &slope).expect("matching lengths");

        let z = 0.75;
        let shifted: Vec<f64> = intercept
            .iter()
            .zip(&slope)
            .map(|(a, b)| a + z * b)
            .collect();
        let direct = FusedLassoProblem::new(design, shifted, 1.5)
            .expect("valid")
            .to_qp()
            .expect("assembly succeeds");
        for (idx, expected) in direct.q().iter().enumerate() {
            let along_line = c[idx] + z * d[idx];
            assert!((along_line - expected).abs() < 1.0e-12, "entry {idx}");
        }
    }

    #[test]
    fn rejects_mismatched_inputs() {
        assert!(FusedLassoProblem::new(DenseMatrix::identity(3), vec![1.0, 2.0], 1.0).is_err());
        assert!(FusedLassoProblem::new(DenseMatrix::identity(3), vec![0.0; 3], -1.0).is_err());
        assert!(
            FusedLassoProblem::new(DenseMatrix::identity(3), vec![0.0, f64::NAN, 0.0], 1.0)
                .is_err()
        );
    }
}
