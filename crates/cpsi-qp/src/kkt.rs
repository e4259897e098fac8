// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::linalg::{DenseMatrix, LuFactor, dot};
use cpsi_core::CpsiError;

const INDEPENDENCE_TOLERANCE: f64 = 1.0e-10;

/// Factored KKT matrix `[[P, Cᵀ], [C, 0]]` of an equality-constrained QP.
///
/// A solve with right-hand side `(r, s)` returns `(x, w)` with `Px + Cᵀw = r`
/// and `Cx = s`. For inequality rows written as `G_i x ≤ h_i`, optimality
/// requires `w_i ≥ 0`.
#[derive(Clone, Debug)]
pub struct KktSystem {
    n: usize,
    constraints: usize,
    factor: LuFactor,
}

/// Primal part and constraint multipliers of one KKT solve.
#[derive(Clone, Debug, PartialEq)]
pub struct KktSolution {
    pub primal: Vec<f64>,
    pub multipliers: Vec<f64>,
}

impl KktSystem {
    pub fn factor(p: &DenseMatrix, constraint_rows: &[&[f64]]) -> Result<Self, CpsiError> {
        let n = p.rows();
        let m = constraint_rows.len();
        let size = n + m;
        let mut matrix = DenseMatrix::zeros(size, size);

        for i in 0..n {
            matrix.row_mut(i)[..n].copy_from_slice(p.row(i));
        }
        for (r, row) in constraint_rows.iter().enumerate() {
            if row.len() != n {
                return Err(CpsiError::invalid_input(format!(
                    "constraint row {r} has length {}, expected {n}",
                    row.len()
                )));
            }
            matrix.row_mut(n + r)[..n].copy_from_slice(row);
            for (j, &value) in row.iter().enumerate() {
                matrix.set(j, n + r, value);
            }
        }

        let factor = LuFactor::factor(matrix).map_err(|err| {
            CpsiError::solver(format!(
                "singular KKT system with {n} variables and {m} working constraints: {err}"
            ))
        })?;
        Ok(Self {
            n,
            constraints: m,
            factor,
        })
    }

    pub fn variables(&self) -> usize {
        self.n
    }

    pub fn constraints(&self) -> usize {
        self.constraints
    }

    pub fn solve(&self, rhs_primal: &[f64], rhs_constraints: &[f64]) -> KktSolution {
        debug_assert_eq!(rhs_primal.len(), self.n);
        debug_assert_eq!(rhs_constraints.len(), self.constraints);
        let mut rhs = Vec::with_capacity(self.n + self.constraints);
        rhs.extend_from_slice(rhs_primal);
        rhs.extend_from_slice(rhs_constraints);

        let mut solution = self.factor.solve(&rhs);
        let multipliers = solution.split_off(self.n);
        KktSolution {
            primal: solution,
            multipliers,
        }
    }
}

/// Incremental linear-independence filter for constraint rows.
///
/// Keeps an orthonormal basis of the accepted rows (modified Gram–Schmidt) and
/// accepts a candidate only when its residual against that basis is not
/// negligible relative to its own norm.
#[derive(Clone, Debug, Default)]
pub struct RowBasis {
    basis: Vec<Vec<f64>>,
}

impl RowBasis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.basis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.basis.is_empty()
    }

    /// Returns `true` and extends the basis when `row` is independent of it.
    pub fn try_insert(&mut self, row: &[f64]) -> bool {
        let norm = dot(row, row).sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return false;
        }

        let mut residual = row.to_vec();
        for direction in &self.basis {
            let projection = dot(&residual, direction);
            for (value, unit) in residual.iter_mut().zip(direction) {
                *value -= projection * unit;
            }
        }
        let residual_norm = dot(&residual, &residual).sqrt();
        if residual_norm <= INDEPENDENCE_TOLERANCE * norm {
            return false;
        }

        for value in &mut residual {
            *value /= residual_norm;
        }
        self.basis.push(residual);
        true
    }
}
