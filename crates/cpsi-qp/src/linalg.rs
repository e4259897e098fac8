// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cpsi_core::CpsiError;

const SINGULAR_PIVOT_RELATIVE: f64 = 1.0e-12;

/// Row-major dense matrix.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zeros(n, n);
        for i in 0..n {
            matrix.data[i * n + i] = 1.0;
        }
        matrix
    }

    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, CpsiError> {
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            CpsiError::invalid_input(format!("matrix shape overflow: {rows}x{cols}"))
        })?;
        if data.len() != expected {
            return Err(CpsiError::invalid_input(format!(
                "row-major data length mismatch: expected {rows}x{cols}={expected}, got {}",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix from equally sized rows; `cols` fixes the width when `rows` is empty.
    pub fn from_rows(rows: &[Vec<f64>], cols: usize) -> Result<Self, CpsiError> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(CpsiError::invalid_input(format!(
                    "row {idx} has length {}, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        let cols = self.cols;
        &mut self.data[i * cols..(i + 1) * cols]
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|value| value.is_finite())
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |acc, value| acc.max(value.abs()))
    }

    /// `self · x`; `x` must have `cols` entries.
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.cols);
        (0..self.rows).map(|i| dot(self.row(i), x)).collect()
    }

    /// `selfᵀ · y`; `y` must have `rows` entries.
    pub fn transpose_mul_vec(&self, y: &[f64]) -> Vec<f64> {
        debug_assert_eq!(y.len(), self.rows);
        let mut out = vec![0.0; self.cols];
        for (i, &weight) in y.iter().enumerate() {
            if weight == 0.0 {
                continue;
            }
            for (acc, value) in out.iter_mut().zip(self.row(i)) {
                *acc += weight * value;
            }
        }
        out
    }

    /// `selfᵀ · self`.
    pub fn gram(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.cols);
        for k in 0..self.rows {
            let row = self.row(k);
            for (i, &left) in row.iter().enumerate() {
                if left == 0.0 {
                    continue;
                }
                for (j, &right) in row.iter().enumerate() {
                    out.data[i * self.cols + j] += left * right;
                }
            }
        }
        out
    }

    pub fn is_symmetric(&self, relative_tolerance: f64) -> bool {
        if self.rows != self.cols {
            return false;
        }
        let scale = self.max_abs().max(1.0);
        for i in 0..self.rows {
            for j in (i + 1)..self.cols {
                if (self.get(i, j) - self.get(j, i)).abs() > relative_tolerance * scale {
                    return false;
                }
            }
        }
        true
    }
}

pub fn dot(left: &[f64], right: &[f64]) -> f64 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

pub fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, value| acc.max(value.abs()))
}

/// LU factorization with partial pivoting of a square matrix.
#[derive(Clone, Debug)]
pub struct LuFactor {
    n: usize,
    lu: Vec<f64>,
    pivots: Vec<usize>,
}

impl LuFactor {
    /// Factors `matrix` in place; fails when a pivot is negligible relative to the largest entry.
    pub fn factor(matrix: DenseMatrix) -> Result<Self, CpsiError> {
        if matrix.rows != matrix.cols {
            return Err(CpsiError::invalid_input(format!(
                "LU factorization requires a square matrix; got {}x{}",
                matrix.rows, matrix.cols
            )));
        }
        let n = matrix.rows;
        let threshold = SINGULAR_PIVOT_RELATIVE * matrix.max_abs().max(1.0);
        let mut lu = matrix.data;
        let mut pivots: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let mut pivot_row = k;
            let mut pivot_abs = lu[k * n + k].abs();
            for i in (k + 1)..n {
                let candidate = lu[i * n + k].abs();
                if candidate > pivot_abs {
                    pivot_abs = candidate;
                    pivot_row = i;
                }
            }
            if !pivot_abs.is_finite() || pivot_abs <= threshold {
                return Err(CpsiError::numerical_issue(format!(
                    "matrix is singular to working precision at column {k} of {n} (pivot={pivot_abs:e})"
                )));
            }

            if pivot_row != k {
                for j in 0..n {
                    lu.swap(k * n + j, pivot_row * n + j);
                }
                pivots.swap(k, pivot_row);
            }

            let diag = lu[k * n + k];
            for i in (k + 1)..n {
                let factor = lu[i * n + k] / diag;
                lu[i * n + k] = factor;
                if factor == 0.0 {
                    continue;
                }
                for j in (k + 1)..n {
                    lu[i * n + j] -= factor * lu[k * n + j];
                }
            }
        }

        Ok(Self { n, lu, pivots })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.n;
        debug_assert_eq!(rhs.len(), n);
        let mut out: Vec<f64> = self.pivots.iter().map(|&row| rhs[row]).collect();

        for i in 0..n {
            let mut sum = out[i];
            for j in 0..i {
                sum -= self.lu[i * n + j] * out[j];
            }
            out[i] = sum;
        }
        for i in (0..n).rev() {
            let mut sum = out[i];
            for j in (i + 1)..n {
                sum -= self.lu[i * n + j] * out[j];
            }
            out[i] = sum / self.lu[i * n + i];
        }
        out
    }
}
