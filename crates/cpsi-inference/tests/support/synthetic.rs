// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]
#![allow(dead_code)]

use cpsi_inference::TrialData;
use cpsi_qp::DenseMatrix;
use rand::Rng;

/// Standard normal draw via Box–Muller.
pub fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Mean `level` on `[n/3, 2n/3)` and zero elsewhere.
pub fn middle_block_mean(n: usize, level: f64) -> Vec<f64> {
    (0..n)
        .map(|idx| if (n / 3..2 * n / 3).contains(&idx) { level } else { 0.0 })
        .collect()
}

/// Signal-approximation data `y = μ + ε` with `X = I` and unit-variance noise.
pub fn signal_trial<R: Rng>(rng: &mut R, true_mean: Vec<f64>) -> TrialData {
    let response = true_mean
        .iter()
        .map(|mean| mean + standard_normal(rng))
        .collect();
    TrialData {
        design: DenseMatrix::identity(true_mean.len()),
        response,
        true_mean,
    }
}
