// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cpsi_core::CpsiError;

const KOLMOGOROV_SERIES_TERMS: u32 = 100;
const KOLMOGOROV_SERIES_EPS: f64 = 1.0e-12;
/// Below this scaled statistic the alternating series has not converged and the
/// p-value is 1 to working precision.
const KOLMOGOROV_SMALL_LAMBDA: f64 = 0.2;

/// Kolmogorov–Smirnov summary of a pivot sample against `Uniform(0, 1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformityReport {
    pub samples: usize,
    pub ks_statistic: f64,
    pub p_value: f64,
    pub mean: f64,
}

impl UniformityReport {
    /// `true` when uniformity is not rejected at level `alpha`.
    pub fn passes(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Fraction of `samples` at or below each point of `points`.
pub fn empirical_cdf(samples: &[f64], points: &[f64]) -> Result<Vec<f64>, CpsiError> {
    let sorted = sorted_finite(samples, "empirical_cdf")?;
    let n = sorted.len() as f64;
    Ok(points
        .iter()
        .map(|&point| sorted.partition_point(|&value| value <= point) as f64 / n)
        .collect())
}

/// One-sample KS distance `sup |F_n(x) − x|` for samples in `[0, 1]`.
pub fn ks_uniform_statistic(samples: &[f64]) -> Result<f64, CpsiError> {
    let sorted = sorted_finite(samples, "ks_uniform_statistic")?;
    if let Some(value) = sorted.iter().find(|value| !(0.0..=1.0).contains(*value)) {
        return Err(CpsiError::invalid_input(format!(
            "ks_uniform_statistic expects samples in [0, 1]; got {value}"
        )));
    }

    let n = sorted.len() as f64;
    let statistic = sorted
        .iter()
        .enumerate()
        .map(|(idx, &value)| {
            let above = (idx + 1) as f64 / n - value;
            let below = value - idx as f64 / n;
            above.max(below)
        })
        .fold(0.0, f64::max);
    Ok(statistic)
}

/// Asymptotic p-value of a KS statistic `d` from `n` samples, with the
/// Stephens small-sample correction `λ = (√n + 0.12 + 0.11/√n)·d`.
pub fn kolmogorov_p_value(d: f64, n: usize) -> f64 {
    if n == 0 || !d.is_finite() || d <= 0.0 {
        return 1.0;
    }
    let root_n = (n as f64).sqrt();
    let lambda = (root_n + 0.12 + 0.11 / root_n) * d;
    if lambda < KOLMOGOROV_SMALL_LAMBDA {
        return 1.0;
    }

    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=KOLMOGOROV_SERIES_TERMS {
        let j = f64::from(j);
        let term = sign * (-2.0 * j * j * lambda * lambda).exp();
        sum += term;
        if term.abs() <= KOLMOGOROV_SERIES_EPS * sum.abs() {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

pub fn uniformity_report(samples: &[f64]) -> Result<UniformityReport, CpsiError> {
    let ks_statistic = ks_uniform_statistic(samples)?;
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    Ok(UniformityReport {
        samples: samples.len(),
        ks_statistic,
        p_value: kolmogorov_p_value(ks_statistic, samples.len()),
        mean,
    })
}

fn sorted_finite(samples: &[f64], label: &str) -> Result<Vec<f64>, CpsiError> {
    if samples.is_empty() {
        return Err(CpsiError::invalid_input(format!(
            "{label} requires at least one sample"
        )));
    }
    if let Some(idx) = samples.iter().position(|value| !value.is_finite()) {
        return Err(CpsiError::invalid_input(format!(
            "{label}: sample[{idx}] is not finite"
        )));
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::{empirical_cdf, kolmogorov_p_value, ks_uniform_statistic, uniformity_report};

    #[test]
    fn empirical_cdf_counts_ties_as_at_or_below() {
        let cdf = empirical_cdf(&[0.2, 0.5, 0.5, 0.9], &[0.0, 0.2, 0.5, 0.95])
            .expect("finite samples");
        assert_eq!(cdf, vec![0.0, 0.25, 0.75, 1.0]);
    }

    #[test]
    fn ks_statistic_of_a_perfect_grid_is_half_a_step() {
        let n = 10;
        let samples: Vec<f64> = (0..n).map(|i| (i as f64 + 0.5) / n as f64).collect();
        let d = ks_uniform_statistic(&samples).expect("valid samples");
        assert!((d - 0.05).abs() < 1.0e-12);
    }

    #[test]
    fn ks_statistic_of_a_point_mass_is_large() {
        let d = ks_uniform_statistic(&[0.99; 50]).expect("valid samples");
        assert!((d - 0.99).abs() < 1.0e-12);
        assert!(kolmogorov_p_value(d, 50) < 1.0e-10);
    }

    #[test]
    fn p_value_matches_reference_points() {
        // λ ≈ 1.36 is the classic 5% critical value of the Kolmogorov distribution.
        let n = 10_000;
        let root_n = (n as f64).sqrt();
        let d = 1.358 / (root_n + 0.12 + 0.11 / root_n);
        assert!((kolmogorov_p_value(d, n) - 0.05).abs() < 1.0e-3);
        assert_eq!(kolmogorov_p_value(0.0, 10), 1.0);
        assert_eq!(kolmogorov_p_value(0.01, 4), 1.0);
    }

    #[test]
    fn rejects_empty_and_out_of_range_samples() {
        assert!(ks_uniform_statistic(&[]).is_err());
        assert!(ks_uniform_statistic(&[0.5, 1.5]).is_err());
        assert!(ks_uniform_statistic(&[f64::NAN]).is_err());
        assert!(empirical_cdf(&[], &[0.5]).is_err());
    }

    #[test]
    fn report_summarizes_the_sample() {
        let samples: Vec<f64> = (0..200).map(|i| (i as f64 + 0.5) / 200.0).collect();
        let report = uniformity_report(&samples).expect("valid samples");
        assert_eq!(report.samples, 200);
        assert!((report.mean - 0.5).abs() < 1.0e-12);
        assert!(report.passes(0.05));
    }
}
