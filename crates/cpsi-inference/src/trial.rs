// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! One selective-inference trial: static fit, selection, trace, pivot.

use crate::direction::{AffineLine, fused_lasso_parametric_qp, test_direction};
use crate::pivot::{PivotEngine, PivotReport, PivotRequest};
use cpsi_core::{CpsiError, ExecutionContext, TraceDiagnostics, find_changepoints};
use cpsi_parametric::{ParametricPathTracer, TraceConfig};
use cpsi_qp::{DenseMatrix, FusedLassoProblem, QpOracle, dot};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::debug;

const DEFAULT_LAMBDA: f64 = 5.0;
const DEFAULT_NOISE_VARIANCE: f64 = 1.0;

/// Observed data for one trial.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialData {
    pub design: DenseMatrix,
    pub response: Vec<f64>,
    /// Mean of the response under the null, used for the pivot's null mean.
    pub true_mean: Vec<f64>,
}

/// Configuration for [`run_trial`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct TrialConfig {
    pub lambda: f64,
    pub trace: TraceConfig,
    /// Per-observation noise variance `σ²`.
    pub noise_variance: f64,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            lambda: DEFAULT_LAMBDA,
            trace: TraceConfig::default(),
            noise_variance: DEFAULT_NOISE_VARIANCE,
        }
    }
}

impl TrialConfig {
    pub fn validate(&self) -> Result<(), CpsiError> {
        if !self.lambda.is_finite() || self.lambda <= 0.0 {
            return Err(CpsiError::invalid_input(format!(
                "TrialConfig.lambda must be finite and > 0; got {}",
                self.lambda
            )));
        }
        if !self.noise_variance.is_finite() || self.noise_variance <= 0.0 {
            return Err(CpsiError::invalid_input(format!(
                "TrialConfig.noise_variance must be finite and > 0; got {}",
                self.noise_variance
            )));
        }
        self.trace.validate()
    }
}

/// Which interior changepoint of the static fit is tested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChangepointSelection {
    /// Uniformly at random among the interior changepoints.
    #[default]
    Uniform,
    /// Position in the changepoint list, `1..len-1`.
    Index(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrialReport {
    pub changepoints: Vec<usize>,
    /// Position of the tested changepoint in `changepoints`.
    pub selected: usize,
    pub statistic: f64,
    pub null_mean: f64,
    pub variance: f64,
    pub pivot: PivotReport,
    pub trace: TraceDiagnostics,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TrialOutcome {
    /// The static fit has no interior changepoint; nothing to test.
    NoChangepoint { changepoints: Vec<usize> },
    Tested(Box<TrialReport>),
}

impl TrialOutcome {
    pub fn pivot(&self) -> Option<f64> {
        match self {
            Self::NoChangepoint { .. } => None,
            Self::Tested(report) => Some(report.pivot.pivot),
        }
    }
}

fn validate_data(data: &TrialData) -> Result<(), CpsiError> {
    let n = data.design.rows();
    if data.response.len() != n || data.true_mean.len() != n {
        return Err(CpsiError::invalid_input(format!(
            "trial data lengths must match design rows {n}; got response={}, true_mean={}",
            data.response.len(),
            data.true_mean.len()
        )));
    }
    if let Some(idx) = data.true_mean.iter().position(|value| !value.is_finite()) {
        return Err(CpsiError::invalid_input(format!(
            "true_mean[{idx}] is not finite"
        )));
    }
    Ok(())
}

/// Runs one trial as a pure function of its inputs and random source.
///
/// The test direction is built on the response index space, so the design
/// must be square (`X = I` in the usual signal-approximation setting) for the
/// changepoint list of `beta` to index the response.
pub fn run_trial<O, R>(
    data: &TrialData,
    selection: ChangepointSelection,
    rng: &mut R,
    oracle: &O,
    config: &TrialConfig,
    ctx: &ExecutionContext<'_>,
) -> Result<TrialOutcome, CpsiError>
where
    O: QpOracle,
    R: Rng,
{
    config.validate()?;
    validate_data(data)?;
    let n = data.design.rows();
    if data.design.cols() != n {
        return Err(CpsiError::invalid_input(format!(
            "test directions need a square design; got {}x{}",
            n,
            data.design.cols()
        )));
    }

    let problem =
        FusedLassoProblem::new(data.design.clone(), data.response.clone(), config.lambda)?;
    let solution = oracle.solve(&problem.to_qp()?, None)?;
    let changepoints = find_changepoints(
        problem.beta(&solution.x),
        config.trace.tolerances.changepoint_tolerance,
    )?;
    if changepoints.len() <= 2 {
        debug!(
            target: "cpsi_inference::trial",
            "static fit has no interior changepoint"
        );
        return Ok(TrialOutcome::NoChangepoint { changepoints });
    }

    let interior = changepoints.len() - 2;
    let selected = match selection {
        ChangepointSelection::Uniform => rng.gen_range(1..=interior),
        ChangepointSelection::Index(idx) => idx,
    };
    let eta = test_direction(&changepoints, selected, n)?;
    let statistic = dot(&eta, &data.response);
    if statistic.abs() > config.trace.z_threshold {
        return Err(CpsiError::invalid_input(format!(
            "observed statistic {statistic} lies outside the traced window ±{}",
            config.trace.z_threshold
        )));
    }
    let line = AffineLine::from_direction(&data.response, &eta)?;
    let qp = fused_lasso_parametric_qp(&data.design, &line, config.lambda)?;

    let path = ParametricPathTracer::new(oracle, config.trace.clone())?.trace(&qp, ctx)?;

    let null_mean = dot(&eta, &data.true_mean);
    let variance = config.noise_variance * dot(&eta, &eta);
    let pivot = PivotEngine::new().pivot(
        &path,
        &PivotRequest {
            observed: &changepoints,
            statistic,
            mean: null_mean,
            variance,
        },
    )?;
    debug!(
        target: "cpsi_inference::trial",
        selected_changepoint = changepoints[selected],
        statistic,
        intervals = path.intervals.len(),
        pivot = pivot.pivot,
        "trial complete"
    );

    Ok(TrialOutcome::Tested(Box::new(TrialReport {
        changepoints,
        selected,
        statistic,
        null_mean,
        variance,
        pivot,
        trace: path.diagnostics,
    })))
}

fn run_seeded<O, G>(
    seed: u64,
    generate: &G,
    oracle: &O,
    config: &TrialConfig,
) -> Result<TrialOutcome, CpsiError>
where
    O: QpOracle,
    G: Fn(&mut StdRng) -> TrialData,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let data = generate(&mut rng);
    run_trial(
        &data,
        ChangepointSelection::Uniform,
        &mut rng,
        oracle,
        config,
        &ExecutionContext::new(),
    )
}

/// Runs one independent trial per seed; results are in seed order.
///
/// Each trial owns a `StdRng` seeded from its seed, so the output does not
/// depend on scheduling. With the `rayon` feature the trials run in parallel.
#[cfg(not(feature = "rayon"))]
pub fn run_trial_batch<O, G>(
    seeds: &[u64],
    generate: G,
    oracle: &O,
    config: &TrialConfig,
) -> Vec<Result<TrialOutcome, CpsiError>>
where
    O: QpOracle + Sync,
    G: Fn(&mut StdRng) -> TrialData + Sync,
{
    seeds
        .iter()
        .map(|&seed| run_seeded(seed, &generate, oracle, config))
        .collect()
}

/// Runs one independent trial per seed; results are in seed order.
///
/// Each trial owns a `StdRng` seeded from its seed, so the output does not
/// depend on scheduling. With the `rayon` feature the trials run in parallel.
#[cfg(feature = "rayon")]
pub fn run_trial_batch<O, G>(
    seeds: &[u64],
    generate: G,
    oracle: &O,
    config: &TrialConfig,
) -> Vec<Result<TrialOutcome, CpsiError>>
where
    O: QpOracle + Sync,
    G: Fn(&mut StdRng) -> TrialData + Sync,
{
    seeds
        .par_iter()
        .map(|&seed| run_seeded(seed, &generate, oracle, config))
        .collect()
}
