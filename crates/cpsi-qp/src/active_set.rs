// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::kkt::{KktSystem, RowBasis};
use crate::linalg::{DenseMatrix, LuFactor, dot, max_abs};
use crate::oracle::{QpOracle, QpSolution};
use crate::problem::QpProblem;
use cpsi_core::CpsiError;
use tracing::trace;

const DEFAULT_MAX_ITERATIONS: usize = 10_000;
const DEFAULT_FEASIBILITY_TOLERANCE: f64 = 1.0e-9;
const DEFAULT_MULTIPLIER_TOLERANCE: f64 = 1.0e-10;
const DEFAULT_STEP_TOLERANCE: f64 = 1.0e-11;
const BLOCKING_DIRECTION_EPS: f64 = 1.0e-14;

/// Configuration for [`ActiveSetSolver`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveSetConfig {
    pub max_iterations: usize,
    /// Largest constraint violation accepted for a starting point.
    pub feasibility_tolerance: f64,
    /// Working-set multipliers above `-multiplier_tolerance` count as non-negative.
    pub multiplier_tolerance: f64,
    /// Steps with `‖p‖∞ ≤ step_tolerance · max(1, ‖x‖∞)` are treated as zero.
    pub step_tolerance: f64,
}

impl Default for ActiveSetConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            feasibility_tolerance: DEFAULT_FEASIBILITY_TOLERANCE,
            multiplier_tolerance: DEFAULT_MULTIPLIER_TOLERANCE,
            step_tolerance: DEFAULT_STEP_TOLERANCE,
        }
    }
}

impl ActiveSetConfig {
    fn validate(&self) -> Result<(), CpsiError> {
        if self.max_iterations == 0 {
            return Err(CpsiError::invalid_input(
                "ActiveSetConfig.max_iterations must be >= 1; got 0",
            ));
        }
        let tolerances = [
            ("feasibility_tolerance", self.feasibility_tolerance),
            ("multiplier_tolerance", self.multiplier_tolerance),
            ("step_tolerance", self.step_tolerance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(CpsiError::invalid_input(format!(
                    "ActiveSetConfig.{name} must be finite and >= 0; got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Dense primal active-set QP oracle.
///
/// Starts from a feasible point (the warm start, the origin, or the least-norm
/// solution of `Ax = b`), keeps a linearly independent working set, and
/// alternates blocking steps with dropping the most negative multiplier. `P`
/// must be positive definite on the null space of every working set it visits,
/// which holds for the fused-lasso QPs assembled by this crate.
#[derive(Clone, Debug, Default)]
pub struct ActiveSetSolver {
    config: ActiveSetConfig,
}

impl ActiveSetSolver {
    pub fn new(config: ActiveSetConfig) -> Result<Self, CpsiError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ActiveSetConfig {
        &self.config
    }

    fn feasible_start(
        &self,
        problem: &QpProblem,
        warm_start: Option<&[f64]>,
    ) -> Result<Vec<f64>, CpsiError> {
        let n = problem.dim();
        let tolerance = self.config.feasibility_tolerance;

        if let Some(candidate) = warm_start {
            if candidate.len() == n
                && candidate.iter().all(|value| value.is_finite())
                && problem.max_violation(candidate) <= tolerance
            {
                return Ok(candidate.to_vec());
            }
            trace!(
                target: "cpsi_qp::active_set",
                "warm start rejected; falling back to cold start"
            );
        }

        let origin = vec![0.0; n];
        let origin_violation = problem.max_violation(&origin);
        if origin_violation <= tolerance {
            return Ok(origin);
        }

        let mut last_violation = origin_violation;
        if problem.equality_count() > 0 {
            if let Some(candidate) = least_norm_equality_point(problem) {
                let violation = problem.max_violation(&candidate);
                if violation <= tolerance {
                    return Ok(candidate);
                }
                last_violation = violation;
            }
        }

        Err(CpsiError::infeasible(format!(
            "no feasible starting point: origin violation={origin_violation:e}, least-norm equality point violation={last_violation:e}"
        )))
    }

    fn initial_working_set(&self, problem: &QpProblem, x: &[f64]) -> (Vec<usize>, Vec<usize>) {
        let mut basis = RowBasis::new();
        let equalities: Vec<usize> = (0..problem.equality_count())
            .filter(|&i| basis.try_insert(problem.a().row(i)))
            .collect();
        let working: Vec<usize> = (0..problem.inequality_count())
            .filter(|&i| problem.inequality_slack(i, x) <= self.config.feasibility_tolerance)
            .filter(|&i| basis.try_insert(problem.g().row(i)))
            .collect();
        (equalities, working)
    }
}

fn least_norm_equality_point(problem: &QpProblem) -> Option<Vec<f64>> {
    let a = problem.a();
    let m = a.rows();
    let mut normal = DenseMatrix::zeros(m, m);
    for i in 0..m {
        for j in 0..m {
            normal.set(i, j, dot(a.row(i), a.row(j)));
        }
    }
    let factor = LuFactor::factor(normal).ok()?;
    let multipliers = factor.solve(problem.b());
    Some(a.transpose_mul_vec(&multipliers))
}

impl QpOracle for ActiveSetSolver {
    fn name(&self) -> &'static str {
        "active_set"
    }

    fn solve(
        &self,
        problem: &QpProblem,
        warm_start: Option<&[f64]>,
    ) -> Result<QpSolution, CpsiError> {
        let n = problem.dim();
        let mut x = self.feasible_start(problem, warm_start)?;
        let (equalities, mut working) = self.initial_working_set(problem, &x);

        for iteration in 0..self.config.max_iterations {
            let mut rows: Vec<&[f64]> = Vec::with_capacity(equalities.len() + working.len());
            rows.extend(equalities.iter().map(|&i| problem.a().row(i)));
            rows.extend(working.iter().map(|&i| problem.g().row(i)));

            let kkt = KktSystem::factor(problem.p(), &rows)?;
            let gradient = problem.gradient(&x);
            let negative_gradient: Vec<f64> = gradient.iter().map(|value| -value).collect();
            let solution = kkt.solve(&negative_gradient, &vec![0.0; rows.len()]);
            let step = solution.primal;

            if max_abs(&step) <= self.config.step_tolerance * max_abs(&x).max(1.0) {
                let inequality_multipliers = &solution.multipliers[equalities.len()..];
                let most_negative = inequality_multipliers
                    .iter()
                    .enumerate()
                    .min_by(|left, right| left.1.total_cmp(right.1));

                match most_negative {
                    Some((slot, &multiplier)) if multiplier < -self.config.multiplier_tolerance => {
                        trace!(
                            target: "cpsi_qp::active_set",
                            iteration,
                            constraint = working[slot],
                            multiplier,
                            "dropping constraint from working set"
                        );
                        working.remove(slot);
                    }
                    _ => {
                        let objective = problem.objective(&x);
                        if !objective.is_finite() {
                            return Err(CpsiError::solver(format!(
                                "non-finite objective at the active-set optimum: {objective}"
                            )));
                        }
                        return Ok(QpSolution {
                            x,
                            objective,
                            iterations: iteration + 1,
                        });
                    }
                }
                continue;
            }

            let mut alpha = 1.0;
            let mut blocking = None;
            for i in 0..problem.inequality_count() {
                if working.contains(&i) {
                    continue;
                }
                let directional = dot(problem.g().row(i), &step);
                if directional <= BLOCKING_DIRECTION_EPS {
                    continue;
                }
                let ratio = problem.inequality_slack(i, &x).max(0.0) / directional;
                if ratio < alpha {
                    alpha = ratio;
                    blocking = Some(i);
                }
            }

            for (value, delta) in x.iter_mut().zip(&step) {
                *value += alpha * delta;
            }
            if let Some(i) = blocking {
                working.push(i);
            }
        }

        Err(CpsiError::solver(format!(
            "active-set iteration cap reached: max_iterations={}, n={n}",
            self.config.max_iterations
        )))
    }
}
