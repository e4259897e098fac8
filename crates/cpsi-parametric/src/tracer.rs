// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::affine::AffineKktSolution;
use crate::config::TraceConfig;
use crate::path::{ParametricPath, ParametricQp, PathInterval};
use cpsi_core::{CpsiError, ExecutionContext, TraceDiagnostics, find_changepoints};
use cpsi_qp::QpOracle;
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Traces the changepoint list of a parametric QP across `[-z_threshold, z_threshold]`.
///
/// Each step solves one static QP at a probe `z`, continues its active set
/// affinely to the nearest breakpoint, and labels the interval with the
/// changepoints of `beta` at its midpoint. Intervals with equal labels are
/// coalesced so the result is a partition into maximal intervals.
#[derive(Debug)]
pub struct ParametricPathTracer<O: QpOracle> {
    oracle: O,
    config: TraceConfig,
}

impl<O: QpOracle> ParametricPathTracer<O> {
    pub fn new(oracle: O, config: TraceConfig) -> Result<Self, CpsiError> {
        config.validate()?;
        Ok(Self { oracle, config })
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn trace(
        &self,
        qp: &ParametricQp,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ParametricPath, CpsiError> {
        let started_at = Instant::now();
        let tolerances = &self.config.tolerances;
        let z_threshold = self.config.z_threshold;
        let cancel_check_every = self.config.normalized_cancel_check_every();
        let problem = qp.problem();

        let mut diagnostics = TraceDiagnostics {
            oracle: Cow::Borrowed(self.oracle.name()),
            variables: problem.dim(),
            inequality_constraints: problem.inequality_count(),
            equality_constraints: problem.equality_count(),
            z_threshold,
            ..TraceDiagnostics::default()
        };
        let mut intervals: Vec<PathInterval> = Vec::new();
        let mut dependent_active_max = 0usize;

        let mut z_lo = -z_threshold;
        let mut probe = z_lo;
        let mut warm_start: Option<Vec<f64>> = None;

        while z_lo < z_threshold {
            ctx.poll_cancel(diagnostics.oracle_solves, cancel_check_every)?;

            let instance = qp.problem_at(probe)?;
            let solution = self.oracle.solve(&instance, warm_start.as_deref())?;
            diagnostics.oracle_solves += 1;

            let affine = AffineKktSolution::from_optimum(qp, &solution.x, tolerances)?;
            dependent_active_max = dependent_active_max.max(affine.dependent_active());
            let bounds = affine.bounds(qp, tolerances)?;

            if bounds.lower > z_lo + tolerances.breakpoint_tolerance {
                let offset = probe - z_lo;
                if offset <= tolerances.min_progress {
                    warn!(
                        target: "cpsi_parametric::tracer",
                        z = z_lo,
                        lower = bounds.lower,
                        offset,
                        "probe cannot be moved closer to the current breakpoint"
                    );
                    return Err(CpsiError::stalled(
                        z_lo,
                        format!(
                            "interval found at probe {probe} starts at {} and the probe offset {offset:e} cannot shrink further",
                            bounds.lower
                        ),
                    ));
                }
                probe = z_lo + 0.5 * offset;
                diagnostics.gap_refinements += 1;
                trace!(
                    target: "cpsi_parametric::tracer",
                    z = z_lo,
                    lower = bounds.lower,
                    probe,
                    "probe skipped an interval; halving the offset"
                );
                continue;
            }

            let z_hi = bounds.upper.min(z_threshold);
            if z_hi <= z_lo + tolerances.min_progress {
                if probe <= z_lo && z_lo + tolerances.probe_step < z_threshold {
                    // The window starts on a breakpoint: solve just inside it.
                    probe = z_lo + tolerances.probe_step;
                    diagnostics.gap_refinements += 1;
                    trace!(
                        target: "cpsi_parametric::tracer",
                        z = z_lo,
                        probe,
                        "probe sits on a breakpoint; stepping inside the window"
                    );
                    continue;
                }
                warn!(
                    target: "cpsi_parametric::tracer",
                    z = z_lo,
                    upper = bounds.upper,
                    "trace failed to advance"
                );
                return Err(CpsiError::stalled(
                    z_lo,
                    format!(
                        "next breakpoint {} is within min_progress={:e} of the current one",
                        bounds.upper, tolerances.min_progress
                    ),
                ));
            }

            if diagnostics.raw_intervals == self.config.max_intervals {
                warn!(
                    target: "cpsi_parametric::tracer",
                    z = z_lo,
                    max_intervals = self.config.max_intervals,
                    "interval budget exhausted"
                );
                return Err(CpsiError::trace_overflow(self.config.max_intervals, z_lo));
            }
            diagnostics.raw_intervals += 1;

            let beta = affine.beta_at(0.5 * (z_lo + z_hi), qp.beta_dim());
            let changepoints = find_changepoints(&beta, tolerances.changepoint_tolerance)?;

            match intervals.last_mut() {
                Some(last) if last.changepoints == changepoints => {
                    last.z_hi = z_hi;
                    diagnostics.merged_breakpoints += 1;
                }
                _ => {
                    debug!(
                        target: "cpsi_parametric::tracer",
                        z_lo,
                        z_hi,
                        changepoints = ?changepoints,
                        "new changepoint list"
                    );
                    intervals.push(PathInterval {
                        z_lo,
                        z_hi,
                        changepoints,
                    });
                }
            }

            warm_start = Some(affine.primal_at(z_hi));
            ctx.report_window_position(z_hi, z_threshold);

            z_lo = z_hi;
            probe = (z_hi + tolerances.probe_step).min(z_threshold);
        }

        let runtime_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        diagnostics.runtime_ms = Some(runtime_ms);
        diagnostics.emitted_intervals = intervals.len();
        diagnostics.notes.push(format!(
            "tolerances: changepoint={:e}, breakpoint={:e}, active={:e}, probe_step={:e}",
            tolerances.changepoint_tolerance,
            tolerances.breakpoint_tolerance,
            tolerances.active_tolerance,
            tolerances.probe_step
        ));
        if dependent_active_max > 0 {
            diagnostics.warnings.push(format!(
                "up to {dependent_active_max} linearly dependent active constraints were left out of the KKT system"
            ));
        }

        ctx.record_scalars(&[
            ("parametric.trace.runtime_ms", runtime_ms as f64),
            ("parametric.trace.oracle_solves", diagnostics.oracle_solves as f64),
            ("parametric.trace.raw_intervals", diagnostics.raw_intervals as f64),
            ("parametric.trace.emitted_intervals", diagnostics.emitted_intervals as f64),
            ("parametric.trace.gap_refinements", diagnostics.gap_refinements as f64),
        ]);

        Ok(ParametricPath {
            intervals,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ParametricPathTracer;
    use crate::config::TraceConfig;
    use crate::path::ParametricQp;
    use cpsi_core::{CancelToken, CpsiError, ExecutionContext, TelemetrySink};
    use cpsi_qp::{ActiveSetSolver, DenseMatrix, QpOracle, QpProblem, QpSolution};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTelemetry {
        scalars: Mutex<Vec<(&'static str, f64)>>,
    }

    impl TelemetrySink for RecordingTelemetry {
        fn record_scalar(&self, key: &'static str, value: f64) {
            self.scalars
                .lock()
                .expect("telemetry lock should not be poisoned")
                .push((key, value));
        }
    }

    /// Ignores the probe and always solves one fixed instance.
    struct FrozenOracle {
        frozen: QpProblem,
    }

    impl QpOracle for FrozenOracle {
        fn name(&self) -> &'static str {
            "frozen"
        }

        fn solve(
            &self,
            _problem: &QpProblem,
            warm_start: Option<&[f64]>,
        ) -> Result<QpSolution, CpsiError> {
            ActiveSetSolver::default().solve(&self.frozen, warm_start)
        }
    }

    struct FailingOracle;

    impl QpOracle for FailingOracle {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn solve(
            &self,
            _problem: &QpProblem,
            _warm_start: Option<&[f64]>,
        ) -> Result<QpSolution, CpsiError> {
            Err(CpsiError::infeasible("always infeasible"))
        }
    }

    /// `min ½‖x‖² + (c + z·d)ᵀx` with `x₀ ≤ 0` and `x₁ ≤ 0`, `c = (1, 1, 0)`,
    /// `d = (−1, −1, 0)`: both constraints become active at exactly `z = 1`.
    fn symmetric_tie() -> ParametricQp {
        let g = DenseMatrix::from_row_major(2, 3, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
            .expect("valid shape");
        let problem = QpProblem::new(
            DenseMatrix::identity(3),
            vec![1.0, 1.0, 0.0],
            g,
            vec![0.0, 0.0],
            DenseMatrix::zeros(0, 3),
            vec![],
        )
        .expect("valid problem");
        ParametricQp::new(problem, vec![-1.0, -1.0, 0.0], 3).expect("valid parametric QP")
    }

    fn tracer() -> ParametricPathTracer<ActiveSetSolver> {
        ParametricPathTracer::new(ActiveSetSolver::default(), TraceConfig::default())
            .expect("default config is valid")
    }

    #[test]
    fn simultaneous_activation_is_a_single_breakpoint() {
        let path = tracer()
            .trace(&symmetric_tie(), &ExecutionContext::new())
            .expect("tie should trace");

        assert_eq!(path.len(), 2);
        assert_eq!(path.intervals[0].z_lo, -20.0);
        assert!((path.intervals[0].z_hi - 1.0).abs() < 1.0e-12);
        assert_eq!(path.intervals[0].z_hi, path.intervals[1].z_lo);
        assert_eq!(path.intervals[1].z_hi, 20.0);
        assert_eq!(path.intervals[0].changepoints, vec![0, 2, 3]);
        assert_eq!(path.intervals[1].changepoints, vec![0, 3]);
        assert!(path.intervals.iter().all(|interval| interval.width() > 0.0));
        assert_eq!(path.diagnostics.raw_intervals, 2);
        assert_eq!(path.diagnostics.emitted_intervals, 2);
        assert_eq!(path.diagnostics.oracle, "active_set");
    }

    #[test]
    fn zero_direction_yields_one_interval() {
        let base = symmetric_tie();
        let qp = ParametricQp::new(base.problem().clone(), vec![0.0; 3], 3)
            .expect("valid parametric QP");
        let path = tracer()
            .trace(&qp, &ExecutionContext::new())
            .expect("constant QP should trace");

        assert_eq!(path.len(), 1);
        assert_eq!(path.breakpoints(), vec![-20.0, 20.0]);
        assert_eq!(path.intervals[0].changepoints, vec![0, 2, 3]);
        assert_eq!(path.diagnostics.oracle_solves, 1);
    }

    #[test]
    fn equal_labels_on_both_sides_of_a_breakpoint_are_coalesced() {
        // x₀ = x₁ = max(z − 1, −5) and x₂ = 3: the lower bounds release at
        // z = −4 but the changepoint list stays [0, 2, 3].
        let g = DenseMatrix::from_row_major(2, 3, vec![-1.0, 0.0, 0.0, 0.0, -1.0, 0.0])
            .expect("valid shape");
        let problem = QpProblem::new(
            DenseMatrix::identity(3),
            vec![1.0, 1.0, -3.0],
            g,
            vec![5.0, 5.0],
            DenseMatrix::zeros(0, 3),
            vec![],
        )
        .expect("valid problem");
        let qp = ParametricQp::new(problem, vec![-1.0, -1.0, 0.0], 3).expect("valid QP");
        let path = tracer()
            .trace(&qp, &ExecutionContext::new())
            .expect("clipped problem should trace");

        assert_eq!(path.diagnostics.raw_intervals, 2);
        assert_eq!(path.diagnostics.merged_breakpoints, 1);
        assert_eq!(path.len(), 1);
        assert_eq!(path.breakpoints(), vec![-20.0, 20.0]);
        assert_eq!(path.intervals[0].changepoints, vec![0, 2, 3]);
    }

    #[test]
    fn window_starting_on_a_breakpoint_is_not_a_stall() {
        // x₀ = x₁ = min(−1 − z, 0): the bounds release exactly at z = −1.
        let base = symmetric_tie();
        let qp = ParametricQp::new(base.problem().clone(), vec![1.0, 1.0, 0.0], 3)
            .expect("valid parametric QP");
        let tracer = ParametricPathTracer::new(
            ActiveSetSolver::default(),
            TraceConfig {
                z_threshold: 1.0,
                ..TraceConfig::default()
            },
        )
        .expect("valid config");
        let path = tracer
            .trace(&qp, &ExecutionContext::new())
            .expect("boundary breakpoint should not stall");

        assert_eq!(path.breakpoints(), vec![-1.0, 1.0]);
        assert_eq!(path.intervals[0].changepoints, vec![0, 2, 3]);
        assert_eq!(path.diagnostics.gap_refinements, 1);
    }

    #[test]
    fn overflow_is_reported_with_the_current_z() {
        let tracer = ParametricPathTracer::new(
            ActiveSetSolver::default(),
            TraceConfig {
                max_intervals: 1,
                ..TraceConfig::default()
            },
        )
        .expect("valid config");
        let err = tracer
            .trace(&symmetric_tie(), &ExecutionContext::new())
            .expect_err("two intervals exceed a budget of one");
        match err {
            CpsiError::TraceOverflow { max_intervals, z } => {
                assert_eq!(max_intervals, 1);
                assert!((z - 1.0).abs() < 1.0e-12);
            }
            other => panic!("expected TraceOverflow, got {other:?}"),
        }
    }

    #[test]
    fn oracle_that_ignores_the_probe_stalls() {
        let qp = symmetric_tie();
        let frozen = qp.problem_at(-20.0).expect("valid instance");
        let tracer = ParametricPathTracer::new(FrozenOracle { frozen }, TraceConfig::default())
            .expect("valid config");
        let err = tracer
            .trace(&qp, &ExecutionContext::new())
            .expect_err("stale solutions cannot advance past z = 1");
        match err {
            CpsiError::StalledTrace { z, .. } => assert!((z - 1.0).abs() < 1.0e-12),
            other => panic!("expected StalledTrace, got {other:?}"),
        }
    }

    #[test]
    fn oracle_failures_propagate_unchanged() {
        let tracer = ParametricPathTracer::new(FailingOracle, TraceConfig::default())
            .expect("valid config");
        let err = tracer
            .trace(&symmetric_tie(), &ExecutionContext::new())
            .expect_err("oracle failure must propagate");
        assert_eq!(err, CpsiError::infeasible("always infeasible"));
    }

    #[test]
    fn cancelled_context_stops_before_the_first_solve() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = ExecutionContext::new().with_cancel(&cancel);
        let err = tracer()
            .trace(&symmetric_tie(), &ctx)
            .expect_err("cancelled trace must fail");
        assert_eq!(err, CpsiError::Cancelled);
    }

    #[test]
    fn telemetry_reports_trace_counters() {
        let telemetry = RecordingTelemetry::default();
        let ctx = ExecutionContext::new().with_telemetry_sink(&telemetry);
        tracer()
            .trace(&symmetric_tie(), &ctx)
            .expect("tie should trace");

        let scalars = telemetry
            .scalars
            .lock()
            .expect("telemetry lock should not be poisoned");
        let lookup = |key: &str| {
            scalars
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| *value)
        };
        assert_eq!(lookup("parametric.trace.raw_intervals"), Some(2.0));
        assert_eq!(lookup("parametric.trace.emitted_intervals"), Some(2.0));
        assert!(lookup("parametric.trace.runtime_ms").is_some());
    }
}
