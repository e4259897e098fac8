// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use cpsi_core::{ExecutionContext, find_changepoints};
use cpsi_inference::{
    AffineLine, PivotEngine, PivotRequest, fused_lasso_parametric_qp, test_direction,
};
use cpsi_parametric::{ParametricPathTracer, TraceConfig};
use cpsi_qp::{ActiveSetSolver, DenseMatrix, FusedLassoProblem, QpOracle};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);

    let n = common::bounded(cursor.next_u8(), 3, 9);
    let lambda = f64::from(cursor.next_u8()) / 32.0;
    let response: Vec<f64> = (0..n)
        .map(|_| common::scaled(cursor.next_i16(), 4.0))
        .collect();

    let design = DenseMatrix::identity(n);
    let Ok(problem) = FusedLassoProblem::new(design.clone(), response.clone(), lambda) else {
        return;
    };
    let Ok(qp) = problem.to_qp() else {
        return;
    };
    let Ok(solution) = ActiveSetSolver::default().solve(&qp, None) else {
        return;
    };
    let Ok(changepoints) = find_changepoints(problem.beta(&solution.x), 1.0e-8) else {
        return;
    };

    // Flat fits contrast a fixed split so they still exercise the tracer.
    let eta = if changepoints.len() > 2 {
        let selected = common::bounded(cursor.next_u8(), 1, changepoints.len() - 2);
        test_direction(&changepoints, selected, n)
    } else {
        let split = common::bounded(cursor.next_u8(), 1, n - 1);
        test_direction(&[0, split, n], 1, n)
    };
    let Ok(eta) = eta else {
        return;
    };

    let Ok(line) = AffineLine::from_direction(&response, &eta) else {
        return;
    };
    let Ok(parametric) = fused_lasso_parametric_qp(&design, &line, lambda) else {
        return;
    };
    let config = TraceConfig {
        max_intervals: 256,
        ..TraceConfig::default()
    };
    let Ok(tracer) = ParametricPathTracer::new(ActiveSetSolver::default(), config) else {
        return;
    };
    let Ok(path) = tracer.trace(&parametric, &ExecutionContext::new()) else {
        return;
    };

    for pair in path.intervals.windows(2) {
        assert_eq!(pair[0].z_hi, pair[1].z_lo, "path intervals must tile the window");
        assert_ne!(
            pair[0].changepoints, pair[1].changepoints,
            "adjacent intervals must carry distinct changepoint lists"
        );
    }

    let statistic = eta.iter().zip(&response).map(|(e, y)| e * y).sum::<f64>();
    let variance = eta.iter().map(|e| e * e).sum::<f64>();
    let request = PivotRequest {
        observed: &changepoints,
        statistic,
        mean: 0.0,
        variance,
    };
    if let Ok(report) = PivotEngine::new().pivot(&path, &request) {
        assert!((0.0..=1.0).contains(&report.pivot));
    }
});
