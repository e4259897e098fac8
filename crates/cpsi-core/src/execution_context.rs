// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpsiError;
use crate::control::CancelToken;
use crate::observability::{ProgressSink, TelemetrySink};

/// Optional hooks threaded through traces and trials.
///
/// A default context has no hooks and never cancels, so the per-trial
/// computation stays a pure function of its inputs.
#[derive(Clone, Copy, Default)]
pub struct ExecutionContext<'a> {
    cancel: Option<&'a CancelToken>,
    progress: Option<&'a dyn ProgressSink>,
    telemetry: Option<&'a dyn TelemetrySink>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(self, cancel: &'a CancelToken) -> Self {
        Self {
            cancel: Some(cancel),
            ..self
        }
    }

    pub fn with_progress_sink(self, progress: &'a dyn ProgressSink) -> Self {
        Self {
            progress: Some(progress),
            ..self
        }
    }

    pub fn with_telemetry_sink(self, telemetry: &'a dyn TelemetrySink) -> Self {
        Self {
            telemetry: Some(telemetry),
            ..self
        }
    }

    pub fn has_hooks(&self) -> bool {
        self.cancel.is_some() || self.progress.is_some() || self.telemetry.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    /// Polls the token when `step` is a multiple of `every` (zero polls
    /// every step).
    pub fn poll_cancel(&self, step: usize, every: usize) -> Result<(), CpsiError> {
        if step % every.max(1) == 0 && self.is_cancelled() {
            Err(CpsiError::cancelled())
        } else {
            Ok(())
        }
    }

    /// Reports how far `z` has advanced through `[-z_threshold, z_threshold]`.
    pub fn report_window_position(&self, z: f64, z_threshold: f64) {
        let Some(sink) = self.progress else {
            return;
        };
        let fraction = (z + z_threshold) / (2.0 * z_threshold);
        if fraction.is_finite() {
            sink.on_progress(fraction.clamp(0.0, 1.0) as f32);
        }
    }

    pub fn record_scalar(&self, key: &'static str, value: f64) {
        if let Some(sink) = self.telemetry {
            sink.record_scalar(key, value);
        }
    }

    /// Emits a batch of scalars in order.
    pub fn record_scalars(&self, values: &[(&'static str, f64)]) {
        for &(key, value) in values {
            self.record_scalar(key, value);
        }
    }
}
