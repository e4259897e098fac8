// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Receives the traced fraction of the `z` window, clamped to `[0, 1]`.
pub trait ProgressSink {
    fn on_progress(&self, fraction: f32);
}

/// Receives named scalar measurements emitted by traces and trials.
pub trait TelemetrySink {
    fn record_scalar(&self, key: &'static str, value: f64);
}
