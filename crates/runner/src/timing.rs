// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Step-boundary timing instrumentation.
//!
//! [`StepTimingRecorder`] is the stateful observer injected into the
//! inference loop. The engine calls it once per step; the first invocation
//! only establishes the clock origin, so N invocations yield N−1 records.
//! Elapsed deltas come from a monotonic clock; the wall-clock timestamp is
//! captured separately for the metrics table.

use engine::{StepContext, StepObserver, StepState};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Timing for one completed inference step.
///
/// Immutable once appended; the sequence is strictly ordered by step index.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StepRecord {
    /// 0-based step index as reported by the engine.
    pub step: usize,
    /// Wall-clock capture time, seconds since the UNIX epoch.
    pub timestamp: f64,
    /// Seconds elapsed since the previous step capture.
    pub elapsed_secs: f64,
}

/// Observer that measures per-step latency without perturbing engine state.
///
/// Before every clock read it takes the device's completion barrier so the
/// measured delta reflects finished step compute, not queued work. Zero
/// invocations (a zero-step run) is a valid outcome with an empty record
/// sequence.
#[derive(Debug, Default)]
pub struct StepTimingRecorder {
    last_capture: Option<Instant>,
    records: Vec<StepRecord>,
}

impl StepTimingRecorder {
    /// Creates a recorder with no clock origin established.
    pub fn new() -> Self {
        Self::default()
    }

    /// The records accumulated so far.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Consumes the recorder, yielding its record sequence.
    pub fn into_records(self) -> Vec<StepRecord> {
        self.records
    }
}

impl StepObserver for StepTimingRecorder {
    fn on_step_end(&mut self, ctx: &StepContext<'_>, state: StepState) -> StepState {
        // Drain queued device work before looking at the clock.
        ctx.device.synchronize();
        let now = Instant::now();

        if let Some(previous) = self.last_capture {
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            self.records.push(StepRecord {
                step: ctx.step,
                timestamp,
                elapsed_secs: now.duration_since(previous).as_secs_f64(),
            });
        }
        self.last_capture = Some(now);

        // Observe only; the bundle passes through untouched.
        state
    }
}
