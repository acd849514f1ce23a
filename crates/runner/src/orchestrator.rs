// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Top-level run sequencing.
//!
//! One orchestrator instance drives exactly one run:
//!
//! ```text
//! RunId ─ derive paths ─ resolve engine ─ prepare image
//!       ─ build request ─ execute (steps observed) ─ persist artifacts
//! ```
//!
//! The engine handle is exclusively owned for the run's duration and
//! discarded afterwards; nothing is cached across runs. Any failure is
//! fatal to the run and leaves no partial artifacts behind.

use crate::{
    ImagePreprocessor, MetricsTable, PipelineResolver, RunArtifactWriter, RunArtifacts, RunConfig,
    RunError, RunId, StepRecord, StepTimingRecorder, METRICS_DIR,
};
use engine::{EditRequest, EngineError};
use rand::SeedableRng;
use std::path::PathBuf;

/// Summary of a completed run, for console reporting.
#[derive(Debug)]
pub struct RunReport {
    /// The identifier both artifacts share.
    pub run_id: RunId,
    /// Where the artifacts were written.
    pub artifacts: RunArtifacts,
    /// The source locator the engine actually loaded from.
    pub resolved_source: String,
    /// The formatted metrics table, as persisted.
    pub table: MetricsTable,
}

impl RunReport {
    /// The recorded steps of this run.
    pub fn records(&self) -> &[StepRecord] {
        self.table.records()
    }
}

/// Wires resolution, preprocessing, execution, and persistence into one
/// single-shot inference run.
#[derive(Debug)]
pub struct RunOrchestrator {
    config: RunConfig,
    metrics_dir: PathBuf,
}

impl RunOrchestrator {
    /// Creates an orchestrator for one run of the given configuration.
    pub fn new(config: RunConfig) -> Self {
        Self { config, metrics_dir: PathBuf::from(METRICS_DIR) }
    }

    /// Overrides the metrics directory. The CLI never exposes this; it
    /// exists so embedders and tests can isolate their output tree.
    pub fn with_metrics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.metrics_dir = dir.into();
        self
    }

    /// Executes the run to completion.
    ///
    /// The run identifier is generated before any work begins; both output
    /// directories are created idempotently up front, but no file appears
    /// in either unless the whole run succeeds.
    pub async fn execute(self) -> Result<RunReport, RunError> {
        self.config.validate()?;

        let run_id = RunId::new();
        let artifacts =
            RunArtifacts::derive(&run_id, &self.config.image_output_dir, &self.metrics_dir);
        tracing::info!("run {run_id}: starting ({} steps)", self.config.steps);

        for dir in [&self.config.image_output_dir, &self.metrics_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                RunError::Config(format!(
                    "cannot create output directory '{}': {e}",
                    dir.display(),
                ))
            })?;
        }

        let engine = PipelineResolver::resolve(&self.config)?;
        let resolved_source = PipelineResolver::resolved_source(&self.config);

        let prepared = ImagePreprocessor::new(self.config.width, self.config.height)
            .prepare(&self.config.image_input)
            .await?;

        let mut recorder = StepTimingRecorder::new();
        let request = EditRequest {
            images: vec![prepared],
            prompt: self.config.prompt_positive.clone(),
            negative_prompt: self.config.prompt_negative.clone(),
            generator: rand::rngs::StdRng::seed_from_u64(self.config.seed),
            guidance_scale: self.config.guidance_scale,
            num_steps: self.config.steps,
            height: self.config.height,
            width: self.config.width,
            observed_tensor_inputs: Vec::new(),
        };

        // Single inference invocation; inference-only execution, no
        // gradient bookkeeping.
        let output = engine
            .execute(request, &mut recorder)
            .map_err(RunError::Inference)?;

        let image = output.images.into_iter().next().ok_or_else(|| {
            RunError::Inference(EngineError::Execution(
                "engine produced no output image".into(),
            ))
        })?;

        let table = MetricsTable::new(
            &run_id,
            self.config.model_type.as_str(),
            &resolved_source,
            recorder.into_records(),
        );
        RunArtifactWriter::write(&artifacts, &image, &table)?;

        tracing::info!("run {run_id}: complete ({} timed steps)", table.records().len());
        Ok(RunReport { run_id, artifacts, resolved_source, table })
    }
}
