// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runner
//!
//! Orchestration for a single generative image-edit inference run.
//!
//! A run wires five pieces together:
//! - [`PipelineResolver`] — maps (vendor, precision, optional explicit
//!   source) to a loaded engine, applying the default-source table.
//! - [`ImagePreprocessor`] — aspect-preserving canvas fit onto a black
//!   target-sized raster.
//! - [`StepTimingRecorder`] — the per-step latency observer injected into
//!   the inference loop.
//! - [`RunArtifactWriter`] — single-shot persistence of the output image
//!   and metrics table under one [`RunId`].
//! - [`RunOrchestrator`] — the top-level sequencing of all of the above.
//!
//! The process model is strictly one run per process: synchronous
//! long-running calls, no concurrency of its own, no caching of engine
//! handles across runs.

mod artifacts;
mod config;
mod error;
mod orchestrator;
mod preprocess;
mod resolver;
mod timing;

pub use artifacts::{
    MetricsTable, RunArtifactWriter, RunArtifacts, RunId, METRICS_DIR, METRICS_HEADER,
};
pub use config::{ModelType, RunConfig, Vendor, DEFAULT_IMAGE_INPUT};
pub use error::RunError;
pub use orchestrator::{RunOrchestrator, RunReport};
pub use preprocess::ImagePreprocessor;
pub use resolver::{PipelineResolver, VariantSpec, VARIANT_TABLE};
pub use timing::{StepRecord, StepTimingRecorder};
