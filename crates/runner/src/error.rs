// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for run orchestration.
//!
//! The five classes mirror the phases of a run. All of them are fatal to
//! the run; nothing is retried or recovered locally, and no artifacts are
//! written on any failure path.

use std::path::PathBuf;

/// Errors that can occur during a single inference run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Invalid or inconsistent run configuration. Raised before any work
    /// begins.
    #[error("configuration error: {0}")]
    Config(String),

    /// The model source could not be resolved into a loadable engine.
    #[error("model resolution failed: {0}")]
    Resolution(#[source] engine::EngineError),

    /// The input image locator is unreachable or not a decodable raster
    /// image. Raised before the engine is invoked.
    #[error("input image unavailable: {0}")]
    ImageFetch(String),

    /// The engine failed during execution. No artifacts are written.
    #[error("inference failed: {0}")]
    Inference(#[source] engine::EngineError),

    /// Disk write failure after compute already completed. Distinct from
    /// the earlier classes: the inference result existed and was lost only
    /// at persistence time.
    #[error("inference succeeded but writing '{path}' failed: {detail}")]
    Persistence { path: PathBuf, detail: String },
}
