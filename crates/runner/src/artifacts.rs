// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run-identified artifact persistence.
//!
//! Each run writes exactly two artifacts, bound together by one
//! [`RunId`]: `<image_dir>/<run_id>.png` and
//! `output_metrics/<run_id>.csv`. Both are buffered fully in memory and
//! written single-shot after inference succeeds — no partial file is ever
//! observable, and a failed run leaves both directories untouched.

use crate::{RunError, StepRecord};
use image::RgbImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Fixed directory for metrics tables.
pub const METRICS_DIR: &str = "output_metrics";

/// CSV header row of the metrics table.
pub const METRICS_HEADER: &str = "run_id,model_type,model_path,step,timestamp,time_sec";

/// Globally unique token binding one run's artifacts together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunId(uuid::Uuid);

impl RunId {
    /// Generates a fresh identifier. Two runs never collide.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The two output paths of a run, derived deterministically from its id.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    /// `<image_dir>/<run_id>.png`
    pub image_path: PathBuf,
    /// `<metrics_dir>/<run_id>.csv`
    pub metrics_path: PathBuf,
}

impl RunArtifacts {
    /// Derives both paths under the given directories. Both filenames share
    /// the run id as their stem.
    pub fn derive(run_id: &RunId, image_dir: &Path, metrics_dir: &Path) -> Self {
        Self {
            image_path: image_dir.join(format!("{run_id}.png")),
            metrics_path: metrics_dir.join(format!("{run_id}.csv")),
        }
    }
}

/// The per-step metrics table of one run, formatted for the CSV artifact
/// and console output.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    run_id: String,
    model_type: String,
    model_path: String,
    records: Vec<StepRecord>,
}

impl MetricsTable {
    /// Builds the table from a run's identity and recorded steps.
    pub fn new(
        run_id: &RunId,
        model_type: &str,
        model_path: &str,
        records: Vec<StepRecord>,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            model_type: model_type.to_string(),
            model_path: model_path.to_string(),
            records,
        }
    }

    /// The recorded steps backing this table.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// One formatted data row per record; elapsed time fixed to 6 decimals.
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        self.records.iter().map(|r| {
            format!(
                "{},{},{},{},{},{:.6}",
                self.run_id, self.model_type, self.model_path, r.step, r.timestamp, r.elapsed_secs,
            )
        })
    }

    /// The full CSV document: header plus one row per record.
    pub fn to_csv(&self) -> String {
        let mut out = String::from(METRICS_HEADER);
        out.push('\n');
        for row in self.rows() {
            out.push_str(&row);
            out.push('\n');
        }
        out
    }
}

/// Persists the two artifacts of a successful run.
pub struct RunArtifactWriter;

impl RunArtifactWriter {
    /// Writes the output image (lossless PNG) and the metrics table.
    ///
    /// Both payloads are encoded in memory first; each path is then written
    /// exactly once. Failure here means compute already succeeded and only
    /// persistence was lost, which the error class reflects.
    pub fn write(
        artifacts: &RunArtifacts,
        image: &RgbImage,
        table: &MetricsTable,
    ) -> Result<(), RunError> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| RunError::Persistence {
                path: artifacts.image_path.clone(),
                detail: format!("PNG encode failed: {e}"),
            })?;

        let csv = table.to_csv();

        std::fs::write(&artifacts.image_path, &png).map_err(|e| RunError::Persistence {
            path: artifacts.image_path.clone(),
            detail: e.to_string(),
        })?;
        tracing::info!("image saved to {}", artifacts.image_path.display());

        std::fs::write(&artifacts.metrics_path, csv).map_err(|e| RunError::Persistence {
            path: artifacts.metrics_path.clone(),
            detail: e.to_string(),
        })?;
        tracing::info!("metrics saved to {}", artifacts.metrics_path.display());

        Ok(())
    }
}
