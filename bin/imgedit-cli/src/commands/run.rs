// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `imgedit-rt run` command: execute one inference run end to end.
//!
//! ```text
//! RunConfig → RunOrchestrator::execute → <uuid>.png + <uuid>.csv
//! ```
//!
//! Configuration comes from a TOML file when `--config` is given, from the
//! flag surface otherwise. The metrics table is echoed to stdout in the
//! same shape it is persisted in.

use clap::Args;
use runner::{ModelType, RunConfig, RunOrchestrator, Vendor, DEFAULT_IMAGE_INPUT, METRICS_HEADER};
use std::path::PathBuf;

/// Flag surface of the `run` subcommand, mirroring the TOML config fields.
#[derive(Args)]
pub struct RunArgs {
    /// Model vendor: qwen-image-edit-plus or flux-kontext (aliases: qwen, flux).
    #[arg(long)]
    pub vendor: Option<String>,

    /// Precision: vanilla or gguf.
    #[arg(long, default_value = "vanilla")]
    pub model_type: String,

    /// Explicit model source (path, URL, or hub repo id). Defaults per variant.
    #[arg(long)]
    pub model_path: Option<String>,

    /// Path or URL of the input image.
    #[arg(long)]
    pub image_input: Option<String>,

    /// Directory for the output image.
    #[arg(long, default_value = "output_images")]
    pub image_output_dir: PathBuf,

    /// Positive prompt.
    #[arg(short, long, default_value = "replace the cat with a dalmatian")]
    pub prompt: String,

    /// Negative prompt.
    #[arg(long, default_value = "")]
    pub negative_prompt: String,

    /// Random seed for reproducibility.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Classifier-free guidance scale.
    #[arg(long, default_value_t = 4.0)]
    pub guidance_scale: f32,

    /// Number of inference steps.
    #[arg(long, default_value_t = 10)]
    pub steps: usize,

    /// Output image height.
    #[arg(long, default_value_t = 1024)]
    pub height: u32,

    /// Output image width.
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Compute target: cpu or accelerator.
    #[arg(long, default_value = "accelerator")]
    pub device: String,
}

impl RunArgs {
    /// Builds the run configuration from the flag surface.
    fn into_config(self) -> anyhow::Result<RunConfig> {
        let vendor_name = self
            .vendor
            .ok_or_else(|| anyhow::anyhow!("--vendor is required (or pass --config)"))?;
        let vendor = Vendor::from_str_loose(&vendor_name)
            .ok_or_else(|| anyhow::anyhow!("unknown vendor '{vendor_name}'"))?;
        let model_type = ModelType::from_str_loose(&self.model_type)
            .ok_or_else(|| anyhow::anyhow!("unknown model type '{}'", self.model_type))?;

        Ok(RunConfig {
            vendor,
            model_type,
            model_path: self.model_path,
            image_input: self.image_input.unwrap_or_else(|| DEFAULT_IMAGE_INPUT.to_string()),
            image_output_dir: self.image_output_dir,
            prompt_positive: self.prompt,
            prompt_negative: self.negative_prompt,
            seed: self.seed,
            guidance_scale: self.guidance_scale,
            steps: self.steps,
            height: self.height,
            width: self.width,
            device: self.device,
        })
    }
}

pub async fn execute(config_path: Option<PathBuf>, args: RunArgs) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            imgedit-rt · Inference Runner            ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    let config = match config_path {
        Some(path) => {
            tracing::info!("loading configuration from {}", path.display());
            RunConfig::from_file(&path)?
        }
        None => args.into_config()?,
    };
    tracing::debug!("effective configuration: {config:?}");

    println!("  Config:");
    println!("   Vendor:   {}", config.vendor);
    println!("   Type:     {}", config.model_type);
    println!(
        "   Source:   {}",
        runner::PipelineResolver::resolved_source(&config),
    );
    println!("   Input:    {}", truncate(&config.image_input, 60));
    println!("   Prompt:   \"{}\"", truncate(&config.prompt_positive, 50));
    println!("   Canvas:   {}x{}", config.width, config.height);
    println!("   Steps:    {} (seed {})", config.steps, config.seed);
    println!("   Device:   {}", config.device);
    println!();

    // ── Run ────────────────────────────────────────────────────
    println!("  Executing run ({} steps)...", config.steps);
    let report = match RunOrchestrator::new(config).execute().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("run failed: {e}");
            return Err(e.into());
        }
    };
    tracing::info!(
        "run {} complete: {} timed steps",
        report.run_id,
        report.records().len(),
    );
    println!();

    // ── Results ────────────────────────────────────────────────
    println!("  Results:");
    println!("   Run id:   {}", report.run_id);
    println!("   Image:    {}", report.artifacts.image_path.display());
    println!("   Metrics:  {}", report.artifacts.metrics_path.display());
    println!();

    println!("  Step timings ({} rows):", report.records().len());
    println!("   {METRICS_HEADER}");
    for row in report.table.rows() {
        println!("   {row}");
    }
    println!();

    Ok(())
}

/// Truncates a string with ellipsis. Counts chars, not bytes, so multibyte
/// prompts and locators never split inside a code point.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
