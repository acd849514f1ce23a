// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end run orchestration.
//!
//! These exercise the complete flow from configuration → resolution →
//! preprocessing → execution → persistence, including the all-or-nothing
//! failure behaviour.

use runner::{ModelType, RunConfig, RunError, RunOrchestrator, Vendor, METRICS_HEADER};
use std::path::{Path, PathBuf};

// ── Helpers ────────────────────────────────────────────────────

/// Creates a fresh scratch directory tree for one test.
fn scratch(name: &str) -> (PathBuf, PathBuf) {
    let root = std::env::temp_dir().join(format!("imgedit_it_{name}"));
    let _ = std::fs::remove_dir_all(&root);
    let images = root.join("output_images");
    let metrics = root.join("output_metrics");
    std::fs::create_dir_all(&root).unwrap();
    (images, metrics)
}

/// Writes a solid-colour PNG input image and returns its path.
fn solid_input(dir: &Path, width: u32, height: u32) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join("input.png");
    image::RgbImage::from_pixel(width, height, image::Rgb([90, 140, 200]))
        .save(&path)
        .unwrap();
    path
}

fn base_config(images: &Path, input: &Path) -> RunConfig {
    let mut config = RunConfig::for_vendor(Vendor::QwenImageEditPlus);
    config.image_input = input.to_string_lossy().into_owned();
    config.image_output_dir = images.to_path_buf();
    config.device = "cpu".into();
    config.steps = 3;
    config.seed = 0;
    config.height = 64;
    config.width = 64;
    config
}

fn dir_file_count(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

// ── End-to-End ─────────────────────────────────────────────────

#[tokio::test]
async fn test_end_to_end_vanilla_run() {
    let (images, metrics) = scratch("e2e");
    let input = solid_input(&images.parent().unwrap().join("in"), 32, 32);

    let report = RunOrchestrator::new(base_config(&images, &input))
        .with_metrics_dir(&metrics)
        .execute()
        .await
        .unwrap();

    // Both artifacts exist and share the run-id stem.
    assert!(report.artifacts.image_path.is_file());
    assert!(report.artifacts.metrics_path.is_file());
    assert_eq!(
        report.artifacts.image_path.file_stem(),
        report.artifacts.metrics_path.file_stem(),
    );
    assert_eq!(
        report.artifacts.image_path.file_stem().unwrap().to_str().unwrap(),
        report.run_id.to_string(),
    );

    // Output raster is exactly the configured canvas.
    let output = image::open(&report.artifacts.image_path).unwrap();
    assert_eq!(output.width(), 64);
    assert_eq!(output.height(), 64);

    // 3 steps → step 0 is the clock origin → exactly 2 data rows.
    let csv = std::fs::read_to_string(&report.artifacts.metrics_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], METRICS_HEADER);
    assert_eq!(report.records().len(), 2);

    for (line, record) in lines[1..].iter().zip(report.records()) {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], report.run_id.to_string());
        assert_eq!(fields[1], "vanilla");
        assert_eq!(fields[2], "Qwen/Qwen-Image-Edit-2509");
        assert_eq!(fields[3], record.step.to_string());
        let elapsed: f64 = fields[5].parse().unwrap();
        assert!(elapsed >= 0.0);
        assert!((elapsed - record.elapsed_secs).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_sequential_runs_do_not_collide() {
    let (images, metrics) = scratch("unique");
    let input = solid_input(&images.parent().unwrap().join("in"), 16, 16);

    let first = RunOrchestrator::new(base_config(&images, &input))
        .with_metrics_dir(&metrics)
        .execute()
        .await
        .unwrap();
    let second = RunOrchestrator::new(base_config(&images, &input))
        .with_metrics_dir(&metrics)
        .execute()
        .await
        .unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_ne!(first.artifacts.image_path, second.artifacts.image_path);
    assert!(first.artifacts.image_path.is_file());
    assert!(second.artifacts.image_path.is_file());
    assert_eq!(dir_file_count(&images), 2);
    assert_eq!(dir_file_count(&metrics), 2);
}

#[tokio::test]
async fn test_identical_seeds_reproduce_output() {
    let (images, metrics) = scratch("seeded");
    let input = solid_input(&images.parent().unwrap().join("in"), 16, 16);

    let a = RunOrchestrator::new(base_config(&images, &input))
        .with_metrics_dir(&metrics)
        .execute()
        .await
        .unwrap();
    let b = RunOrchestrator::new(base_config(&images, &input))
        .with_metrics_dir(&metrics)
        .execute()
        .await
        .unwrap();

    let img_a = image::open(&a.artifacts.image_path).unwrap().to_rgb8();
    let img_b = image::open(&b.artifacts.image_path).unwrap().to_rgb8();
    assert_eq!(img_a.as_raw(), img_b.as_raw());
}

#[tokio::test]
async fn test_zero_steps_yields_header_only_metrics() {
    let (images, metrics) = scratch("zerostep");
    let input = solid_input(&images.parent().unwrap().join("in"), 16, 16);

    let mut config = base_config(&images, &input);
    config.steps = 0;

    let report = RunOrchestrator::new(config)
        .with_metrics_dir(&metrics)
        .execute()
        .await
        .unwrap();

    assert!(report.records().is_empty());
    let csv = std::fs::read_to_string(&report.artifacts.metrics_path).unwrap();
    assert_eq!(csv, format!("{METRICS_HEADER}\n"));
}

// ── Failure Paths ──────────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_quantized_source_writes_nothing() {
    let (images, metrics) = scratch("badgguf");
    let input = solid_input(&images.parent().unwrap().join("in"), 16, 16);

    let mut config = base_config(&images, &input);
    config.model_type = ModelType::Gguf;
    config.model_path = Some("./definitely/missing/pack.gguf".into());

    let err = RunOrchestrator::new(config)
        .with_metrics_dir(&metrics)
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Resolution(_)));
    // Neither output directory gained a file.
    assert_eq!(dir_file_count(&images), 0);
    assert_eq!(dir_file_count(&metrics), 0);
}

#[tokio::test]
async fn test_rejected_quantized_format_writes_nothing() {
    let (images, metrics) = scratch("rejgguf");
    let root = images.parent().unwrap().to_path_buf();
    let input = solid_input(&root.join("in"), 16, 16);

    let packed = root.join("broken.gguf");
    std::fs::write(&packed, b"not a packed quantized file").unwrap();

    let mut config = base_config(&images, &input);
    config.model_type = ModelType::Gguf;
    config.model_path = Some(packed.to_string_lossy().into_owned());

    let err = RunOrchestrator::new(config)
        .with_metrics_dir(&metrics)
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Resolution(_)));
    assert_eq!(dir_file_count(&images), 0);
    assert_eq!(dir_file_count(&metrics), 0);
}

#[tokio::test]
async fn test_missing_input_image_fails_before_inference() {
    let (images, metrics) = scratch("badimg");

    let mut config = base_config(&images, Path::new("./no/such/image.png"));
    config.image_input = "./no/such/image.png".into();

    let err = RunOrchestrator::new(config)
        .with_metrics_dir(&metrics)
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::ImageFetch(_)));
    assert_eq!(dir_file_count(&images), 0);
    assert_eq!(dir_file_count(&metrics), 0);
}

#[tokio::test]
async fn test_invalid_configuration_rejected_up_front() {
    let (images, metrics) = scratch("badcfg");
    let input = solid_input(&images.parent().unwrap().join("in"), 16, 16);

    let mut config = base_config(&images, &input);
    config.width = 0;

    let err = RunOrchestrator::new(config)
        .with_metrics_dir(&metrics)
        .execute()
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Config(_)));
}

// ── Config Roundtrip ───────────────────────────────────────────

#[test]
fn test_config_toml_roundtrip() {
    let config = RunConfig::for_vendor(Vendor::FluxKontext);
    let toml = config.to_toml().unwrap();
    let back = RunConfig::from_toml(&toml).unwrap();
    assert_eq!(back.vendor, config.vendor);
    assert_eq!(back.model_type, config.model_type);
    assert_eq!(back.image_input, config.image_input);
}
