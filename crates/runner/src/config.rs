// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! vendor = "qwen-image-edit-plus"
//! model_type = "vanilla"
//! image_input = "./cat.png"
//! image_output_dir = "output_images"
//! prompt_positive = "replace the cat with a dalmatian"
//! prompt_negative = ""
//! seed = 0
//! guidance_scale = 4.0
//! steps = 10
//! height = 1024
//! width = 1024
//! device = "accelerator"
//! ```

use crate::RunError;
use engine::ComputeDevice;
use std::path::{Path, PathBuf};

/// Default input image when none is configured: a public sample.
pub const DEFAULT_IMAGE_INPUT: &str =
    "https://huggingface.co/datasets/huggingface/documentation-images/resolve/main/diffusers/cat.png";

/// The generative model family being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Vendor {
    QwenImageEditPlus,
    FluxKontext,
}

impl Vendor {
    /// Returns the vendor as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::QwenImageEditPlus => "qwen-image-edit-plus",
            Vendor::FluxKontext => "flux-kontext",
        }
    }

    /// Parses a vendor name, accepting the upstream pipeline class names as
    /// aliases.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "qwen-image-edit-plus" | "qwenimageeditpluspipeline" | "qwen" => {
                Some(Vendor::QwenImageEditPlus)
            }
            "flux-kontext" | "fluxkontextpipeline" | "flux" => Some(Vendor::FluxKontext),
            _ => None,
        }
    }

    /// All supported vendors.
    pub fn all() -> [Vendor; 2] {
        [Vendor::QwenImageEditPlus, Vendor::FluxKontext]
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the model loads at full precision or from a packed quantized
/// file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Full-precision load from the canonical source.
    Vanilla,
    /// Quantized transformer from a single packed GGUF file, assembled with
    /// full-precision auxiliary components.
    Gguf,
}

impl ModelType {
    /// Returns the model type as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Vanilla => "vanilla",
            ModelType::Gguf => "gguf",
        }
    }

    /// Parses a model type name.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "vanilla" | "full" => Some(ModelType::Vanilla),
            "gguf" => Some(ModelType::Gguf),
            _ => None,
        }
    }

    /// All supported model types.
    pub fn all() -> [ModelType; 2] {
        [ModelType::Vanilla, ModelType::Gguf]
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a single inference run.
///
/// Constructed once from the CLI or a TOML file and never mutated.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunConfig {
    /// Model vendor (required).
    pub vendor: Vendor,
    /// Precision type.
    #[serde(default = "default_model_type")]
    pub model_type: ModelType,
    /// Explicit model source locator (path, URL, or hub repo id). When
    /// absent, the per-(vendor, model type) default is used.
    #[serde(default)]
    pub model_path: Option<String>,
    /// Path or URL of the input image.
    #[serde(default = "default_image_input")]
    pub image_input: String,
    /// Directory for the output image.
    #[serde(default = "default_image_output_dir")]
    pub image_output_dir: PathBuf,
    /// Positive prompt (what to add/replace).
    #[serde(default = "default_prompt_positive")]
    pub prompt_positive: String,
    /// Negative prompt (what to avoid).
    #[serde(default)]
    pub prompt_negative: String,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub seed: u64,
    /// Classifier-free guidance scale.
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,
    /// Number of inference steps.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Output image height.
    #[serde(default = "default_dimension")]
    pub height: u32,
    /// Output image width.
    #[serde(default = "default_dimension")]
    pub width: u32,
    /// Compute target: `"cpu"` or `"accelerator"` (aliases accepted).
    #[serde(default = "default_device")]
    pub device: String,
}

fn default_model_type() -> ModelType {
    ModelType::Vanilla
}
fn default_image_input() -> String {
    DEFAULT_IMAGE_INPUT.to_string()
}
fn default_image_output_dir() -> PathBuf {
    PathBuf::from("output_images")
}
fn default_prompt_positive() -> String {
    "replace the cat with a dalmatian".to_string()
}
fn default_guidance_scale() -> f32 {
    4.0
}
fn default_steps() -> usize {
    10
}
fn default_dimension() -> u32 {
    1024
}
fn default_device() -> String {
    "accelerator".to_string()
}

impl RunConfig {
    /// A configuration with every field at its documented default.
    pub fn for_vendor(vendor: Vendor) -> Self {
        Self {
            vendor,
            model_type: default_model_type(),
            model_path: None,
            image_input: default_image_input(),
            image_output_dir: default_image_output_dir(),
            prompt_positive: default_prompt_positive(),
            prompt_negative: String::new(),
            seed: 0,
            guidance_scale: default_guidance_scale(),
            steps: default_steps(),
            height: default_dimension(),
            width: default_dimension(),
            device: default_device(),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RunError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RunError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RunError> {
        toml::from_str(toml_str).map_err(|e| RunError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RunError> {
        toml::to_string_pretty(self)
            .map_err(|e| RunError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the configured compute target.
    pub fn resolve_device(&self) -> Result<ComputeDevice, RunError> {
        ComputeDevice::from_str_loose(&self.device).ok_or_else(|| {
            RunError::Config(format!(
                "unknown device '{}'; expected 'cpu' or 'accelerator'",
                self.device,
            ))
        })
    }

    /// Checks the configuration for values no run can satisfy.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.height == 0 || self.width == 0 {
            return Err(RunError::Config(format!(
                "output dimensions must be non-zero, got {}x{}",
                self.width, self.height,
            )));
        }
        if !self.guidance_scale.is_finite() || self.guidance_scale < 0.0 {
            return Err(RunError::Config(format!(
                "guidance scale must be finite and non-negative, got {}",
                self.guidance_scale,
            )));
        }
        self.resolve_device()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = RunConfig::for_vendor(Vendor::QwenImageEditPlus);
        assert_eq!(c.model_type, ModelType::Vanilla);
        assert_eq!(c.seed, 0);
        assert_eq!(c.guidance_scale, 4.0);
        assert_eq!(c.steps, 10);
        assert_eq!(c.height, 1024);
        assert_eq!(c.width, 1024);
        assert_eq!(c.device, "accelerator");
        assert_eq!(c.image_output_dir, PathBuf::from("output_images"));
        assert!(c.model_path.is_none());
        c.validate().unwrap();
    }

    #[test]
    fn test_from_toml_minimal() {
        let c = RunConfig::from_toml("vendor = \"flux-kontext\"").unwrap();
        assert_eq!(c.vendor, Vendor::FluxKontext);
        assert_eq!(c.model_type, ModelType::Vanilla);
        assert_eq!(c.image_input, DEFAULT_IMAGE_INPUT);
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
vendor = "qwen-image-edit-plus"
model_type = "gguf"
model_path = "/models/edit.gguf"
image_input = "./cat.png"
seed = 42
steps = 3
height = 64
width = 64
device = "cpu"
"#;
        let c = RunConfig::from_toml(toml).unwrap();
        assert_eq!(c.model_type, ModelType::Gguf);
        assert_eq!(c.model_path.as_deref(), Some("/models/edit.gguf"));
        assert_eq!(c.seed, 42);
        assert_eq!(c.resolve_device().unwrap(), ComputeDevice::Cpu);
    }

    #[test]
    fn test_toml_roundtrip() {
        let c = RunConfig::for_vendor(Vendor::FluxKontext);
        let toml = c.to_toml().unwrap();
        let back = RunConfig::from_toml(&toml).unwrap();
        assert_eq!(back.vendor, c.vendor);
        assert_eq!(back.model_type, c.model_type);
        assert_eq!(back.steps, c.steps);
    }

    #[test]
    fn test_vendor_aliases() {
        assert_eq!(
            Vendor::from_str_loose("QwenImageEditPlusPipeline"),
            Some(Vendor::QwenImageEditPlus)
        );
        assert_eq!(Vendor::from_str_loose("flux"), Some(Vendor::FluxKontext));
        assert_eq!(Vendor::from_str_loose("sdxl"), None);
    }

    #[test]
    fn test_model_type_aliases() {
        assert_eq!(ModelType::from_str_loose("GGUF"), Some(ModelType::Gguf));
        assert_eq!(ModelType::from_str_loose("full"), Some(ModelType::Vanilla));
        assert_eq!(ModelType::from_str_loose("int4"), None);
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let mut c = RunConfig::for_vendor(Vendor::QwenImageEditPlus);
        c.height = 0;
        assert!(matches!(c.validate(), Err(RunError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_device() {
        let mut c = RunConfig::for_vendor(Vendor::QwenImageEditPlus);
        c.device = "tpu".into();
        assert!(matches!(c.validate(), Err(RunError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_negative_guidance() {
        let mut c = RunConfig::for_vendor(Vendor::QwenImageEditPlus);
        c.guidance_scale = -1.0;
        assert!(matches!(c.validate(), Err(RunError::Config(_))));
    }
}
