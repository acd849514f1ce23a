// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model-variant resolution across the vendor × precision matrix.
//!
//! Dispatch is a lookup table, not branching logic: each supported
//! (vendor, model type) pair is one [`VariantSpec`] row carrying its default
//! source and assembly inputs, so adding a variant is a data change.
//!
//! Loading policy per precision:
//! - **vanilla** — the complete model from the resolved source at fixed
//!   bf16 precision.
//! - **gguf** — only the transformer sub-module from the packed quantized
//!   file, assembled with the remaining components from the vendor's
//!   canonical full-precision repo. Auxiliary components (text encoders,
//!   schedulers) stay at their default precision.

use crate::{ModelType, RunConfig, RunError, Vendor};
use engine::{ComputeDtype, DiffusionEngine, EngineBuilder, QuantizationConfig, TransformerModule};

/// One row of the variant dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct VariantSpec {
    pub vendor: Vendor,
    pub model_type: ModelType,
    /// Source used when no explicit locator is configured.
    pub default_source: &'static str,
    /// Canonical full-precision repo supplying non-quantized components.
    pub base_repo: &'static str,
    /// Repo supplying the transformer architecture config for packed files.
    pub transformer_config: &'static str,
}

/// The four supported variants.
pub const VARIANT_TABLE: [VariantSpec; 4] = [
    VariantSpec {
        vendor: Vendor::QwenImageEditPlus,
        model_type: ModelType::Vanilla,
        default_source: "Qwen/Qwen-Image-Edit-2509",
        base_repo: "Qwen/Qwen-Image-Edit-2509",
        transformer_config: "callgg/image-edit-plus",
    },
    VariantSpec {
        vendor: Vendor::QwenImageEditPlus,
        model_type: ModelType::Gguf,
        default_source:
            "https://huggingface.co/calcuis/qwen-image-edit-plus-gguf/blob/main/qwen-image-edit-plus-v2-iq4_nl.gguf",
        base_repo: "Qwen/Qwen-Image-Edit-2509",
        transformer_config: "callgg/image-edit-plus",
    },
    VariantSpec {
        vendor: Vendor::FluxKontext,
        model_type: ModelType::Vanilla,
        default_source: "black-forest-labs/FLUX.1-Kontext-dev",
        base_repo: "black-forest-labs/FLUX.1-Kontext-dev",
        transformer_config: "black-forest-labs/FLUX.1-Kontext-dev",
    },
    VariantSpec {
        vendor: Vendor::FluxKontext,
        model_type: ModelType::Gguf,
        default_source:
            "https://huggingface.co/calcuis/kontext-gguf/blob/main/flux-kontext-lite-q8_0.gguf",
        base_repo: "black-forest-labs/FLUX.1-Kontext-dev",
        transformer_config: "black-forest-labs/FLUX.1-Kontext-dev",
    },
];

/// Fixed compute precision for both loading paths.
const COMPUTE_DTYPE: ComputeDtype = ComputeDtype::Bf16;

/// Maps a (vendor, model type, optional explicit source) tuple to a loaded,
/// device-bound [`DiffusionEngine`].
pub struct PipelineResolver;

impl PipelineResolver {
    /// Looks up the dispatch row for a variant. Every (vendor, model type)
    /// combination has exactly one row.
    pub fn variant(vendor: Vendor, model_type: ModelType) -> &'static VariantSpec {
        VARIANT_TABLE
            .iter()
            .find(|v| v.vendor == vendor && v.model_type == model_type)
            .expect("variant table covers the full vendor x model-type matrix")
    }

    /// The default source locator for a variant.
    pub fn default_source(vendor: Vendor, model_type: ModelType) -> &'static str {
        Self::variant(vendor, model_type).default_source
    }

    /// The source a configuration will actually load from: the explicit
    /// locator when given, the variant default otherwise.
    pub fn resolved_source(config: &RunConfig) -> String {
        config.model_path.clone().unwrap_or_else(|| {
            Self::default_source(config.vendor, config.model_type).to_string()
        })
    }

    /// Builds a ready-to-execute engine for the configured variant.
    ///
    /// Fatal when the source cannot be opened or the packed quantized file
    /// is rejected; no partial engine state survives a failed resolution.
    pub fn resolve(config: &RunConfig) -> Result<DiffusionEngine, RunError> {
        let spec = Self::variant(config.vendor, config.model_type);
        let source = Self::resolved_source(config);
        let device = config.resolve_device()?;

        tracing::info!(
            "resolving {} / {} from '{source}'",
            config.vendor,
            config.model_type,
        );

        let builder = match config.model_type {
            ModelType::Vanilla => EngineBuilder::from_pretrained(&source, COMPUTE_DTYPE)
                .map_err(RunError::Resolution)?,
            ModelType::Gguf => {
                let transformer = TransformerModule::from_single_file(
                    &source,
                    QuantizationConfig { compute_dtype: COMPUTE_DTYPE },
                    spec.transformer_config,
                )
                .map_err(RunError::Resolution)?;
                EngineBuilder::from_pretrained(spec.base_repo, COMPUTE_DTYPE)
                    .map_err(RunError::Resolution)?
                    .with_transformer(transformer)
            }
        };

        Ok(builder.to_device(device).disable_progress().build())
    }
}
