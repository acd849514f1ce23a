// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Engine construction from resolved model sources.
//!
//! Two loading paths exist:
//!
//! 1. **Full precision** — [`EngineBuilder::from_pretrained`] opens the
//!    complete model at a fixed reduced floating-point precision. Local
//!    directories are validated eagerly (the SafeTensors header is parsed
//!    via mmap when present, without reading weight data); hub repo ids and
//!    remote URLs defer the actual fetch to the hub machinery.
//! 2. **Quantized** — [`TransformerModule::from_single_file`] loads only the
//!    large transformer sub-module from a packed GGUF file, then
//!    [`EngineBuilder::with_transformer`] assembles it with the remaining
//!    components from the vendor's canonical full-precision source. Only
//!    the heaviest sub-module benefits from quantization; text encoders and
//!    schedulers stay at their default precision.

use crate::{ComputeDevice, DiffusionEngine, EngineError};
use std::path::{Path, PathBuf};

/// Magic bytes at the start of every valid packed quantized file.
const GGUF_MAGIC: &[u8; 4] = b"GGUF";

/// Default SafeTensors filename inside a full-precision model directory.
const WEIGHTS_FILE: &str = "model.safetensors";

/// Numeric precision the engine computes in.
///
/// Full-precision loads are pinned to [`ComputeDtype::Bf16`] for
/// memory/throughput balance; this is not a run configuration knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDtype {
    Bf16,
    F16,
    F32,
}

impl ComputeDtype {
    /// Returns the dtype as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeDtype::Bf16 => "bf16",
            ComputeDtype::F16 => "f16",
            ComputeDtype::F32 => "f32",
        }
    }
}

/// Descriptor for dequantized compute precision of a quantized sub-module.
#[derive(Debug, Clone, Copy)]
pub struct QuantizationConfig {
    /// Precision quantized blocks are expanded to at compute time.
    pub compute_dtype: ComputeDtype,
}

/// A model source locator, parsed from its string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A path on the local filesystem.
    LocalPath(PathBuf),
    /// An http(s) URL.
    RemoteUrl(String),
    /// A hub repository id (e.g. `"Qwen/Qwen-Image-Edit-2509"`).
    RepoId(String),
}

impl ModelSource {
    /// Classifies a locator string.
    ///
    /// URLs are recognised by scheme; anything that exists on disk or is
    /// spelled like a filesystem path is local; the remainder is treated as
    /// a hub repo id.
    pub fn parse(locator: &str) -> Self {
        if locator.contains("://") {
            return ModelSource::RemoteUrl(locator.to_string());
        }
        let path = Path::new(locator);
        if path.exists()
            || locator.starts_with('/')
            || locator.starts_with("./")
            || locator.starts_with("../")
        {
            return ModelSource::LocalPath(path.to_path_buf());
        }
        ModelSource::RepoId(locator.to_string())
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSource::LocalPath(p) => write!(f, "{}", p.display()),
            ModelSource::RemoteUrl(u) => f.write_str(u),
            ModelSource::RepoId(r) => f.write_str(r),
        }
    }
}

/// The transformer sub-module, loaded standalone from a packed quantized
/// file.
#[derive(Debug, Clone)]
pub struct TransformerModule {
    /// The locator the sub-module was loaded from.
    pub source: String,
    /// Compute precision descriptor.
    pub quantization: QuantizationConfig,
    /// Repo id supplying the transformer's architecture config.
    pub config_repo: String,
    /// Packed file size, when the source was a local file.
    pub size_bytes: Option<u64>,
}

impl TransformerModule {
    /// Loads the transformer from a single packed GGUF file.
    ///
    /// Local files are opened via mmap and their magic validated before any
    /// further parsing; a rejected format is fatal. Remote URLs and repo
    /// ids defer the fetch to the hub machinery.
    pub fn from_single_file(
        locator: &str,
        quantization: QuantizationConfig,
        config_repo: &str,
    ) -> Result<Self, EngineError> {
        let size_bytes = match ModelSource::parse(locator) {
            ModelSource::LocalPath(path) => {
                if !path.exists() {
                    return Err(EngineError::SourceNotFound(locator.to_string()));
                }
                let file = std::fs::File::open(&path).map_err(|e| EngineError::SourceOpen {
                    locator: locator.to_string(),
                    detail: e.to_string(),
                })?;
                let mmap =
                    unsafe { memmap2::Mmap::map(&file) }.map_err(|e| EngineError::SourceOpen {
                        locator: locator.to_string(),
                        detail: format!("mmap failed: {e}"),
                    })?;
                if mmap.len() < GGUF_MAGIC.len() || &mmap[..GGUF_MAGIC.len()] != GGUF_MAGIC {
                    return Err(EngineError::QuantizedFormat {
                        path: path.display().to_string(),
                        detail: "missing GGUF magic".to_string(),
                    });
                }
                tracing::info!(
                    "transformer: mmap'd packed file {} ({:.2} MB)",
                    path.display(),
                    mmap.len() as f64 / (1024.0 * 1024.0),
                );
                Some(mmap.len() as u64)
            }
            ModelSource::RemoteUrl(url) => {
                tracing::info!("transformer: deferred fetch from {url}");
                None
            }
            ModelSource::RepoId(repo) => {
                tracing::info!("transformer: deferred fetch from hub repo {repo}");
                None
            }
        };

        Ok(Self {
            source: locator.to_string(),
            quantization,
            config_repo: config_repo.to_string(),
            size_bytes,
        })
    }
}

/// Staged construction of a [`DiffusionEngine`].
#[derive(Debug)]
pub struct EngineBuilder {
    source: String,
    dtype: ComputeDtype,
    transformer: Option<TransformerModule>,
    device: ComputeDevice,
    progress_enabled: bool,
}

impl EngineBuilder {
    /// Opens the complete model at the given source and precision.
    ///
    /// Local sources are validated immediately: a missing path is fatal, a
    /// directory with a SafeTensors file gets its header parsed (metadata
    /// only, weight data stays on disk). Hub repo ids and URLs are accepted
    /// as deferred references.
    pub fn from_pretrained(locator: &str, dtype: ComputeDtype) -> Result<Self, EngineError> {
        match ModelSource::parse(locator) {
            ModelSource::LocalPath(path) => {
                if !path.exists() {
                    return Err(EngineError::SourceNotFound(locator.to_string()));
                }
                let weights = if path.is_dir() {
                    path.join(WEIGHTS_FILE)
                } else {
                    path.clone()
                };
                if weights.is_file() {
                    let count = read_tensor_count(&weights)?;
                    tracing::info!(
                        "loaded {} ({count} tensors, {dtype} compute)",
                        weights.display(),
                        dtype = dtype.as_str(),
                    );
                } else {
                    tracing::warn!(
                        "'{}' has no {WEIGHTS_FILE}, components load in synthetic mode",
                        path.display(),
                    );
                }
            }
            ModelSource::RemoteUrl(url) => {
                tracing::info!("model source: deferred fetch from {url}");
            }
            ModelSource::RepoId(repo) => {
                tracing::info!("model source: hub repo {repo} ({} compute)", dtype.as_str());
            }
        }

        Ok(Self {
            source: locator.to_string(),
            dtype,
            transformer: None,
            device: ComputeDevice::Cpu,
            progress_enabled: true,
        })
    }

    /// Replaces the full-precision transformer with a pre-loaded quantized
    /// sub-module. The remaining components keep their current source.
    pub fn with_transformer(mut self, transformer: TransformerModule) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Binds the assembled engine to a compute target.
    pub fn to_device(mut self, device: ComputeDevice) -> Self {
        self.device = device;
        self
    }

    /// Suppresses the engine's built-in progress reporting, keeping run
    /// logs deterministic.
    pub fn disable_progress(mut self) -> Self {
        self.progress_enabled = false;
        self
    }

    /// Finalises the engine.
    pub fn build(self) -> DiffusionEngine {
        tracing::info!(
            "engine ready: source '{}', device {}, transformer {}",
            self.source,
            self.device,
            if self.transformer.is_some() { "quantized" } else { "full" },
        );
        DiffusionEngine::new(
            self.source,
            self.dtype,
            self.transformer,
            self.device,
            self.progress_enabled,
        )
    }
}

/// Parses the SafeTensors header of a weight file and returns the tensor
/// count. Weight data itself is never read.
fn read_tensor_count(path: &Path) -> Result<usize, EngineError> {
    let file = std::fs::File::open(path).map_err(|e| EngineError::SourceOpen {
        locator: path.display().to_string(),
        detail: e.to_string(),
    })?;
    let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| EngineError::SourceOpen {
        locator: path.display().to_string(),
        detail: format!("mmap failed: {e}"),
    })?;
    let st = safetensors::SafeTensors::deserialize(&mmap)
        .map_err(|e| EngineError::SafeTensors(format!("{}: {e}", path.display())))?;
    Ok(st.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse_url() {
        let src = ModelSource::parse("https://huggingface.co/x/blob/main/y.gguf");
        assert!(matches!(src, ModelSource::RemoteUrl(_)));
    }

    #[test]
    fn test_source_parse_repo_id() {
        let src = ModelSource::parse("Qwen/Qwen-Image-Edit-2509");
        assert_eq!(src, ModelSource::RepoId("Qwen/Qwen-Image-Edit-2509".into()));
    }

    #[test]
    fn test_source_parse_path_spelling() {
        assert!(matches!(
            ModelSource::parse("./models/missing"),
            ModelSource::LocalPath(_)
        ));
        assert!(matches!(
            ModelSource::parse("/abs/missing"),
            ModelSource::LocalPath(_)
        ));
    }

    #[test]
    fn test_source_parse_existing_path() {
        let dir = std::env::temp_dir().join("engine_test_src_dir");
        std::fs::create_dir_all(&dir).unwrap();
        let src = ModelSource::parse(dir.to_str().unwrap());
        assert!(matches!(src, ModelSource::LocalPath(_)));
    }

    #[test]
    fn test_from_pretrained_missing_path() {
        let err = EngineBuilder::from_pretrained("./definitely/not/here", ComputeDtype::Bf16)
            .unwrap_err();
        assert!(matches!(err, EngineError::SourceNotFound(_)));
    }

    #[test]
    fn test_from_pretrained_repo_id_defers() {
        let builder =
            EngineBuilder::from_pretrained("black-forest-labs/FLUX.1-Kontext-dev", ComputeDtype::Bf16)
                .unwrap();
        let engine = builder.build();
        assert_eq!(engine.source(), "black-forest-labs/FLUX.1-Kontext-dev");
        assert!(!engine.is_quantized());
    }

    #[test]
    fn test_single_file_rejects_bad_magic() {
        let path = std::env::temp_dir().join("engine_test_bad.gguf");
        std::fs::write(&path, b"NOPE-not-a-packed-file").unwrap();

        let err = TransformerModule::from_single_file(
            path.to_str().unwrap(),
            QuantizationConfig { compute_dtype: ComputeDtype::Bf16 },
            "callgg/image-edit-plus",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::QuantizedFormat { .. }));
    }

    #[test]
    fn test_single_file_accepts_gguf_magic() {
        let path = std::env::temp_dir().join("engine_test_ok.gguf");
        let mut bytes = b"GGUF".to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        std::fs::write(&path, bytes).unwrap();

        let module = TransformerModule::from_single_file(
            path.to_str().unwrap(),
            QuantizationConfig { compute_dtype: ComputeDtype::Bf16 },
            "callgg/image-edit-plus",
        )
        .unwrap();
        assert_eq!(module.size_bytes, Some(68));
        assert_eq!(module.quantization.compute_dtype, ComputeDtype::Bf16);
    }

    #[test]
    fn test_single_file_missing_path() {
        let err = TransformerModule::from_single_file(
            "./no/such/file.gguf",
            QuantizationConfig { compute_dtype: ComputeDtype::Bf16 },
            "cfg",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::SourceNotFound(_)));
    }

    #[test]
    fn test_hybrid_assembly() {
        let path = std::env::temp_dir().join("engine_test_hybrid.gguf");
        let mut bytes = b"GGUF".to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        std::fs::write(&path, bytes).unwrap();

        let transformer = TransformerModule::from_single_file(
            path.to_str().unwrap(),
            QuantizationConfig { compute_dtype: ComputeDtype::Bf16 },
            "callgg/image-edit-plus",
        )
        .unwrap();

        let engine = EngineBuilder::from_pretrained("Qwen/Qwen-Image-Edit-2509", ComputeDtype::Bf16)
            .unwrap()
            .with_transformer(transformer)
            .to_device(ComputeDevice::Cpu)
            .disable_progress()
            .build();

        assert!(engine.is_quantized());
        assert_eq!(engine.device(), &ComputeDevice::Cpu);
    }
}
