// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The reference engine: a deterministic step-loop implementation of the
//! engine contract.
//!
//! Real forward passes are owned by the external modeling library; this
//! implementation keeps the contract honest end-to-end — it drives the
//! iterative refinement loop, consumes the seeded generator, honours the
//! guidance scale, and invokes the step observer with real scheduler
//! timesteps — while the per-step computation itself is a seeded pixel
//! transform rather than a neural network.

use crate::{
    ComputeDevice, ComputeDtype, EditOutput, EditRequest, EngineError, StepContext, StepObserver,
    StepState, TransformerModule,
};
use image::RgbImage;
use rand::Rng;

/// Initial scheduler timestep; steps sweep linearly from here towards zero.
const TIMESTEP_MAX: f32 = 1000.0;

/// A loaded, device-bound image-edit engine.
///
/// Exclusively owned by one run: construct, call
/// [`execute`](DiffusionEngine::execute) once, discard. Engines are never
/// shared across concurrent runs and nothing is cached between processes.
#[derive(Debug)]
pub struct DiffusionEngine {
    source: String,
    dtype: ComputeDtype,
    transformer: Option<TransformerModule>,
    device: ComputeDevice,
    progress_enabled: bool,
}

impl DiffusionEngine {
    pub(crate) fn new(
        source: String,
        dtype: ComputeDtype,
        transformer: Option<TransformerModule>,
        device: ComputeDevice,
        progress_enabled: bool,
    ) -> Self {
        Self { source, dtype, transformer, device, progress_enabled }
    }

    /// The locator the engine's full-precision components came from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compute precision the engine was loaded at.
    pub fn dtype(&self) -> ComputeDtype {
        self.dtype
    }

    /// The compute target the engine is bound to.
    pub fn device(&self) -> &ComputeDevice {
        &self.device
    }

    /// Returns `true` when the transformer sub-module was loaded from a
    /// packed quantized file.
    pub fn is_quantized(&self) -> bool {
        self.transformer.is_some()
    }

    /// Runs the iterative refinement loop once.
    ///
    /// Inference-only execution: no gradient or training bookkeeping exists
    /// anywhere in this path. The observer is called synchronously at the
    /// end of every step (step indices `0..num_steps`); a zero-step request
    /// is valid and produces the input image unchanged with zero observer
    /// calls.
    pub fn execute(
        &self,
        mut request: EditRequest,
        observer: &mut dyn StepObserver,
    ) -> Result<EditOutput, EngineError> {
        let source_image = request
            .images
            .first()
            .ok_or_else(|| EngineError::Execution("request carries no input image".into()))?;

        if request.height == 0 || request.width == 0 {
            return Err(EngineError::Execution(format!(
                "degenerate output dimensions {}x{}",
                request.height, request.width,
            )));
        }

        tracing::debug!(
            "executing: {} steps, cfg {}, {}x{}, device {}",
            request.num_steps,
            request.guidance_scale,
            request.width,
            request.height,
            self.device,
        );

        let mut latent = canvas_sized(source_image, request.width, request.height);
        // Guidance bounds the per-step refinement amplitude.
        let amplitude = (request.guidance_scale.clamp(0.0, 16.0)).round() as i16 + 1;

        for step in 0..request.num_steps {
            let timestep =
                TIMESTEP_MAX * (1.0 - step as f32 / request.num_steps.max(1) as f32);

            if self.progress_enabled {
                tracing::info!("step {}/{} (t={timestep:.1})", step + 1, request.num_steps);
            }

            // One refinement increment drawn from the seeded generator. A
            // real backend replaces this with the transformer forward pass
            // and scheduler update for this timestep.
            let shift: [i16; 3] = [
                request.generator.gen_range(-amplitude..=amplitude),
                request.generator.gen_range(-amplitude..=amplitude),
                request.generator.gen_range(-amplitude..=amplitude),
            ];
            for pixel in latent.pixels_mut() {
                for (channel, delta) in shift.iter().enumerate() {
                    pixel.0[channel] =
                        (pixel.0[channel] as i16 + delta).clamp(0, 255) as u8;
                }
            }

            let mut state = StepState::default();
            for name in &request.observed_tensor_inputs {
                state.insert(name.clone(), channel_means(&latent));
            }
            let ctx = StepContext { step, timestep, device: &self.device };
            let _state = observer.on_step_end(&ctx, state);
        }

        Ok(EditOutput { images: vec![latent] })
    }
}

/// Resizes to the exact target canvas if the input deviates from it.
fn canvas_sized(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.width() == width && image.height() == height {
        image.clone()
    } else {
        image::imageops::resize(image, width, height, image::imageops::FilterType::CatmullRom)
    }
}

/// Per-channel means, the step-local summary exposed to observers that
/// requested tensor inputs.
fn channel_means(image: &RgbImage) -> Vec<f32> {
    let mut sums = [0f64; 3];
    for pixel in image.pixels() {
        for (channel, sum) in sums.iter_mut().enumerate() {
            *sum += pixel.0[channel] as f64;
        }
    }
    let count = (image.width() as f64 * image.height() as f64).max(1.0);
    sums.iter().map(|s| (s / count) as f32).collect()
}
