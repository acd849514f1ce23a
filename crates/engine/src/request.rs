// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The engine request/response contract and the per-step callback seam.
//!
//! [`StepObserver`] is the inversion-of-control point: the engine calls it
//! synchronously once per completed step, handing over a [`StepContext`] and
//! a mutable [`StepState`] bundle. Observers must treat pipeline internals
//! as read-only — the bundle is returned, not replaced with new content.
//! Any engine implementation satisfying this trait boundary can be
//! substituted, including stub engines in tests.

use crate::ComputeDevice;
use image::RgbImage;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

/// Mutable bundle of step-local values passed through the step callback.
///
/// Contains one entry per tensor-input name the request asked to observe
/// (see [`EditRequest::observed_tensor_inputs`]); an empty request list
/// yields an empty bundle.
#[derive(Debug, Default)]
pub struct StepState {
    values: BTreeMap<String, Vec<f32>>,
}

impl StepState {
    /// Inserts or replaces a named value.
    pub fn insert(&mut self, name: impl Into<String>, value: Vec<f32>) {
        self.values.insert(name.into(), value);
    }

    /// Looks up a named value.
    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.values.get(name).map(|v| v.as_slice())
    }

    /// Iterates over the entry names in deterministic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// Returns `true` when the bundle carries no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read-only context handed to the observer at each step boundary.
#[derive(Debug)]
pub struct StepContext<'a> {
    /// 0-based step index, monotonic across one execution.
    pub step: usize,
    /// Scheduler timestep value for this step.
    pub timestep: f32,
    /// The device the engine is bound to, for completion barriers.
    pub device: &'a ComputeDevice,
}

/// Per-step callback invoked synchronously by the engine.
///
/// Called once per step; the first invocation (step 0) typically serves as a
/// clock origin for timing observers. Implementations must observe, never
/// mutate, engine internals, and must tolerate zero invocations (a
/// zero-step request is a valid run).
pub trait StepObserver {
    /// Invoked at the end of each step. The returned bundle is handed back
    /// to the engine unmodified by convention.
    fn on_step_end(&mut self, ctx: &StepContext<'_>, state: StepState) -> StepState;
}

/// A single image-edit inference request.
///
/// Constructed once per run and consumed by exactly one
/// [`DiffusionEngine::execute`](crate::DiffusionEngine::execute) call.
pub struct EditRequest {
    /// Input images, already preprocessed to the target canvas.
    pub images: Vec<RgbImage>,
    /// Positive prompt (what to add/replace).
    pub prompt: String,
    /// Negative prompt (what to avoid).
    pub negative_prompt: String,
    /// Seeded deterministic generator; identical seeds give identical
    /// outputs for identical requests.
    pub generator: StdRng,
    /// Classifier-free guidance scale.
    pub guidance_scale: f32,
    /// Number of inference steps.
    pub num_steps: usize,
    /// Output height in pixels.
    pub height: u32,
    /// Output width in pixels.
    pub width: u32,
    /// Names of tensor inputs the step callback wishes to observe
    /// (empty = none).
    pub observed_tensor_inputs: Vec<String>,
}

impl std::fmt::Debug for EditRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditRequest")
            .field("images", &self.images.len())
            .field("prompt", &self.prompt)
            .field("num_steps", &self.num_steps)
            .field("height", &self.height)
            .field("width", &self.width)
            .finish()
    }
}

/// The result of a single inference call.
#[derive(Debug)]
pub struct EditOutput {
    /// Output images; exactly one per input image in the reference engine.
    pub images: Vec<RgbImage>,
}
