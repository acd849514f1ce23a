// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # engine
//!
//! The inference-engine boundary for generative image editing.
//!
//! The actual diffusion computation is owned by an external modeling
//! library; this crate pins down the narrow contract the orchestrator
//! consumes it through:
//!
//! - [`EditRequest`] / [`EditOutput`] — the single-call request/result pair.
//! - [`StepObserver`] — the per-step callback invoked synchronously by the
//!   engine at each step boundary.
//! - [`EngineBuilder`] — source resolution, quantized sub-module assembly,
//!   device binding, and progress suppression.
//!
//! [`DiffusionEngine`] is the reference implementation of that contract: it
//! drives a real step loop with deterministic seeded output, standing in for
//! the external forward passes the same way the runtime's synthetic weight
//! mode stands in for real model files.

mod device;
mod error;
mod loader;
mod reference;
mod request;

pub use device::ComputeDevice;
pub use error::EngineError;
pub use loader::{
    ComputeDtype, EngineBuilder, ModelSource, QuantizationConfig, TransformerModule,
};
pub use reference::DiffusionEngine;
pub use request::{EditOutput, EditRequest, StepContext, StepObserver, StepState};
