// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compute target selection and the step-boundary completion barrier.

/// The compute target an engine is bound to.
///
/// The engine may internally queue work on an accelerator; the only
/// synchronization obligation the orchestration core imposes is
/// [`ComputeDevice::synchronize`], taken inside the timing callback before
/// each timestamp read so measured deltas reflect completed step compute
/// rather than queued work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    /// General-purpose processor execution.
    Cpu,
    /// Accelerator execution (GPU or equivalent).
    Accelerator,
}

impl ComputeDevice {
    /// Returns the device as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeDevice::Cpu => "cpu",
            ComputeDevice::Accelerator => "accelerator",
        }
    }

    /// Parses a device name, accepting common aliases.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Some(ComputeDevice::Cpu),
            "accelerator" | "cuda" | "gpu" => Some(ComputeDevice::Accelerator),
            _ => None,
        }
    }

    /// Returns `true` when bound to an accelerator.
    pub fn is_accelerator(&self) -> bool {
        matches!(self, ComputeDevice::Accelerator)
    }

    /// Full completion barrier: blocks until all work queued on this device
    /// has finished.
    ///
    /// On [`ComputeDevice::Cpu`] execution is already synchronous and this
    /// returns immediately. The reference engine issues no asynchronous
    /// kernels, so the accelerator barrier is likewise immediate; callers
    /// must still take it before reading the clock.
    pub fn synchronize(&self) {
        if self.is_accelerator() {
            // Kernel queue drain point for real accelerator backends.
            std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
        }
    }
}

impl std::fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
