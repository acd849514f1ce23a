// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for engine loading and execution.

/// Errors that can occur while building or executing an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The model source locator does not point at anything fetchable.
    #[error("model source not found: '{0}'")]
    SourceNotFound(String),

    /// The model source exists but could not be opened or read.
    #[error("cannot open model source '{locator}': {detail}")]
    SourceOpen { locator: String, detail: String },

    /// The packed quantized file was rejected by the sub-module loader.
    #[error("quantized file rejected at '{path}': {detail}")]
    QuantizedFormat { path: String, detail: String },

    /// The SafeTensors weight header is malformed.
    #[error("SafeTensors header error: {0}")]
    SafeTensors(String),

    /// The engine failed mid-execution (numerical fault, resource
    /// exhaustion, malformed request).
    #[error("execution failed: {0}")]
    Execution(String),
}
