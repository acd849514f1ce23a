// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # imgedit-rt
//!
//! Command-line interface for single-shot generative image-edit runs.
//!
//! ## Usage
//! ```bash
//! # Run one edit with the vendor defaults
//! imgedit-rt run --vendor qwen --prompt "replace the cat with a dalmatian"
//!
//! # Quantized variant from an explicit packed file
//! imgedit-rt run --vendor flux --model-type gguf --model-path ./kontext-q8_0.gguf
//!
//! # Show the default-source matrix
//! imgedit-rt resolve
//! ```

mod commands;

use clap::{Parser, Subcommand};
use commands::run::RunArgs;

#[derive(Parser)]
#[command(
    name = "imgedit-rt",
    about = "Single-shot generative image-edit inference driver",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (overrides CLI arguments).
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one image-edit inference run and persist its artifacts.
    Run(RunArgs),

    /// Show the variant dispatch table, or the resolved source for one variant.
    Resolve {
        /// Restrict to one vendor.
        #[arg(long)]
        vendor: Option<String>,

        /// Restrict to one precision.
        #[arg(long)]
        model_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => commands::run::execute(cli.config, args).await,
        Commands::Resolve { vendor, model_type } => {
            commands::resolve::execute(vendor, model_type)
        }
    }
}
