// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `imgedit-rt resolve` command: display the variant dispatch table.
//!
//! Without filters, prints all four (vendor, precision) rows with their
//! default sources; with filters, only the matching rows.

use runner::{ModelType, Vendor, VARIANT_TABLE};

pub fn execute(vendor: Option<String>, model_type: Option<String>) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            imgedit-rt · Variant Resolver            ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let vendor = vendor
        .map(|s| {
            Vendor::from_str_loose(&s).ok_or_else(|| anyhow::anyhow!("unknown vendor '{s}'"))
        })
        .transpose()?;
    let model_type = model_type
        .map(|s| {
            ModelType::from_str_loose(&s)
                .ok_or_else(|| anyhow::anyhow!("unknown model type '{s}'"))
        })
        .transpose()?;

    println!(
        "  {:<22} {:<9} {}",
        "Vendor", "Type", "Default source",
    );
    println!("  {}", "-".repeat(100));

    for spec in VARIANT_TABLE
        .iter()
        .filter(|v| vendor.map_or(true, |want| v.vendor == want))
        .filter(|v| model_type.map_or(true, |want| v.model_type == want))
    {
        println!(
            "  {:<22} {:<9} {}",
            spec.vendor.as_str(),
            spec.model_type.as_str(),
            spec.default_source,
        );
        if spec.model_type == ModelType::Gguf {
            println!(
                "  {:<32} base: {}  config: {}",
                "", spec.base_repo, spec.transformer_config,
            );
        }
    }
    println!();

    Ok(())
}
