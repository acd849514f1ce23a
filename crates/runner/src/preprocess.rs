// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Input image preparation: aspect-preserving canvas fit.
//!
//! The transform scales the source to the largest size that fits inside the
//! target box without cropping, centres it, and fills the remaining border
//! with black. Smaller-than-target inputs scale up; larger inputs scale
//! down; nothing is ever cropped. When the leftover padding on an axis is
//! odd, the extra pixel goes to the trailing (bottom/right) edge.

use crate::RunError;
use image::{imageops, DynamicImage, RgbImage};

/// Border fill colour outside the fitted region.
const BORDER_FILL: image::Rgb<u8> = image::Rgb([0, 0, 0]);

/// Prepares one input image into an exactly target-sized raster.
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    target_width: u32,
    target_height: u32,
}

impl ImagePreprocessor {
    /// Creates a preprocessor for the given target canvas.
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self { target_width, target_height }
    }

    /// Fetches the input from a local path or http(s) URL, decodes it, and
    /// applies the canvas fit. Produced once per run, immutable thereafter.
    pub async fn prepare(&self, locator: &str) -> Result<RgbImage, RunError> {
        let source = fetch_input(locator).await?;
        tracing::debug!(
            "input image {}x{} -> canvas {}x{}",
            source.width(),
            source.height(),
            self.target_width,
            self.target_height,
        );
        Ok(self.canvas_fit(&source))
    }

    /// The aspect-preserving resize-and-pad transform.
    pub fn canvas_fit(&self, source: &DynamicImage) -> RgbImage {
        let (src_w, src_h) = (source.width().max(1), source.height().max(1));
        let scale = f64::min(
            self.target_width as f64 / src_w as f64,
            self.target_height as f64 / src_h as f64,
        );
        let fit_w = ((src_w as f64 * scale).round() as u32)
            .clamp(1, self.target_width);
        let fit_h = ((src_h as f64 * scale).round() as u32)
            .clamp(1, self.target_height);

        let resized = imageops::resize(
            &source.to_rgb8(),
            fit_w,
            fit_h,
            imageops::FilterType::CatmullRom,
        );

        // Equal split; integer floor puts the odd pixel on the trailing edge.
        let pad_x = (self.target_width - fit_w) / 2;
        let pad_y = (self.target_height - fit_h) / 2;

        let mut canvas =
            RgbImage::from_pixel(self.target_width, self.target_height, BORDER_FILL);
        imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);
        canvas
    }
}

/// Loads the raw input image from a local path or over HTTP.
async fn fetch_input(locator: &str) -> Result<DynamicImage, RunError> {
    if locator.starts_with("http://") || locator.starts_with("https://") {
        let response = reqwest::get(locator)
            .await
            .map_err(|e| RunError::ImageFetch(format!("'{locator}': {e}")))?
            .error_for_status()
            .map_err(|e| RunError::ImageFetch(format!("'{locator}': {e}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RunError::ImageFetch(format!("'{locator}': {e}")))?;
        image::load_from_memory(&bytes)
            .map_err(|e| RunError::ImageFetch(format!("'{locator}': undecodable payload: {e}")))
    } else {
        image::open(locator)
            .map_err(|e| RunError::ImageFetch(format!("'{locator}': {e}")))
    }
}
