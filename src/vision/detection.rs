//! Price-tag outline detection
//!
//! Finds candidate tag boundaries as axis-aligned rectangles: binarize,
//! soften, thicken, edge-detect, then take the bounding box of every outer
//! contour that encloses enough area.

use anyhow::{ensure, Result};
use image::{imageops, GrayImage, RgbaImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area};
use imageproc::morphology::dilate;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use super::geometry::Rect;

/// Configuration for contour extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Minimum enclosed contour area in square pixels
    pub min_area: f64,
    /// Gray level above which a pixel counts as foreground
    pub binary_threshold: u8,
    /// Value written for foreground pixels
    pub binary_max: u8,
    /// Gaussian sigma approximating a 3x3 kernel
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds
    pub canny_low: f32,
    pub canny_high: f32,
    /// Polygon simplification tolerance as a fraction of the contour perimeter
    pub approx_epsilon: f64,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_area: 1000.0,
            binary_threshold: 177,
            binary_max: 200,
            blur_sigma: 0.8,
            canny_low: 100.0,
            canny_high: 200.3,
            approx_epsilon: 0.02,
        }
    }
}

impl ContourConfig {
    /// Reject settings the image filters cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.blur_sigma.is_finite() && self.blur_sigma > 0.0,
            "contours.blur_sigma must be greater than zero (got {})",
            self.blur_sigma
        );
        ensure!(
            self.canny_low.is_finite() && self.canny_high.is_finite() && self.canny_low >= 0.0,
            "contours.canny_low and contours.canny_high must be finite and non-negative"
        );
        ensure!(
            self.canny_low <= self.canny_high,
            "contours.canny_low ({}) must not exceed contours.canny_high ({})",
            self.canny_low,
            self.canny_high
        );
        ensure!(
            self.min_area.is_finite() && self.min_area >= 0.0,
            "contours.min_area must be non-negative (got {})",
            self.min_area
        );
        ensure!(
            self.approx_epsilon.is_finite() && self.approx_epsilon >= 0.0,
            "contours.approx_epsilon must be non-negative (got {})",
            self.approx_epsilon
        );
        Ok(())
    }

    /// Replace settings that would make the filters panic
    fn sanitized(mut self) -> Self {
        let defaults = ContourConfig::default();
        if !(self.blur_sigma.is_finite() && self.blur_sigma > 0.0) {
            warn!("Invalid blur sigma {}, using {}", self.blur_sigma, defaults.blur_sigma);
            self.blur_sigma = defaults.blur_sigma;
        }
        if !(self.canny_low.is_finite() && self.canny_high.is_finite()) {
            warn!("Invalid Canny thresholds, using defaults");
            self.canny_low = defaults.canny_low;
            self.canny_high = defaults.canny_high;
        }
        if self.canny_low > self.canny_high {
            warn!("Canny thresholds {} > {}, swapping", self.canny_low, self.canny_high);
            std::mem::swap(&mut self.canny_low, &mut self.canny_high);
        }
        if !self.approx_epsilon.is_finite() || self.approx_epsilon < 0.0 {
            self.approx_epsilon = defaults.approx_epsilon;
        }
        self
    }
}

/// Extracts candidate price-tag rectangles from a frame
#[derive(Debug, Clone, Default)]
pub struct ContourExtractor {
    config: ContourConfig,
}

impl ContourExtractor {
    pub fn new(config: ContourConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    /// Bounding rectangles of all outer contours larger than `min_area`
    pub fn extract(&self, image: &RgbaImage) -> Vec<Rect> {
        let start = Instant::now();

        let gray = imageops::grayscale(image);
        let binary = binarize(&gray, self.config.binary_threshold, self.config.binary_max);
        let blurred = gaussian_blur_f32(&binary, self.config.blur_sigma);
        let dilated = dilate(&blurred, Norm::LInf, 1);
        let edges = canny(&dilated, self.config.canny_low, self.config.canny_high);

        let rects: Vec<Rect> = find_contours::<i32>(&edges)
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| contour_area(&c.points) > self.config.min_area)
            .filter_map(|c| outline_bounds(&c.points, self.config.approx_epsilon))
            .collect();

        debug!(
            "Contour extraction on {}x{} complete in {:?}: {} candidates",
            image.width(),
            image.height(),
            start.elapsed(),
            rects.len()
        );

        rects
    }
}

/// Fixed-level threshold: `max` above `threshold`, 0 otherwise
fn binarize(gray: &GrayImage, threshold: u8, max: u8) -> GrayImage {
    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { max } else { 0 };
    }
    out
}

/// Bounding rectangle of the contour's simplified polygon
fn outline_bounds(points: &[Point<i32>], epsilon_ratio: f64) -> Option<Rect> {
    let epsilon = arc_length(points, true) * epsilon_ratio;
    if points.len() < 3 || epsilon <= 0.0 {
        return bounding_rect(points);
    }
    bounding_rect(&approximate_polygon_dp(points, epsilon, true))
}

/// Pixel-inclusive bounding rectangle of a point set
fn bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(Rect::new(min_x, min_y, max_x + 1, max_y + 1))
}
