//! Vision Layer
//!
//! Turns a camera frame into the raw material the price locators work on:
//! - OCR text fragments (element and block level)
//! - Candidate price-tag rectangles from contour detection

pub mod classify;
pub mod decompose;
pub mod detection;
pub mod geometry;
pub mod ocr;

use std::time::Instant;
use thiserror::Error;
use tracing::debug;

use crate::capture::frame::CameraFrame;

pub use decompose::{decompose, DecomposedFrame, TextFragment};
pub use detection::{ContourConfig, ContourExtractor};
pub use geometry::Rect;
pub use ocr::{OcrEngine, ReplayOcr, TextResult};

/// Transient per-frame defects. The frame is skipped; the scan goes on.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Unsupported rotation: {0} degrees")]
    UnsupportedRotation(u32),
}

/// Everything one frame contributes before price location
#[derive(Debug)]
pub struct VisionResult {
    /// Text fragments from the OCR hierarchy
    pub fragments: DecomposedFrame,
    /// Candidate tag outlines
    pub contours: Vec<Rect>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Run contour extraction on the upright frame and decompose `text` against it
pub fn process_frame(frame: &CameraFrame, text: &TextResult, extractor: &ContourExtractor) -> VisionResult {
    let start = Instant::now();

    let upright = frame.upright_image();
    let contours = extractor.extract(&upright);
    let fragments = decompose(text, frame.upright_dimensions());

    let processing_time = start.elapsed();
    debug!(
        "Vision processing of frame {} complete in {:?}: {} elements, {} blocks, {} contours",
        frame.sequence(),
        processing_time,
        fragments.elements.len(),
        fragments.blocks.len(),
        contours.len()
    );

    VisionResult {
        fragments,
        contours,
        processing_time_ms: processing_time.as_millis() as u64,
    }
}
