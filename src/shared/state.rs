//! Read-only view of the scan for the presentation layer

use parking_lot::RwLock;
use std::sync::Arc;

use crate::analysis::FrameAnalysis;
use crate::vision::{Rect, TextFragment};

/// Latest scan state as seen by a live overlay
#[derive(Debug, Clone, Default)]
pub struct ScanSnapshot {
    /// Whether a scan is in progress
    pub is_scanning: bool,
    /// Price found in the most recent analyzed frame
    pub price: Option<TextFragment>,
    /// Product name found in the most recent analyzed frame
    pub product_name: Option<TextFragment>,
    /// Tag outline found in the most recent analyzed frame
    pub price_tag_contour: Option<Rect>,
    /// Accepted frames so far in the current scan
    pub scanned_frames: u32,
    /// Confidence threshold currently applied
    pub confidence: f32,
}

impl ScanSnapshot {
    /// Replace the per-frame detections
    pub fn apply_analysis(&mut self, analysis: &FrameAnalysis) {
        self.price = analysis.price.clone();
        self.product_name = analysis.product_name.clone();
        self.price_tag_contour = analysis.price_tag_contour;
    }

    /// Drop all per-frame detections
    pub fn clear_detections(&mut self) {
        self.price = None;
        self.product_name = None;
        self.price_tag_contour = None;
    }
}

/// Snapshot shared between the scan driver (single writer) and readers
pub type SharedSnapshot = Arc<RwLock<ScanSnapshot>>;
