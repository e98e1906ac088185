//! Analysis Layer
//!
//! Per-frame price/product heuristics and the cross-frame vote.

pub mod locator;
pub mod voting;

use std::sync::Arc;

use crate::vision::{Rect, TextFragment, TextResult};

pub use locator::{analyze_frame, FrameAnalysis, LocatorConfig};
pub use voting::{aggregate, ScanOutcome};

/// Outcome of one analyzed frame that produced a price
#[derive(Debug, Clone)]
pub struct FrameResult {
    /// OCR hierarchy, kept so frames between OCR passes can reuse it
    pub text: Arc<TextResult>,
    pub price: TextFragment,
    pub product_name: Option<String>,
    pub price_tag_contour: Option<Rect>,
}
