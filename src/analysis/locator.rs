//! Price, price-tag and product-name location within a single frame
//!
//! Print convention on shelf tags makes the price the largest text, so most
//! heuristics here walk fragments in descending `size` order.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::FrameResult;
use crate::vision::classify::{is_number_only, is_number_with_leading_currency, is_valid_price};
use crate::vision::{DecomposedFrame, Rect, TextFragment, TextResult};

/// Tolerances used when associating text with a tag outline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Margin when testing the price against candidate tag outlines
    pub price_tag_margin: i32,
    /// Margin when testing a product-name block against the tag outline
    pub product_name_margin: i32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            price_tag_margin: 0,
            product_name_margin: 10,
        }
    }
}

/// Rebuild a price whose integer and fractional parts were read as
/// separate fragments ("12" followed by a raised "99").
///
/// The integer part is the largest fragment shaped like a number behind an
/// optional currency sign. The fraction is the left-most bare number past
/// the integer part's midpoint, at most one OCR block away. Both parts must
/// clear `confidence`.
pub fn find_badly_formatted_price(fragments: &[TextFragment], confidence: f32) -> Option<TextFragment> {
    // First of the largest wins, so earlier (already size-sorted) entries take ties
    let big = fragments
        .iter()
        .filter(|f| is_number_with_leading_currency(f.text.trim()))
        .fold(None::<&TextFragment>, |best, f| match best {
            Some(b) if b.size >= f.size => Some(b),
            _ => Some(f),
        })?;

    let midpoint = big.rect.left + big.rect.width() / 2;
    let small = fragments
        .iter()
        .filter(|f| {
            f.id != big.id
                && is_number_only(&f.text.replace(' ', ""))
                && f.rect.left > midpoint
                && f.block_index.abs_diff(big.block_index) <= 1
        })
        .min_by_key(|f| f.rect.left)?;

    if big.confidence < confidence || small.confidence < confidence {
        debug!(
            "Rejected split price '{}' + '{}': confidence {:.2}/{:.2} below {:.2}",
            big.text, small.text, big.confidence, small.confidence, confidence
        );
        return None;
    }

    let mut merged = big.clone();
    merged.text = format!("{}.{}", big.text, small.text.replace(' ', ""));
    merged.rect = Rect::new(big.rect.left, big.rect.top, small.rect.right, big.rect.bottom);
    Some(merged)
}

/// Find the price among fragments sorted by `size`, largest first.
///
/// A well-formed top fragment is returned straight away. Otherwise a
/// rebuilt split price competes with the largest well-formed fragment and
/// the taller of the two wins.
pub fn find_price(fragments: &[TextFragment], confidence: f32) -> Option<TextFragment> {
    if let Some(top) = fragments.first() {
        if is_valid_price(&top.text) {
            return Some(top.clone());
        }
    }

    let rebuilt = find_badly_formatted_price(fragments, confidence);
    let formed = fragments.iter().find(|f| is_valid_price(&f.text));

    match (rebuilt, formed) {
        (Some(rebuilt), Some(formed)) => {
            if rebuilt.size > formed.size {
                Some(rebuilt)
            } else {
                Some(formed.clone())
            }
        }
        (Some(rebuilt), None) => Some(rebuilt),
        (None, formed) => formed.cloned(),
    }
}

/// Tightest candidate outline that contains the price box
pub fn find_price_tag_contour(contours: &[Rect], price: &Rect, margin: i32) -> Option<Rect> {
    contours
        .iter()
        .filter(|c| price.is_inside(c, margin))
        .min_by_key(|c| c.area())
        .copied()
}

/// First block (largest first) that reads like words, is not the price's
/// own block, and sits within the tag outline.
pub fn find_product_name<'a>(
    blocks: &'a [TextFragment],
    price_block: usize,
    price_tag: &Rect,
    margin: i32,
) -> Option<&'a TextFragment> {
    blocks.iter().find(|block| {
        block.block_index != price_block && is_mostly_words(&block.text) && block.rect.is_inside(price_tag, margin)
    })
}

/// More than half of the characters are letters or spaces
fn is_mostly_words(text: &str) -> bool {
    let total = text.chars().count();
    let wordish = text.chars().filter(|c| *c == ' ' || c.is_alphabetic()).count();
    wordish as f32 > total as f32 * 0.5
}

/// What one frame yielded, for live overlay and for the session list
#[derive(Debug, Clone, Default)]
pub struct FrameAnalysis {
    pub price: Option<TextFragment>,
    pub price_tag_contour: Option<Rect>,
    pub product_name: Option<TextFragment>,
}

impl FrameAnalysis {
    /// Session entry for this frame, if a price was found
    pub fn into_frame_result(self, text: Arc<TextResult>) -> Option<FrameResult> {
        let price = self.price?;
        Some(FrameResult {
            text,
            price,
            product_name: self.product_name.map(|f| f.text),
            price_tag_contour: self.price_tag_contour,
        })
    }
}

/// Run price, tag and product-name location over one decomposed frame
pub fn analyze_frame(
    fragments: &DecomposedFrame,
    contours: &[Rect],
    confidence: f32,
    config: &LocatorConfig,
) -> FrameAnalysis {
    let mut elements = fragments.elements.clone();
    elements.sort_by(|a, b| b.size.cmp(&a.size));

    let Some(price) = find_price(&elements, confidence) else {
        return FrameAnalysis::default();
    };

    let price_tag_contour = find_price_tag_contour(contours, &price.rect, config.price_tag_margin);

    let product_name = price_tag_contour.and_then(|tag| {
        let mut blocks = fragments.blocks.clone();
        blocks.sort_by(|a, b| b.size.cmp(&a.size));
        find_product_name(&blocks, price.block_index, &tag, config.product_name_margin).cloned()
    });

    debug!(
        "Frame analysis: price={:?} tag={:?} product={:?}",
        price.text,
        price_tag_contour,
        product_name.as_ref().map(|f| &f.text)
    );

    FrameAnalysis {
        price: Some(price),
        price_tag_contour,
        product_name,
    }
}
