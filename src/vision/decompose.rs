//! Frame decomposition
//!
//! Flattens the OCR hierarchy into per-element and per-block text fragments
//! that the locators can sort and filter.

use serde::{Deserialize, Serialize};

use super::geometry::Rect;
use super::ocr::TextResult;

/// One recognized text span with its box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Sequence number, unique within one decomposition
    pub id: u32,
    /// (width, height) of the upright frame the fragment came from
    pub image_size: (u32, u32),
    pub rect: Rect,
    pub text: String,
    /// Glyph height in pixels, used as a salience proxy
    pub size: i32,
    pub block_index: usize,
    /// `None` for block-level fragments
    pub line_index: Option<usize>,
    pub confidence: f32,
}

impl TextFragment {
    /// Build a fragment; `size` is derived from the (normalized) box height
    pub fn new(
        id: u32,
        image_size: (u32, u32),
        rect: Rect,
        text: impl Into<String>,
        block_index: usize,
        line_index: Option<usize>,
        confidence: f32,
    ) -> Self {
        let rect = rect.normalized();
        Self {
            id,
            image_size,
            rect,
            text: text.into(),
            size: rect.height(),
            block_index,
            line_index,
            confidence,
        }
    }
}

/// Fragments extracted from one frame
#[derive(Debug, Clone, Default)]
pub struct DecomposedFrame {
    /// Word-level fragments
    pub elements: Vec<TextFragment>,
    /// One fragment per OCR block
    pub blocks: Vec<TextFragment>,
}

/// Split an OCR result into element and block fragments.
///
/// Entries without a bounding box are skipped. A block's confidence is the
/// mean of its line confidences.
pub fn decompose(text: &TextResult, image_size: (u32, u32)) -> DecomposedFrame {
    let mut next_id = 0u32;
    let mut take_id = || {
        let id = next_id;
        next_id += 1;
        id
    };

    let mut frame = DecomposedFrame::default();

    for (block_index, block) in text.blocks.iter().enumerate() {
        if let Some(rect) = block.bounding_box {
            let confidence = if block.lines.is_empty() {
                0.0
            } else {
                block.lines.iter().map(|l| l.confidence).sum::<f32>() / block.lines.len() as f32
            };
            frame.blocks.push(TextFragment::new(
                take_id(),
                image_size,
                rect,
                block.text.clone(),
                block_index,
                None,
                confidence,
            ));
        }

        for (line_index, line) in block.lines.iter().enumerate() {
            for element in &line.elements {
                let Some(rect) = element.bounding_box else {
                    continue;
                };
                frame.elements.push(TextFragment::new(
                    take_id(),
                    image_size,
                    rect,
                    element.text.clone(),
                    block_index,
                    Some(line_index),
                    element.confidence,
                ));
            }
        }
    }

    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::ocr::{TextBlock, TextElement, TextLine};

    fn element(text: &str, rect: Option<Rect>, confidence: f32) -> TextElement {
        TextElement { text: text.into(), bounding_box: rect, confidence }
    }

    fn sample() -> TextResult {
        TextResult {
            blocks: vec![
                TextBlock {
                    text: "Fresh Milk 1L".into(),
                    bounding_box: Some(Rect::new(10, 10, 200, 40)),
                    lines: vec![
                        TextLine {
                            text: "Fresh Milk".into(),
                            confidence: 0.9,
                            elements: vec![
                                element("Fresh", Some(Rect::new(10, 10, 80, 30)), 0.9),
                                element("Milk", Some(Rect::new(90, 10, 150, 30)), 0.8),
                            ],
                            ..Default::default()
                        },
                        TextLine {
                            text: "1L".into(),
                            confidence: 0.5,
                            elements: vec![element("1L", None, 0.5)],
                            ..Default::default()
                        },
                    ],
                },
                TextBlock {
                    text: "2.49".into(),
                    bounding_box: None,
                    lines: vec![TextLine {
                        text: "2.49".into(),
                        confidence: 0.95,
                        elements: vec![element("2.49", Some(Rect::new(20, 60, 120, 120)), 0.95)],
                        ..Default::default()
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_decompose_indices_and_sizes() {
        let frame = decompose(&sample(), (640, 480));

        assert_eq!(frame.elements.len(), 3);
        assert_eq!(frame.blocks.len(), 1);

        let milk = &frame.elements[1];
        assert_eq!(milk.text, "Milk");
        assert_eq!(milk.block_index, 0);
        assert_eq!(milk.line_index, Some(0));
        assert_eq!(milk.size, 20);
        assert_eq!(milk.image_size, (640, 480));

        let price = &frame.elements[2];
        assert_eq!(price.block_index, 1);
        assert_eq!(price.size, 60);
    }

    #[test]
    fn test_block_fragment_confidence_is_line_mean() {
        let frame = decompose(&sample(), (640, 480));
        let block = &frame.blocks[0];

        assert_eq!(block.line_index, None);
        assert_eq!(block.size, 30);
        assert!((block.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_ids_are_unique() {
        let frame = decompose(&sample(), (640, 480));
        let mut ids: Vec<u32> = frame.elements.iter().chain(&frame.blocks).map(|f| f.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_inverted_box_keeps_size_non_negative() {
        let fragment = TextFragment::new(0, (10, 10), Rect::new(5, 40, 50, 10), "x", 0, Some(0), 1.0);
        assert_eq!(fragment.size, 30);
        assert_eq!(fragment.size, fragment.rect.bottom - fragment.rect.top);
    }
}
