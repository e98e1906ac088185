//! OCR (Optical Character Recognition) boundary
//!
//! The recognizer itself is an external collaborator. This module defines the
//! hierarchical result it hands back (blocks -> lines -> elements) and the
//! async trait the scan driver dispatches through.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::geometry::Rect;
use super::FrameError;
use crate::capture::frame::CameraFrame;

/// Full OCR result for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextResult {
    pub blocks: Vec<TextBlock>,
}

/// A paragraph-like group of lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    #[serde(default)]
    pub bounding_box: Option<Rect>,
    #[serde(default)]
    pub lines: Vec<TextLine>,
}

/// A single line inside a block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    #[serde(default)]
    pub bounding_box: Option<Rect>,
    /// Recognition confidence (0.0 - 1.0)
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub elements: Vec<TextElement>,
}

/// A word-level span inside a line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub text: String,
    #[serde(default)]
    pub bounding_box: Option<Rect>,
    /// Recognition confidence (0.0 - 1.0)
    #[serde(default)]
    pub confidence: f32,
}

impl TextResult {
    /// Number of elements across all blocks and lines
    pub fn element_count(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|b| &b.lines)
            .map(|l| l.elements.len())
            .sum()
    }
}

/// Text recognizer invoked once per OCR frame.
///
/// Implementations may fail per frame; the driver treats an error as "no
/// result for this frame" and moves on.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, frame: &CameraFrame) -> Result<TextResult, FrameError>;
}

/// OCR engine that serves previously recorded results, keyed by frame label
#[derive(Debug, Default)]
pub struct ReplayOcr {
    recorded: HashMap<String, TextResult>,
}

impl ReplayOcr {
    /// Create an engine from an in-memory map
    pub fn new(recorded: HashMap<String, TextResult>) -> Self {
        Self { recorded }
    }

    /// Load recorded results from a JSON object of `label -> TextResult`
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read OCR recording: {:?}", path))?;
        let recorded: HashMap<String, TextResult> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse OCR recording: {:?}", path))?;

        info!("Loaded {} recorded OCR results from {:?}", recorded.len(), path);
        Ok(Self { recorded })
    }
}

#[async_trait]
impl OcrEngine for ReplayOcr {
    async fn recognize(&self, frame: &CameraFrame) -> Result<TextResult, FrameError> {
        let result = self
            .recorded
            .get(frame.label())
            .cloned()
            .ok_or_else(|| FrameError::Ocr(format!("no recorded text for frame '{}'", frame.label())))?;

        debug!(
            "Replay OCR: frame '{}' -> {} blocks, {} elements",
            frame.label(),
            result.blocks.len(),
            result.element_count()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Rotation;
    use image::RgbaImage;
    use std::io::Write;
    use std::time::Instant;
    use tempfile::NamedTempFile;

    fn frame(label: &str) -> CameraFrame {
        CameraFrame::new(RgbaImage::new(4, 4), Rotation::Deg0, Instant::now()).with_label(label)
    }

    #[test]
    fn test_text_result_json_roundtrip() {
        let json = r#"{
            "blocks": [{
                "text": "12.99",
                "bounding_box": {"left": 0, "top": 0, "right": 50, "bottom": 20},
                "lines": [{
                    "text": "12.99",
                    "confidence": 0.9,
                    "elements": [{"text": "12.99", "confidence": 0.9,
                                  "bounding_box": {"left": 0, "top": 0, "right": 50, "bottom": 20}}]
                }]
            }]
        }"#;

        let parsed: TextResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.element_count(), 1);
        assert_eq!(parsed.blocks[0].lines[0].elements[0].bounding_box, Some(Rect::new(0, 0, 50, 20)));
    }

    #[tokio::test]
    async fn test_replay_known_and_unknown_frames() {
        let mut recorded = HashMap::new();
        recorded.insert(
            "frame_000".to_string(),
            TextResult {
                blocks: vec![TextBlock { text: "Milk".into(), ..Default::default() }],
            },
        );
        let ocr = ReplayOcr::new(recorded);

        let found = ocr.recognize(&frame("frame_000")).await.unwrap();
        assert_eq!(found.blocks[0].text, "Milk");

        let missing = ocr.recognize(&frame("frame_001")).await;
        assert!(matches!(missing, Err(FrameError::Ocr(_))));
    }

    #[tokio::test]
    async fn test_replay_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"a": {{"blocks": [{{"text": "Tea"}}]}}, "b": {{"blocks": []}}}}"#).unwrap();

        let ocr = ReplayOcr::from_file(file.path()).unwrap();
        assert_eq!(ocr.recognize(&frame("a")).await.unwrap().blocks[0].text, "Tea");
        assert!(ocr.recognize(&frame("b")).await.unwrap().blocks.is_empty());
    }

    #[test]
    fn test_replay_from_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        assert!(ReplayOcr::from_file(file.path()).is_err());
    }
}
