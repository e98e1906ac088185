//! Scanner Configuration
//!
//! Sampling, confidence and detection tunables stored in TOML format.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::analysis::LocatorConfig;
use crate::capture::{CaptureConfig, Rotation};
use crate::vision::ContourConfig;

/// Scanner settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Frame sampling settings
    pub sampling: SamplingConfig,
    /// Adaptive confidence settings
    pub confidence: ConfidenceConfig,
    /// Contour detection settings
    pub contours: ContourConfig,
    /// Price/product association settings
    pub locator: LocatorConfig,
    /// Capture settings
    pub capture: CaptureSettings,
}

/// How frames are sampled during one scan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Minimum time between accepted frames
    pub frame_interval_ms: u64,
    /// Run fresh OCR on every Nth accepted frame
    pub ocr_stride: u32,
    /// Accepted frames per scan before voting
    pub sample_budget: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 50,
            ocr_stride: 6,
            sample_budget: 18,
        }
    }
}

impl SamplingConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Confidence threshold for rebuilt prices, lowered when a scan starves
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Threshold at scan start
    pub initial: f32,
    /// Threshold after the checkpoint fires
    pub minimum: f32,
    /// Accepted-frame count at which the result count is checked
    pub checkpoint_frame: u32,
    /// Results needed by the checkpoint to keep the initial threshold
    pub min_results: usize,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            initial: 0.7,
            minimum: 0.5,
            checkpoint_frame: 10,
            min_results: 5,
        }
    }
}

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Replay frame rate
    pub fps: u32,
    /// Rotation applied to every frame
    pub rotation: Rotation,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            rotation: Rotation::Deg0,
        }
    }
}

impl From<&CaptureSettings> for CaptureConfig {
    fn from(settings: &CaptureSettings) -> Self {
        CaptureConfig {
            fps: settings.fps,
            rotation: settings.rotation,
        }
    }
}

impl ScannerConfig {
    /// Reject values the scanner cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(self.sampling.sample_budget > 0, "sampling.sample_budget must be at least 1");
        ensure!(self.sampling.ocr_stride > 0, "sampling.ocr_stride must be at least 1");
        ensure!(
            (0.0..=1.0).contains(&self.confidence.initial) && (0.0..=1.0).contains(&self.confidence.minimum),
            "confidence thresholds must lie within 0.0..=1.0"
        );
        ensure!(self.capture.fps > 0, "capture.fps must be at least 1");
        self.contours.validate()
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<ScannerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {:?}", path))?;
    let config: ScannerConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {:?}", path))?;
    config
        .validate()
        .with_context(|| format!("Invalid config: {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &ScannerConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write config: {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_scanner_config() {
        let config = ScannerConfig::default();

        // Sampling defaults
        assert_eq!(config.sampling.frame_interval(), Duration::from_millis(50));
        assert_eq!(config.sampling.ocr_stride, 6);
        assert_eq!(config.sampling.sample_budget, 18);

        // Confidence defaults
        assert!((config.confidence.initial - 0.7).abs() < 0.001);
        assert!((config.confidence.minimum - 0.5).abs() < 0.001);
        assert_eq!(config.confidence.checkpoint_frame, 10);
        assert_eq!(config.confidence.min_results, 5);

        // Detection defaults
        assert!((config.contours.min_area - 1000.0).abs() < 0.001);
        assert_eq!(config.locator.price_tag_margin, 0);
        assert_eq!(config.locator.product_name_margin, 10);

        assert_eq!(config.capture.rotation, Rotation::Deg0);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = ScannerConfig::default();
        config.sampling.sample_budget = 24;
        config.capture.rotation = Rotation::Deg90;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ScannerConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.sampling.sample_budget, 24);
        assert_eq!(parsed.capture.rotation, Rotation::Deg90);
        assert_eq!(parsed.contours.binary_threshold, config.contours.binary_threshold);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: ScannerConfig = toml::from_str(
            r#"
            [sampling]
            ocr_stride = 3

            [capture]
            rotation = 270
            "#,
        )
        .unwrap();

        assert_eq!(parsed.sampling.ocr_stride, 3);
        assert_eq!(parsed.sampling.sample_budget, 18);
        assert_eq!(parsed.capture.rotation, Rotation::Deg270);
        assert_eq!(parsed.capture.fps, 30);
    }

    #[test]
    fn test_invalid_rotation_rejected() {
        let parsed: Result<ScannerConfig, _> = toml::from_str("[capture]\nrotation = 45\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_save_and_load_config() {
        let config = ScannerConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.sampling.ocr_stride, loaded.sampling.ocr_stride);
        assert_eq!(config.locator.product_name_margin, loaded.locator.product_name_margin);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    fn load_str(content: &str) -> Result<ScannerConfig> {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", content).unwrap();
        load_config(temp_file.path())
    }

    #[test]
    fn test_load_rejects_zero_blur_sigma() {
        let err = load_str("[contours]\nblur_sigma = 0.0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("blur_sigma"));
    }

    #[test]
    fn test_load_rejects_inverted_canny_thresholds() {
        let err = load_str("[contours]\ncanny_low = 300.0\ncanny_high = 100.0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("canny_low"));
    }

    #[test]
    fn test_load_rejects_zero_sample_budget() {
        assert!(load_str("[sampling]\nsample_budget = 0\n").is_err());
        assert!(load_str("[sampling]\nocr_stride = 0\n").is_err());
        assert!(load_str("[capture]\nfps = 0\n").is_err());
        assert!(load_str("[sampling]\nsample_budget = 1\n").is_ok());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
