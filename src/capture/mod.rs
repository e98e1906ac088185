//! Camera Capture Layer
//!
//! Live capture is owned by the host platform. This layer defines the frame
//! type handed to the scanner and a directory replay source that plays a
//! folder of still images back as a camera feed.

pub mod frame;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::vision::FrameError;
use frame::CameraFrame;

/// Clockwise rotation from sensor orientation to upright
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

impl TryFrom<u32> for Rotation {
    type Error = FrameError;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(FrameError::UnsupportedRotation(other)),
        }
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Camera capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Frames per second the replayed feed pretends to run at
    pub fps: u32,
    /// Rotation applied to every frame
    pub rotation: Rotation,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            rotation: Rotation::Deg0,
        }
    }
}

/// Plays a directory of image files back as a camera feed.
///
/// Files are ordered by name and stamped `1000 / fps` ms apart starting
/// from the moment the source is created.
pub struct DirectoryFrameSource {
    paths: std::vec::IntoIter<PathBuf>,
    config: CaptureConfig,
    origin: Instant,
    next_sequence: u64,
    in_flight: Arc<AtomicUsize>,
}

impl DirectoryFrameSource {
    /// Open a directory of frame images
    pub fn open(dir: &Path, config: CaptureConfig) -> Result<Self> {
        if config.fps == 0 {
            bail!("Capture fps must be greater than zero");
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory: {:?}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image_file(path))
            .collect();
        paths.sort();

        info!("Replaying {} frames from {:?} at {} fps", paths.len(), dir, config.fps);

        Ok(Self {
            paths: paths.into_iter(),
            config,
            origin: Instant::now(),
            next_sequence: 0,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Count of handed-out frames not yet released
    pub fn in_flight(&self) -> Arc<AtomicUsize> {
        self.in_flight.clone()
    }

    fn frame_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.config.fps))
    }

    fn load(&self, path: &Path, sequence: u64) -> Result<CameraFrame, FrameError> {
        let image = image::open(path)
            .map_err(|e| FrameError::Decode(format!("{:?}: {}", path, e)))?
            .to_rgba8();

        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let timestamp = self.origin + self.frame_period() * sequence as u32;

        debug!("Loaded frame {} '{}' ({}x{})", sequence, label, image.width(), image.height());

        let in_flight = self.in_flight.clone();
        in_flight.fetch_add(1, Ordering::SeqCst);

        Ok(CameraFrame::new(image, self.config.rotation, timestamp)
            .with_sequence(sequence)
            .with_label(label)
            .with_release(move || {
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }))
    }
}

impl Iterator for DirectoryFrameSource {
    type Item = Result<CameraFrame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(self.load(&path, sequence))
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "png" | "jpg" | "jpeg" | "bmp" | "webp" | "tif" | "tiff"
            )
        })
        .unwrap_or(false)
}
