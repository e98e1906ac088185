//! Frame data structures for camera content

use image::{imageops, RgbaImage};
use parking_lot::Mutex;
use std::fmt;
use std::time::Instant;

use super::Rotation;

/// Hook run when the camera buffer behind a frame can be reused
type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A single camera frame.
///
/// The frame owns its pixels for the duration of one analysis pass. If a
/// release hook is attached it runs exactly once, when the frame is dropped,
/// whichever way the pass ends.
pub struct CameraFrame {
    /// Raw RGBA pixels as delivered by the camera (sensor orientation)
    image: RgbaImage,
    /// Clockwise rotation needed to make the image upright
    rotation: Rotation,
    /// Timestamp when the frame was captured
    timestamp: Instant,
    /// Position in the camera stream
    sequence: u64,
    /// Human-readable source name (file stem when replaying)
    label: String,
    /// Locked so `&CameraFrame` can cross into OCR futures
    release: Mutex<Option<ReleaseHook>>,
}

impl CameraFrame {
    /// Create a new camera frame
    pub fn new(image: RgbaImage, rotation: Rotation, timestamp: Instant) -> Self {
        Self {
            image,
            rotation,
            timestamp,
            sequence: 0,
            label: String::new(),
            release: Mutex::new(None),
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Attach a hook that returns the buffer to the camera subsystem
    pub fn with_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        *self.release.get_mut() = Some(Box::new(release));
        self
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get frame dimensions as (width, height) after rotation
    pub fn upright_dimensions(&self) -> (u32, u32) {
        let (w, h) = self.image.dimensions();
        match self.rotation {
            Rotation::Deg90 | Rotation::Deg270 => (h, w),
            Rotation::Deg0 | Rotation::Deg180 => (w, h),
        }
    }

    /// The image turned upright, in the coordinate space OCR boxes use
    pub fn upright_image(&self) -> RgbaImage {
        match self.rotation {
            Rotation::Deg0 => self.image.clone(),
            Rotation::Deg90 => imageops::rotate90(&self.image),
            Rotation::Deg180 => imageops::rotate180(&self.image),
            Rotation::Deg270 => imageops::rotate270(&self.image),
        }
    }
}

impl fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraFrame")
            .field("dimensions", &self.image.dimensions())
            .field("rotation", &self.rotation)
            .field("sequence", &self.sequence)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Drop for CameraFrame {
    fn drop(&mut self) {
        if let Some(release) = self.release.get_mut().take() {
            release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_release_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();

        let frame = CameraFrame::new(RgbaImage::new(2, 2), Rotation::Deg0, Instant::now())
            .with_release(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        assert_eq!(released.load(Ordering::SeqCst), 0);

        drop(frame);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_frame_can_be_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CameraFrame>();

        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let frame = CameraFrame::new(RgbaImage::new(2, 2), Rotation::Deg0, Instant::now())
            .with_label("shared")
            .with_release(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let label = std::thread::scope(|scope| scope.spawn(|| frame.label().to_string()).join().unwrap());
        assert_eq!(label, "shared");

        drop(frame);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_upright_dimensions() {
        let frame = CameraFrame::new(RgbaImage::new(640, 480), Rotation::Deg90, Instant::now());
        assert_eq!(frame.upright_dimensions(), (480, 640));
        assert_eq!(frame.upright_image().dimensions(), (480, 640));

        let frame = CameraFrame::new(RgbaImage::new(640, 480), Rotation::Deg180, Instant::now());
        assert_eq!(frame.upright_dimensions(), (640, 480));
    }

    #[test]
    fn test_upright_image_rotates_pixels() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));

        let frame = CameraFrame::new(image, Rotation::Deg90, Instant::now());
        let upright = frame.upright_image();

        // Clockwise turn moves the left pixel to the top of a 1x2 column
        assert_eq!(upright.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(upright.get_pixel(0, 1).0, [0, 0, 0, 0]);
    }
}
