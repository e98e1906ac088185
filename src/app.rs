//! Application Coordinator
//!
//! Wires a frame source, the OCR engine and the scan driver together and
//! runs a presentation thread that consumes scan events.

use anyhow::{bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analysis::ScanOutcome;
use crate::capture::{CaptureConfig, DirectoryFrameSource};
use crate::config::ScannerConfig;
use crate::session::{FrameDisposition, ScanAbortHandle, ScanDriver};
use crate::shared::ScanEvent;
use crate::vision::{OcrEngine, Rect};

/// Main application coordinator
pub struct ScannerApp {
    config: ScannerConfig,
    ocr: Arc<dyn OcrEngine>,
}

impl ScannerApp {
    pub fn new(config: ScannerConfig, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { config, ocr }
    }

    /// Scan a directory of frames as if it were a live camera feed.
    ///
    /// Fails when the frames run out before the scan has sampled enough.
    pub fn scan_directory(&self, frames_dir: &Path) -> Result<Option<ScanOutcome>> {
        let source = DirectoryFrameSource::open(frames_dir, CaptureConfig::from(&self.config.capture))?;
        let in_flight = source.in_flight();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build scan runtime")?;

        let (events_tx, events_rx) = unbounded();
        let presenter = std::thread::spawn(move || present(events_rx));

        // The sender is dropped with the driver, which ends the presenter
        let outcome = runtime.block_on(self.drive(source, events_tx));

        if presenter.join().is_err() {
            warn!("Presentation thread panicked");
        }

        let leaked = in_flight.load(Ordering::SeqCst);
        if leaked > 0 {
            warn!("{} frames were never released", leaked);
        }
        outcome
    }

    async fn drive(&self, source: DirectoryFrameSource, events: Sender<ScanEvent>) -> Result<Option<ScanOutcome>> {
        let mut driver = ScanDriver::new(&self.config, self.ocr.clone(), events);
        tokio::spawn(abort_on_interrupt(driver.abort_handle()));
        driver.start_scan();

        for frame in source {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Skipping frame: {}", e);
                    continue;
                }
            };

            match driver.on_frame(frame).await {
                FrameDisposition::Finished(outcome) => return Ok(outcome),
                FrameDisposition::Cancelled => bail!("Scan aborted"),
                _ => {}
            }
        }

        let sampled = driver.session().scanned_frames();
        driver.abort();
        bail!(
            "Frames ran out after {} of {} sampled frames",
            sampled,
            self.config.sampling.sample_budget
        )
    }
}

/// Abort the scan on Ctrl-C
async fn abort_on_interrupt(handle: ScanAbortHandle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupted, aborting scan");
        handle.abort();
    }
}

/// Stand-in for a live overlay: log what it would draw
fn present(events: Receiver<ScanEvent>) {
    let mut price_rect: Option<Rect> = None;
    for event in events.iter() {
        match event {
            ScanEvent::ScanStateChanged(true) => info!("Scanning..."),
            ScanEvent::ScanStateChanged(false) => info!("Scanning stopped"),
            ScanEvent::PriceFound(Some(price)) => {
                let (width, height) = price.image_size;
                debug!(
                    "Price: {} at {:?} in {}x{} frame (line {:?})",
                    price.text, price.rect, width, height, price.line_index
                );
                price_rect = Some(price.rect);
            }
            ScanEvent::ProductNameFound(Some(name)) => match price_rect.take() {
                Some(rect) => debug!("Product: {} (label spans {:?})", name.text, rect.expand(&name.rect)),
                None => debug!("Product: {}", name.text),
            },
            ScanEvent::PriceTagContourFound(Some(rect)) => debug!("Price tag: {:?}", rect),
            ScanEvent::PriceFound(None) => price_rect = None,
            ScanEvent::ProductNameFound(None) | ScanEvent::PriceTagContourFound(None) => {}
            ScanEvent::Benchmark(elapsed) => info!("Scan took {} ms", elapsed.as_millis()),
            ScanEvent::Finished(Some(outcome)) => info!(
                "Result: {:.2} ({})",
                outcome.price,
                outcome.product_name.as_deref().unwrap_or("unknown product")
            ),
            ScanEvent::Finished(None) => info!("No price found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::ocr::{TextBlock, TextElement, TextLine};
    use crate::vision::{Rect, ReplayOcr, TextResult};
    use image::RgbaImage;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn price_text(price: &str) -> TextResult {
        let rect = Rect::new(4, 4, 28, 16);
        TextResult {
            blocks: vec![TextBlock {
                text: price.into(),
                bounding_box: Some(rect),
                lines: vec![TextLine {
                    text: price.into(),
                    bounding_box: Some(rect),
                    confidence: 0.9,
                    elements: vec![TextElement {
                        text: price.into(),
                        bounding_box: Some(rect),
                        confidence: 0.9,
                    }],
                }],
            }],
        }
    }

    fn write_frames(dir: &Path, count: usize) -> HashMap<String, TextResult> {
        (0..count)
            .map(|i| {
                let label = format!("frame_{i:03}");
                RgbaImage::new(32, 24).save(dir.join(format!("{label}.png"))).unwrap();
                let price = if i == 6 { "3.49" } else { "3.99" };
                (label, price_text(price))
            })
            .collect()
    }

    fn config_at_fps(fps: u32) -> ScannerConfig {
        let mut config = ScannerConfig::default();
        config.capture.fps = fps;
        config
    }

    #[test]
    fn test_scan_directory_votes() {
        let dir = TempDir::new().unwrap();
        let recorded = write_frames(dir.path(), 20);

        let app = ScannerApp::new(config_at_fps(10), Arc::new(ReplayOcr::new(recorded)));
        let outcome = app.scan_directory(dir.path()).unwrap().unwrap();
        assert!((outcome.price - 3.99).abs() < 1e-9);
        assert_eq!(outcome.product_name, None);
    }

    #[test]
    fn test_scan_directory_runs_out_of_frames() {
        let dir = TempDir::new().unwrap();
        let recorded = write_frames(dir.path(), 20);

        // 30 fps against a 50 ms throttle keeps every other frame
        let app = ScannerApp::new(config_at_fps(30), Arc::new(ReplayOcr::new(recorded)));
        assert!(app.scan_directory(dir.path()).is_err());
    }
}
