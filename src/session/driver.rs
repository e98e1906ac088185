//! Async scan driver
//!
//! Owns the session and runs the per-frame pipeline: admission, OCR (fresh
//! or reused), contour extraction, location, recording. `on_frame` takes
//! `&mut self` and awaits OCR inline, so frame results are recorded in the
//! order frames were accepted no matter how long OCR takes.
//!
//! Aborting cancels the scan's token; an OCR pass still in flight is
//! dropped and its result never reaches the session.

use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Admission, OcrPlan, Progress, ScanSession};
use crate::analysis::{analyze_frame, FrameAnalysis, FrameResult, LocatorConfig, ScanOutcome};
use crate::capture::frame::CameraFrame;
use crate::config::ScannerConfig;
use crate::shared::{ScanEvent, ScanSnapshot, SharedSnapshot};
use crate::vision::{process_frame, ContourExtractor, OcrEngine};

/// What happened to a frame handed to the driver
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDisposition {
    /// No scan in progress
    Ignored,
    /// Dropped by the frame-rate throttle
    Throttled,
    /// Analyzed; `found_price` tells whether it produced a result
    Analyzed { found_price: bool },
    /// Counted, but OCR failed so nothing was analyzed
    Skipped,
    /// This frame completed the scan
    Finished(Option<ScanOutcome>),
    /// The scan was aborted before or during this frame
    Cancelled,
}

/// Aborts the driver's current scan from any thread
#[derive(Debug, Clone)]
pub struct ScanAbortHandle {
    token: Arc<Mutex<CancellationToken>>,
}

impl ScanAbortHandle {
    pub fn abort(&self) {
        self.token.lock().cancel();
    }
}

/// Drives one scan session from incoming camera frames
pub struct ScanDriver {
    session: ScanSession,
    ocr: Arc<dyn OcrEngine>,
    extractor: ContourExtractor,
    locator: LocatorConfig,
    events: Sender<ScanEvent>,
    snapshot: SharedSnapshot,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl ScanDriver {
    pub fn new(config: &ScannerConfig, ocr: Arc<dyn OcrEngine>, events: Sender<ScanEvent>) -> Self {
        let session = ScanSession::new(config.sampling.clone(), config.confidence.clone());
        let snapshot = ScanSnapshot {
            confidence: session.confidence(),
            ..Default::default()
        };

        Self {
            session,
            ocr,
            extractor: ContourExtractor::new(config.contours.clone()),
            locator: config.locator.clone(),
            events,
            snapshot: Arc::new(RwLock::new(snapshot)),
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    /// Live view for the presentation layer
    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    pub fn abort_handle(&self) -> ScanAbortHandle {
        ScanAbortHandle {
            token: self.cancel.clone(),
        }
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    /// Begin a new scan, discarding any previous one
    pub fn start_scan(&mut self) {
        *self.cancel.lock() = CancellationToken::new();
        self.session.start(Instant::now());

        {
            let mut snapshot = self.snapshot.write();
            snapshot.is_scanning = true;
            snapshot.scanned_frames = 0;
            snapshot.confidence = self.session.confidence();
            snapshot.clear_detections();
        }
        self.emit(ScanEvent::ScanStateChanged(true));
    }

    /// Abort the current scan, if any
    pub fn abort(&mut self) {
        self.cancel.lock().cancel();
        self.stop_cancelled();
    }

    /// Run one camera frame through the pipeline.
    ///
    /// The frame is consumed and released when this returns, on every path.
    pub async fn on_frame(&mut self, frame: CameraFrame) -> FrameDisposition {
        let token = self.cancel.lock().clone();
        if token.is_cancelled() {
            if self.session.is_scanning() {
                self.stop_cancelled();
                return FrameDisposition::Cancelled;
            }
            return FrameDisposition::Ignored;
        }

        let accepted = match self.session.admit(frame.timestamp()) {
            Admission::NotScanning => return FrameDisposition::Ignored,
            Admission::Throttled => {
                debug!("Throttled frame {}", frame.sequence());
                return FrameDisposition::Throttled;
            }
            Admission::Accepted(accepted) => accepted,
        };
        let generation = accepted.generation;

        let text = match accepted.ocr {
            OcrPlan::Reuse(text) => text,
            OcrPlan::Fresh => {
                debug!("Dispatching OCR for frame {} (position {})", frame.sequence(), accepted.position);
                let ocr = self.ocr.clone();
                let recognized = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    result = ocr.recognize(&frame) => Some(result),
                };

                let Some(recognized) = recognized else {
                    self.stop_cancelled();
                    return FrameDisposition::Cancelled;
                };

                match recognized {
                    Ok(text) => Arc::new(text),
                    Err(e) => {
                        warn!("Skipping frame {}: {}", frame.sequence(), e);
                        return self.complete(generation, None, FrameDisposition::Skipped);
                    }
                }
            }
        };

        let vision = process_frame(&frame, &text, &self.extractor);
        let analysis = analyze_frame(&vision.fragments, &vision.contours, self.session.confidence(), &self.locator);
        debug!(
            "Frame {} (position {}) analyzed, vision took {} ms, price {:?}",
            frame.sequence(),
            accepted.position,
            vision.processing_time_ms,
            analysis.price.as_ref().map(|p| &p.text)
        );
        self.publish_analysis(&analysis);

        let found_price = analysis.price.is_some();
        let result = analysis.into_frame_result(text);
        self.complete(generation, result, FrameDisposition::Analyzed { found_price })
    }

    fn complete(
        &mut self,
        generation: u64,
        result: Option<FrameResult>,
        on_continue: FrameDisposition,
    ) -> FrameDisposition {
        match self.session.record(generation, result) {
            Progress::Continue => {
                let mut snapshot = self.snapshot.write();
                snapshot.scanned_frames = self.session.scanned_frames();
                snapshot.confidence = self.session.confidence();
                on_continue
            }
            Progress::Finished(outcome) => {
                self.publish_finished(outcome.clone());
                FrameDisposition::Finished(outcome)
            }
            Progress::Stale => FrameDisposition::Cancelled,
        }
    }

    fn stop_cancelled(&mut self) {
        if !self.session.is_scanning() {
            return;
        }
        self.session.abort();
        self.publish_stopped();
    }

    fn publish_analysis(&self, analysis: &FrameAnalysis) {
        self.snapshot.write().apply_analysis(analysis);
        self.emit(ScanEvent::PriceFound(analysis.price.clone()));
        if analysis.price.is_some() {
            self.emit(ScanEvent::PriceTagContourFound(analysis.price_tag_contour));
        }
        if analysis.price_tag_contour.is_some() {
            self.emit(ScanEvent::ProductNameFound(analysis.product_name.clone()));
        }
    }

    fn publish_finished(&self, outcome: Option<ScanOutcome>) {
        let elapsed = self.session.elapsed(Instant::now());
        info!("Scan completed in {:?}", elapsed);

        self.emit(ScanEvent::Benchmark(elapsed));
        self.emit(ScanEvent::Finished(outcome));
        self.publish_stopped();
    }

    fn publish_stopped(&self) {
        {
            let mut snapshot = self.snapshot.write();
            snapshot.is_scanning = false;
            snapshot.scanned_frames = self.session.scanned_frames();
            snapshot.clear_detections();
        }
        self.emit(ScanEvent::ScanStateChanged(false));
        self.emit(ScanEvent::PriceFound(None));
        self.emit(ScanEvent::ProductNameFound(None));
        self.emit(ScanEvent::PriceTagContourFound(None));
    }

    fn emit(&self, event: ScanEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}
