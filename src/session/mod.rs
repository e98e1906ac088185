//! Scan Session
//!
//! Single-writer state of one user-initiated scan: which frames are sampled,
//! which get fresh OCR, the collected per-frame results, and the adaptive
//! confidence threshold. The session itself performs no I/O; the async
//! driver in [`driver`] feeds it.
//!
//! Every scan gets a new generation number. Work started under an older
//! generation (an OCR pass that outlived an abort, say) is rejected as
//! stale when it tries to record.

pub mod driver;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::analysis::{aggregate, FrameResult, ScanOutcome};
use crate::config::{ConfidenceConfig, SamplingConfig};
use crate::vision::TextResult;

pub use driver::{FrameDisposition, ScanAbortHandle, ScanDriver};

/// Scan lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning,
}

/// Where the text for an accepted frame comes from
#[derive(Debug, Clone)]
pub enum OcrPlan {
    /// Dispatch OCR for this frame
    Fresh,
    /// Reuse the hierarchy behind the latest frame result
    Reuse(Arc<TextResult>),
}

/// A frame the session has agreed to analyze
#[derive(Debug, Clone)]
pub struct AcceptedFrame {
    /// Scan this frame belongs to
    pub generation: u64,
    /// Zero-based position in the accepted-frame stream
    pub position: u32,
    pub ocr: OcrPlan,
}

/// Decision on an incoming frame
#[derive(Debug, Clone)]
pub enum Admission {
    /// No scan in progress
    NotScanning,
    /// Arrived too soon after the last accepted frame
    Throttled,
    Accepted(AcceptedFrame),
}

/// Session state after recording a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// More frames needed
    Continue,
    /// Sample budget reached; the scan is over
    Finished(Option<ScanOutcome>),
    /// The frame belonged to a scan that already ended
    Stale,
}

/// Mutable state of the current scan
#[derive(Debug)]
pub struct ScanSession {
    sampling: SamplingConfig,
    confidence_config: ConfidenceConfig,
    state: ScanState,
    generation: u64,
    results: Vec<FrameResult>,
    scanned_frames: u32,
    confidence: f32,
    started_at: Option<Instant>,
    last_accepted: Option<Instant>,
}

impl ScanSession {
    pub fn new(sampling: SamplingConfig, confidence_config: ConfidenceConfig) -> Self {
        let confidence = confidence_config.initial;
        Self {
            sampling,
            confidence_config,
            state: ScanState::Idle,
            generation: 0,
            results: Vec::new(),
            scanned_frames: 0,
            confidence,
            started_at: None,
            last_accepted: None,
        }
    }

    /// Reset all scan state and begin sampling. Returns the new generation.
    pub fn start(&mut self, now: Instant) -> u64 {
        self.generation += 1;
        self.state = ScanState::Scanning;
        self.results.clear();
        self.scanned_frames = 0;
        self.confidence = self.confidence_config.initial;
        self.started_at = Some(now);
        self.last_accepted = None;

        info!("Scan {} started", self.generation);
        self.generation
    }

    /// Decide whether a frame captured at `timestamp` is analyzed
    pub fn admit(&mut self, timestamp: Instant) -> Admission {
        if self.state != ScanState::Scanning {
            return Admission::NotScanning;
        }

        if let Some(last) = self.last_accepted {
            if timestamp.saturating_duration_since(last) < self.sampling.frame_interval() {
                return Admission::Throttled;
            }
        }
        self.last_accepted = Some(timestamp);

        let position = self.scanned_frames;
        let ocr = match self.results.last() {
            Some(last) if position % self.sampling.ocr_stride.max(1) != 0 => OcrPlan::Reuse(last.text.clone()),
            _ => OcrPlan::Fresh,
        };

        Admission::Accepted(AcceptedFrame {
            generation: self.generation,
            position,
            ocr,
        })
    }

    /// Count an accepted frame and store its result, if any.
    ///
    /// Lowers the confidence threshold at the checkpoint when too few
    /// results have come in, and finishes the scan once the sample budget
    /// is used up.
    pub fn record(&mut self, generation: u64, result: Option<FrameResult>) -> Progress {
        if !self.is_current(generation) {
            debug!("Discarding frame from stale scan {}", generation);
            return Progress::Stale;
        }

        if let Some(result) = result {
            if self.results.len() < self.sampling.sample_budget as usize {
                self.results.push(result);
            }
        }
        self.scanned_frames += 1;

        if self.scanned_frames == self.confidence_config.checkpoint_frame
            && self.results.len() < self.confidence_config.min_results
            && self.confidence > self.confidence_config.minimum
        {
            info!(
                "Only {} results after {} frames, lowering confidence {:.2} -> {:.2}",
                self.results.len(),
                self.scanned_frames,
                self.confidence,
                self.confidence_config.minimum
            );
            self.confidence = self.confidence_config.minimum;
        }

        if self.scanned_frames >= self.sampling.sample_budget {
            return Progress::Finished(self.finish());
        }

        Progress::Continue
    }

    /// Stop the current scan without a result
    pub fn abort(&mut self) {
        if self.state == ScanState::Scanning {
            info!("Scan {} aborted after {} frames", self.generation, self.scanned_frames);
            self.end();
        }
    }

    fn finish(&mut self) -> Option<ScanOutcome> {
        let outcome = aggregate(&self.results);
        info!(
            "Scan {} finished: {} results from {} frames -> {:?}",
            self.generation,
            self.results.len(),
            self.scanned_frames,
            outcome
        );
        self.end();
        outcome
    }

    fn end(&mut self) {
        self.state = ScanState::Idle;
        self.results.clear();
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state == ScanState::Scanning && generation == self.generation
    }

    pub fn is_scanning(&self) -> bool {
        self.state == ScanState::Scanning
    }

    /// Threshold the price locator should use for the next frame
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn scanned_frames(&self) -> u32 {
        self.scanned_frames
    }

    pub fn results(&self) -> &[FrameResult] {
        &self.results
    }

    /// Time since the scan started
    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(SamplingConfig::default(), ConfidenceConfig::default())
    }
}
