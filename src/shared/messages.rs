//! Message types sent from the scan driver to the presentation layer

use std::time::Duration;

use crate::analysis::ScanOutcome;
use crate::vision::{Rect, TextFragment};

/// Events emitted while a scan runs
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Scanning started (`true`) or stopped (`false`)
    ScanStateChanged(bool),
    /// Price located in the latest analyzed frame
    PriceFound(Option<TextFragment>),
    /// Product name located in the latest analyzed frame
    ProductNameFound(Option<TextFragment>),
    /// Tag outline located in the latest analyzed frame
    PriceTagContourFound(Option<Rect>),
    /// Terminal result of a completed scan
    Finished(Option<ScanOutcome>),
    /// Wall time from scan start to completion
    Benchmark(Duration),
}
