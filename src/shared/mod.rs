//! Shared state and messaging between the scanner and the presentation layer
//!
//! The scan driver is the only writer. Readers get a snapshot behind a lock
//! and a channel of events, never the session itself.

pub mod messages;
pub mod state;

pub use messages::ScanEvent;
pub use state::{ScanSnapshot, SharedSnapshot};
