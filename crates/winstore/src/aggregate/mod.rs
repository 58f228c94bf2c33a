//! Sliding-window aggregation over per-key sample histories.
//!
//! # Architecture
//!
//! ```text
//! add_value → SampleChain::prepend → Window::add (per window, name order)
//!           → Threshold::check → SampleChain::trim(max period)
//! ```

pub mod chain;
pub mod history;
pub mod threshold;
pub mod window;

pub use chain::{NodeId, SampleChain};
pub use history::KeyHistory;
pub use threshold::{Threshold, ThresholdBounds, ThresholdEvent, ThresholdNotify, ThresholdState};
pub use window::Window;
