//! Touch input side of the pipeline
//!
//! Everything between the raw multitouch driver and the intent engine:
//! the contact frame model, the per-frame plausibility classifier, the
//! zone map and the finger-count arbiter, plus the FFI device source.

pub mod arbiter;
pub mod classifier;
pub mod source;
pub mod types;
pub mod zones;

pub use arbiter::{FingerArbiter, GestureMode};
pub use classifier::{ContactClassifier, TouchVerdict};
pub use types::{ContactFrame, ContactPhase, FrameMessage};
pub use zones::{Axis, Zone};
