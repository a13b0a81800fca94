//! Output side of the pipeline
//!
//! Synthetic scroll event model, the event sink capability with its
//! Quartz implementation, the suppressing event tap at the HID
//! insertion point, and the display-link frame clock for inertia.

pub mod clock;
pub mod sink;
pub mod tap;
pub mod types;

pub use clock::FrameClock;
pub use sink::{EventSink, RecordingSink, SharedRecordingSink};
pub use tap::{should_drop_event, InterceptKind, Interceptor, SharedState};
pub use types::{MomentumPhase, ScrollEvent, ScrollPhase, TRACKPAL_EVENT_TAG};
