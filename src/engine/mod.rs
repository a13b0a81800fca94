//! The Touch Intent Engine
//!
//! Stateful pipeline from raw contact frames to synthesized scroll and
//! click events: session tracking, Bayesian intent evaluation, scroll
//! emission with sub-pixel accumulation, inertial coast-down, adaptive
//! threshold learning and session recording.

mod engine;
pub mod inertia;
pub mod intent;
pub mod learner;
pub mod recorder;
pub mod scroll;
pub mod session;

pub use engine::Engine;
pub use inertia::InertiaEngine;
pub use intent::{IntentDecision, IntentEvaluator};
pub use learner::{AdaptiveLearner, AdaptiveState};
pub use recorder::{ScrollSessionRecord, SessionRecorder};
pub use scroll::ScrollEmitter;
pub use session::TouchSession;
