//! # TrackPal
//!
//! TrackPal turns a precision multitouch trackpad into a device with
//! single-finger edge scrolling, middle-click emulation and hot-corner
//! taps, on top of a native driver that only produces multi-finger
//! scroll gestures.
//!
//! ## Overview
//!
//! The library consumes raw per-frame multitouch contacts from the
//! private MultitouchSupport framework, classifies each touch's intent
//! from very short early evidence, and — when scrolling is intended —
//! synthesizes pixel-precise scroll-wheel events with an inertial
//! coast-down after lift-off, while a Quartz event tap suppresses the
//! conflicting native scroll and cursor-move events.
//!
//! ## Architecture
//!
//! - [`touch`]: contact frame model, per-frame plausibility classifier,
//!   zone map, finger-count arbiter and the multitouch device source
//! - [`engine`]: the touch intent engine — session state, Bayesian
//!   intent evaluation, scroll emission, inertia, adaptive learning and
//!   session recording
//! - [`events`]: synthetic scroll event model, the Quartz event sink,
//!   the suppressing event tap and the display-link frame clock
//! - [`store`]: flat key/value settings file with legacy-token
//!   migration and adaptive state persistence
//! - [`time`]: monotonic high-resolution timebase
//! - [`app`]: CLI and typed configuration
//!
//! ## Event Pipeline
//!
//! ```text
//! ┌──────────────┐    ┌─────────────┐    ┌──────────────┐    ┌─────────────┐
//! │ MTDevice     │───▶│ Frame Ring  │───▶│ Intent       │───▶│ Scroll      │
//! │ callback     │    │ (lock-free) │    │ Evaluator    │    │ Emitter     │
//! └──────────────┘    └─────────────┘    └──────────────┘    └─────────────┘
//!                                                                   │
//! ┌──────────────┐    ┌─────────────┐    ┌──────────────┐           ▼
//! │ Native event │◀───│ Event Tap   │    │ Inertia      │◀───  lift-off
//! │ suppression  │    │ (HID point) │    │ Engine       │
//! └──────────────┘    └─────────────┘    └──────────────┘
//! ```
//!
//! ## Permissions
//!
//! The event tap requires Accessibility permissions on macOS:
//! System Settings → Privacy & Security → Accessibility

pub mod app;
pub mod engine;
pub mod events;
pub mod store;
pub mod time;
pub mod touch;

// Re-export commonly used types
pub use app::config::Config;
pub use engine::Engine;
pub use events::types::{ScrollEvent, TRACKPAL_EVENT_TAG};
pub use touch::types::{ContactFrame, ContactPhase, FrameMessage};
pub use touch::zones::Zone;

/// Result type alias for TrackPal
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for TrackPal
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Multitouch device error: {0}")]
    Device(String),

    #[error("Event tap error: {0}")]
    Tap(String),

    #[error("Event sink error: {0}")]
    Sink(String),

    #[error("Frame clock error: {0}")]
    Clock(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
