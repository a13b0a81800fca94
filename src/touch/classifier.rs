//! Per-frame contact plausibility classification
//!
//! Filters palms (too large) and hovers/grazes (too light) before any
//! session state is touched. Classification is stateless; the counters
//! exist only for diagnostics.

use super::types::ContactFrame;
use crate::app::config::Config;

/// Verdict for a single contact frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchVerdict {
    /// Plausible fingertip
    Valid,
    /// Pressure density below the light-touch threshold
    TooLight,
    /// Contact ellipse larger than a fingertip
    TooLarge,
}

/// Stateless classifier with diagnostic counters.
#[derive(Debug, Default)]
pub struct ContactClassifier {
    passed: u64,
    filtered_light: u64,
    filtered_large: u64,
}

impl ContactClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one frame. Lift-off frames bypass the filters because
    /// density falls to zero on release.
    pub fn classify(&mut self, frame: &ContactFrame, config: &Config) -> TouchVerdict {
        if frame.phase.is_lift_off() {
            return TouchVerdict::Valid;
        }

        if config.filter_large_touches
            && (frame.major_axis > config.large_touch_major_axis_threshold
                || frame.minor_axis > config.large_touch_minor_axis_threshold)
        {
            self.filtered_large += 1;
            return TouchVerdict::TooLarge;
        }

        if config.filter_light_touches && frame.density < config.light_touch_density_threshold {
            self.filtered_light += 1;
            return TouchVerdict::TooLight;
        }

        self.passed += 1;
        TouchVerdict::Valid
    }

    /// (passed, filtered_light, filtered_large)
    pub fn counters(&self) -> (u64, u64, u64) {
        (self.passed, self.filtered_light, self.filtered_large)
    }
}
