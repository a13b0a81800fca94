//! Core types for the touch input stream
//!
//! Contact frames are plain copies of the primitive scalar fields the
//! multitouch driver reports; no driver-owned pointers cross the thread
//! boundary.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of one contact, as reported per frame by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContactPhase {
    /// Finger in sensing range but not touching
    Hover = 1,
    /// First frame of a new contact
    Start = 2,
    /// Contact established
    Contact = 3,
    /// Contact moving on the surface
    Move = 4,
    /// Contact about to leave the surface
    Lifting = 6,
    /// Contact released
    Released = 7,
}

impl ContactPhase {
    /// Map a raw driver state value. States 4 and 5 are both motion.
    pub fn from_raw(state: i32) -> Option<Self> {
        match state {
            1 => Some(ContactPhase::Hover),
            2 => Some(ContactPhase::Start),
            3 => Some(ContactPhase::Contact),
            4 | 5 => Some(ContactPhase::Move),
            6 => Some(ContactPhase::Lifting),
            7 => Some(ContactPhase::Released),
            _ => None,
        }
    }

    /// Frames in these phases carry no pressure data; density falls to
    /// zero on release, so they bypass plausibility classification.
    pub fn is_lift_off(&self) -> bool {
        matches!(self, ContactPhase::Lifting | ContactPhase::Released)
    }

    /// Whether the contact is on the surface.
    pub fn is_touching(&self) -> bool {
        matches!(
            self,
            ContactPhase::Start | ContactPhase::Contact | ContactPhase::Move
        )
    }
}

/// One contact in one driver frame, positions normalized to `[0, 1]`
/// with the origin at the bottom-left of the trackpad.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContactFrame {
    /// Normalized horizontal position
    pub x: f64,
    /// Normalized vertical position
    pub y: f64,
    /// Lifecycle phase
    pub phase: ContactPhase,
    /// Pressure density in `[0, 1]`
    pub density: f64,
    /// Contact ellipse major axis (sensor units)
    pub major_axis: f64,
    /// Contact ellipse minor axis (sensor units)
    pub minor_axis: f64,
    /// Monotonic timestamp in seconds
    pub timestamp: f64,
}

impl ContactFrame {
    /// Convenience constructor used by tests and the device source.
    pub fn new(x: f64, y: f64, phase: ContactPhase, timestamp: f64) -> Self {
        Self {
            x,
            y,
            phase,
            density: 0.10,
            major_axis: 8.0,
            minor_axis: 7.0,
            timestamp,
        }
    }

    /// Override contact geometry and pressure.
    pub fn with_geometry(mut self, density: f64, major_axis: f64, minor_axis: f64) -> Self {
        self.density = density;
        self.major_axis = major_axis;
        self.minor_axis = minor_axis;
        self
    }
}

/// Message handed from the multitouch callback thread to the engine.
///
/// The engine consumes the single contact only when `finger_count == 1`;
/// multi-finger frames update the arbiter, and `finger_count == 0` with
/// no contact is the "all released" pseudo-frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameMessage {
    /// The primary contact, when exactly one finger is down
    pub contact: Option<ContactFrame>,
    /// Number of fingers the driver reported for this frame
    pub finger_count: u32,
    /// Frame timestamp in seconds
    pub timestamp: f64,
}

impl FrameMessage {
    /// Frame carrying a single contact.
    pub fn single(contact: ContactFrame) -> Self {
        Self {
            contact: Some(contact),
            finger_count: 1,
            timestamp: contact.timestamp,
        }
    }

    /// Multi-finger frame; only the count matters downstream.
    pub fn fingers(finger_count: u32, timestamp: f64) -> Self {
        Self {
            contact: None,
            finger_count,
            timestamp,
        }
    }

    /// The "all released" pseudo-frame.
    pub fn all_released(timestamp: f64) -> Self {
        Self {
            contact: None,
            finger_count: 0,
            timestamp,
        }
    }
}
