//! Zone map
//!
//! Pure, total mapping from a normalized contact position to the zone
//! label that drives the rest of the pipeline. Evaluation order is
//! fixed: corners, then the middle-click rectangle, then the vertical
//! edges, then the horizontal band, then center.

use crate::app::config::{Config, Corner, HorizontalPosition, VerticalEdgeMode};
use serde::{Deserialize, Serialize};

/// Labeled region of the trackpad surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    LeftEdge,
    RightEdge,
    BottomEdge,
    TopEdge,
    TopLeftCorner,
    TopRightCorner,
    BottomLeftCorner,
    BottomRightCorner,
    MiddleClick,
    Center,
}

/// Scroll axis of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Zone {
    /// The axis this zone scrolls on, if it is a scroll zone.
    pub fn scroll_axis(&self) -> Option<Axis> {
        match self {
            Zone::LeftEdge | Zone::RightEdge => Some(Axis::Vertical),
            Zone::BottomEdge | Zone::TopEdge => Some(Axis::Horizontal),
            _ => None,
        }
    }

    /// Whether this zone participates in scroll evaluation.
    pub fn is_scroll_zone(&self) -> bool {
        self.scroll_axis().is_some()
    }

    /// The corner this zone labels, if any.
    pub fn corner(&self) -> Option<Corner> {
        match self {
            Zone::TopLeftCorner => Some(Corner::TopLeft),
            Zone::TopRightCorner => Some(Corner::TopRight),
            Zone::BottomLeftCorner => Some(Corner::BottomLeft),
            Zone::BottomRightCorner => Some(Corner::BottomRight),
            _ => None,
        }
    }

    pub fn is_corner(&self) -> bool {
        self.corner().is_some()
    }
}

/// Classify a normalized position. Total and deterministic: depends
/// only on `(x, y)` and the configuration.
pub fn zone_for(x: f64, y: f64, config: &Config) -> Zone {
    if config.corner_trigger_enabled {
        let s = config.corner_trigger_zone_size;
        let left = x < s;
        let right = x > 1.0 - s;
        let bottom = y < s;
        let top = y > 1.0 - s;
        match (left, right, bottom, top) {
            (true, _, _, true) => return Zone::TopLeftCorner,
            (_, true, _, true) => return Zone::TopRightCorner,
            (true, _, true, _) => return Zone::BottomLeftCorner,
            (_, true, true, _) => return Zone::BottomRightCorner,
            _ => {}
        }
    }

    if config.middle_click_enabled && in_middle_click_zone(x, y, config) {
        return Zone::MiddleClick;
    }

    if x < config.edge_zone_width
        && matches!(
            config.vertical_edge_mode,
            VerticalEdgeMode::Left | VerticalEdgeMode::Both
        )
    {
        return Zone::LeftEdge;
    }
    if x > 1.0 - config.edge_zone_width
        && matches!(
            config.vertical_edge_mode,
            VerticalEdgeMode::Right | VerticalEdgeMode::Both
        )
    {
        return Zone::RightEdge;
    }

    match config.horizontal_position {
        HorizontalPosition::Bottom if y < config.horizontal_zone_height => Zone::BottomEdge,
        HorizontalPosition::Top if y > 1.0 - config.horizontal_zone_height => Zone::TopEdge,
        _ => Zone::Center,
    }
}

/// The middle-click rectangle sits on the side opposite the horizontal
/// scroll band, centered horizontally.
fn in_middle_click_zone(x: f64, y: f64, config: &Config) -> bool {
    if (x - 0.5).abs() > config.middle_click_zone_width / 2.0 {
        return false;
    }
    match config.horizontal_position {
        HorizontalPosition::Bottom => y > 1.0 - config.middle_click_zone_height,
        HorizontalPosition::Top => y < config.middle_click_zone_height,
    }
}

/// How far inside its zone a position sits, in `[0, 1]`. Deeper means
/// closer to the physical edge the zone hugs; used as the evidence
/// prior for a touch starting there.
pub fn zone_depth(zone: Zone, x: f64, y: f64, config: &Config) -> f64 {
    let depth = match zone {
        Zone::LeftEdge => (config.edge_zone_width - x) / config.edge_zone_width,
        Zone::RightEdge => (x - (1.0 - config.edge_zone_width)) / config.edge_zone_width,
        Zone::BottomEdge => (config.horizontal_zone_height - y) / config.horizontal_zone_height,
        Zone::TopEdge => (y - (1.0 - config.horizontal_zone_height)) / config.horizontal_zone_height,
        Zone::TopLeftCorner
        | Zone::TopRightCorner
        | Zone::BottomLeftCorner
        | Zone::BottomRightCorner => {
            let s = config.corner_trigger_zone_size;
            let dx = if x < 0.5 { (s - x) / s } else { (x - (1.0 - s)) / s };
            let dy = if y < 0.5 { (s - y) / s } else { (y - (1.0 - s)) / s };
            dx.min(dy)
        }
        Zone::MiddleClick | Zone::Center => 0.0,
    };
    depth.clamp(0.0, 1.0)
}
