//! Typed configuration
//!
//! Runtime configuration for the whole pipeline. Values are clamped to
//! their legal ranges on load — a bad settings file degrades, it never
//! rejects startup. Enum options carry stable ASCII tokens for
//! persistence, plus the legacy localized raw values one historical
//! release wrote; those are accepted once and migrated.

use serde::{Deserialize, Serialize};

/// Which vertical edges scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VerticalEdgeMode {
    Left,
    #[default]
    Right,
    Both,
}

/// Where the horizontal scroll band sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HorizontalPosition {
    #[default]
    Bottom,
    Top,
}

/// Scroll acceleration curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AccelerationCurve {
    #[default]
    Linear,
    Quadratic,
    Cubic,
    Ease,
}

/// Trackpad corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Action fired by a corner tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CornerAction {
    #[default]
    None,
    MissionControl,
    AppWindows,
    ShowDesktop,
    Launchpad,
    NotificationCenter,
    RightClick,
}

impl VerticalEdgeMode {
    pub fn as_token(&self) -> &'static str {
        match self {
            VerticalEdgeMode::Left => "left",
            VerticalEdgeMode::Right => "right",
            VerticalEdgeMode::Both => "both",
        }
    }

    pub fn parse_token(token: &str) -> Option<Self> {
        match token {
            "left" => Some(VerticalEdgeMode::Left),
            "right" => Some(VerticalEdgeMode::Right),
            "both" => Some(VerticalEdgeMode::Both),
            _ => None,
        }
    }

    /// Raw values written by the localized legacy release.
    pub fn parse_legacy(token: &str) -> Option<Self> {
        match token {
            "左侧" => Some(VerticalEdgeMode::Left),
            "右侧" => Some(VerticalEdgeMode::Right),
            "两侧" => Some(VerticalEdgeMode::Both),
            _ => None,
        }
    }
}

impl HorizontalPosition {
    pub fn as_token(&self) -> &'static str {
        match self {
            HorizontalPosition::Bottom => "bottom",
            HorizontalPosition::Top => "top",
        }
    }

    pub fn parse_token(token: &str) -> Option<Self> {
        match token {
            "bottom" => Some(HorizontalPosition::Bottom),
            "top" => Some(HorizontalPosition::Top),
            _ => None,
        }
    }

    pub fn parse_legacy(token: &str) -> Option<Self> {
        match token {
            "底部" => Some(HorizontalPosition::Bottom),
            "顶部" => Some(HorizontalPosition::Top),
            _ => None,
        }
    }
}

impl AccelerationCurve {
    pub fn as_token(&self) -> &'static str {
        match self {
            AccelerationCurve::Linear => "linear",
            AccelerationCurve::Quadratic => "quadratic",
            AccelerationCurve::Cubic => "cubic",
            AccelerationCurve::Ease => "ease",
        }
    }

    pub fn parse_token(token: &str) -> Option<Self> {
        match token {
            "linear" => Some(AccelerationCurve::Linear),
            "quadratic" => Some(AccelerationCurve::Quadratic),
            "cubic" => Some(AccelerationCurve::Cubic),
            "ease" => Some(AccelerationCurve::Ease),
            _ => None,
        }
    }

    pub fn parse_legacy(token: &str) -> Option<Self> {
        match token {
            "线性" => Some(AccelerationCurve::Linear),
            "二次" => Some(AccelerationCurve::Quadratic),
            "三次" => Some(AccelerationCurve::Cubic),
            "缓动" => Some(AccelerationCurve::Ease),
            _ => None,
        }
    }
}

impl CornerAction {
    pub fn as_token(&self) -> &'static str {
        match self {
            CornerAction::None => "none",
            CornerAction::MissionControl => "mission_control",
            CornerAction::AppWindows => "app_windows",
            CornerAction::ShowDesktop => "show_desktop",
            CornerAction::Launchpad => "launchpad",
            CornerAction::NotificationCenter => "notification_center",
            CornerAction::RightClick => "right_click",
        }
    }

    pub fn parse_token(token: &str) -> Option<Self> {
        match token {
            "none" => Some(CornerAction::None),
            "mission_control" => Some(CornerAction::MissionControl),
            "app_windows" => Some(CornerAction::AppWindows),
            "show_desktop" => Some(CornerAction::ShowDesktop),
            "launchpad" => Some(CornerAction::Launchpad),
            "notification_center" => Some(CornerAction::NotificationCenter),
            "right_click" => Some(CornerAction::RightClick),
            _ => None,
        }
    }

    pub fn parse_legacy(token: &str) -> Option<Self> {
        match token {
            "无" => Some(CornerAction::None),
            "调度中心" => Some(CornerAction::MissionControl),
            "应用窗口" => Some(CornerAction::AppWindows),
            "显示桌面" => Some(CornerAction::ShowDesktop),
            "启动台" => Some(CornerAction::Launchpad),
            "通知中心" => Some(CornerAction::NotificationCenter),
            "右键" => Some(CornerAction::RightClick),
            _ => None,
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Fraction of trackpad width used as the left/right scroll strip
    pub edge_zone_width: f64,
    /// Fraction of trackpad height used as the top/bottom scroll strip
    pub horizontal_zone_height: f64,
    pub scroll_multiplier: f64,
    pub vertical_edge_mode: VerticalEdgeMode,
    pub horizontal_position: HorizontalPosition,

    pub middle_click_enabled: bool,
    pub middle_click_zone_width: f64,
    pub middle_click_zone_height: f64,

    pub corner_trigger_enabled: bool,
    pub corner_trigger_zone_size: f64,
    pub corner_action_top_left: CornerAction,
    pub corner_action_top_right: CornerAction,
    pub corner_action_bottom_left: CornerAction,
    pub corner_action_bottom_right: CornerAction,

    pub acceleration_curve: AccelerationCurve,

    pub filter_light_touches: bool,
    pub light_touch_density_threshold: f64,
    pub filter_large_touches: bool,
    pub large_touch_major_axis_threshold: f64,
    pub large_touch_minor_axis_threshold: f64,

    pub launch_at_login: bool,
    pub is_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            edge_zone_width: 0.15,
            horizontal_zone_height: 0.30,
            scroll_multiplier: 3.0,
            vertical_edge_mode: VerticalEdgeMode::default(),
            horizontal_position: HorizontalPosition::default(),
            middle_click_enabled: false,
            middle_click_zone_width: 0.30,
            middle_click_zone_height: 0.15,
            corner_trigger_enabled: false,
            corner_trigger_zone_size: 0.15,
            corner_action_top_left: CornerAction::None,
            corner_action_top_right: CornerAction::None,
            corner_action_bottom_left: CornerAction::None,
            corner_action_bottom_right: CornerAction::None,
            acceleration_curve: AccelerationCurve::default(),
            filter_light_touches: true,
            light_touch_density_threshold: 0.02,
            filter_large_touches: true,
            large_touch_major_axis_threshold: 15.0,
            large_touch_minor_axis_threshold: 12.0,
            launch_at_login: false,
            is_enabled: true,
        }
    }
}

impl Config {
    /// The configured action for a corner.
    pub fn corner_action(&self, corner: Corner) -> CornerAction {
        match corner {
            Corner::TopLeft => self.corner_action_top_left,
            Corner::TopRight => self.corner_action_top_right,
            Corner::BottomLeft => self.corner_action_bottom_left,
            Corner::BottomRight => self.corner_action_bottom_right,
        }
    }

    /// Force every numeric field into its legal range.
    pub fn clamp(&mut self) {
        self.edge_zone_width = self.edge_zone_width.clamp(0.05, 0.30);
        self.horizontal_zone_height = self.horizontal_zone_height.clamp(0.10, 0.40);
        self.scroll_multiplier = self.scroll_multiplier.clamp(1.0, 10.0);
        self.middle_click_zone_width = self.middle_click_zone_width.clamp(0.10, 0.60);
        self.middle_click_zone_height = self.middle_click_zone_height.clamp(0.05, 0.30);
        self.corner_trigger_zone_size = self.corner_trigger_zone_size.clamp(0.05, 0.25);
        self.light_touch_density_threshold = self.light_touch_density_threshold.clamp(0.0, 0.5);
        self.large_touch_major_axis_threshold =
            self.large_touch_major_axis_threshold.clamp(5.0, 50.0);
        self.large_touch_minor_axis_threshold =
            self.large_touch_minor_axis_threshold.clamp(5.0, 50.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.edge_zone_width, 0.15);
        assert_eq!(config.horizontal_zone_height, 0.30);
        assert_eq!(config.scroll_multiplier, 3.0);
        assert_eq!(config.vertical_edge_mode, VerticalEdgeMode::Right);
        assert_eq!(config.horizontal_position, HorizontalPosition::Bottom);
        assert_eq!(config.acceleration_curve, AccelerationCurve::Linear);
        assert!(config.filter_light_touches);
        assert!(config.filter_large_touches);
        assert!(config.is_enabled);
    }

    #[test]
    fn test_clamp_pulls_into_range() {
        let mut config = Config::default();
        config.edge_zone_width = 0.9;
        config.horizontal_zone_height = 0.01;
        config.scroll_multiplier = 99.0;
        config.corner_trigger_zone_size = 0.0;
        config.clamp();
        assert_eq!(config.edge_zone_width, 0.30);
        assert_eq!(config.horizontal_zone_height, 0.10);
        assert_eq!(config.scroll_multiplier, 10.0);
        assert_eq!(config.corner_trigger_zone_size, 0.05);
    }

    #[test]
    fn test_clamp_is_identity_on_defaults() {
        let mut config = Config::default();
        let original = config.clone();
        config.clamp();
        assert_eq!(config, original);
    }

    #[test]
    fn test_corner_action_lookup() {
        let mut config = Config::default();
        config.corner_action_bottom_right = CornerAction::AppWindows;
        assert_eq!(config.corner_action(Corner::BottomRight), CornerAction::AppWindows);
        assert_eq!(config.corner_action(Corner::TopLeft), CornerAction::None);
    }

    #[test]
    fn test_token_round_trips() {
        for mode in [VerticalEdgeMode::Left, VerticalEdgeMode::Right, VerticalEdgeMode::Both] {
            assert_eq!(VerticalEdgeMode::parse_token(mode.as_token()), Some(mode));
        }
        for pos in [HorizontalPosition::Bottom, HorizontalPosition::Top] {
            assert_eq!(HorizontalPosition::parse_token(pos.as_token()), Some(pos));
        }
        for curve in [
            AccelerationCurve::Linear,
            AccelerationCurve::Quadratic,
            AccelerationCurve::Cubic,
            AccelerationCurve::Ease,
        ] {
            assert_eq!(AccelerationCurve::parse_token(curve.as_token()), Some(curve));
        }
        for action in [
            CornerAction::None,
            CornerAction::MissionControl,
            CornerAction::AppWindows,
            CornerAction::ShowDesktop,
            CornerAction::Launchpad,
            CornerAction::NotificationCenter,
            CornerAction::RightClick,
        ] {
            assert_eq!(CornerAction::parse_token(action.as_token()), Some(action));
        }
    }

    #[test]
    fn test_ascii_tokens_are_ascii() {
        for action in [
            CornerAction::MissionControl,
            CornerAction::NotificationCenter,
            CornerAction::RightClick,
        ] {
            assert!(action.as_token().is_ascii());
        }
        assert!(VerticalEdgeMode::Both.as_token().is_ascii());
    }

    #[test]
    fn test_legacy_tokens_parse() {
        assert_eq!(VerticalEdgeMode::parse_legacy("右侧"), Some(VerticalEdgeMode::Right));
        assert_eq!(HorizontalPosition::parse_legacy("底部"), Some(HorizontalPosition::Bottom));
        assert_eq!(AccelerationCurve::parse_legacy("缓动"), Some(AccelerationCurve::Ease));
        assert_eq!(CornerAction::parse_legacy("调度中心"), Some(CornerAction::MissionControl));
        // Legacy values are not valid ASCII tokens
        assert_eq!(VerticalEdgeMode::parse_token("右侧"), None);
    }

    #[test]
    fn test_unknown_tokens_rejected() {
        assert_eq!(VerticalEdgeMode::parse_token("middle"), None);
        assert_eq!(CornerAction::parse_token("MissionControl"), None);
        assert_eq!(AccelerationCurve::parse_legacy("linear"), None);
    }
}
