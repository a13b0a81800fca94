//! Persistent settings store
//!
//! Flat key/value TOML file holding user settings and the learner's
//! adaptive state. Values are clamped on load and never reject
//! startup. One historical release wrote localized enum raw values;
//! those are accepted exactly once, migrated to stable ASCII tokens,
//! and can never be written again because the serializer only knows
//! the ASCII tokens.

use crate::app::config::{
    AccelerationCurve, Config, CornerAction, HorizontalPosition, VerticalEdgeMode,
};
use crate::engine::learner::AdaptiveState;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// On-disk representation: every key optional, enums as raw strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawSettings {
    #[serde(rename = "scrollMultiplier", skip_serializing_if = "Option::is_none")]
    scroll_multiplier: Option<f64>,
    #[serde(rename = "edgeZoneWidth", skip_serializing_if = "Option::is_none")]
    edge_zone_width: Option<f64>,
    #[serde(rename = "bottomZoneHeight", skip_serializing_if = "Option::is_none")]
    bottom_zone_height: Option<f64>,
    #[serde(rename = "cornerTriggerZoneSize", skip_serializing_if = "Option::is_none")]
    corner_trigger_zone_size: Option<f64>,

    #[serde(rename = "verticalEdgeMode", skip_serializing_if = "Option::is_none")]
    vertical_edge_mode: Option<String>,
    #[serde(rename = "horizontalPosition", skip_serializing_if = "Option::is_none")]
    horizontal_position: Option<String>,

    #[serde(rename = "middleClickEnabled", skip_serializing_if = "Option::is_none")]
    middle_click_enabled: Option<bool>,
    #[serde(rename = "middleClickZoneWidth", skip_serializing_if = "Option::is_none")]
    middle_click_zone_width: Option<f64>,
    #[serde(rename = "middleClickZoneHeight", skip_serializing_if = "Option::is_none")]
    middle_click_zone_height: Option<f64>,
    #[serde(rename = "cornerTriggerEnabled", skip_serializing_if = "Option::is_none")]
    corner_trigger_enabled: Option<bool>,
    #[serde(rename = "filterLightTouches", skip_serializing_if = "Option::is_none")]
    filter_light_touches: Option<bool>,
    #[serde(rename = "filterLargeTouches", skip_serializing_if = "Option::is_none")]
    filter_large_touches: Option<bool>,
    #[serde(rename = "launchAtLogin", skip_serializing_if = "Option::is_none")]
    launch_at_login: Option<bool>,
    #[serde(rename = "isEnabled", skip_serializing_if = "Option::is_none")]
    is_enabled: Option<bool>,

    #[serde(rename = "cornerActionTopLeft", skip_serializing_if = "Option::is_none")]
    corner_action_top_left: Option<String>,
    #[serde(rename = "cornerActionTopRight", skip_serializing_if = "Option::is_none")]
    corner_action_top_right: Option<String>,
    #[serde(rename = "cornerActionBottomLeft", skip_serializing_if = "Option::is_none")]
    corner_action_bottom_left: Option<String>,
    #[serde(rename = "cornerActionBottomRight", skip_serializing_if = "Option::is_none")]
    corner_action_bottom_right: Option<String>,

    #[serde(rename = "accelerationCurveType", skip_serializing_if = "Option::is_none")]
    acceleration_curve_type: Option<String>,

    #[serde(rename = "lightTouchDensityThreshold", skip_serializing_if = "Option::is_none")]
    light_touch_density_threshold: Option<f64>,
    #[serde(rename = "largeTouchMajorAxisThreshold", skip_serializing_if = "Option::is_none")]
    large_touch_major_axis_threshold: Option<f64>,
    #[serde(rename = "largeTouchMinorAxisThreshold", skip_serializing_if = "Option::is_none")]
    large_touch_minor_axis_threshold: Option<f64>,

    #[serde(rename = "adaptive_dirCenterH", skip_serializing_if = "Option::is_none")]
    adaptive_dir_center_h: Option<f64>,
    #[serde(rename = "adaptive_dirCenterV", skip_serializing_if = "Option::is_none")]
    adaptive_dir_center_v: Option<f64>,
    #[serde(rename = "adaptive_retryCountH", skip_serializing_if = "Option::is_none")]
    adaptive_retry_count_h: Option<u32>,
    #[serde(rename = "adaptive_retryCountV", skip_serializing_if = "Option::is_none")]
    adaptive_retry_count_v: Option<u32>,
    #[serde(rename = "adaptive_missCountH", skip_serializing_if = "Option::is_none")]
    adaptive_miss_count_h: Option<u32>,
    #[serde(rename = "adaptive_missCountV", skip_serializing_if = "Option::is_none")]
    adaptive_miss_count_v: Option<u32>,
    #[serde(rename = "adaptive_retryBonusH", skip_serializing_if = "Option::is_none")]
    adaptive_retry_bonus_h: Option<f64>,
    #[serde(rename = "adaptive_retryBonusV", skip_serializing_if = "Option::is_none")]
    adaptive_retry_bonus_v: Option<f64>,
}

/// Outcome of parsing one enum key.
enum ParsedToken<T> {
    Current(T),
    Legacy(T),
    Unknown,
}

fn parse_with_legacy<T>(
    raw: Option<&String>,
    parse: impl Fn(&str) -> Option<T>,
    parse_legacy: impl Fn(&str) -> Option<T>,
) -> ParsedToken<T> {
    match raw {
        None => ParsedToken::Unknown,
        Some(value) => {
            if let Some(parsed) = parse(value) {
                ParsedToken::Current(parsed)
            } else if let Some(parsed) = parse_legacy(value) {
                ParsedToken::Legacy(parsed)
            } else {
                warn!("Unknown settings token {:?}, using default", value);
                ParsedToken::Unknown
            }
        }
    }
}

/// File-backed settings store.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.trackpal/settings.toml`
    pub fn at_default_path() -> Self {
        let path = dirs::home_dir()
            .map(|home| home.join(".trackpal").join("settings.toml"))
            .unwrap_or_else(|| PathBuf::from("settings.toml"));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings and adaptive state, clamping everything into its
    /// legal range. Performs the one-shot legacy token migration when
    /// old localized values are found.
    pub fn load(&self) -> Result<(Config, AdaptiveState)> {
        if !self.path.exists() {
            return Ok((Config::default(), AdaptiveState::default()));
        }

        let content = std::fs::read_to_string(&self.path)?;
        let raw: RawSettings =
            toml::from_str(&content).map_err(|e| Error::Store(e.to_string()))?;

        let mut migrated = false;
        let mut config = Config::default();

        if let Some(v) = raw.scroll_multiplier {
            config.scroll_multiplier = v;
        }
        if let Some(v) = raw.edge_zone_width {
            config.edge_zone_width = v;
        }
        if let Some(v) = raw.bottom_zone_height {
            config.horizontal_zone_height = v;
        }
        if let Some(v) = raw.corner_trigger_zone_size {
            config.corner_trigger_zone_size = v;
        }
        if let Some(v) = raw.middle_click_enabled {
            config.middle_click_enabled = v;
        }
        if let Some(v) = raw.middle_click_zone_width {
            config.middle_click_zone_width = v;
        }
        if let Some(v) = raw.middle_click_zone_height {
            config.middle_click_zone_height = v;
        }
        if let Some(v) = raw.corner_trigger_enabled {
            config.corner_trigger_enabled = v;
        }
        if let Some(v) = raw.filter_light_touches {
            config.filter_light_touches = v;
        }
        if let Some(v) = raw.filter_large_touches {
            config.filter_large_touches = v;
        }
        if let Some(v) = raw.launch_at_login {
            config.launch_at_login = v;
        }
        if let Some(v) = raw.is_enabled {
            config.is_enabled = v;
        }
        if let Some(v) = raw.light_touch_density_threshold {
            config.light_touch_density_threshold = v;
        }
        if let Some(v) = raw.large_touch_major_axis_threshold {
            config.large_touch_major_axis_threshold = v;
        }
        if let Some(v) = raw.large_touch_minor_axis_threshold {
            config.large_touch_minor_axis_threshold = v;
        }

        match parse_with_legacy(
            raw.vertical_edge_mode.as_ref(),
            VerticalEdgeMode::parse_token,
            VerticalEdgeMode::parse_legacy,
        ) {
            ParsedToken::Current(v) => config.vertical_edge_mode = v,
            ParsedToken::Legacy(v) => {
                config.vertical_edge_mode = v;
                migrated = true;
            }
            ParsedToken::Unknown => {}
        }
        match parse_with_legacy(
            raw.horizontal_position.as_ref(),
            HorizontalPosition::parse_token,
            HorizontalPosition::parse_legacy,
        ) {
            ParsedToken::Current(v) => config.horizontal_position = v,
            ParsedToken::Legacy(v) => {
                config.horizontal_position = v;
                migrated = true;
            }
            ParsedToken::Unknown => {}
        }
        match parse_with_legacy(
            raw.acceleration_curve_type.as_ref(),
            AccelerationCurve::parse_token,
            AccelerationCurve::parse_legacy,
        ) {
            ParsedToken::Current(v) => config.acceleration_curve = v,
            ParsedToken::Legacy(v) => {
                config.acceleration_curve = v;
                migrated = true;
            }
            ParsedToken::Unknown => {}
        }

        let parse_corner = |raw_value: Option<&String>, migrated: &mut bool| {
            match parse_with_legacy(
                raw_value,
                CornerAction::parse_token,
                CornerAction::parse_legacy,
            ) {
                ParsedToken::Current(v) => v,
                ParsedToken::Legacy(v) => {
                    *migrated = true;
                    v
                }
                ParsedToken::Unknown => CornerAction::None,
            }
        };
        config.corner_action_top_left =
            parse_corner(raw.corner_action_top_left.as_ref(), &mut migrated);
        config.corner_action_top_right =
            parse_corner(raw.corner_action_top_right.as_ref(), &mut migrated);
        config.corner_action_bottom_left =
            parse_corner(raw.corner_action_bottom_left.as_ref(), &mut migrated);
        config.corner_action_bottom_right =
            parse_corner(raw.corner_action_bottom_right.as_ref(), &mut migrated);

        config.clamp();

        let adaptive = AdaptiveState {
            dir_center_h: raw.adaptive_dir_center_h.unwrap_or(0.50),
            dir_center_v: raw.adaptive_dir_center_v.unwrap_or(0.50),
            retry_count_h: raw.adaptive_retry_count_h.unwrap_or(0),
            retry_count_v: raw.adaptive_retry_count_v.unwrap_or(0),
            miss_count_h: raw.adaptive_miss_count_h.unwrap_or(0),
            miss_count_v: raw.adaptive_miss_count_v.unwrap_or(0),
            retry_bonus_h: raw.adaptive_retry_bonus_h.unwrap_or(0.0),
            retry_bonus_v: raw.adaptive_retry_bonus_v.unwrap_or(0.0),
        }
        .clamped();

        if migrated {
            info!("Migrating legacy settings tokens to stable ASCII");
            self.save(&config, &adaptive)?;
        }

        Ok((config, adaptive))
    }

    /// Write the full settings file (ASCII tokens only).
    pub fn save(&self, config: &Config, adaptive: &AdaptiveState) -> Result<()> {
        let raw = RawSettings {
            scroll_multiplier: Some(config.scroll_multiplier),
            edge_zone_width: Some(config.edge_zone_width),
            bottom_zone_height: Some(config.horizontal_zone_height),
            corner_trigger_zone_size: Some(config.corner_trigger_zone_size),
            vertical_edge_mode: Some(config.vertical_edge_mode.as_token().to_string()),
            horizontal_position: Some(config.horizontal_position.as_token().to_string()),
            middle_click_enabled: Some(config.middle_click_enabled),
            middle_click_zone_width: Some(config.middle_click_zone_width),
            middle_click_zone_height: Some(config.middle_click_zone_height),
            corner_trigger_enabled: Some(config.corner_trigger_enabled),
            filter_light_touches: Some(config.filter_light_touches),
            filter_large_touches: Some(config.filter_large_touches),
            launch_at_login: Some(config.launch_at_login),
            is_enabled: Some(config.is_enabled),
            corner_action_top_left: Some(config.corner_action_top_left.as_token().to_string()),
            corner_action_top_right: Some(config.corner_action_top_right.as_token().to_string()),
            corner_action_bottom_left: Some(config.corner_action_bottom_left.as_token().to_string()),
            corner_action_bottom_right: Some(
                config.corner_action_bottom_right.as_token().to_string(),
            ),
            acceleration_curve_type: Some(config.acceleration_curve.as_token().to_string()),
            light_touch_density_threshold: Some(config.light_touch_density_threshold),
            large_touch_major_axis_threshold: Some(config.large_touch_major_axis_threshold),
            large_touch_minor_axis_threshold: Some(config.large_touch_minor_axis_threshold),
            adaptive_dir_center_h: Some(adaptive.dir_center_h),
            adaptive_dir_center_v: Some(adaptive.dir_center_v),
            adaptive_retry_count_h: Some(adaptive.retry_count_h),
            adaptive_retry_count_v: Some(adaptive.retry_count_v),
            adaptive_miss_count_h: Some(adaptive.miss_count_h),
            adaptive_miss_count_v: Some(adaptive.miss_count_v),
            adaptive_retry_bonus_h: Some(adaptive.retry_bonus_h),
            adaptive_retry_bonus_v: Some(adaptive.retry_bonus_v),
        };
        self.write_raw(&raw)
    }

    /// Update only the adaptive keys, preserving whatever else the
    /// file holds. Idempotent; concurrent writers are not expected.
    pub fn save_adaptive(&self, adaptive: &AdaptiveState) -> Result<()> {
        let mut raw = self.read_raw_or_default();
        raw.adaptive_dir_center_h = Some(adaptive.dir_center_h);
        raw.adaptive_dir_center_v = Some(adaptive.dir_center_v);
        raw.adaptive_retry_count_h = Some(adaptive.retry_count_h);
        raw.adaptive_retry_count_v = Some(adaptive.retry_count_v);
        raw.adaptive_miss_count_h = Some(adaptive.miss_count_h);
        raw.adaptive_miss_count_v = Some(adaptive.miss_count_v);
        raw.adaptive_retry_bonus_h = Some(adaptive.retry_bonus_h);
        raw.adaptive_retry_bonus_v = Some(adaptive.retry_bonus_v);
        self.write_raw(&raw)
    }

    fn read_raw_or_default(&self) -> RawSettings {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default()
    }

    fn write_raw(&self, raw: &RawSettings) -> Result<()> {
        let content = toml::to_string_pretty(raw).map_err(|e| Error::Store(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.toml"))
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let (config, adaptive) = store.load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(adaptive, AdaptiveState::default());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut config = Config::default();
        config.scroll_multiplier = 5.0;
        config.vertical_edge_mode = VerticalEdgeMode::Both;
        config.corner_trigger_enabled = true;
        config.corner_action_bottom_right = CornerAction::AppWindows;
        config.acceleration_curve = AccelerationCurve::Ease;

        let mut adaptive = AdaptiveState::default();
        adaptive.dir_center_v = 0.52;
        adaptive.retry_bonus_h = 0.04;
        adaptive.miss_count_h = 17;

        store.save(&config, &adaptive).unwrap();
        let (loaded_config, loaded_adaptive) = store.load().unwrap();
        assert_eq!(loaded_config, config);
        assert_eq!(loaded_adaptive, adaptive);
    }

    #[test]
    fn test_out_of_range_values_clamped_on_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"
scrollMultiplier = 50.0
edgeZoneWidth = 0.9
bottomZoneHeight = 0.01
adaptive_dirCenterH = 0.9
adaptive_retryBonusV = 3.0
"#,
        )
        .unwrap();

        let (config, adaptive) = store.load().unwrap();
        assert_eq!(config.scroll_multiplier, 10.0);
        assert_eq!(config.edge_zone_width, 0.30);
        assert_eq!(config.horizontal_zone_height, 0.10);
        assert_eq!(adaptive.dir_center_h, 0.55);
        assert_eq!(adaptive.retry_bonus_v, 0.08);
    }

    #[test]
    fn test_legacy_tokens_migrate_once() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"
verticalEdgeMode = "两侧"
horizontalPosition = "顶部"
accelerationCurveType = "缓动"
cornerActionBottomRight = "应用窗口"
"#,
        )
        .unwrap();

        let (config, _) = store.load().unwrap();
        assert_eq!(config.vertical_edge_mode, VerticalEdgeMode::Both);
        assert_eq!(config.horizontal_position, HorizontalPosition::Top);
        assert_eq!(config.acceleration_curve, AccelerationCurve::Ease);
        assert_eq!(config.corner_action_bottom_right, CornerAction::AppWindows);

        // The file was rewritten with ASCII tokens
        let rewritten = std::fs::read_to_string(store.path()).unwrap();
        assert!(rewritten.contains("\"both\""));
        assert!(rewritten.contains("\"top\""));
        assert!(rewritten.contains("\"ease\""));
        assert!(rewritten.contains("\"app_windows\""));
        assert!(rewritten.is_ascii());

        // Loading again parses the ASCII tokens directly
        let (config2, _) = store.load().unwrap();
        assert_eq!(config2.vertical_edge_mode, VerticalEdgeMode::Both);
    }

    #[test]
    fn test_unknown_tokens_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "verticalEdgeMode = \"diagonal\"\n").unwrap();
        let (config, _) = store.load().unwrap();
        assert_eq!(config.vertical_edge_mode, VerticalEdgeMode::Right);
    }

    #[test]
    fn test_save_adaptive_preserves_config_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut config = Config::default();
        config.scroll_multiplier = 7.0;
        store.save(&config, &AdaptiveState::default()).unwrap();

        let mut adaptive = AdaptiveState::default();
        adaptive.miss_count_v = 42;
        store.save_adaptive(&adaptive).unwrap();

        let (loaded_config, loaded_adaptive) = store.load().unwrap();
        assert_eq!(loaded_config.scroll_multiplier, 7.0);
        assert_eq!(loaded_adaptive.miss_count_v, 42);
    }

    #[test]
    fn test_save_adaptive_to_fresh_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut adaptive = AdaptiveState::default();
        adaptive.dir_center_h = 0.45;
        store.save_adaptive(&adaptive).unwrap();

        let (_, loaded) = store.load().unwrap();
        assert_eq!(loaded.dir_center_h, 0.45);
    }

    #[test]
    fn test_corrupt_file_errors() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "not toml {{{").unwrap();
        assert!(store.load().is_err());
    }

    #[test]
    fn test_default_path_shape() {
        let store = SettingsStore::at_default_path();
        assert!(store.path().to_string_lossy().contains("settings.toml"));
    }
}
