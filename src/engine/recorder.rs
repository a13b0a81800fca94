//! Scroll session recording
//!
//! Every completed scroll session is recorded with its activation
//! snapshot and kinematics so the per-zone thresholds can tighten
//! against false activations over time. The learned thresholds are
//! advisory: the Bayesian evaluator remains the sole activation gate.

use crate::touch::zones::Zone;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;
use uuid::Uuid;

/// Completed sessions retained for diagnostics.
const HISTORY_CAP: usize = 50;

/// A session this short and this small, not cancelled, mis-triggered.
const FALSE_ACTIVATION_MAX_DURATION: f64 = 0.3;
const FALSE_ACTIVATION_MAX_DISTANCE: f64 = 0.05;

/// Evidence captured at the moment of activation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ActivationSnapshot {
    pub on_axis_ratio: f64,
    pub off_axis_speed: f64,
    pub on_axis_speed: f64,
    pub density: f64,
    pub confidence: f64,
}

/// One completed (or cancelled) scroll session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollSessionRecord {
    pub id: Uuid,
    pub zone: Zone,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub total_distance: f64,
    pub max_velocity: f64,
    pub direction_changes: u32,
    pub was_cancelled: bool,
    pub activation: ActivationSnapshot,
}

impl ScrollSessionRecord {
    pub fn duration(&self) -> Option<f64> {
        self.end_time.map(|end| (end - self.start_time).max(0.0))
    }

    /// Short, tiny and not cancelled: the activation should not have
    /// happened.
    pub fn is_false_activation(&self) -> bool {
        match self.duration() {
            Some(duration) => {
                duration < FALSE_ACTIVATION_MAX_DURATION
                    && self.total_distance < FALSE_ACTIVATION_MAX_DISTANCE
                    && !self.was_cancelled
            }
            None => false,
        }
    }
}

/// Advisory per-zone thresholds tightened by false activations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoneThresholds {
    pub min_duration: f64,
    pub min_distance: f64,
    pub min_on_axis_ratio: f64,
    pub max_off_axis_ratio: f64,
    pub sample_count: u32,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            min_duration: 0.3,
            min_distance: 0.05,
            min_on_axis_ratio: 0.4,
            max_off_axis_ratio: 1.5,
            sample_count: 0,
        }
    }
}

impl ZoneThresholds {
    /// Learn from one completed session. False activations tighten;
    /// good sessions relax slowly toward the floors.
    fn learn(&mut self, false_activation: bool) {
        let alpha = (self.sample_count as f64 / 100.0).min(0.1);
        if false_activation {
            self.min_duration *= 1.0 + alpha * 0.1;
            self.min_distance *= 1.0 + alpha * 0.1;
            self.min_on_axis_ratio = (self.min_on_axis_ratio * (1.0 + alpha * 0.05)).min(0.5);
        } else {
            self.min_duration = (self.min_duration * (1.0 - alpha * 0.02)).max(0.2);
            self.min_distance = (self.min_distance * (1.0 - alpha * 0.02)).max(0.03);
            self.min_on_axis_ratio = (self.min_on_axis_ratio * (1.0 - alpha * 0.02)).max(0.3);
        }
        self.sample_count += 1;
    }
}

struct CurrentSession {
    record: ScrollSessionRecord,
    last_delta: Option<(f64, f64)>,
}

/// Records scroll sessions and maintains the per-zone thresholds.
#[derive(Default)]
pub struct SessionRecorder {
    current: Option<CurrentSession>,
    history: VecDeque<ScrollSessionRecord>,
    thresholds: HashMap<Zone, ZoneThresholds>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording at activation.
    pub fn begin(&mut self, zone: Zone, activation: ActivationSnapshot, now: f64) {
        self.current = Some(CurrentSession {
            record: ScrollSessionRecord {
                id: Uuid::new_v4(),
                zone,
                start_time: now,
                end_time: None,
                total_distance: 0.0,
                max_velocity: 0.0,
                direction_changes: 0,
                was_cancelled: false,
                activation,
            },
            last_delta: None,
        });
    }

    pub fn is_recording(&self) -> bool {
        self.current.is_some()
    }

    /// Fold one scroll delta and the current velocity into the record.
    pub fn update(&mut self, delta: (f64, f64), velocity: (f64, f64)) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        let record = &mut current.record;
        record.total_distance += (delta.0 * delta.0 + delta.1 * delta.1).sqrt();
        let speed = (velocity.0 * velocity.0 + velocity.1 * velocity.1).sqrt();
        if speed > record.max_velocity {
            record.max_velocity = speed;
        }
        if let Some((px, py)) = current.last_delta {
            if px * delta.0 + py * delta.1 < 0.0 {
                record.direction_changes += 1;
            }
        }
        current.last_delta = Some(delta);
    }

    /// Close the current record, learn from it and archive it.
    pub fn finish(&mut self, now: f64, cancelled: bool) -> Option<ScrollSessionRecord> {
        let mut current = self.current.take()?;
        current.record.end_time = Some(now);
        current.record.was_cancelled = cancelled;

        let false_activation = current.record.is_false_activation();
        self.thresholds
            .entry(current.record.zone)
            .or_default()
            .learn(false_activation);
        if false_activation {
            debug!(
                "False activation in {:?} (duration {:.3}s, distance {:.4})",
                current.record.zone,
                current.record.duration().unwrap_or(0.0),
                current.record.total_distance
            );
        }

        if self.history.len() == HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(current.record.clone());
        Some(current.record)
    }

    pub fn history(&self) -> impl Iterator<Item = &ScrollSessionRecord> {
        self.history.iter()
    }

    pub fn thresholds(&self, zone: Zone) -> Option<&ZoneThresholds> {
        self.thresholds.get(&zone)
    }

    /// Dump the retained history as pretty JSON for offline tuning.
    pub fn export_json(&self) -> crate::Result<String> {
        let records: Vec<&ScrollSessionRecord> = self.history.iter().collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ActivationSnapshot {
        ActivationSnapshot {
            on_axis_ratio: 0.9,
            on_axis_speed: 2.0,
            off_axis_speed: 0.1,
            density: 0.1,
            confidence: 0.8,
        }
    }

    #[test]
    fn test_false_activation_predicate() {
        let mut recorder = SessionRecorder::new();
        recorder.begin(Zone::RightEdge, snapshot(), 0.0);
        recorder.update((0.0, -0.01), (0.0, -0.6));
        let record = recorder.finish(0.1, false).unwrap();
        assert!(record.is_false_activation());
    }

    #[test]
    fn test_long_session_is_not_false() {
        let mut recorder = SessionRecorder::new();
        recorder.begin(Zone::RightEdge, snapshot(), 0.0);
        recorder.update((0.0, -0.02), (0.0, -1.2));
        let record = recorder.finish(0.5, false).unwrap();
        assert!(!record.is_false_activation());
    }

    #[test]
    fn test_large_movement_is_not_false() {
        let mut recorder = SessionRecorder::new();
        recorder.begin(Zone::RightEdge, snapshot(), 0.0);
        for _ in 0..10 {
            recorder.update((0.0, -0.02), (0.0, -1.2));
        }
        let record = recorder.finish(0.1, false).unwrap();
        assert!(record.total_distance >= 0.05);
        assert!(!record.is_false_activation());
    }

    #[test]
    fn test_cancelled_is_not_false() {
        let mut recorder = SessionRecorder::new();
        recorder.begin(Zone::RightEdge, snapshot(), 0.0);
        let record = recorder.finish(0.1, true).unwrap();
        assert!(record.was_cancelled);
        assert!(!record.is_false_activation());
    }

    #[test]
    fn test_direction_changes() {
        let mut recorder = SessionRecorder::new();
        recorder.begin(Zone::RightEdge, snapshot(), 0.0);
        recorder.update((0.0, -0.02), (0.0, -1.2));
        recorder.update((0.0, -0.02), (0.0, -1.2));
        recorder.update((0.0, 0.02), (0.0, 1.2)); // reversal
        recorder.update((0.0, 0.02), (0.0, 1.2));
        let record = recorder.finish(1.0, false).unwrap();
        assert_eq!(record.direction_changes, 1);
    }

    #[test]
    fn test_max_velocity_running_max() {
        let mut recorder = SessionRecorder::new();
        recorder.begin(Zone::BottomEdge, snapshot(), 0.0);
        recorder.update((0.02, 0.0), (1.0, 0.0));
        recorder.update((0.04, 0.0), (2.5, 0.0));
        recorder.update((0.01, 0.0), (0.5, 0.0));
        let record = recorder.finish(1.0, false).unwrap();
        assert!((record.max_velocity - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_history_bounded_at_fifty() {
        let mut recorder = SessionRecorder::new();
        for i in 0..60 {
            recorder.begin(Zone::RightEdge, snapshot(), i as f64);
            recorder.finish(i as f64 + 1.0, false);
        }
        assert_eq!(recorder.history().count(), HISTORY_CAP);
        // Oldest records were evicted
        let first = recorder.history().next().unwrap();
        assert!(first.start_time >= 10.0);
    }

    #[test]
    fn test_false_activations_tighten_thresholds() {
        let mut recorder = SessionRecorder::new();
        // Seed sample_count so alpha is nonzero
        for i in 0..20 {
            recorder.begin(Zone::BottomEdge, snapshot(), i as f64 * 10.0);
            recorder.finish(i as f64 * 10.0 + 1.0, false);
        }
        let before = *recorder.thresholds(Zone::BottomEdge).unwrap();

        for i in 0..10 {
            let t = 1000.0 + i as f64;
            recorder.begin(Zone::BottomEdge, snapshot(), t);
            recorder.finish(t + 0.05, false); // short + tiny: false
        }
        let after = *recorder.thresholds(Zone::BottomEdge).unwrap();
        assert!(after.min_duration > before.min_duration);
        assert!(after.min_distance > before.min_distance);
        assert!(after.min_on_axis_ratio >= before.min_on_axis_ratio);
        assert!(after.min_on_axis_ratio <= 0.5);
    }

    #[test]
    fn test_successes_never_cross_floors() {
        let mut recorder = SessionRecorder::new();
        for i in 0..500 {
            let t = i as f64 * 10.0;
            recorder.begin(Zone::RightEdge, snapshot(), t);
            for _ in 0..10 {
                recorder.update((0.0, -0.02), (0.0, -1.2));
            }
            recorder.finish(t + 1.0, false);
        }
        let thresholds = recorder.thresholds(Zone::RightEdge).unwrap();
        assert!(thresholds.min_duration >= 0.2);
        assert!(thresholds.min_distance >= 0.03);
        assert!(thresholds.min_on_axis_ratio >= 0.3);
    }

    #[test]
    fn test_update_without_session_is_noop() {
        let mut recorder = SessionRecorder::new();
        recorder.update((0.1, 0.1), (1.0, 1.0));
        assert!(recorder.finish(1.0, false).is_none());
    }

    #[test]
    fn test_export_json() {
        let mut recorder = SessionRecorder::new();
        recorder.begin(Zone::RightEdge, snapshot(), 0.0);
        recorder.finish(1.0, false);
        let json = recorder.export_json().unwrap();
        assert!(json.contains("RightEdge"));
        assert!(json.contains("total_distance"));
    }
}
