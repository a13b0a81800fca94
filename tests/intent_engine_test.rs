//! Integration tests for the touch intent engine
//!
//! Drives `Engine::handle_frame` / `handle_tick` directly with a
//! recording sink and a manual clock: raw contact frames in, synthetic
//! scroll events and tap actions out.

use trackpal::app::config::{Config, CornerAction};
use trackpal::engine::{AdaptiveLearner, Engine};
use trackpal::events::clock::ManualClock;
use trackpal::events::sink::SharedRecordingSink;
use trackpal::events::tap::SharedState;
use trackpal::events::types::{MomentumPhase, ScrollPhase, TRACKPAL_EVENT_TAG};
use trackpal::touch::types::{ContactFrame, ContactPhase, FrameMessage};

const FRAME_DT: f64 = 1.0 / 60.0;

/// Engine under test plus the handles the assertions need.
struct Harness {
    engine: Engine,
    sink: SharedRecordingSink,
    now: f64,
}

impl Harness {
    fn new(config: Config) -> Self {
        let sink = SharedRecordingSink::new();
        let shared = SharedState::new();
        let mut engine = Engine::new(
            config,
            AdaptiveLearner::default(),
            Box::new(sink.clone()),
            Box::new(ManualClock::new()),
            shared,
        );
        engine.start().expect("engine start");
        Self {
            engine,
            sink,
            now: 0.0,
        }
    }

    fn frame(&mut self, x: f64, y: f64, phase: ContactPhase) {
        self.engine
            .handle_frame(FrameMessage::single(ContactFrame::new(x, y, phase, self.now)));
        self.now += FRAME_DT;
    }

    fn fingers(&mut self, count: u32) {
        self.engine
            .handle_frame(FrameMessage::fingers(count, self.now));
        self.now += FRAME_DT;
    }

    fn all_released(&mut self) {
        self.engine
            .handle_frame(FrameMessage::all_released(self.now));
        self.now += FRAME_DT;
    }

    /// One touch: start, interpolated moves, lift.
    fn drag(&mut self, from: (f64, f64), to: (f64, f64), frames: usize) {
        self.frame(from.0, from.1, ContactPhase::Start);
        for i in 1..frames {
            let t = i as f64 / (frames - 1) as f64;
            let x = from.0 + (to.0 - from.0) * t;
            let y = from.1 + (to.1 - from.1) * t;
            self.frame(x, y, ContactPhase::Move);
        }
        self.frame(to.0, to.1, ContactPhase::Released);
        self.all_released();
    }

    /// Run inertia ticks until the coast ends (bounded).
    fn run_inertia(&mut self) -> usize {
        let before = self.sink.scrolls().len();
        for _ in 0..2000 {
            self.now += FRAME_DT;
            self.engine.handle_tick(self.now);
            if let Some(last) = self.sink.scrolls().last() {
                if last.momentum == MomentumPhase::Ended {
                    break;
                }
            }
        }
        self.sink.scrolls().len() - before
    }
}

#[test]
fn vertical_scroll_from_right_edge_with_inertia() {
    // Scenario 1: right-edge touch moving down at 60 Hz
    let mut harness = Harness::new(Config::default());
    harness.drag((0.95, 0.5), (0.95, 0.35), 5);

    let scrolls = harness.sink.non_zero_scrolls();
    assert!(!scrolls.is_empty(), "activation must emit scroll events");
    for event in &scrolls {
        assert_eq!(event.pixel_dx, 0);
        assert!(event.pixel_dy > 0, "downward finger scrolls positive Y");
        assert_eq!(event.tag, TRACKPAL_EVENT_TAG);
        assert!(event.continuous);
    }

    // The drag phase was opened and closed
    let phases: Vec<ScrollPhase> = harness.sink.scrolls().iter().map(|e| e.phase).collect();
    assert!(phases.contains(&ScrollPhase::Began));
    assert!(phases.contains(&ScrollPhase::Ended));

    // Lift-off at speed: inertia emits decaying positive-Y events
    let momentum_events = harness.run_inertia();
    assert!(momentum_events > 1, "coast must emit momentum events");
    let scrolls = harness.sink.scrolls();
    let momentum: Vec<_> = scrolls
        .iter()
        .filter(|e| e.momentum != MomentumPhase::None)
        .collect();
    assert_eq!(momentum.first().unwrap().momentum, MomentumPhase::Began);
    assert_eq!(momentum.last().unwrap().momentum, MomentumPhase::Ended);
    assert!(momentum.last().unwrap().is_zero_delta());
    let moving: Vec<_> = momentum.iter().filter(|e| !e.is_zero_delta()).collect();
    for pair in moving.windows(2) {
        assert!(pair[1].pixel_dy <= pair[0].pixel_dy, "coast must decay");
        assert!(pair[1].pixel_dy > 0);
    }
}

#[test]
fn horizontal_scroll_from_bottom_edge() {
    // Scenario 2: bottom-edge touch moving right
    let mut harness = Harness::new(Config::default());
    harness.drag((0.50, 0.05), (0.70, 0.05), 6);

    let scrolls = harness.sink.non_zero_scrolls();
    assert!(!scrolls.is_empty());
    for event in &scrolls {
        assert_eq!(event.pixel_dy, 0);
        assert!(event.pixel_dx > 0, "rightward finger scrolls positive X");
    }

    // Aspect compensation: a steady 0.04/frame drag emits ~19px frames
    // (0.04 * 3.0 * 100 * 1.6)
    let biggest = scrolls.iter().map(|e| e.pixel_dx).max().unwrap();
    assert!(biggest >= 15, "1.6 aspect scale must apply, got {biggest}");
}

#[test]
fn mostly_vertical_drag_in_bottom_edge_rejects() {
    // Scenario 3: vertical drag through the bottom band
    let mut harness = Harness::new(Config::default());
    harness.frame(0.50, 0.05, ContactPhase::Start);
    assert!(harness.engine.shared().is_actively_scrolling());

    for i in 1..4 {
        let t = i as f64 / 3.0;
        harness.frame(0.50 + 0.01 * t, 0.05 + 0.13 * t, ContactPhase::Move);
    }

    // Hard rejection fired: suppression released, nothing emitted
    assert!(!harness.engine.shared().is_actively_scrolling());
    assert!(harness.sink.non_zero_scrolls().is_empty());

    harness.frame(0.51, 0.18, ContactPhase::Released);
    harness.all_released();
    assert!(harness.sink.non_zero_scrolls().is_empty());
    assert_eq!(harness.sink.corner_actions().len(), 0);
}

#[test]
fn palm_contact_is_filtered() {
    // Scenario 4: palm geometry never creates a session
    let mut harness = Harness::new(Config::default());
    let palm = ContactFrame::new(0.5, 0.5, ContactPhase::Start, harness.now)
        .with_geometry(0.30, 22.0, 18.0);
    harness.engine.handle_frame(FrameMessage::single(palm));

    assert!(!harness.engine.shared().is_actively_scrolling());
    assert!(harness.sink.scrolls().is_empty());
}

#[test]
fn multi_to_single_debounce() {
    // Scenario 5: single-finger frames within 150 ms of a 2->1
    // transition are discarded
    let mut harness = Harness::new(Config::default());
    for _ in 0..18 {
        harness.fingers(2);
    }

    // First single-finger frame lands at ~0.30s and stamps the
    // transition; it must not start a session
    harness.now = 0.30;
    harness.frame(0.95, 0.5, ContactPhase::Start);
    assert!(!harness.engine.shared().is_actively_scrolling());

    // Still inside the window
    harness.now = 0.40;
    harness.frame(0.95, 0.5, ContactPhase::Start);
    assert!(!harness.engine.shared().is_actively_scrolling());

    // Past the window: a new session begins normally
    harness.now = 0.45;
    harness.frame(0.95, 0.5, ContactPhase::Start);
    assert!(harness.engine.shared().is_actively_scrolling());
}

fn corner_config() -> Config {
    let mut config = Config::default();
    config.corner_trigger_enabled = true;
    config.corner_trigger_zone_size = 0.15;
    config.corner_action_bottom_right = CornerAction::AppWindows;
    config
}

#[test]
fn corner_tap_fires_action() {
    // Scenario 6a: held corner touch with jitter, then release
    let mut harness = Harness::new(corner_config());
    harness.frame(0.97, 0.03, ContactPhase::Start);
    let jitter = [
        (0.0008, 0.0),
        (-0.0008, 0.0006),
        (0.0008, -0.0006),
        (-0.0008, 0.0),
        (0.0008, 0.0),
        (-0.0008, 0.0),
    ];
    let (mut x, mut y) = (0.97, 0.03);
    for (dx, dy) in jitter {
        x += dx;
        y += dy;
        harness.frame(x, y, ContactPhase::Move);
    }
    harness.frame(x, y, ContactPhase::Released);
    harness.all_released();

    assert_eq!(harness.sink.corner_actions(), vec![CornerAction::AppWindows]);
    assert!(harness.sink.non_zero_scrolls().is_empty());
}

#[test]
fn corner_slide_promotes_to_scroll() {
    // Scenario 6b: decisive slide out of the corner scrolls instead
    let mut harness = Harness::new(corner_config());
    harness.drag((0.97, 0.03), (0.80, 0.03), 4);

    let scrolls = harness.sink.non_zero_scrolls();
    assert!(!scrolls.is_empty(), "promotion must reach activation");
    for event in &scrolls {
        assert!(event.pixel_dx < 0, "leftward slide scrolls negative X");
        assert_eq!(event.pixel_dy, 0);
    }
    assert!(harness.sink.corner_actions().is_empty());
}

#[test]
fn multi_finger_transition_cancels_scroll() {
    let mut harness = Harness::new(Config::default());
    harness.frame(0.95, 0.5, ContactPhase::Start);
    harness.frame(0.95, 0.46, ContactPhase::Move);
    harness.frame(0.95, 0.42, ContactPhase::Move);
    harness.frame(0.95, 0.38, ContactPhase::Move);
    assert!(!harness.sink.non_zero_scrolls().is_empty());

    // Second finger lands: scrolling must stop cleanly
    harness.fingers(2);
    assert!(!harness.engine.shared().is_actively_scrolling());
    let last = harness.sink.scrolls();
    let last = last.last().unwrap();
    assert!(last.is_zero_delta());
    assert_eq!(last.phase, ScrollPhase::Ended);

    // No inertia after a cancellation
    let before = harness.sink.scrolls().len();
    for _ in 0..10 {
        harness.now += FRAME_DT;
        harness.engine.handle_tick(harness.now);
    }
    assert_eq!(harness.sink.scrolls().len(), before);
}

#[test]
fn palm_mid_session_closes_scroll_phase() {
    let mut harness = Harness::new(Config::default());
    harness.frame(0.95, 0.5, ContactPhase::Start);
    harness.frame(0.95, 0.46, ContactPhase::Move);
    harness.frame(0.95, 0.42, ContactPhase::Move);
    assert!(!harness.sink.non_zero_scrolls().is_empty());

    let palm = ContactFrame::new(0.95, 0.40, ContactPhase::Move, harness.now)
        .with_geometry(0.30, 22.0, 18.0);
    harness.engine.handle_frame(FrameMessage::single(palm));

    // Orphaned-phase recovery: the ended event is posted on reset
    assert!(!harness.engine.shared().is_actively_scrolling());
    let scrolls = harness.sink.scrolls();
    let last = scrolls.last().unwrap();
    assert!(last.is_zero_delta());
    assert_eq!(last.phase, ScrollPhase::Ended);
}

#[test]
fn new_touch_preempts_inertia() {
    let mut harness = Harness::new(Config::default());
    harness.drag((0.95, 0.5), (0.95, 0.35), 5);

    // A couple of coast frames
    for _ in 0..3 {
        harness.now += FRAME_DT;
        harness.engine.handle_tick(harness.now);
    }
    let had_momentum = harness
        .sink
        .scrolls()
        .iter()
        .any(|e| e.momentum == MomentumPhase::Began);
    assert!(had_momentum);

    // New touch anywhere stops the coast with a momentum-ended event
    harness.frame(0.5, 0.5, ContactPhase::Start);
    let scrolls = harness.sink.scrolls();
    let ended = scrolls
        .iter()
        .filter(|e| e.momentum == MomentumPhase::Ended)
        .count();
    assert_eq!(ended, 1);

    // Further ticks are no-ops
    let before = harness.sink.scrolls().len();
    harness.now += FRAME_DT;
    harness.engine.handle_tick(harness.now);
    assert_eq!(harness.sink.scrolls().len(), before);
}

#[test]
fn middle_click_tap() {
    let mut config = Config::default();
    config.middle_click_enabled = true;
    let mut harness = Harness::new(config);

    // Quick tap in the top-center strip
    harness.frame(0.5, 0.95, ContactPhase::Start);
    harness.frame(0.5, 0.95, ContactPhase::Move);
    harness.frame(0.5, 0.95, ContactPhase::Released);
    harness.all_released();

    assert_eq!(harness.sink.middle_clicks(), 1);
    assert!(harness.sink.scrolls().is_empty());
}

#[test]
fn middle_click_drag_does_not_click() {
    let mut config = Config::default();
    config.middle_click_enabled = true;
    let mut harness = Harness::new(config);

    harness.drag((0.5, 0.95), (0.42, 0.88), 8);
    assert_eq!(harness.sink.middle_clicks(), 0);
}

#[test]
fn stop_twice_is_clean() {
    let mut harness = Harness::new(Config::default());
    harness.drag((0.95, 0.5), (0.95, 0.35), 5);

    harness.engine.stop();
    assert!(!harness.engine.is_enabled());
    harness.engine.stop();
    assert!(!harness.engine.is_enabled());

    // Frames after stop are ignored
    let before = harness.sink.scrolls().len();
    harness.frame(0.95, 0.5, ContactPhase::Start);
    assert_eq!(harness.sink.scrolls().len(), before);
}

#[test]
fn scroll_events_all_tagged() {
    // Tag property across drag and coast emissions
    let mut harness = Harness::new(Config::default());
    harness.drag((0.95, 0.5), (0.95, 0.30), 6);
    harness.run_inertia();

    for event in harness.sink.scrolls() {
        assert_eq!(event.tag, TRACKPAL_EVENT_TAG);
    }
}

#[test]
fn ramp_flushes_buffered_deltas_on_activation() {
    // The deltas buffered during evaluation are emitted (ramp-scaled)
    // the moment the touch activates, not dropped
    let mut harness = Harness::new(Config::default());
    harness.frame(0.88, 0.5, ContactPhase::Start);
    harness.frame(0.88, 0.488, ContactPhase::Move); // discarded first delta
    harness.frame(0.88, 0.476, ContactPhase::Move); // buffered, activates
    let events_after_activation = harness.sink.non_zero_scrolls().len();
    assert!(
        events_after_activation >= 1,
        "ramp flush must emit the buffered delta"
    );
}
