//! Engine orchestration
//!
//! One `Engine` value owns the whole pipeline and its capability
//! handles. All state mutation happens on the thread draining the
//! frame and tick rings; the only cross-thread state is the shared
//! cell the event-tap callback reads.

use crate::app::config::{Config, CornerAction};
use crate::engine::inertia::InertiaEngine;
use crate::engine::intent::{IntentDecision, IntentEvaluator};
use crate::engine::learner::AdaptiveLearner;
use crate::engine::recorder::{ActivationSnapshot, SessionRecorder};
use crate::engine::scroll::ScrollEmitter;
use crate::engine::session::{Activation, TouchSession};
use crate::events::clock::FrameClock;
use crate::events::sink::EventSink;
use crate::events::tap::{Interceptor, SharedState};
use crate::store::SettingsStore;
use crate::touch::arbiter::{FingerArbiter, FingerTransition};
use crate::touch::classifier::{ContactClassifier, TouchVerdict};
use crate::touch::source::TouchSource;
use crate::touch::types::{ContactFrame, FrameMessage};
use crate::touch::zones::{self, Zone};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lift-off within this window and displacement fires a corner or
/// middle-click tap.
const TAP_MAX_DURATION: f64 = 0.5;
const TAP_MAX_MOVEMENT: f64 = 0.05;

/// The touch intent engine.
pub struct Engine {
    config: Config,
    classifier: ContactClassifier,
    arbiter: FingerArbiter,
    evaluator: IntentEvaluator,
    emitter: ScrollEmitter,
    inertia: InertiaEngine,
    learner: AdaptiveLearner,
    recorder: SessionRecorder,
    session: Option<TouchSession>,
    shared: Arc<SharedState>,
    sink: Box<dyn EventSink>,
    clock: Box<dyn FrameClock>,
    source: Option<Box<dyn TouchSource>>,
    interceptor: Option<Box<dyn Interceptor>>,
    store: Option<SettingsStore>,
    enabled: bool,
}

impl Engine {
    pub fn new(
        config: Config,
        learner: AdaptiveLearner,
        sink: Box<dyn EventSink>,
        clock: Box<dyn FrameClock>,
        shared: Arc<SharedState>,
    ) -> Self {
        Self {
            config,
            classifier: ContactClassifier::new(),
            arbiter: FingerArbiter::new(),
            evaluator: IntentEvaluator::new(),
            emitter: ScrollEmitter::new(),
            inertia: InertiaEngine::new(),
            learner,
            recorder: SessionRecorder::new(),
            session: None,
            shared,
            sink,
            clock,
            source: None,
            interceptor: None,
            store: None,
            enabled: false,
        }
    }

    /// Attach the raw multitouch source (owned exclusively by the
    /// engine).
    pub fn with_source(mut self, source: Box<dyn TouchSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach the suppressing event tap.
    pub fn with_interceptor(mut self, interceptor: Box<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Attach the settings store used for adaptive state persistence.
    pub fn with_store(mut self, store: SettingsStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn learner(&self) -> &AdaptiveLearner {
        &self.learner
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn shared(&self) -> Arc<SharedState> {
        Arc::clone(&self.shared)
    }

    /// Enable the pipeline. Idempotent; on any capability failure the
    /// engine stays off and reports once.
    pub fn start(&mut self) -> Result<()> {
        if self.enabled {
            return Ok(());
        }

        if let Some(interceptor) = self.interceptor.as_mut() {
            interceptor.start()?;
        }
        if let Some(source) = self.source.as_mut() {
            if let Err(e) = source.start() {
                if let Some(interceptor) = self.interceptor.as_mut() {
                    interceptor.stop();
                }
                return Err(e);
            }
        }

        self.enabled = true;
        info!("Engine enabled");
        Ok(())
    }

    /// Disable the pipeline, tear down taps and clocks, persist
    /// adaptive state. Calling twice leaves everything off.
    pub fn stop(&mut self) {
        if !self.enabled {
            return;
        }

        let now = self
            .session
            .as_ref()
            .map(|s| s.last_time)
            .unwrap_or_default();
        self.cancel_active_session(now);

        if let Some(source) = self.source.as_mut() {
            source.stop();
        }
        if let Some(interceptor) = self.interceptor.as_mut() {
            interceptor.stop();
        }
        self.clock.stop();
        self.persist_adaptive();
        self.enabled = false;
        info!("Engine disabled");
    }

    /// Single entry point for touch input.
    pub fn handle_frame(&mut self, msg: FrameMessage) {
        if !self.enabled {
            return;
        }

        let transition = self.arbiter.observe(msg.finger_count, msg.timestamp);
        self.shared.set_finger_count(msg.finger_count);

        if transition == FingerTransition::EnteredMulti {
            self.cancel_active_session(msg.timestamp);
        }

        if msg.finger_count == 0 {
            self.finish_touch(msg.timestamp);
            return;
        }
        if msg.finger_count != 1 {
            return;
        }
        if !self.arbiter.should_process_single_finger_touch(msg.timestamp) {
            return;
        }
        let Some(contact) = msg.contact else {
            return;
        };

        if contact.phase.is_lift_off() {
            self.finish_touch(contact.timestamp);
        } else if contact.phase.is_touching() {
            self.process_contact(contact);
        }
        // Hover frames carry no contact evidence and are ignored
    }

    /// One frame-clock tick; drives inertia and tears the clock down
    /// when the coast ends.
    pub fn handle_tick(&mut self, now: f64) {
        if !self.enabled {
            return;
        }
        let coasting = self.inertia.step(now, &mut *self.sink);
        if !coasting && self.clock.is_running() {
            self.clock.stop();
        }
    }

    /// Clear all session and activation state and release the shared
    /// flag. Closes an orphaned scroll phase on every teardown path.
    pub fn reset_tracking(&mut self) {
        if let Some(mut session) = self.session.take() {
            self.emitter.end_session(&mut session, &mut *self.sink);
            if session.activated {
                self.recorder.finish(session.last_time, true);
            }
        }
        self.shared.set_actively_scrolling(false);
    }

    fn process_contact(&mut self, contact: ContactFrame) {
        match self.classifier.classify(&contact, &self.config) {
            TouchVerdict::Valid => {}
            verdict => {
                if self.session.is_some() {
                    debug!("Session reset by classifier verdict {:?}", verdict);
                    self.reset_tracking();
                }
                return;
            }
        }

        if self.session.is_none() {
            // Any new touch pre-empts a running coast
            if self.inertia.is_active() {
                self.inertia.stop(&mut *self.sink);
                self.clock.stop();
            }
            self.begin_session(contact);
        } else {
            self.advance_session(contact);
        }
    }

    fn begin_session(&mut self, contact: ContactFrame) {
        let zone = zones::zone_for(contact.x, contact.y, &self.config);
        match zone {
            Zone::Center => {}
            Zone::MiddleClick => {
                let session = TouchSession::new(zone, contact.x, contact.y, contact.timestamp);
                self.session = Some(session);
            }
            _ => {
                let prior =
                    IntentEvaluator::zone_prior(zone, contact.x, contact.y, &self.config);
                let mut session =
                    TouchSession::new(zone, contact.x, contact.y, contact.timestamp);
                session.activation = Some(Activation::with_prior(prior));
                self.session = Some(session);
                self.shared.set_actively_scrolling(true);
                if let Some(axis) = zone.scroll_axis() {
                    self.learner.note_session_start(axis, contact.timestamp);
                }
                debug!(
                    "Session started in {:?} at ({:.3}, {:.3}), prior {:.3}",
                    zone, contact.x, contact.y, prior
                );
            }
        }
    }

    fn advance_session(&mut self, contact: ContactFrame) {
        let session = self.session.as_mut().expect("advance without session");
        let delta = session.advance(contact.x, contact.y, contact.timestamp);

        if session.is_pending() {
            let decision = self.evaluator.evaluate(
                session,
                delta,
                contact.density,
                &self.config,
                &self.learner,
            );
            match decision {
                IntentDecision::Activated => self.on_activated(contact.timestamp),
                IntentDecision::Rejected => self.on_rejected(contact.timestamp),
                IntentDecision::NeedMoreFrames => {}
            }
        } else if session.activated {
            self.emitter
                .emit(session, delta, &self.config, &mut *self.sink);
            let velocity = session
                .velocity_history
                .latest()
                .map(|v| (v.vx, v.vy))
                .unwrap_or_default();
            self.recorder.update(delta, velocity);
        }
        // Tap-tracking sessions (middle-click, restored corners) only
        // accumulate position until lift-off
    }

    fn on_activated(&mut self, now: f64) {
        let session = self.session.as_mut().expect("activation without session");
        let activation = session
            .activation
            .take()
            .expect("activated without pending state");
        session.activated = true;

        let snapshot = ActivationSnapshot {
            on_axis_ratio: activation.last_on_axis_ratio,
            on_axis_speed: activation.last_on_axis_speed,
            off_axis_speed: activation.last_off_axis_speed,
            density: activation.last_density,
            confidence: activation.confidence,
        };
        let zone = session.zone;
        debug!(
            "Activated {:?} after {} frame(s), confidence {:.3}",
            zone, activation.frames_observed, activation.confidence
        );

        if let Some(axis) = zone.scroll_axis() {
            if self.learner.record_success(axis, &activation.deltas) {
                self.persist_adaptive();
            }
        }
        self.recorder.begin(zone, snapshot, now);

        let session = self.session.as_mut().expect("session present");
        self.emitter
            .flush_ramp(session, &activation.deltas, &self.config, &mut *self.sink);
    }

    fn on_rejected(&mut self, now: f64) {
        let session = self.session.as_mut().expect("rejection without session");
        session.activation = None;
        self.shared.set_actively_scrolling(false);

        if let Some(axis) = session.zone.scroll_axis() {
            self.learner.record_failure(axis, now);
        }

        // Corners keep their tap; everything else returns the cursor
        if session.original_zone.is_corner() {
            session.zone = session.original_zone;
        } else {
            session.zone = Zone::Center;
        }
        debug!("Activation rejected, zone now {:?}", session.zone);
    }

    fn finish_touch(&mut self, now: f64) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if session.is_pending() {
            // Lift during evaluation: a missed activation
            if let Some(axis) = session.zone.scroll_axis() {
                self.learner.record_failure(axis, now);
            }
            session.activation = None;
        }

        if session.activated {
            self.emitter.end_session(&mut session, &mut *self.sink);
            self.recorder.finish(now, false);

            if let Some(axis) = session.zone.scroll_axis() {
                let average = session.velocity_history.average();
                if self
                    .inertia
                    .try_start(average, axis, self.config.scroll_multiplier, now)
                {
                    if let Err(e) = self.clock.start() {
                        warn!("Frame clock unavailable, skipping inertia: {}", e);
                        self.inertia.stop(&mut *self.sink);
                    }
                }
            }
        } else {
            self.fire_tap_actions(&session, now);
            // Best-effort recovery: no teardown path may leave an open
            // scroll phase
            self.emitter.end_session(&mut session, &mut *self.sink);
        }

        self.shared.set_actively_scrolling(false);
    }

    fn fire_tap_actions(&mut self, session: &TouchSession, now: f64) {
        let (nx, ny) = session.net_displacement();
        let movement = (nx * nx + ny * ny).sqrt();
        if session.duration(now) > TAP_MAX_DURATION || movement > TAP_MAX_MOVEMENT {
            return;
        }

        let tap_zone = if session.original_zone.is_corner() {
            session.original_zone
        } else {
            session.zone
        };

        if let Some(corner) = tap_zone.corner() {
            if self.config.corner_trigger_enabled {
                let action = self.config.corner_action(corner);
                if action != CornerAction::None {
                    debug!("Corner tap {:?} fires {:?}", corner, action);
                    self.sink.trigger_corner_action(action);
                }
            }
        } else if tap_zone == Zone::MiddleClick && self.config.middle_click_enabled {
            debug!("Middle-click tap");
            self.sink.post_middle_click();
        }
    }

    fn cancel_active_session(&mut self, now: f64) {
        self.inertia.stop(&mut *self.sink);
        self.clock.stop();

        if let Some(mut session) = self.session.take() {
            self.emitter.end_session(&mut session, &mut *self.sink);
            if session.activated {
                self.recorder.finish(now, true);
            }
            // A multi-finger cancellation is not a missed activation;
            // the learner only counts rejections and timeouts
        }
        self.shared.set_actively_scrolling(false);
    }

    fn persist_adaptive(&self) {
        if let Some(store) = self.store.as_ref() {
            if let Err(e) = store.save_adaptive(self.learner.state()) {
                warn!("Failed to persist adaptive state: {}", e);
            }
        }
    }
}
