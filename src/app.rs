//! Top-level application state machine and run loop.
//!
//! `AppState` owns the particle pool, the explosion scheduler, the gesture
//! classifier and the landmark mailbox, and advances all of them once per
//! rendered frame in a fixed order: newest hand frame, card animation,
//! pending sub-explosions, particle physics.

use std::sync::mpsc;
use std::time::Instant;

use rand::Rng;

use crate::card::FortuneCard;
use crate::gesture::{
    spawn_hand_source, GestureClassifier, GestureEvent, LandmarkMailbox, SimInput,
};

#[cfg(not(feature = "leap"))]
use crate::gesture::SimHandSource;
use crate::particles::{ParticlePool, Viewport};
use crate::scheduler::ExplosionScheduler;
use crate::visualizer::{Visualizer, WindowSignal};

#[cfg(feature = "leap")]
use crate::gesture::LeapHandSource;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.  The fortune list is supplied
/// here, never computed by the core.
pub struct AppConfig {
    pub fortunes:      Vec<String>,
    pub pool_capacity: usize,
    pub width:         usize,
    pub height:        usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            fortunes: [
                "Great blessing",
                "Middle blessing",
                "Small blessing",
                "Half blessing",
                "Future blessing",
                "Curse",
                "Great curse",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            pool_capacity: 1500,
            width: 960,
            height: 720,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Phase
// ════════════════════════════════════════════════════════════════════════════

/// Coarse interaction phase.  Gates which gesture events are acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    DrawingLot,
    ShowingLot,
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── simulation state ─────────────────────────────────────────────────
    viewport:   Viewport,
    pool:       ParticlePool,
    scheduler:  ExplosionScheduler,
    classifier: GestureClassifier,
    mailbox:    LandmarkMailbox,

    // ── interaction state ────────────────────────────────────────────────
    phase:    Phase,
    card:     Option<FortuneCard>,
    fortunes: Vec<String>,

    // ── status message ───────────────────────────────────────────────────
    pub status: String,
}

const READY_STATUS: &str = "Ready — open palm for fireworks, swing finger to draw a fortune";

impl AppState {
    pub fn new(cfg: AppConfig) -> Self {
        AppState {
            viewport:   Viewport::new(cfg.width as f32, cfg.height as f32),
            pool:       ParticlePool::new(cfg.pool_capacity),
            scheduler:  ExplosionScheduler::new(),
            classifier: GestureClassifier::new(),
            mailbox:    LandmarkMailbox::new(),
            phase:      Phase::Idle,
            card:       None,
            fortunes:   cfg.fortunes,
            status:     READY_STATUS.to_string(),
        }
    }

    /// Handle for hand sources.  Clones share the same slot.
    pub fn mailbox(&self) -> LandmarkMailbox {
        self.mailbox.clone()
    }

    // ── Per-frame tick — the sole entry point of the render loop ─────────

    pub fn tick(&mut self, now: Instant) {
        // 1. Newest buffered hand frame, if the source produced one.
        if let Some(frame) = self.mailbox.take() {
            let in_idle = self.phase == Phase::Idle;
            let result = self.classifier.classify(&frame, in_idle, &self.viewport);
            for event in result.events {
                self.handle_gesture(event, now);
            }
        }

        // 2. Card reveal animation.
        if self.phase == Phase::DrawingLot {
            if let Some(card) = self.card.as_mut() {
                if card.tick(now) {
                    self.phase = Phase::ShowingLot;
                    self.status = format!("\"{}\" — tap to dismiss", card.text);
                }
            }
        }

        // 3. Due sub-explosions.
        self.scheduler.tick(now, &mut self.pool, &self.viewport);

        // 4. Particle physics.
        self.pool.integrate(&self.viewport);
    }

    // ── Process one GestureEvent ──────────────────────────────────────────

    fn handle_gesture(&mut self, event: GestureEvent, now: Instant) {
        match (self.phase, event) {
            (Phase::Idle, GestureEvent::PalmOpen { cursor }) => {
                // The classifier re-fires every open frame; the scheduler's
                // debounce decides which ones become bursts.
                if self
                    .scheduler
                    .trigger_primary(now, cursor, None, &mut self.pool, &self.viewport)
                {
                    self.status = format!("BURST at ({:.0}, {:.0})", cursor[0], cursor[1]);
                }
            }

            (Phase::Idle, GestureEvent::Swing) => {
                if self.fortunes.is_empty() {
                    return;
                }
                let pick = rand::thread_rng().gen_range(0..self.fortunes.len());
                self.card = Some(FortuneCard::draw(self.fortunes[pick].clone(), now));
                self.phase = Phase::DrawingLot;
                self.status = "SWING — drawing a lot…".to_string();
            }

            // Every other (phase, event) pair is a no-op.
            _ => {}
        }
    }

    // ── External signals ──────────────────────────────────────────────────

    /// Dismiss the shown card.  Consumed only while showing; ignored in any
    /// other phase.
    pub fn dismiss(&mut self) {
        if self.phase != Phase::ShowingLot {
            return;
        }
        if let Some(card) = self.card.as_mut() {
            card.hide();
        }
        self.phase = Phase::Idle;
        self.status = READY_STATUS.to_string();
    }

    /// Viewport resize notification: size-relative constants follow the
    /// new dimensions; nothing else changes.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.set_size(width, height);
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn phase(&self) -> Phase { self.phase }
    pub fn viewport(&self) -> &Viewport { &self.viewport }
    pub fn pool(&self) -> &ParticlePool { &self.pool }
    pub fn pool_mut(&mut self) -> &mut ParticlePool { &mut self.pool }
    pub fn card(&self) -> Option<&FortuneCard> { self.card.as_ref() }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Creates the visualizer window, spawns the hand source (simulation by
/// default, LeapMotion with `--features leap`) and drives the tick/render
/// loop at ~60 fps.  Closing the window stops the loop; the hand source
/// thread ends on its own once the input channel drops.
pub fn run(cfg: AppConfig) -> Result<(), String> {
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();

    let mut app = AppState::new(cfg);

    // Exactly one source may write the mailbox: a second writer would
    // overwrite tracking frames at its own cadence and starve the first.
    #[cfg(not(feature = "leap"))]
    spawn_hand_source(SimHandSource { rx: sim_rx }, app.mailbox());
    #[cfg(feature = "leap")]
    {
        // Hardware owns the mailbox; the window's sim inputs go nowhere.
        drop(sim_rx);
        spawn_hand_source(LeapHandSource, app.mailbox());
    }

    let mut vis = Visualizer::new(sim_tx, app.viewport().width as usize, app.viewport().height as usize)?;

    while vis.is_open() {
        match vis.poll_input() {
            WindowSignal::Quit => break,
            WindowSignal::Dismiss => app.dismiss(),
            WindowSignal::None => {}
        }

        // External resize notification.
        let (w, h) = vis.size();
        if (w as f32, h as f32) != (app.viewport().width, app.viewport().height) {
            app.resize(w as f32, h as f32);
        }

        app.tick(Instant::now());
        vis.render(&mut app);
    }

    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{HandFrame, LANDMARK_COUNT};
    use crate::particles::{PRIMARY_COUNT, SECONDARY_COUNT};
    use std::time::Duration;

    fn make_app() -> AppState {
        AppState::new(AppConfig {
            fortunes: vec!["blessing".to_string()],
            pool_capacity: 2000,
            width: 800,
            height: 600,
        })
    }

    /// Closed hand, every point at the centre except the index tip's x.
    fn closed_frame(index_x: f32) -> HandFrame {
        let mut points = [[0.5_f32; 2]; LANDMARK_COUNT];
        points[8][0] = index_x;
        HandFrame { points }
    }

    /// Open hand: fingertips far enough from the wrist, index x steady.
    fn open_frame() -> HandFrame {
        let mut points = [[0.5_f32; 2]; LANDMARK_COUNT];
        for tip in [8, 12, 16, 20] {
            points[tip] = [0.5, 0.0];
        }
        HandFrame { points }
    }

    /// Drive the app into DrawingLot; returns the tick time of the swing.
    fn enter_drawing(app: &mut AppState, t0: Instant) -> Instant {
        for (i, x) in [0.50, 0.50, 0.50, 0.50, 0.65].iter().enumerate() {
            app.mailbox().post(closed_frame(*x));
            app.tick(t0 + Duration::from_millis(i as u64 * 16));
        }
        t0 + Duration::from_millis(4 * 16)
    }

    #[test]
    fn swing_enters_drawing_lot() {
        let mut app = make_app();
        let t0 = Instant::now();
        enter_drawing(&mut app, t0);
        assert_eq!(app.phase(), Phase::DrawingLot);
        let card = app.card().expect("card created");
        assert!(card.visible);
        assert_eq!(card.text, "blessing");
    }

    #[test]
    fn reveal_completes_at_1200ms() {
        let mut app = make_app();
        let t0 = Instant::now();
        let ts = enter_drawing(&mut app, t0);

        app.tick(ts + Duration::from_millis(1199));
        assert_eq!(app.phase(), Phase::DrawingLot);

        app.tick(ts + Duration::from_millis(1200));
        assert_eq!(app.phase(), Phase::ShowingLot);
    }

    #[test]
    fn dismiss_only_consumed_while_showing() {
        let mut app = make_app();
        let t0 = Instant::now();

        app.dismiss();
        assert_eq!(app.phase(), Phase::Idle);
        assert!(app.card().is_none());

        let ts = enter_drawing(&mut app, t0);
        app.dismiss();
        assert_eq!(app.phase(), Phase::DrawingLot);
        assert!(app.card().expect("card").visible);

        app.tick(ts + Duration::from_millis(1200));
        assert_eq!(app.phase(), Phase::ShowingLot);
        app.dismiss();
        assert_eq!(app.phase(), Phase::Idle);
        assert!(!app.card().expect("card").visible);
    }

    #[test]
    fn palm_open_ignored_outside_idle() {
        let mut app = make_app();
        let t0 = Instant::now();
        let ts = enter_drawing(&mut app, t0);

        for i in 1..=20 {
            app.mailbox().post(open_frame());
            app.tick(ts + Duration::from_millis(i * 16));
        }
        assert_eq!(app.pool().active_count(), 0);
        assert_eq!(app.scheduler.pending_count(), 0);
    }

    #[test]
    fn held_palm_fires_exactly_one_primary_within_debounce() {
        let mut app = make_app();
        let t0 = Instant::now();

        let mut active_per_tick = Vec::new();
        for i in 0..30u64 {
            app.mailbox().post(open_frame());
            app.tick(t0 + Duration::from_millis(i * 16));
            active_per_tick.push(app.pool().active_count());
        }

        // Nothing before the EMA crosses 0.7 on the sixth frame...
        assert_eq!(active_per_tick[4], 0);
        // ...one 120-particle primary at the crossing, with one pending entry.
        assert_eq!(active_per_tick[5], PRIMARY_COUNT);
        // The chain fires 150 ms after the trigger (tick 15 at ~240 ms) and
        // nothing else does within the 400 ms debounce window.
        let expected = PRIMARY_COUNT + 3 * SECONDARY_COUNT;
        assert_eq!(*active_per_tick.last().unwrap(), expected);
        assert!(active_per_tick.iter().all(|&n| n <= expected));
        assert_eq!(app.scheduler.pending_count(), 0);
    }

    #[test]
    fn resize_updates_viewport_constants() {
        let mut app = make_app();
        let speed_before = app.viewport().base_speed();
        app.resize(1600.0, 1200.0);
        assert!((app.viewport().base_speed() - speed_before * 2.0).abs() < 1e-6);
    }
}
