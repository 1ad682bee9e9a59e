//! Hand-landmark intake and gesture classification.
//!
//! Frames of 21 normalized 2D landmarks arrive asynchronously from a
//! [`HandSource`] (real LeapMotion hardware or the keyboard/mouse simulator)
//! and are parked in a single-slot, last-write-wins [`LandmarkMailbox`].
//! The tick thread takes at most one frame per tick and feeds it to the
//! [`GestureClassifier`], which smooths palm openness with an EMA and
//! watches the index fingertip for a direction reversal.  Consumers don't
//! need to know which backend produced the frames.

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::particles::Viewport;

/// Landmarks per hand frame (MediaPipe hand topology).
pub const LANDMARK_COUNT: usize = 21;

const WRIST: usize = 0;
const INDEX_TIP: usize = 8;
const PALM_CENTER: usize = 9;
/// Index, middle, ring, pinky tips — used for the openness measure.
const FINGERTIPS: [usize; 4] = [8, 12, 16, 20];

/// Average wrist→fingertip distance above which the palm counts as open.
const OPEN_DISTANCE: f32 = 0.4;
const EMA_KEEP: f32 = 0.8;
const EMA_GAIN: f32 = 0.2;
/// Smoothed openness above which the palm-open trigger fires.
const EMA_FIRE: f32 = 0.7;

const SWING_WINDOW: usize = 5;
const SWING_MIN_DELTA: f32 = 0.08;

// ════════════════════════════════════════════════════════════════════════════
// HandFrame
// ════════════════════════════════════════════════════════════════════════════

/// One detector frame: 21 landmarks, each normalized to [0, 1] image space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandFrame {
    pub points: [[f32; 2]; LANDMARK_COUNT],
}

// ════════════════════════════════════════════════════════════════════════════
// GestureEvent
// ════════════════════════════════════════════════════════════════════════════

/// A discrete trigger distilled from noisy per-frame landmarks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureEvent {
    /// Smoothed palm openness above threshold.  Re-emitted every qualifying
    /// frame while the palm stays open; the scheduler's debounce absorbs
    /// the repeats.  Carries the screen-space cursor (origin-centred).
    PalmOpen { cursor: [f32; 2] },

    /// Index fingertip reversed direction with enough travel.  Only
    /// evaluated while the app is idle.
    Swing,
}

/// Result of classifying one frame.
#[derive(Clone, Debug)]
pub struct Classification {
    /// Screen-space position of the palm centre (landmark 9), mirrored
    /// horizontally and flipped vertically, centred at the origin.
    pub cursor: [f32; 2],
    pub events: Vec<GestureEvent>,
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClassifier
// ════════════════════════════════════════════════════════════════════════════

/// Per-hand smoothing state.  Feed it one frame at a time via
/// [`GestureClassifier::classify`].
#[derive(Debug, Default)]
pub struct GestureClassifier {
    /// EMA of the boolean palm-openness observation, in [0, 1].
    openness: f32,
    /// FIFO of the index fingertip's normalized x, oldest first.
    index_history: Vec<f32>,
}

impl GestureClassifier {
    pub fn new() -> Self {
        GestureClassifier::default()
    }

    /// Classify one landmark frame.
    ///
    /// `in_idle` gates swing detection: the state machine leaves idle the
    /// moment a swing is handled, so the same history window cannot re-fire
    /// until idle is re-entered and the window rolls over.
    pub fn classify(
        &mut self,
        frame: &HandFrame,
        in_idle: bool,
        viewport: &Viewport,
    ) -> Classification {
        let mut events = Vec::new();

        // ── Cursor: mirror x, flip y, centre at the origin ─────────────────
        let palm = frame.points[PALM_CENTER];
        let cursor = [
            (1.0 - palm[0] - 0.5) * viewport.width,
            -(palm[1] - 0.5) * viewport.height,
        ];

        // ── Palm openness → EMA → palm-open trigger ────────────────────────
        let wrist = frame.points[WRIST];
        let avg_reach = FINGERTIPS
            .iter()
            .map(|&tip| distance(wrist, frame.points[tip]))
            .sum::<f32>()
            / FINGERTIPS.len() as f32;
        let open = if avg_reach > OPEN_DISTANCE { 1.0 } else { 0.0 };
        self.openness = self.openness * EMA_KEEP + open * EMA_GAIN;
        if self.openness > EMA_FIRE {
            events.push(GestureEvent::PalmOpen { cursor });
        }

        // ── Index swing: direction reversal over a 5-frame window ──────────
        if self.index_history.len() >= SWING_WINDOW {
            self.index_history.remove(0);
        }
        self.index_history.push(frame.points[INDEX_TIP][0]);

        if in_idle && self.index_history.len() == SWING_WINDOW {
            let oldest = self.index_history[0];
            let delta = self.index_history[SWING_WINDOW - 1] - oldest;
            let prev_delta = self.index_history[SWING_WINDOW - 2] - oldest;
            if delta.abs() > SWING_MIN_DELTA && sign(delta) != sign(prev_delta) {
                events.push(GestureEvent::Swing);
            }
        }

        Classification { cursor, events }
    }
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Three-valued sign: zero is its own sign, unlike `f32::signum`.
fn sign(x: f32) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkMailbox — single-slot, last-write-wins frame buffer
// ════════════════════════════════════════════════════════════════════════════

/// The only shared state between a hand source and the tick thread.
///
/// The source overwrites the slot at its own cadence; the tick takes the
/// newest frame at most once per tick.  No queue can build up.
#[derive(Clone, Debug, Default)]
pub struct LandmarkMailbox {
    slot: Arc<Mutex<Option<HandFrame>>>,
}

impl LandmarkMailbox {
    pub fn new() -> Self {
        LandmarkMailbox::default()
    }

    /// Replace whatever frame is waiting.
    pub fn post(&self, frame: HandFrame) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(frame);
    }

    /// Remove and return the newest frame, if any arrived since last take.
    pub fn take(&self) -> Option<HandFrame> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.take()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandSource trait — unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`HandFrame`]s into a mailbox.
pub trait HandSource: Send + 'static {
    fn run(self: Box<Self>, mailbox: LandmarkMailbox);
}

/// Spawn a hand source on its own thread.  The source and the tick loop are
/// independently stoppable: dropping the sim input channel ends the source,
/// closing the window ends the loop.
pub fn spawn_hand_source<S: HandSource>(source: S, mailbox: LandmarkMailbox) {
    thread::spawn(move || Box::new(source).run(mailbox));
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource — keyboard/mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Copy, Debug)]
pub enum SimInput {
    /// Space held: synthesize an open palm at `center` (landmark space).
    OpenPalm { center: [f32; 2] },
    /// No gesture key held: synthesize a loosely closed hand.
    ClosedPalm { center: [f32; 2] },
    /// W pressed: play a short scripted index-finger swing.
    Swing { center: [f32; 2] },
}

/// Hand source driven by [`SimInput`] events from the visualizer's window.
///
/// It synthesizes full 21-landmark frames, so the classifier runs the exact
/// same path in simulation as with real hardware.
pub struct SimHandSource {
    pub rx: Receiver<SimInput>,
}

impl HandSource for SimHandSource {
    fn run(self: Box<Self>, mailbox: LandmarkMailbox) {
        // Index-x offsets that produce a direction reversal with enough
        // travel once the 5-frame history fills.
        const SWING_SCRIPT: [f32; 5] = [0.0, 0.0, 0.0, -0.05, 0.15];

        for input in self.rx {
            match input {
                SimInput::OpenPalm { center } => {
                    mailbox.post(synth_frame(center, 0.5, 0.0));
                }
                SimInput::ClosedPalm { center } => {
                    mailbox.post(synth_frame(center, 0.15, 0.0));
                }
                SimInput::Swing { center } => {
                    for dx in SWING_SCRIPT {
                        mailbox.post(synth_frame(center, 0.15, dx));
                        // Pace posts near the tick rate so each frame lands
                        // in a separate history slot.
                        thread::sleep(Duration::from_millis(18));
                    }
                }
            }
        }
    }
}

/// Build a synthetic frame: wrist and palm centre at `center`, fingertips
/// fanned out at `spread` distance, index tip shifted by `index_dx`.
fn synth_frame(center: [f32; 2], spread: f32, index_dx: f32) -> HandFrame {
    let mut points = [center; LANDMARK_COUNT];
    for (slot, &tip) in FINGERTIPS.iter().enumerate() {
        // Fan upward between 60° and 120°.
        let angle = std::f32::consts::PI * (60.0 + 20.0 * slot as f32) / 180.0;
        points[tip] = [
            center[0] + angle.cos() * spread,
            center[1] - angle.sin() * spread,
        ];
    }
    points[INDEX_TIP][0] += index_dx;
    HandFrame { points }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapHandSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Hand source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Skeletal joints are projected into the 21-landmark MediaPipe ordering
/// (wrist, then four joints per digit, thumb first) and normalized into
/// [0, 1] image space, mirrored so the frame matches a selfie camera.
#[cfg(feature = "leap")]
pub struct LeapHandSource;

#[cfg(feature = "leap")]
impl HandSource for LeapHandSource {
    fn run(self: Box<Self>, mailbox: LandmarkMailbox) {
        use leaprs::*;

        // Tracking volume mapped onto the unit square (mm).
        const SPAN_X: f32 = 400.0;
        const SPAN_Y: f32 = 300.0;
        const BASE_Y: f32 = 80.0;

        let normalize = |x: f32, y: f32| -> [f32; 2] {
            [
                (0.5 - x / SPAN_X).clamp(0.0, 1.0),
                (1.0 - (y - BASE_Y) / SPAN_Y).clamp(0.0, 1.0),
            ]
        };

        let mut connection = Connection::create(ConnectionConfig::default())
            .expect("Failed to open LeapC connection");
        connection.open().expect("Failed to open LeapMotion device");

        loop {
            let msg = match connection.poll(100) {
                Ok(m) => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let hand = match frame.hands().next() {
                    Some(h) => h,
                    None => continue,
                };

                let mut points = [[0.5_f32; 2]; LANDMARK_COUNT];

                let wrist = hand.arm().next_joint();
                points[WRIST] = normalize(wrist.x, wrist.y);

                // Digits arrive thumb-first; each contributes four joints
                // (knuckle → tip) in MediaPipe order.
                for (d, digit) in hand.digits().take(5).enumerate() {
                    let joints = [
                        digit.proximal().prev_joint(),
                        digit.proximal().next_joint(),
                        digit.intermediate().next_joint(),
                        digit.distal().next_joint(),
                    ];
                    for (j, p) in joints.iter().enumerate() {
                        points[1 + d * 4 + j] = normalize(p.x, p.y);
                    }
                }

                mailbox.post(HandFrame { points });
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn vp() -> Viewport {
        Viewport::new(800.0, 600.0)
    }

    /// Frame with every point at `center` except the index tip's x.
    fn flat_frame(index_x: f32) -> HandFrame {
        let mut points = [[0.5_f32; 2]; LANDMARK_COUNT];
        points[INDEX_TIP][0] = index_x;
        HandFrame { points }
    }

    fn open_frame() -> HandFrame {
        synth_frame([0.5, 0.5], 0.5, 0.0)
    }

    #[test]
    fn cursor_is_mirrored_flipped_and_centred() {
        let mut c = GestureClassifier::new();
        let mut points = [[0.5_f32; 2]; LANDMARK_COUNT];
        points[PALM_CENTER] = [0.25, 0.25];
        let out = c.classify(&HandFrame { points }, true, &vp());
        assert!((out.cursor[0] - 200.0).abs() < 1e-3);
        assert!((out.cursor[1] - 150.0).abs() < 1e-3);
    }

    #[test]
    fn ema_stays_within_unit_interval() {
        let mut c = GestureClassifier::new();
        for i in 0..200 {
            let frame = if i % 3 == 0 { open_frame() } else { flat_frame(0.5) };
            c.classify(&frame, true, &vp());
            assert!((0.0..=1.0).contains(&c.openness));
        }
    }

    #[test]
    fn palm_open_fires_on_sixth_open_frame() {
        let mut c = GestureClassifier::new();
        // 1 − 0.8⁵ ≈ 0.672 stays under the 0.7 threshold...
        for _ in 0..5 {
            let out = c.classify(&open_frame(), true, &vp());
            assert!(out.events.is_empty());
        }
        // ...1 − 0.8⁶ ≈ 0.738 crosses it.
        let out = c.classify(&open_frame(), true, &vp());
        assert!(matches!(out.events[0], GestureEvent::PalmOpen { .. }));
    }

    #[test]
    fn palm_open_refires_while_held() {
        let mut c = GestureClassifier::new();
        for _ in 0..6 {
            c.classify(&open_frame(), true, &vp());
        }
        for _ in 0..10 {
            let out = c.classify(&open_frame(), true, &vp());
            assert!(out
                .events
                .iter()
                .any(|e| matches!(e, GestureEvent::PalmOpen { .. })));
        }
    }

    #[test]
    fn swing_fires_on_reversal_while_idle() {
        let mut c = GestureClassifier::new();
        for x in [0.50, 0.50, 0.50, 0.50] {
            assert!(c.classify(&flat_frame(x), true, &vp()).events.is_empty());
        }
        // delta = 0.15 > 0.08, prev_delta = 0.0 — sign reversal from zero.
        let out = c.classify(&flat_frame(0.65), true, &vp());
        assert_eq!(out.events, vec![GestureEvent::Swing]);
    }

    #[test]
    fn swing_suppressed_outside_idle() {
        let mut c = GestureClassifier::new();
        for x in [0.50, 0.50, 0.50, 0.50] {
            c.classify(&flat_frame(x), false, &vp());
        }
        let out = c.classify(&flat_frame(0.65), false, &vp());
        assert!(out.events.is_empty());
    }

    #[test]
    fn swing_requires_sign_reversal() {
        let mut c = GestureClassifier::new();
        // Monotonic drift: delta and prev_delta share a sign.
        for x in [0.50, 0.50, 0.50, 0.55] {
            c.classify(&flat_frame(x), true, &vp());
        }
        let out = c.classify(&flat_frame(0.65), true, &vp());
        assert!(out.events.is_empty());
    }

    #[test]
    fn swing_requires_enough_travel() {
        let mut c = GestureClassifier::new();
        for x in [0.50, 0.50, 0.50, 0.48] {
            c.classify(&flat_frame(x), true, &vp());
        }
        // Reversal, but |delta| = 0.05 < 0.08.
        let out = c.classify(&flat_frame(0.55), true, &vp());
        assert!(out.events.is_empty());
    }

    #[test]
    fn sim_source_stops_when_input_channel_drops() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mailbox = LandmarkMailbox::new();
        let writer = mailbox.clone();
        let handle = thread::spawn(move || Box::new(SimHandSource { rx }).run(writer));

        tx.send(SimInput::OpenPalm { center: [0.5, 0.5] }).expect("source alive");
        drop(tx);
        // Once the channel closes the source exits; the mailbox can then be
        // owned exclusively by another writer (the hardware backend).
        handle.join().expect("source thread ends");

        mailbox.take();
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn mailbox_keeps_newest_frame_only() {
        let mailbox = LandmarkMailbox::new();
        mailbox.post(flat_frame(0.1));
        mailbox.post(flat_frame(0.9));
        let got = mailbox.take().expect("frame");
        assert!((got.points[INDEX_TIP][0] - 0.9).abs() < f32::EPSILON);
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn synth_open_frame_reads_as_open() {
        let frame = synth_frame([0.5, 0.5], 0.5, 0.0);
        let wrist = frame.points[WRIST];
        let avg = FINGERTIPS
            .iter()
            .map(|&t| distance(wrist, frame.points[t]))
            .sum::<f32>()
            / 4.0;
        assert!(avg > OPEN_DISTANCE);

        let closed = synth_frame([0.5, 0.5], 0.15, 0.0);
        let avg_closed = FINGERTIPS
            .iter()
            .map(|&t| distance(closed.points[WRIST], closed.points[t]))
            .sum::<f32>()
            / 4.0;
        assert!(avg_closed < OPEN_DISTANCE);
    }
}
