//! Fortune card reveal animation, plus the hue → color mapping shared with
//! the particle renderer.
//!
//! The card scales and fades in over 1.2 s with an ease-out-cubic curve
//! while drifting toward the screen centre.  The drift is an iterative
//! per-tick blend (factor = ease × 0.05), so the approach speed follows the
//! tick rate rather than elapsed time — kept as-is to match the original
//! effect.

use std::time::Instant;

use rand::Rng;

/// Full reveal duration in milliseconds.
pub const REVEAL_MS: f32 = 1200.0;
/// Per-tick positional blend ceiling toward the centre.
const CENTER_BLEND: f32 = 0.05;
/// The card spawns uniformly within ±this many units of the centre.
const SPAWN_OFFSET: f32 = 50.0;

// ════════════════════════════════════════════════════════════════════════════
// Color helpers — hue in [0,1) → packed ARGB
// ════════════════════════════════════════════════════════════════════════════

/// Map a circular hue to a vivid ARGB color.
pub fn hue_color(hue: f32) -> u32 {
    hsv_to_argb(hue.rem_euclid(1.0) * 360.0, 0.82, 0.95)
}

/// Convert HSV → packed ARGB (0xAARRGGBB, A=0xFF).
pub fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h = h % 360.0;
    let hi = (h / 60.0) as u32;
    let f = h / 60.0 - hi as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let ri = (r * 255.0) as u32;
    let gi = (g * 255.0) as u32;
    let bi = (b * 255.0) as u32;
    0xFF000000 | (ri << 16) | (gi << 8) | bi
}

/// Ease-out-cubic: decelerates toward the end of the transition.
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

// ════════════════════════════════════════════════════════════════════════════
// FortuneCard
// ════════════════════════════════════════════════════════════════════════════

/// The card entity: selected text plus a transform derived each tick from
/// the time elapsed since the draw.
#[derive(Clone, Debug)]
pub struct FortuneCard {
    pub text: String,
    /// Origin-centred position; drifts toward (0, 0) during the reveal.
    pub position: [f32; 2],
    pub scale: f32,
    pub opacity: f32,
    pub visible: bool,
    revealed_at: Instant,
}

impl FortuneCard {
    /// Start a reveal at a random off-centre position.
    pub fn draw(text: String, now: Instant) -> Self {
        let mut rng = rand::thread_rng();
        FortuneCard {
            text,
            position: [
                rng.gen_range(-SPAWN_OFFSET..=SPAWN_OFFSET),
                rng.gen_range(-SPAWN_OFFSET..=SPAWN_OFFSET),
            ],
            scale: 0.1,
            opacity: 0.0,
            visible: true,
            revealed_at: now,
        }
    }

    /// Advance the reveal one tick.  Returns true once progress reaches 1,
    /// i.e. the reveal is complete.
    pub fn tick(&mut self, now: Instant) -> bool {
        let elapsed = now.duration_since(self.revealed_at).as_millis() as f32;
        let progress = (elapsed / REVEAL_MS).clamp(0.0, 1.0);
        let ease = ease_out_cubic(progress);

        self.scale = 0.2 + 0.8 * ease;
        self.opacity = ease;

        // Iterative approach to the centre; deliberately tick-rate bound.
        let blend = ease * CENTER_BLEND;
        self.position[0] -= self.position[0] * blend;
        self.position[1] -= self.position[1] * blend;

        progress >= 1.0
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
