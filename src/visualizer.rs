//! Software-rendered visualizer using `minifb`.
//!
//! The window doubles as the simulation input device: mouse position stands
//! in for the hand, `Space` holds the palm open, `W` plays a scripted index
//! swing.  Real rendering state lives in [`crate::app::AppState`]; this
//! module only reads the pool buffers and the card transform.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │            * particle bursts *                      │
//! │                  ┌─────────┐                        │
//! │                  │ FORTUNE │  ← card scales/fades   │
//! │                  └─────────┘     toward the centre  │
//! │  status bar                                         │
//! │  key legend                                         │
//! └─────────────────────────────────────────────────────┘
//! ```

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use std::sync::mpsc::Sender;

use crate::app::AppState;
use crate::card::{hue_color, FortuneCard};
use crate::gesture::SimInput;

const BG_COLOR:     u32 = 0xFF10101E;
const CARD_COLOR:   u32 = 0xFFF5EFD7;
const CARD_BORDER:  u32 = 0xFFB03A2E;
const CARD_TEXT:    u32 = 0xFF2C1810;
const TEXT_BG:      u32 = 0xFF0F3460;
const STATUS_FG:    u32 = 0xFFEEEEEE;
const LEGEND_FG:    u32 = 0xFF888888;

/// A non-gesture signal raised by the window itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSignal {
    None,
    /// Tap/click or Enter — dismisses a shown card.
    Dismiss,
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:     Window,
    buf:        Vec<u32>,
    buf_size:   (usize, usize),
    sim_tx:     Sender<SimInput>,
    mouse_held: bool,
    needs_full: bool,
    /// Card visibility on the previous frame — a dismiss must repaint once
    /// more to clear the card and stale status from the buffer.
    card_was_visible: bool,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>, width: usize, height: usize) -> Result<Self, String> {
        let mut window = Window::new(
            "Hand Fireworks — Fortune Draw",
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; width * height],
            buf_size: (width, height),
            sim_tx,
            mouse_held: false,
            needs_full: true,
            card_was_visible: false,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn size(&self) -> (usize, usize) {
        self.window.get_size()
    }

    /// Poll window input: forwards simulated hand input to the source
    /// thread and reports window-level signals back to the run loop.
    pub fn poll_input(&mut self) -> WindowSignal {
        if !self.window.is_open() {
            return WindowSignal::Quit;
        }
        if self.window.is_key_pressed(Key::Q, KeyRepeat::No) {
            return WindowSignal::Quit;
        }

        // Mouse position → normalized landmark space (undo the classifier's
        // mirror so the cursor lands under the pointer).
        let (w, h) = self.window.get_size();
        let (mx, my) = self
            .window
            .get_mouse_pos(MouseMode::Clamp)
            .unwrap_or((w as f32 / 2.0, h as f32 / 2.0));
        let center = [1.0 - mx / w as f32, my / h as f32];

        if self.window.is_key_pressed(Key::W, KeyRepeat::No) {
            let _ = self.sim_tx.send(SimInput::Swing { center });
        } else if self.window.is_key_down(Key::Space) {
            let _ = self.sim_tx.send(SimInput::OpenPalm { center });
        } else {
            let _ = self.sim_tx.send(SimInput::ClosedPalm { center });
        }

        // Dismiss on Enter or a fresh left click.
        let mouse_down = self.window.get_mouse_down(MouseButton::Left);
        let clicked = mouse_down && !self.mouse_held;
        self.mouse_held = mouse_down;
        if clicked || self.window.is_key_pressed(Key::Enter, KeyRepeat::No) {
            return WindowSignal::Dismiss;
        }

        WindowSignal::None
    }

    // ── Render one frame ──────────────────────────────────────────────────

    pub fn render(&mut self, app: &mut AppState) {
        let (w, h) = self.window.get_size();
        if (w, h) != self.buf_size {
            self.buf_size = (w, h);
            self.buf = vec![BG_COLOR; w * h];
            self.needs_full = true;
        }

        let card_visible = app.card().map_or(false, |c| c.visible);
        let dirty = app.pool_mut().take_dirty();
        let repaint = should_repaint(dirty, card_visible, self.card_was_visible, self.needs_full);
        self.card_was_visible = card_visible;

        if repaint {
            self.needs_full = false;
            self.buf.fill(BG_COLOR);

            self.draw_particles(app);
            if let Some(card) = app.card() {
                if card.visible {
                    let card = card.clone();
                    self.draw_card(app, &card);
                }
            }
            self.draw_status(&app.status);
        }

        let (w, h) = self.buf_size;
        self.window.update_with_buffer(&self.buf, w, h).ok();
    }

    // ── Particles ─────────────────────────────────────────────────────────

    fn draw_particles(&mut self, app: &AppState) {
        let (w, h) = self.buf_size;
        let pool = app.pool();
        let life = pool.life();
        let positions = pool.positions();
        let sizes = pool.sizes();
        let hues = pool.hues();

        for i in 0..pool.capacity() {
            if life[i] <= 0.0 {
                continue;
            }
            // Fade out with remaining life.
            let color = blend(BG_COLOR, hue_color(hues[i]), life[i].clamp(0.0, 1.0));
            let px = w as f32 / 2.0 + positions[i][0];
            let py = h as f32 / 2.0 - positions[i][1];
            self.fill_circle(px as isize, py as isize, sizes[i].max(1.0) as isize, color);
        }
    }

    // ── Fortune card ──────────────────────────────────────────────────────

    fn draw_card(&mut self, app: &AppState, card: &FortuneCard) {
        let (w, h) = self.buf_size;
        let (full_w, full_h) = app.viewport().card_size();
        let cw = (full_w * card.scale) as isize;
        let ch = (full_h * card.scale) as isize;

        let cx = (w as f32 / 2.0 + card.position[0]) as isize;
        let cy = (h as f32 / 2.0 - card.position[1]) as isize;
        let x0 = cx - cw / 2;
        let y0 = cy - ch / 2;

        let face = blend(BG_COLOR, CARD_COLOR, card.opacity);
        let frame = blend(BG_COLOR, CARD_BORDER, card.opacity);
        self.fill_rect_clipped(x0, y0, cw, ch, face);
        self.border_clipped(x0, y0, cw, ch, frame);
        self.border_clipped(x0 + 3, y0 + 3, cw - 6, ch - 6, frame);

        // Centre the text; the tiny font is 4px advance per char, scaled.
        let scale = 2isize;
        let text_w = card.text.chars().count() as isize * 4 * scale;
        let ink = blend(face, CARD_TEXT, card.opacity);
        self.draw_label_scaled(&card.text, cx - text_w / 2, cy - 3 * scale, scale, ink);
    }

    // ── Status bar + key legend ───────────────────────────────────────────

    fn draw_status(&mut self, status: &str) {
        let (w, h) = self.buf_size;
        let status_y = h.saturating_sub(36) as isize;
        self.fill_rect_clipped(0, status_y, w as isize, 36, TEXT_BG);
        self.draw_label_scaled(status, 10, status_y + 6, 1, STATUS_FG);
        self.draw_label_scaled(
            "space=open palm  w=swing/draw  click or enter=dismiss  q=quit",
            10,
            h as isize - 12,
            1,
            LEGEND_FG,
        );
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        let (w, h) = self.buf_size;
        if x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h {
            self.buf[y as usize * w + x as usize] = color;
        }
    }

    fn fill_rect_clipped(&mut self, x: isize, y: isize, w: isize, h: isize, color: u32) {
        for row in y..y + h {
            for col in x..x + w {
                self.set_pixel(col, row, color);
            }
        }
    }

    fn border_clipped(&mut self, x: isize, y: isize, w: isize, h: isize, color: u32) {
        if w <= 0 || h <= 0 {
            return;
        }
        for col in x..x + w {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..y + h {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    fn fill_circle(&mut self, cx: isize, cy: isize, r: isize, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Minimal bitmap font — 3×5 characters, integer-scaled.
    fn draw_label_scaled(&mut self, text: &str, x: isize, y: isize, scale: isize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3isize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect_clipped(
                            cx + col * scale,
                            y + row as isize * scale,
                            scale,
                            scale,
                            color,
                        );
                    }
                }
            }
            cx += 4 * scale; // 3 wide + 1 gap
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        '"' => [0b101, 0b101, 0b000, 0b000, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Whether the scene buffer must be rebuilt this frame.
///
/// A repaint is needed while anything moves (dirty pool, visible card), on
/// the first frame after a resize, and once more on the card's
/// visible→hidden edge so a dismissed card does not linger in the buffer.
fn should_repaint(dirty: bool, card_visible: bool, was_visible: bool, needs_full: bool) -> bool {
    dirty || card_visible || card_visible != was_visible || needs_full
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repaint_on_card_hidden_edge() {
        // A dismiss with an idle pool: dirty=false, card now hidden but
        // visible last frame — the buffer must be rebuilt once to clear it.
        assert!(should_repaint(false, false, true, false));
        // The frame after, everything idle, nothing to repaint.
        assert!(!should_repaint(false, false, false, false));
    }

    #[test]
    fn repaint_while_active() {
        assert!(should_repaint(true, false, false, false));   // particles moved
        assert!(should_repaint(false, true, false, false));   // card animating
        assert!(should_repaint(false, true, true, false));    // card still shown
        assert!(should_repaint(false, false, false, true));   // fresh buffer
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0.0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
    }
}
