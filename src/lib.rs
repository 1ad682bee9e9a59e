//! # hand_fireworks
//!
//! Hand-gesture fireworks with a fortune-draw card reveal.  An open palm
//! launches a particle burst at the hand's position; each burst chains into
//! three smaller secondary bursts a moment later.  A sideways swing of the
//! index finger draws a fortune card that scales and fades in toward the
//! centre of the screen.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Condition | Action |
//! |---|---|---|
//! | Open palm (held) | idle | Primary burst at palm position (400 ms debounce) |
//! | Index swing (direction reversal) | idle | Draw a fortune card |
//! | Tap / click | card shown | Dismiss the card, return to idle |
//!
//! Hand frames arrive from a [`gesture::HandSource`] running on its own
//! thread; the newest frame is kept in a single-slot mailbox and consumed
//! once per render tick.  All simulation state lives in [`app::AppState`]
//! and is advanced by [`app::AppState::tick`] in a fixed order: landmark
//! frame, card animation, pending sub-explosions, particle physics.
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: keyboard + mouse synthesize hand frames.
//! * `leap` — **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Gesture |
//! |---|---|
//! | `Space` / hold | Open palm at the mouse cursor |
//! | `W` | Index swing — draw a fortune |
//! | `Enter` or left click | Dismiss the shown card |
//! | `Q` | Quit |

pub mod gesture;
pub mod particles;
pub mod scheduler;
pub mod card;
pub mod visualizer;
pub mod app;
