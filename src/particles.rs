//! Fixed-capacity particle pool — burst allocation and per-tick physics.
//!
//! Slots are stored as parallel vectors (position / velocity / life / size /
//! hue) so the renderer can read them as flat buffers.  A slot is free when
//! its life is ≤ 0; there is no explicit free list — allocation rescans from
//! the lowest index.  Pool exhaustion is not an error: a burst that asks for
//! more slots than are free is filled partially and the excess is dropped.

use rand::Rng;

// ════════════════════════════════════════════════════════════════════════════
// Viewport — source of all size-relative constants
// ════════════════════════════════════════════════════════════════════════════

/// Current render-surface size plus the physics constants derived from it.
///
/// Coordinates everywhere in the core are centred at the origin: x grows
/// right, y grows up.  The visualizer owns the mapping to pixels.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub width:  f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Viewport { width, height }
    }

    /// Recompute on an external resize notification.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }

    /// Base launch speed of a primary burst, in units per tick.
    pub fn base_speed(&self) -> f32 {
        self.min_side() * 0.012
    }

    /// Downward acceleration applied to every active particle each tick.
    pub fn gravity(&self) -> f32 {
        self.min_side() * 0.0002
    }

    /// Render size of a primary-burst particle.
    pub fn particle_size(&self) -> f32 {
        self.min_side() * 0.01
    }

    /// Width and height of the fortune card at full scale.
    pub fn card_size(&self) -> (f32, f32) {
        (self.width * 0.28, self.height * 0.38)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// BurstKind
// ════════════════════════════════════════════════════════════════════════════

/// Primary bursts are gesture-triggered; secondary bursts are chained,
/// slower (0.6× launch speed) and half the particle size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BurstKind {
    Primary,
    Secondary,
}

/// Particles requested by one primary burst.
pub const PRIMARY_COUNT: usize = 120;
/// Particles requested by one secondary burst.
pub const SECONDARY_COUNT: usize = 40;

const LIFE_DECAY: f32 = 0.012;
const FRICTION: f32 = 0.97;
const HUE_JITTER: f32 = 0.025;
const SECONDARY_SPEED: f32 = 0.6;
const MAGNITUDE_MIN: f32 = 0.4;

// ════════════════════════════════════════════════════════════════════════════
// ParticlePool
// ════════════════════════════════════════════════════════════════════════════

/// Fixed-capacity particle store.  Index = stable identity; no compaction.
#[derive(Debug)]
pub struct ParticlePool {
    positions:  Vec<[f32; 3]>,
    velocities: Vec<[f32; 3]>,
    life:       Vec<f32>,
    sizes:      Vec<f32>,
    hues:       Vec<f32>,
    dirty:      bool,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        ParticlePool {
            positions:  vec![[0.0; 3]; capacity],
            velocities: vec![[0.0; 3]; capacity],
            life:       vec![0.0; capacity],
            sizes:      vec![0.0; capacity],
            hues:       vec![0.0; capacity],
            dirty:      false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.life.len()
    }

    /// Fill up to `count` free slots with a burst at `origin`.
    ///
    /// Returns how many slots were actually filled; fewer than `count` means
    /// the pool ran out of free slots, which is accepted backpressure.
    pub fn allocate(
        &mut self,
        count: usize,
        origin: [f32; 2],
        kind: BurstKind,
        hue: f32,
        viewport: &Viewport,
    ) -> usize {
        let mut rng = rand::thread_rng();

        let (speed, size) = match kind {
            BurstKind::Primary => (viewport.base_speed(), viewport.particle_size()),
            BurstKind::Secondary => (
                viewport.base_speed() * SECONDARY_SPEED,
                viewport.particle_size() * 0.5,
            ),
        };

        let mut filled = 0;
        for i in 0..self.life.len() {
            if filled == count {
                break;
            }
            if self.life[i] > 0.0 {
                continue;
            }
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let magnitude = rng.gen_range(MAGNITUDE_MIN..=1.0) * speed;

            self.positions[i] = [origin[0], origin[1], 0.0];
            self.velocities[i] = [angle.cos() * magnitude, angle.sin() * magnitude, 0.0];
            self.sizes[i] = size;
            self.hues[i] =
                (hue + rng.gen_range(-HUE_JITTER..=HUE_JITTER)).rem_euclid(1.0);
            self.life[i] = 1.0;
            filled += 1;
        }

        if filled > 0 {
            self.dirty = true;
        }
        filled
    }

    /// Advance physics one tick: drift, gravity, friction, life decay.
    ///
    /// A slot whose life drops to ≤ 0 becomes free implicitly; no explicit
    /// release step exists.
    pub fn integrate(&mut self, viewport: &Viewport) {
        let gravity = viewport.gravity();
        let mut touched = false;

        for i in 0..self.life.len() {
            if self.life[i] <= 0.0 {
                continue;
            }
            let v = &mut self.velocities[i];
            let p = &mut self.positions[i];
            p[0] += v[0];
            p[1] += v[1];
            p[2] += v[2];
            v[1] -= gravity;
            v[0] *= FRICTION;
            v[1] *= FRICTION;
            v[2] *= FRICTION;
            self.life[i] -= LIFE_DECAY;
            touched = true;
        }

        if touched {
            self.dirty = true;
        }
    }

    pub fn active_count(&self) -> usize {
        self.life.iter().filter(|l| **l > 0.0).count()
    }

    // ── Renderer views ────────────────────────────────────────────────────

    pub fn positions(&self) -> &[[f32; 3]] { &self.positions }
    pub fn velocities(&self) -> &[[f32; 3]] { &self.velocities }
    pub fn life(&self) -> &[f32] { &self.life }
    pub fn sizes(&self) -> &[f32] { &self.sizes }
    pub fn hues(&self) -> &[f32] { &self.hues }

    /// True if any slot changed since the last call; clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
