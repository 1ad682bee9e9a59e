//! Explosion scheduling — primary-burst debounce and chained sub-explosions.
//!
//! A primary burst is accepted at most once per 400 ms and always leaves
//! exactly one pending sub-explosion 150 ms in the future.  When a pending
//! entry comes due it spawns three secondary bursts around the parent origin
//! and nothing further: the chain is one level deep.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::particles::{BurstKind, ParticlePool, Viewport, PRIMARY_COUNT, SECONDARY_COUNT};

/// Minimum gap between accepted primary bursts.
pub const PRIMARY_DEBOUNCE: Duration = Duration::from_millis(400);
/// Delay from a primary burst to its chained sub-explosion.
pub const CHAIN_DELAY: Duration = Duration::from_millis(150);

const CHAIN_BURSTS: usize = 3;
/// Chained bursts scatter up to ±10% of the viewport on each axis.
const CHAIN_OFFSET: f32 = 0.1;

// ════════════════════════════════════════════════════════════════════════════
// PendingSubExplosion
// ════════════════════════════════════════════════════════════════════════════

/// One deferred chain entry, created by a primary burst and consumed the
/// first tick at or after `fire_at`.
#[derive(Clone, Copy, Debug)]
struct PendingSubExplosion {
    origin:  [f32; 2],
    fire_at: Instant,
    hue:     f32,
}

// ════════════════════════════════════════════════════════════════════════════
// ExplosionScheduler
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct ExplosionScheduler {
    pending:      Vec<PendingSubExplosion>,
    last_primary: Option<Instant>,
}

impl ExplosionScheduler {
    pub fn new() -> Self {
        ExplosionScheduler::default()
    }

    /// Attempt a primary burst at `origin`.
    ///
    /// Returns false (and does nothing) while the debounce window is still
    /// open.  `hue` is picked at random when not given.
    pub fn trigger_primary(
        &mut self,
        now: Instant,
        origin: [f32; 2],
        hue: Option<f32>,
        pool: &mut ParticlePool,
        viewport: &Viewport,
    ) -> bool {
        if let Some(last) = self.last_primary {
            if now.duration_since(last) < PRIMARY_DEBOUNCE {
                return false;
            }
        }
        self.last_primary = Some(now);

        let hue = hue.unwrap_or_else(|| rand::thread_rng().gen_range(0.0..1.0));
        pool.allocate(PRIMARY_COUNT, origin, BurstKind::Primary, hue, viewport);
        self.pending.push(PendingSubExplosion {
            origin,
            fire_at: now + CHAIN_DELAY,
            hue,
        });
        true
    }

    /// Fire a secondary burst immediately.  Never debounced, never chains.
    pub fn trigger_secondary(
        &mut self,
        origin: [f32; 2],
        hue: f32,
        pool: &mut ParticlePool,
        viewport: &Viewport,
    ) {
        pool.allocate(SECONDARY_COUNT, origin, BurstKind::Secondary, hue, viewport);
    }

    /// Consume every pending entry that has come due.
    pub fn tick(&mut self, now: Instant, pool: &mut ParticlePool, viewport: &Viewport) {
        let mut rng = rand::thread_rng();

        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].fire_at > now {
                i += 1;
                continue;
            }
            let entry = self.pending.swap_remove(i);
            for _ in 0..CHAIN_BURSTS {
                let ox = rng.gen_range(-CHAIN_OFFSET..=CHAIN_OFFSET) * viewport.width;
                let oy = rng.gen_range(-CHAIN_OFFSET..=CHAIN_OFFSET) * viewport.height;
                self.trigger_secondary(
                    [entry.origin[0] + ox, entry.origin[1] + oy],
                    entry.hue,
                    pool,
                    viewport,
                );
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
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

    #[test]
    fn debounce_rejects_within_400ms() {
        let mut sched = ExplosionScheduler::new();
        let mut pool = ParticlePool::new(1000);
        let t0 = Instant::now();

        assert!(sched.trigger_primary(t0, [0.0, 0.0], Some(0.5), &mut pool, &vp()));
        assert!(!sched.trigger_primary(
            t0 + Duration::from_millis(399),
            [0.0, 0.0],
            Some(0.5),
            &mut pool,
            &vp()
        ));
        assert_eq!(pool.active_count(), PRIMARY_COUNT);
        assert_eq!(sched.pending_count(), 1);
    }

    #[test]
    fn debounce_accepts_after_400ms() {
        let mut sched = ExplosionScheduler::new();
        let mut pool = ParticlePool::new(1000);
        let t0 = Instant::now();

        assert!(sched.trigger_primary(t0, [0.0, 0.0], Some(0.5), &mut pool, &vp()));
        assert!(sched.trigger_primary(
            t0 + Duration::from_millis(401),
            [0.0, 0.0],
            Some(0.5),
            &mut pool,
            &vp()
        ));
        assert_eq!(pool.active_count(), PRIMARY_COUNT * 2);
        assert_eq!(sched.pending_count(), 2);
    }

    #[test]
    fn chain_fires_at_exactly_150ms() {
        let mut sched = ExplosionScheduler::new();
        let mut pool = ParticlePool::new(1000);
        let t0 = Instant::now();

        sched.trigger_primary(t0, [10.0, 20.0], Some(0.5), &mut pool, &vp());

        sched.tick(t0 + Duration::from_millis(149), &mut pool, &vp());
        assert_eq!(sched.pending_count(), 1);
        assert_eq!(pool.active_count(), PRIMARY_COUNT);

        sched.tick(t0 + Duration::from_millis(150), &mut pool, &vp());
        assert_eq!(sched.pending_count(), 0);
        assert_eq!(pool.active_count(), PRIMARY_COUNT + CHAIN_BURSTS * SECONDARY_COUNT);
    }

    #[test]
    fn chain_depth_is_one() {
        let mut sched = ExplosionScheduler::new();
        let mut pool = ParticlePool::new(1000);
        let t0 = Instant::now();

        sched.trigger_primary(t0, [0.0, 0.0], Some(0.5), &mut pool, &vp());
        sched.tick(t0 + Duration::from_millis(150), &mut pool, &vp());
        // The consumed entry must not have produced new pending entries.
        assert_eq!(sched.pending_count(), 0);
        sched.tick(t0 + Duration::from_millis(1000), &mut pool, &vp());
        assert_eq!(
            pool.active_count(),
            PRIMARY_COUNT + CHAIN_BURSTS * SECONDARY_COUNT
        );
    }

    #[test]
    fn chained_bursts_inherit_parent_hue() {
        let mut sched = ExplosionScheduler::new();
        let mut pool = ParticlePool::new(1000);
        let t0 = Instant::now();

        sched.trigger_primary(t0, [0.0, 0.0], Some(0.5), &mut pool, &vp());
        sched.tick(t0 + Duration::from_millis(150), &mut pool, &vp());

        // Every live particle was spawned from hue 0.5 ± jitter (0.025).
        for (i, h) in pool.hues().iter().enumerate() {
            if pool.life()[i] > 0.0 {
                assert!((h - 0.5).abs() <= 0.0251, "hue {} strayed from parent", h);
            }
        }
    }

    #[test]
    fn secondary_never_enqueues() {
        let mut sched = ExplosionScheduler::new();
        let mut pool = ParticlePool::new(1000);

        sched.trigger_secondary([0.0, 0.0], 0.3, &mut pool, &vp());
        assert_eq!(sched.pending_count(), 0);
        assert_eq!(pool.active_count(), SECONDARY_COUNT);
    }
}
