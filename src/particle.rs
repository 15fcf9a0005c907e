//! Per-particle integration state.
//!
//! A particle holds only scalars: where it is, the optional fourth state
//! variable, the speed measured on its last step, and the ring slot it writes
//! next. Its trail lives in the shared [`TrailStore`] and is addressed by the
//! particle's index.

use glam::{DVec3, Vec3};

use crate::equation::EquationFn;
use crate::trail::TrailStore;

/// Integration state of one particle.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    index: u32,
    position: DVec3,
    extra: f64,
    speed: f64,
    speed_finite: bool,
    write_cursor: u32,
    trail_length: u32,
}

impl ParticleState {
    /// A particle at the origin with no trail. Call [`reset`](Self::reset) before stepping.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            position: DVec3::ZERO,
            extra: 0.0,
            speed: 0.0,
            speed_finite: true,
            write_cursor: 0,
            trail_length: 0,
        }
    }

    /// Place the particle at `initial` and restart its trail.
    ///
    /// Every slot is seeded with `initial` (colored `color`) and the cursor
    /// points at slot 1, so slot 0 counts as the newest point before the
    /// first step.
    pub fn reset(&mut self, initial: DVec3, trails: &mut TrailStore, color: Vec3) {
        self.position = initial;
        self.extra = 0.0;
        self.speed = 0.0;
        self.speed_finite = true;
        self.trail_length = trails.trail_length();
        self.write_cursor = if self.trail_length > 1 { 1 } else { 0 };

        trails.seed(self.index, initial.as_vec3(), color);
        if self.trail_length > 0 {
            trails.mark_break(self.index, self.write_cursor);
        }
    }

    /// Advance one integration step of `dt` without touching the trail.
    ///
    /// `speed` becomes `|delta| / dt`, or zero when `dt` is zero or the result
    /// is not finite. Non-finite positions are kept so divergence stays visible.
    /// With a zero-length trail the particle is inert.
    pub fn step<E: EquationFn + ?Sized>(&mut self, equation: &E, dt: f64) -> DVec3 {
        if self.trail_length == 0 {
            return self.position;
        }

        let p = self.position;
        let delta = equation.delta(p.x, p.y, p.z, dt, self.extra);
        let d = delta.xyz();
        self.position = p + d;
        if let Some(dw) = delta.dw {
            self.extra += dw;
        }

        let speed = if dt == 0.0 { 0.0 } else { d.length() / dt.abs() };
        self.speed_finite = speed.is_finite();
        self.speed = if self.speed_finite { speed } else { 0.0 };
        self.position
    }

    /// Append the current position to the trail and advance the ring cursor.
    pub fn record(&mut self, trails: &mut TrailStore, color: Vec3) {
        if self.trail_length == 0 {
            return;
        }
        trails.write(self.index, self.write_cursor, self.position.as_vec3(), color);
        self.write_cursor = (self.write_cursor + 1) % self.trail_length;
        trails.mark_break(self.index, self.write_cursor);
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// Fourth state variable of 4-D systems, zero otherwise.
    #[inline]
    pub fn extra(&self) -> f64 {
        self.extra
    }

    /// Speed used for coloring. Zero after a non-finite step.
    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Speed of the last step for range statistics, `None` if it was not finite.
    #[inline]
    pub fn sampled_speed(&self) -> Option<f64> {
        self.speed_finite.then_some(self.speed)
    }

    /// Slot the next [`record`](Self::record) writes to.
    #[inline]
    pub fn write_cursor(&self) -> u32 {
        self.write_cursor
    }

    /// Slot holding the most recent trail point.
    pub fn newest_slot(&self) -> u32 {
        if self.trail_length == 0 {
            0
        } else {
            (self.write_cursor + self.trail_length - 1) % self.trail_length
        }
    }

    #[inline]
    pub fn trail_length(&self) -> u32 {
        self.trail_length
    }
}
