//! The flow contract every attractor implements.
//!
//! An equation maps the current state `(x, y, z, w)` and a timestep `dt` to a
//! per-step *delta*. Deltas are already scaled by `dt`: an implementation of the
//! Lorenz system returns `σ(y - x) * dt`, not `σ(y - x)`. The integrator relies on
//! this convention so that substepping is nothing more than calling the equation
//! repeatedly with `dt / substeps`.
//!
//! # Example
//!
//! ```ignore
//! use chaos_trails::{Delta, EquationFn};
//!
//! // Closures with the right signature are equations.
//! let drift = |_x: f64, _y: f64, _z: f64, dt: f64, _w: f64| Delta::new(dt, 0.0, 0.0);
//! let d = drift.delta(0.0, 0.0, 0.0, 0.01, 0.0);
//! assert_eq!(d.dx, 0.01);
//! ```

use glam::DVec3;

/// One integration step worth of change, pre-scaled by `dt`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Delta {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    /// Change of the fourth state variable. `None` for 3-D systems.
    pub dw: Option<f64>,
}

impl Delta {
    /// A 3-D delta.
    pub const fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz, dw: None }
    }

    /// A 4-D delta, for hyperchaotic systems carrying an extra variable.
    pub const fn with_w(dx: f64, dy: f64, dz: f64, dw: f64) -> Self {
        Self {
            dx,
            dy,
            dz,
            dw: Some(dw),
        }
    }

    /// The spatial part as a vector.
    #[inline]
    pub fn xyz(&self) -> DVec3 {
        DVec3::new(self.dx, self.dy, self.dz)
    }
}

/// A pure, deterministic ODE right-hand side returning dt-scaled deltas.
///
/// `w` is the fourth state variable; 3-D systems ignore it.
pub trait EquationFn {
    fn delta(&self, x: f64, y: f64, z: f64, dt: f64, w: f64) -> Delta;
}

impl<F> EquationFn for F
where
    F: Fn(f64, f64, f64, f64, f64) -> Delta,
{
    #[inline]
    fn delta(&self, x: f64, y: f64, z: f64, dt: f64, w: f64) -> Delta {
        self(x, y, z, dt, w)
    }
}
