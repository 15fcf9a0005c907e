//! # chaos-trails
//!
//! Particle trails for chaotic attractors, ready for GPU line rendering.
//!
//! Thousands of particles follow an ODE flow (Lorenz, Aizawa, Halvorsen, ...),
//! each dragging a fixed-length trail colored by its local speed. The crate
//! handles the per-frame CPU side: integration with substeps, one shared
//! ring-buffer trail store for every particle, an auto-ranging speed palette,
//! and line-list index maintenance so wrapped trails never draw a stray
//! segment from newest back to oldest. Graphics code only receives coalesced
//! dirty byte ranges through a [`GpuBufferSink`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use chaos_trails::prelude::*;
//!
//! let config = ChaosConfig::new()
//!     .with_particle_count(500)
//!     .with_trail_length(200)
//!     .with_substeps(4);
//!
//! let mut chaos = ChaosManager::new(config, Attractor::default(), RecordingSink::new(true));
//!
//! // Once per rendered frame:
//! chaos.tick();
//! ```
//!
//! ## Core Concepts
//!
//! ### Equations
//!
//! An [`EquationFn`] returns per-step deltas already multiplied by `dt`.
//! Closures `Fn(x, y, z, dt, w) -> Delta` qualify, and [`Attractor`] ships the
//! classic systems with their usual coefficients.
//!
//! ### Trails
//!
//! [`TrailStore`] keeps positions, colors and line indices for all particles in
//! three flat arrays. Slot `k` of particle `p` is vertex `k * N + p`, so a
//! frame's writes form one contiguous span. A degenerate index pair (the
//! *break*) sits on the edge leaving each particle's newest slot.
//!
//! ### Speed colors
//!
//! [`SpeedColorMapper`] re-estimates the 10th/90th speed percentiles from a
//! bounded random sample every few frames and eases toward them, so the
//! palette adapts to whichever attractor is running.
//!
//! ### Capacity
//!
//! [`CapacityBudget`] shortens trails when `N * trail_length` would exceed the
//! point budget or the 16-bit index range on GPUs without 32-bit indices, and
//! reports it with a [`ClampNotice`] rather than an error.

pub mod attractors;
pub mod budget;
mod chaos;
pub mod color;
pub mod config;
pub mod equation;
pub mod error;
mod gpu;
mod particle;
pub mod sink;
mod trail;

pub use attractors::Attractor;
pub use budget::{Capacity, CapacityBudget, ClampNotice, ClampReason, IndexFormat};
pub use chaos::{ChaosManager, InstanceTransform};
pub use color::{AutoRange, SpeedColorMapper};
pub use config::ChaosConfig;
pub use equation::{Delta, EquationFn};
pub use error::{ConfigError, GpuError};
pub use glam::{DVec3, Vec3};
pub use gpu::{adapter_supports_wide_index, WgpuSink};
pub use particle::ParticleState;
pub use sink::{BufferId, BufferLayout, DirtyRange, GpuBufferSink, RecordingSink};
pub use trail::{LineIndices, TrailStore};

/// Convenient re-exports for common usage.
///
/// # Usage
///
/// ```ignore
/// use chaos_trails::prelude::*;
/// ```
pub mod prelude {
    pub use crate::attractors::Attractor;
    pub use crate::chaos::{ChaosManager, InstanceTransform};
    pub use crate::color::AutoRange;
    pub use crate::config::ChaosConfig;
    pub use crate::equation::{Delta, EquationFn};
    pub use crate::gpu::WgpuSink;
    pub use crate::sink::{GpuBufferSink, RecordingSink};
    pub use crate::{DVec3, Vec3};
}
