//! The per-frame orchestrator.
//!
//! [`ChaosManager`] owns every particle, the shared [`TrailStore`], the
//! [`SpeedColorMapper`] and the GPU sink. The host calls [`ChaosManager::tick`]
//! once per rendered frame; a tick runs in three passes:
//!
//! 1. integrate each particle `substeps` times at `dt / substeps`
//! 2. feed the fresh speeds to the auto-ranging color mapper
//! 3. color each particle's new position and append it to its trail
//!
//! then flushes one coalesced upload per touched buffer. Trails receive a
//! single point per tick however many substeps ran.
//!
//! Lifecycle changes are explicit: [`set_particle_count`](ChaosManager::set_particle_count),
//! [`set_trail_length`](ChaosManager::set_trail_length) and
//! [`set_max_total_trail_points`](ChaosManager::set_max_total_trail_points)
//! reallocate everything and restart; [`restart`](ChaosManager::restart)
//! reseeds particles in place.
//!
//! # Example
//!
//! ```ignore
//! use chaos_trails::prelude::*;
//!
//! let config = ChaosConfig::new().with_particle_count(500).with_substeps(4);
//! let mut chaos = ChaosManager::new(config, Attractor::default(), RecordingSink::new(true));
//! loop {
//!     chaos.tick();
//! }
//! ```

use bytemuck::{Pod, Zeroable};
use glam::{DVec3, Mat4, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::budget::{Capacity, CapacityBudget, ClampNotice};
use crate::color::{AutoRange, SpeedColorMapper};
use crate::config::ChaosConfig;
use crate::equation::EquationFn;
use crate::particle::ParticleState;
use crate::sink::{BufferId, DirtyRange, GpuBufferSink};
use crate::trail::TrailStore;

/// Per-particle model matrix for instanced rendering of particle heads.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub model: [[f32; 4]; 4],
}

impl InstanceTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            model: Mat4::from_translation(translation).to_cols_array_2d(),
        }
    }

    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.model[3][0], self.model[3][1], self.model[3][2])
    }
}

/// Drives the simulation of all particles.
pub struct ChaosManager<S: GpuBufferSink> {
    config: ChaosConfig,
    equation: Box<dyn EquationFn>,
    sink: S,
    particles: Vec<ParticleState>,
    trails: TrailStore,
    mapper: SpeedColorMapper,
    instances: Vec<InstanceTransform>,
    speeds: Vec<f64>,
    rng: StdRng,
    capacity: Capacity,
    instances_dirty: bool,
    frame: u64,
}

impl<S: GpuBufferSink> ChaosManager<S> {
    /// Allocate buffers for `config`, seed every particle and upload the initial state.
    pub fn new(config: ChaosConfig, equation: impl EquationFn + 'static, sink: S) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mapper = SpeedColorMapper::new(
            config.low_speed_color,
            config.high_speed_color,
            config.speed_contrast,
            config.auto_range,
        );

        let mut manager = Self {
            config,
            equation: Box::new(equation),
            sink,
            particles: Vec::new(),
            trails: TrailStore::new(),
            mapper,
            instances: Vec::new(),
            speeds: Vec::new(),
            rng,
            capacity: CapacityBudget {
                particle_count: 0,
                requested_trail_length: 0,
                max_total_trail_points: 0,
                supports_wide_index: false,
            }
            .resolve(),
            instances_dirty: false,
            frame: 0,
        };
        manager.reconfigure();
        manager
    }

    fn capacity_budget(&self) -> CapacityBudget {
        CapacityBudget {
            particle_count: self.config.particle_count,
            requested_trail_length: self.config.trail_length,
            max_total_trail_points: self.config.max_total_trail_points,
            supports_wide_index: self.sink.supports_wide_index(),
        }
    }

    /// Reallocate every buffer from the current config and restart.
    fn reconfigure(&mut self) {
        let n = self.config.particle_count;
        self.capacity = self.capacity_budget().resolve();
        if let Some(notice) = &self.capacity.clamp {
            log::warn!("{}", notice);
        }

        self.trails.configure(n, &self.capacity);
        self.particles = (0..n).map(ParticleState::new).collect();
        self.speeds = vec![0.0; n as usize];
        self.instances = vec![InstanceTransform::zeroed(); n as usize];

        let mut layout = self.trails.layout();
        layout.instance_bytes = std::mem::size_of_val(self.instances.as_slice()) as u64;
        self.sink.configure(&layout);

        log::info!(
            "configured {} particles with {}-slot trails ({} indices)",
            n,
            self.capacity.trail_length,
            self.capacity.index_format
        );
        self.restart();
    }

    /// Re-run the capacity calculation, e.g. after the sink's index support
    /// changed, and reconfigure if the result differs.
    pub fn refresh_capacity(&mut self) -> bool {
        let capacity = self.capacity_budget().resolve();
        if capacity.trail_length == self.capacity.trail_length && capacity.index_format == self.capacity.index_format {
            return false;
        }
        self.reconfigure();
        true
    }

    /// Reseed every particle at a random point of `[-1, 1]^3`, clear the
    /// speed range and reset every trail.
    pub fn restart(&mut self) {
        self.mapper.reset();
        let seed_color = self.mapper.classify(0.0).1;

        for ((particle, instance), speed) in self
            .particles
            .iter_mut()
            .zip(self.instances.iter_mut())
            .zip(self.speeds.iter_mut())
        {
            let start = DVec3::new(
                self.rng.gen_range(-1.0..=1.0),
                self.rng.gen_range(-1.0..=1.0),
                self.rng.gen_range(-1.0..=1.0),
            );
            particle.reset(start, &mut self.trails, seed_color);
            *instance = InstanceTransform::from_translation(start.as_vec3());
            *speed = 0.0;
        }
        self.instances_dirty = true;

        log::debug!("restarted {} particles", self.particles.len());
        self.flush();
    }

    /// Advance one frame using the configured `dt` and substeps.
    ///
    /// Does nothing while frozen. Returns whether the simulation advanced.
    pub fn tick(&mut self) -> bool {
        self.tick_with(self.config.dt, self.config.substeps)
    }

    /// Advance one frame of `dt`, split into `substeps` integration calls.
    pub fn tick_with(&mut self, dt: f64, substeps: u32) -> bool {
        if self.config.freeze {
            return false;
        }
        let substeps = substeps.max(1);
        let sub_dt = dt / substeps as f64;
        let equation = &*self.equation;

        for ((particle, instance), speed) in self
            .particles
            .iter_mut()
            .zip(self.instances.iter_mut())
            .zip(self.speeds.iter_mut())
        {
            for _ in 0..substeps {
                particle.step(equation, sub_dt);
            }
            // Diverged particles stay out of the range statistics.
            *speed = particle.sampled_speed().unwrap_or(f64::NAN);
            *instance = InstanceTransform::from_translation(particle.position().as_vec3());
        }

        self.mapper.observe(&self.speeds, &mut self.rng);

        for particle in &mut self.particles {
            let (_, color) = self.mapper.classify(particle.speed());
            particle.record(&mut self.trails, color);
        }

        self.instances_dirty = true;
        self.frame += 1;
        self.flush();
        true
    }

    /// Push every pending dirty range to the sink.
    fn flush(&mut self) {
        self.trails.flush(&mut self.sink);
        if self.instances_dirty {
            let bytes: &[u8] = bytemuck::cast_slice(&self.instances);
            if !bytes.is_empty() {
                let range = DirtyRange {
                    buffer: BufferId::Instances,
                    byte_offset: 0,
                    byte_length: bytes.len() as u64,
                };
                self.sink.mark_dirty(range, bytes);
            }
            self.instances_dirty = false;
        }
    }

    /// Apply a full config from the control surface, doing the least work
    /// needed: reallocation for size changes, restart for a new trigger value,
    /// plain updates otherwise.
    pub fn apply_config(&mut self, config: &ChaosConfig) {
        let resize = config.particle_count != self.config.particle_count
            || config.trail_length != self.config.trail_length
            || config.max_total_trail_points != self.config.max_total_trail_points;
        let restart = config.restart_trigger != self.config.restart_trigger;

        self.mapper.set_colors(config.low_speed_color, config.high_speed_color);
        self.mapper.set_contrast(config.speed_contrast);
        self.mapper.set_auto_range(config.auto_range);
        if config.seed != self.config.seed {
            if let Some(seed) = config.seed {
                self.rng = StdRng::seed_from_u64(seed);
            }
        }
        self.config = config.clone();
        self.config.substeps = self.config.substeps.max(1);

        if resize {
            self.reconfigure();
        } else if restart {
            self.restart();
        }
    }

    /// Change `N`. Reallocates all buffers and restarts.
    pub fn set_particle_count(&mut self, count: u32) {
        if count != self.config.particle_count {
            self.config.particle_count = count;
            self.reconfigure();
        }
    }

    /// Change the requested trail length. Reallocates all buffers and restarts.
    pub fn set_trail_length(&mut self, length: u32) {
        if length != self.config.trail_length {
            self.config.trail_length = length;
            self.reconfigure();
        }
    }

    /// Change the total point budget. Reallocates all buffers and restarts.
    pub fn set_max_total_trail_points(&mut self, points: u32) {
        if points != self.config.max_total_trail_points {
            self.config.max_total_trail_points = points;
            self.reconfigure();
        }
    }

    /// Restart whenever `trigger` differs from the last value seen.
    pub fn set_restart_trigger(&mut self, trigger: u64) {
        if trigger != self.config.restart_trigger {
            self.config.restart_trigger = trigger;
            self.restart();
        }
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.config.freeze = frozen;
    }

    pub fn toggle_freeze(&mut self) {
        self.config.freeze = !self.config.freeze;
    }

    pub fn is_frozen(&self) -> bool {
        self.config.freeze
    }

    pub fn set_dt(&mut self, dt: f64) {
        self.config.dt = dt;
    }

    pub fn set_substeps(&mut self, substeps: u32) {
        self.config.substeps = substeps.max(1);
    }

    /// Colors apply to points written from now on.
    pub fn set_colors(&mut self, low: Vec3, high: Vec3) {
        self.config.low_speed_color = low;
        self.config.high_speed_color = high;
        self.mapper.set_colors(low, high);
    }

    pub fn set_speed_contrast(&mut self, contrast: f64) {
        self.mapper.set_contrast(contrast);
        self.config.speed_contrast = self.mapper.contrast();
    }

    pub fn set_auto_range(&mut self, auto_range: AutoRange) {
        self.config.auto_range = auto_range;
        self.mapper.set_auto_range(auto_range);
    }

    /// Swap the flow. Particles continue from where they are.
    pub fn set_equation(&mut self, equation: impl EquationFn + 'static) {
        self.equation = Box::new(equation);
    }

    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }

    pub fn particles(&self) -> &[ParticleState] {
        &self.particles
    }

    pub fn trails(&self) -> &TrailStore {
        &self.trails
    }

    pub fn mapper(&self) -> &SpeedColorMapper {
        &self.mapper
    }

    pub fn instances(&self) -> &[InstanceTransform] {
        &self.instances
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Advisory from the last reconfiguration, if the trail length was clamped.
    pub fn clamp_notice(&self) -> Option<&ClampNotice> {
        self.capacity.clamp.as_ref()
    }

    pub fn effective_trail_length(&self) -> u32 {
        self.capacity.trail_length
    }

    /// Ticks advanced since creation.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}
