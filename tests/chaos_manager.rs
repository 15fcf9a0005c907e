//! Integration tests for the orchestrator running real attractors.

use chaos_trails::prelude::*;
use chaos_trails::{BufferId, ClampReason, IndexFormat};

fn seeded(n: u32, len: u32) -> ChaosConfig {
    ChaosConfig::new()
        .with_particle_count(n)
        .with_trail_length(len)
        .with_seed(1234)
}

// ============================================================================
// Attractors
// ============================================================================

#[test]
fn test_every_attractor_keeps_a_valid_range() {
    for name in Attractor::NAMES {
        let attractor: Attractor = name.parse().unwrap();
        let config = seeded(20, 30).with_dt(0.005).with_substeps(2);
        let mut chaos = ChaosManager::new(config, attractor, RecordingSink::new(true));
        for _ in 0..200 {
            chaos.tick();
        }
        let (lo, hi) = chaos.mapper().range();
        assert!(lo.is_finite() && hi.is_finite() && hi > lo, "{name}");
        assert!(chaos.mapper().is_initialized(), "{name}");
    }
}

#[test]
fn test_dissipative_attractors_stay_bounded() {
    for name in ["Lorenz", "Aizawa", "Halvorsen", "Rossler", "Thomas"] {
        let attractor: Attractor = name.parse().unwrap();
        let mut chaos = ChaosManager::new(seeded(20, 30), attractor, RecordingSink::new(true));
        for _ in 0..200 {
            chaos.tick();
        }
        for particle in chaos.particles() {
            assert!(particle.position().is_finite(), "{name} diverged");
            assert!(particle.position().length() < 1e3, "{name} escaped");
        }
    }
}

#[test]
fn test_lorenz_range_adapts_beyond_default() {
    let mut chaos = ChaosManager::new(seeded(200, 20), Attractor::default(), RecordingSink::new(true));
    for _ in 0..50 {
        chaos.tick();
    }
    let (_, hi) = chaos.mapper().range();
    // Lorenz moves at tens of units per second, far beyond the [0, 1] start range.
    assert!(hi > 1.0, "hi = {hi}");
}

#[test]
fn test_hyper_rossler_uses_fourth_variable() {
    let attractor: Attractor = "HyperRossler".parse().unwrap();
    let mut chaos = ChaosManager::new(seeded(10, 10), attractor, RecordingSink::new(true));
    for _ in 0..20 {
        chaos.tick();
    }
    assert!(chaos.particles().iter().any(|p| p.extra() != 0.0));
}

// ============================================================================
// Colors and instances
// ============================================================================

#[test]
fn test_trail_colors_stay_on_gradient() {
    let low = Vec3::new(0.0, 0.2, 1.0);
    let high = Vec3::new(1.0, 0.6, 0.0);
    let config = seeded(30, 12).with_colors(low, high);
    let mut chaos = ChaosManager::new(config, Attractor::default(), RecordingSink::new(true));
    for _ in 0..40 {
        chaos.tick();
    }

    let trails = chaos.trails();
    for p in 0..30 {
        for slot in 0..12 {
            let c = trails.color(p, slot).unwrap();
            let lo = low.min(high) - Vec3::splat(1e-5);
            let hi = low.max(high) + Vec3::splat(1e-5);
            assert!(c.cmpge(lo).all() && c.cmple(hi).all(), "{c:?}");
        }
    }
}

#[test]
fn test_instances_follow_particles() {
    let mut chaos = ChaosManager::new(seeded(16, 8), Attractor::default(), RecordingSink::new(true));
    for _ in 0..10 {
        chaos.tick();
    }
    for (particle, instance) in chaos.particles().iter().zip(chaos.instances()) {
        assert_eq!(instance.translation(), particle.position().as_vec3());
    }
}

// ============================================================================
// Degenerate numerics and configuration
// ============================================================================

#[test]
fn test_divergence_does_not_poison_range() {
    let explode = |x: f64, y: f64, z: f64, dt: f64, _w: f64| Delta::new(x * 1e300 * dt, y, z);
    let mut chaos = ChaosManager::new(seeded(50, 8), explode, RecordingSink::new(true));
    for _ in 0..30 {
        chaos.tick();
    }
    assert!(chaos.particles().iter().any(|p| !p.position().is_finite()));
    let (lo, hi) = chaos.mapper().range();
    assert!(lo.is_finite() && hi.is_finite());
    for particle in chaos.particles() {
        assert!(particle.speed().is_finite());
    }
}

#[test]
fn test_index_width_clamp_end_to_end() {
    let config = seeded(1000, 150);
    let chaos = ChaosManager::new(config, Attractor::default(), RecordingSink::new(false));
    let notice = chaos.clamp_notice().unwrap();
    assert_eq!(notice.reason, ClampReason::IndexWidth);
    assert_eq!(chaos.effective_trail_length(), 65);
    assert_eq!(chaos.trails().index_format(), IndexFormat::U16);
    assert!(chaos.trails().vertex_count() <= 65_535);
}

#[test]
fn test_wide_index_when_supported() {
    let chaos = ChaosManager::new(seeded(1000, 150), Attractor::default(), RecordingSink::new(true));
    assert!(chaos.clamp_notice().is_none());
    assert_eq!(chaos.trails().index_format(), IndexFormat::U32);
    assert_eq!(chaos.sink().layout().unwrap().index_bytes, 1000 * 150 * 2 * 4);
}

#[test]
fn test_point_budget_clamp_end_to_end() {
    let config = seeded(100, 500).with_max_total_trail_points(10_000);
    let chaos = ChaosManager::new(config, Attractor::default(), RecordingSink::new(true));
    assert_eq!(chaos.effective_trail_length(), 100);
    assert_eq!(chaos.clamp_notice().unwrap().reason, ClampReason::PointBudget);
}

#[test]
fn test_config_from_json_drives_manager() {
    let config = ChaosConfig::from_json(
        r##"{
            "particle_count": 8,
            "trail_length": 16,
            "substeps": 3,
            "low_speed_color": "#000000",
            "high_speed_color": "#ffffff",
            "seed": 77
        }"##,
    )
    .unwrap();
    let mut chaos = ChaosManager::new(config, Attractor::default(), RecordingSink::new(true));
    chaos.tick();
    assert_eq!(chaos.particles().len(), 8);
    assert_eq!(chaos.trails().trail_length(), 16);
    assert_eq!(chaos.config().substeps, 3);
}

#[test]
fn test_upload_volume_per_tick_is_bounded() {
    let mut chaos = ChaosManager::new(seeded(100, 50), Attractor::default(), RecordingSink::new(true));
    chaos.sink_mut().take_uploads();
    chaos.tick();

    let uploads = chaos.sink_mut().take_uploads();
    let positions = uploads.iter().find(|r| r.buffer == BufferId::Positions).unwrap();
    // One slot for every particle: N * 12 bytes, not the whole trail buffer.
    assert_eq!(positions.byte_length, 100 * 12);
}
