//! Headless runner.
//!
//! Usage: `chaos-trails [attractor] [frames] [config.json]`
//!
//! Runs the chosen attractor for a number of frames, uploading into a wgpu
//! device when one is available, and logs the speed range and tick cost.
//! Set `RUST_LOG=debug` to see every auto-range resample.

use std::time::{Duration, Instant};

use chaos_trails::prelude::*;
use chaos_trails::ConfigError;

const REPORT_EVERY: u64 = 120;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), ConfigError> {
    let mut args = std::env::args().skip(1);
    let attractor: Attractor = match args.next() {
        Some(name) => name.parse()?,
        None => Attractor::default(),
    };
    let frames: u64 = match args.next() {
        Some(s) => s.parse().map_err(|_| ConfigError::InvalidValue {
            field: "frames",
            reason: format!("expected a frame count, got '{}'", s),
        })?,
        None => 600,
    };
    let config = match args.next() {
        Some(path) => ChaosConfig::load(path)?,
        None => ChaosConfig::default(),
    };

    let sink: Box<dyn GpuBufferSink> = match WgpuSink::request_headless() {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            log::warn!("{}; continuing without GPU uploads", e);
            Box::new(RecordingSink::new(true))
        }
    };

    log::info!(
        "running {} ({}D, display scale {}) for {} frames",
        attractor,
        attractor.dimensions(),
        attractor.local_scale(),
        frames
    );

    let mut chaos = ChaosManager::new(config, attractor, sink);
    if let Some(notice) = chaos.clamp_notice() {
        log::info!("{}", notice);
    }

    let mut busy = Duration::ZERO;
    for frame in 1..=frames {
        let start = Instant::now();
        chaos.tick();
        busy += start.elapsed();

        if frame % REPORT_EVERY == 0 || frame == frames {
            let (lo, hi) = chaos.mapper().range();
            log::info!(
                "frame {:>5}: speed range [{:.3}, {:.3}], avg tick {:.3} ms",
                frame,
                lo,
                hi,
                busy.as_secs_f64() * 1000.0 / frame as f64
            );
        }
    }

    let diverged = chaos
        .particles()
        .iter()
        .filter(|p| !p.position().is_finite())
        .count();
    if diverged > 0 {
        log::warn!("{} of {} particles diverged", diverged, chaos.particles().len());
    }
    Ok(())
}
