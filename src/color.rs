//! Speed to color mapping with an auto-ranging scale.
//!
//! Chaotic flows have wildly different speed distributions (Lorenz moves two
//! orders of magnitude faster than Thomas), so the color scale is not fixed.
//! Every few frames a bounded random sample of particle speeds is sorted and
//! its lower/upper percentiles are blended into the running range:
//!
//! ```text
//! range ← range + α · (sample_range − range)
//! ```
//!
//! A speed is then normalized against the range, shaped with a contrast
//! curve `t' = t^γ` where `γ = 2^((contrast − 0.5) · 4)`, and used to blend
//! between the low- and high-speed colors.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Smallest allowed width of the speed range.
pub const RANGE_EPSILON: f64 = 1e-6;

/// Auto-ranging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoRange {
    /// Percentile mapped to the low-speed color.
    pub lower_percentile: f64,
    /// Percentile mapped to the high-speed color.
    pub upper_percentile: f64,
    /// Blend factor `α` applied to each new measurement, in `(0, 1]`.
    pub smoothing: f64,
    /// Frames between resamples.
    pub resample_interval: u32,
    /// Upper bound on speeds sorted per resample.
    pub max_samples: usize,
}

impl Default for AutoRange {
    fn default() -> Self {
        Self {
            lower_percentile: 0.1,
            upper_percentile: 0.9,
            smoothing: 0.15,
            resample_interval: 10,
            max_samples: 2000,
        }
    }
}

/// Converts particle speeds into trail colors.
#[derive(Debug, Clone)]
pub struct SpeedColorMapper {
    low: Vec3,
    high: Vec3,
    contrast: f64,
    gamma: f64,
    auto: AutoRange,
    range_min: f64,
    range_max: f64,
    initialized: bool,
    frames: u64,
    sample: Vec<f64>,
}

impl SpeedColorMapper {
    pub fn new(low: Vec3, high: Vec3, contrast: f64, auto: AutoRange) -> Self {
        let mut mapper = Self {
            low,
            high,
            contrast: 0.5,
            gamma: 1.0,
            auto,
            range_min: 0.0,
            range_max: 1.0,
            initialized: false,
            frames: 0,
            sample: Vec::with_capacity(auto.max_samples),
        };
        mapper.set_contrast(contrast);
        mapper
    }

    pub fn set_colors(&mut self, low: Vec3, high: Vec3) {
        self.low = low;
        self.high = high;
    }

    /// Set the contrast in `[0, 1]`; 0.5 is linear.
    pub fn set_contrast(&mut self, contrast: f64) {
        let contrast = if contrast.is_finite() { contrast.clamp(0.0, 1.0) } else { 0.5 };
        self.contrast = contrast;
        self.gamma = 2f64.powf((contrast - 0.5) * 4.0);
    }

    pub fn set_auto_range(&mut self, auto: AutoRange) {
        self.auto = auto;
    }

    pub fn low_color(&self) -> Vec3 {
        self.low
    }

    pub fn high_color(&self) -> Vec3 {
        self.high
    }

    pub fn contrast(&self) -> f64 {
        self.contrast
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn auto_range(&self) -> &AutoRange {
        &self.auto
    }

    /// Current `(min, max)` speed range.
    pub fn range(&self) -> (f64, f64) {
        (self.range_min, self.range_max)
    }

    /// Whether a measurement has been taken since the last reset.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Forget the measured range and fall back to `[0, 1]`.
    pub fn reset(&mut self) {
        self.range_min = 0.0;
        self.range_max = 1.0;
        self.initialized = false;
        self.frames = 0;
    }

    /// Feed one frame of speeds. Resamples immediately while uninitialized,
    /// then every `resample_interval` frames. Returns whether the range moved.
    pub fn observe<R: Rng + ?Sized>(&mut self, speeds: &[f64], rng: &mut R) -> bool {
        self.frames += 1;
        let interval = self.auto.resample_interval.max(1) as u64;
        if self.initialized && self.frames % interval != 0 {
            return false;
        }
        self.resample(speeds, rng)
    }

    /// Measure the percentile range of a bounded sample of `speeds` and blend it in.
    ///
    /// Non-finite speeds are skipped. Fewer than two usable samples leave the
    /// range untouched.
    pub fn resample<R: Rng + ?Sized>(&mut self, speeds: &[f64], rng: &mut R) -> bool {
        let max_samples = self.auto.max_samples.max(2);
        self.sample.clear();
        if speeds.len() <= max_samples {
            self.sample.extend(speeds.iter().copied().filter(|s| s.is_finite()));
        } else {
            let picked = rand::seq::index::sample(rng, speeds.len(), max_samples);
            self.sample
                .extend(picked.iter().map(|i| speeds[i]).filter(|s| s.is_finite()));
        }
        if self.sample.len() < 2 {
            return false;
        }

        self.sample.sort_unstable_by(f64::total_cmp);
        let lo = percentile(&self.sample, self.auto.lower_percentile);
        let hi = percentile(&self.sample, self.auto.upper_percentile);

        if self.initialized {
            let alpha = self.auto.smoothing.clamp(0.0, 1.0);
            self.range_min += alpha * (lo - self.range_min);
            self.range_max += alpha * (hi - self.range_max);
        } else {
            self.range_min = lo;
            self.range_max = hi;
            self.initialized = true;
        }
        // Relative floor keeps max > min where 1e-6 is below one ulp.
        let floor = RANGE_EPSILON.max(self.range_min.abs() * 1e-9);
        if !(self.range_max - self.range_min >= floor) {
            self.range_max = self.range_min + floor;
        }

        log::debug!(
            "speed range resampled from {} particles: [{:.4}, {:.4}]",
            self.sample.len(),
            self.range_min,
            self.range_max
        );
        true
    }

    /// Contrast-shaped position of `speed` within the range, in `[0, 1]`.
    pub fn normalize(&self, speed: f64) -> f64 {
        let speed = if speed.is_finite() { speed } else { 0.0 };
        let t = ((speed - self.range_min) / (self.range_max - self.range_min)).clamp(0.0, 1.0);
        t.powf(self.gamma)
    }

    /// Map a speed to its normalized value and color.
    #[inline]
    pub fn classify(&self, speed: f64) -> (f64, Vec3) {
        let t = self.normalize(speed);
        (t, self.low.lerp(self.high, t as f32))
    }
}

impl Default for SpeedColorMapper {
    fn default() -> Self {
        Self::new(Vec3::Z, Vec3::X, 0.5, AutoRange::default())
    }
}

/// Linearly interpolated percentile of an ascending, non-empty slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let last = sorted.len() - 1;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let i = pos.floor() as usize;
    let j = (i + 1).min(last);
    let frac = pos - i as f64;
    sorted[i] + (sorted[j] - sorted[i]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn mapper() -> SpeedColorMapper {
        SpeedColorMapper::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), 0.5, AutoRange::default())
    }

    #[test]
    fn test_default_range_before_sampling() {
        let m = mapper();
        assert_eq!(m.range(), (0.0, 1.0));
        assert!(!m.is_initialized());
        assert_eq!(m.classify(0.0).1, m.low_color());
        assert_eq!(m.classify(1.0).1, m.high_color());
        assert_eq!(m.classify(25.0).0, 1.0);
        assert_eq!(m.classify(-3.0).0, 0.0);
    }

    #[test]
    fn test_gamma_from_contrast() {
        let mut m = mapper();
        assert_eq!(m.gamma(), 1.0);
        m.set_contrast(1.0);
        assert!((m.gamma() - 4.0).abs() < 1e-12);
        m.set_contrast(0.0);
        assert!((m.gamma() - 0.25).abs() < 1e-12);
        m.set_contrast(7.0);
        assert_eq!(m.contrast(), 1.0);
        assert!((m.normalize(0.5) - 0.0625).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_interpolates() {
        let data: Vec<f64> = (0..=100).map(f64::from).collect();
        assert_eq!(percentile(&data, 0.1), 10.0);
        assert_eq!(percentile(&data, 0.9), 90.0);
        assert_eq!(percentile(&[1.0, 3.0], 0.5), 2.0);
        assert_eq!(percentile(&[4.0], 0.9), 4.0);
    }

    #[test]
    fn test_first_sample_is_adopted_then_smoothed() {
        let mut m = mapper();
        let mut rng = StdRng::seed_from_u64(1);
        let speeds: Vec<f64> = (0..=100).map(f64::from).collect();
        assert!(m.observe(&speeds, &mut rng));
        assert_eq!(m.range(), (10.0, 90.0));

        let doubled: Vec<f64> = speeds.iter().map(|s| s * 2.0).collect();
        for _ in 2..10 {
            assert!(!m.observe(&doubled, &mut rng));
        }
        assert_eq!(m.range(), (10.0, 90.0));

        assert!(m.observe(&doubled, &mut rng));
        let (lo, hi) = m.range();
        assert!((lo - 11.5).abs() < 1e-9);
        assert!((hi - 103.5).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_samples_keep_range() {
        let mut m = mapper();
        let mut rng = StdRng::seed_from_u64(2);
        assert!(!m.observe(&[], &mut rng));
        assert!(!m.observe(&[3.0], &mut rng));
        assert!(!m.observe(&[f64::NAN, 2.0, f64::INFINITY], &mut rng));
        assert_eq!(m.range(), (0.0, 1.0));
        assert!(!m.is_initialized());
    }

    #[test]
    fn test_non_finite_speeds_excluded() {
        let mut m = mapper();
        let mut rng = StdRng::seed_from_u64(3);
        let mut speeds: Vec<f64> = (0..=100).map(f64::from).collect();
        speeds.extend([f64::NAN, f64::INFINITY, f64::NEG_INFINITY]);
        m.observe(&speeds, &mut rng);
        assert_eq!(m.range(), (10.0, 90.0));
        assert_eq!(m.classify(f64::NAN).0, 0.0);
    }

    #[test]
    fn test_constant_speeds_enforce_epsilon() {
        let mut m = mapper();
        let mut rng = StdRng::seed_from_u64(4);
        let speeds = vec![5.0; 10_000];
        m.observe(&speeds, &mut rng);
        let (lo, hi) = m.range();
        assert_eq!(lo, 5.0);
        assert!(hi - lo >= RANGE_EPSILON * 0.999);
        assert!(m.normalize(5.0).is_finite());
    }

    #[test]
    fn test_huge_constant_speeds_keep_range_open() {
        let mut m = mapper();
        let mut rng = StdRng::seed_from_u64(6);
        m.observe(&[1e20; 8], &mut rng);
        let (lo, hi) = m.range();
        assert!(hi > lo && hi.is_finite());
        assert!(m.normalize(1e20).is_finite());
    }

    #[test]
    fn test_large_population_is_sampled() {
        let mut m = mapper();
        let mut rng = StdRng::seed_from_u64(5);
        let speeds: Vec<f64> = (0..50_000).map(|i| (i % 1000) as f64).collect();
        m.observe(&speeds, &mut rng);
        let (lo, hi) = m.range();
        assert!((lo - 100.0).abs() < 30.0, "lo = {lo}");
        assert!((hi - 900.0).abs() < 30.0, "hi = {hi}");
    }

    #[test]
    fn test_classify_is_monotone() {
        let mut rng = StdRng::seed_from_u64(6);
        for contrast in [0.0, 0.3, 0.5, 0.8, 1.0] {
            let mut m = mapper();
            m.set_contrast(contrast);
            let speeds: Vec<f64> = (0..500).map(|_| rng.gen_range(0.0..40.0)).collect();
            m.observe(&speeds, &mut rng);

            let mut probes: Vec<f64> = (0..1000).map(|_| rng.gen_range(-10.0..60.0)).collect();
            probes.sort_by(f64::total_cmp);
            let ts: Vec<f64> = probes.iter().map(|&s| m.classify(s).0).collect();
            assert!(ts.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_reset_forgets_range() {
        let mut m = mapper();
        let mut rng = StdRng::seed_from_u64(7);
        m.observe(&[1.0, 2.0, 3.0, 4.0], &mut rng);
        assert!(m.is_initialized());
        m.reset();
        assert!(!m.is_initialized());
        assert_eq!(m.range(), (0.0, 1.0));
    }
}
