//! A catalogue of chaotic flows.
//!
//! Each variant carries its own coefficients; [`Attractor::default_for`] and the
//! `Default` impls of the variants give the classic parameter sets. All of them
//! implement [`EquationFn`] and can be handed straight to a
//! [`ChaosManager`](crate::ChaosManager).
//!
//! | Attractor | Dimensions | Display scale |
//! |-----------|-----------:|--------------:|
//! | [`Attractor::Lorenz`] | 3 | 1 |
//! | [`Attractor::Aizawa`] | 3 | 10 |
//! | [`Attractor::Halvorsen`] | 3 | 1 |
//! | [`Attractor::Rossler`] | 3 | 2 |
//! | [`Attractor::Thomas`] | 3 | 5 |
//! | [`Attractor::ChenLee`] | 3 | 3 |
//! | [`Attractor::Dadras`] | 3 | 2 |
//! | [`Attractor::Sprott`] | 3 | 4 |
//! | [`Attractor::Arneodo`] | 3 | 3 |
//! | [`Attractor::Bouali`] | 3 | 10 |
//! | [`Attractor::BurkeShaw`] | 3 | 2 |
//! | [`Attractor::Chua`] | 3 | 7 |
//! | [`Attractor::NewtonLeipnik`] | 3 | 10 |
//! | [`Attractor::NoseHoover`] | 3 | 5 |
//! | [`Attractor::RabinovichFabrikant`] | 3 | 1 |
//! | [`Attractor::HyperRossler`] | 4 | 1 |
//!
//! # Example
//!
//! ```ignore
//! let lorenz: Attractor = "lorenz".parse()?;
//! let manager = ChaosManager::new(ChaosConfig::default(), lorenz, RecordingSink::new(true));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::equation::{Delta, EquationFn};
use crate::error::ConfigError;

/// A chaotic ODE system with its coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Attractor {
    /// Lorenz system. Evaluated around `(x + 5, z + 25)` so the butterfly sits
    /// near the origin.
    Lorenz { a: f64, b: f64, c: f64 },
    /// Aizawa torus-like attractor.
    Aizawa {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        f: f64,
    },
    /// Halvorsen cyclically symmetric attractor.
    Halvorsen { a: f64 },
    /// Rössler band.
    Rossler { a: f64, b: f64, c: f64 },
    /// Thomas' cyclically symmetric attractor.
    Thomas { b: f64 },
    /// Chen–Lee system.
    ChenLee { a: f64, b: f64, c: f64 },
    /// Dadras system.
    Dadras { a: f64, b: f64, c: f64, d: f64, e: f64 },
    /// Sprott case with a single parameter.
    Sprott { a: f64 },
    Arneodo { a: f64, b: f64, c: f64 },
    Bouali { a: f64, b: f64, c: f64 },
    BurkeShaw { a: f64, b: f64 },
    /// Chua's circuit with a piecewise-linear diode, time-scaled by `k`.
    Chua {
        a: f64,
        b: f64,
        k: f64,
        p: f64,
        q: f64,
        r: f64,
    },
    NewtonLeipnik { a: f64, b: f64 },
    /// Nosé–Hoover thermostat, a conservative flow.
    NoseHoover { a: f64 },
    RabinovichFabrikant { alpha: f64, gamma: f64 },
    /// Hyperchaotic Rössler; drives the fourth state variable.
    HyperRossler { a: f64, b: f64, c: f64, d: f64, e: f64 },
}

impl Attractor {
    /// Every attractor name accepted by [`FromStr`].
    pub const NAMES: [&'static str; 16] = [
        "Lorenz",
        "Aizawa",
        "Halvorsen",
        "Rossler",
        "Thomas",
        "ChenLee",
        "Dadras",
        "Sprott",
        "Arneodo",
        "Bouali",
        "BurkeShaw",
        "Chua",
        "NewtonLeipnik",
        "NoseHoover",
        "RabinovichFabrikant",
        "HyperRossler",
    ];

    /// The classic coefficient set for the named attractor.
    pub fn default_for(name: &str) -> Option<Self> {
        let attractor = match name.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "lorenz" => Attractor::Lorenz {
                a: 10.0,
                b: 28.0,
                c: 8.0 / 3.0,
            },
            "aizawa" => Attractor::Aizawa {
                a: 0.95,
                b: 0.7,
                c: 0.6,
                d: 3.5,
                e: 0.25,
                f: 0.1,
            },
            "halvorsen" => Attractor::Halvorsen { a: 1.5 },
            "rossler" | "rössler" => Attractor::Rossler {
                a: 0.2,
                b: 0.2,
                c: 5.7,
            },
            "thomas" => Attractor::Thomas { b: 0.19 },
            "chenlee" => Attractor::ChenLee {
                a: 0.9,
                b: -3.0,
                c: -0.38,
            },
            "dadras" => Attractor::Dadras {
                a: 3.0,
                b: 2.7,
                c: 1.7,
                d: 2.0,
                e: 9.0,
            },
            "sprott" => Attractor::Sprott { a: 1.0 },
            "arneodo" => Attractor::Arneodo {
                a: 5.5,
                b: 3.5,
                c: 1.0,
            },
            "bouali" => Attractor::Bouali {
                a: 0.3,
                b: 1.0,
                c: 1.0,
            },
            "burkeshaw" => Attractor::BurkeShaw { a: 10.0, b: 13.0 },
            "chua" => Attractor::Chua {
                a: 0.1,
                b: -0.48,
                k: 1.0,
                p: -1.3,
                q: -0.0136,
                r: -0.0297,
            },
            "newtonleipnik" => Attractor::NewtonLeipnik { a: 0.4, b: 0.175 },
            "nosehoover" => Attractor::NoseHoover { a: 1.5 },
            "rabinovichfabrikant" => Attractor::RabinovichFabrikant {
                alpha: 0.14,
                gamma: 0.1,
            },
            "hyperrossler" | "hyperrössler" => Attractor::HyperRossler {
                a: 0.25,
                b: 3.0,
                c: 0.5,
                d: 0.05,
                e: 0.1,
            },
            _ => return None,
        };
        Some(attractor)
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Attractor::Lorenz { .. } => "Lorenz",
            Attractor::Aizawa { .. } => "Aizawa",
            Attractor::Halvorsen { .. } => "Halvorsen",
            Attractor::Rossler { .. } => "Rossler",
            Attractor::Thomas { .. } => "Thomas",
            Attractor::ChenLee { .. } => "ChenLee",
            Attractor::Dadras { .. } => "Dadras",
            Attractor::Sprott { .. } => "Sprott",
            Attractor::Arneodo { .. } => "Arneodo",
            Attractor::Bouali { .. } => "Bouali",
            Attractor::BurkeShaw { .. } => "BurkeShaw",
            Attractor::Chua { .. } => "Chua",
            Attractor::NewtonLeipnik { .. } => "NewtonLeipnik",
            Attractor::NoseHoover { .. } => "NoseHoover",
            Attractor::RabinovichFabrikant { .. } => "RabinovichFabrikant",
            Attractor::HyperRossler { .. } => "HyperRossler",
        }
    }

    /// Number of state variables the system evolves.
    pub fn dimensions(&self) -> u32 {
        match self {
            Attractor::HyperRossler { .. } => 4,
            _ => 3,
        }
    }

    /// Per-attractor scale that brings the trajectory to a comparable on-screen size.
    pub fn local_scale(&self) -> f32 {
        match self {
            Attractor::Lorenz { .. } => 1.0,
            Attractor::Aizawa { .. } => 10.0,
            Attractor::Halvorsen { .. } => 1.0,
            Attractor::Rossler { .. } => 2.0,
            Attractor::Thomas { .. } => 5.0,
            Attractor::ChenLee { .. } => 3.0,
            Attractor::Dadras { .. } => 2.0,
            Attractor::Sprott { .. } => 4.0,
            Attractor::Arneodo { .. } => 3.0,
            Attractor::Bouali { .. } => 10.0,
            Attractor::BurkeShaw { .. } => 2.0,
            Attractor::Chua { .. } => 7.0,
            Attractor::NewtonLeipnik { .. } => 10.0,
            Attractor::NoseHoover { .. } => 5.0,
            Attractor::RabinovichFabrikant { .. } => 1.0,
            Attractor::HyperRossler { .. } => 1.0,
        }
    }
}

impl Default for Attractor {
    fn default() -> Self {
        Attractor::Lorenz {
            a: 10.0,
            b: 28.0,
            c: 8.0 / 3.0,
        }
    }
}

impl fmt::Display for Attractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attractor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attractor::default_for(s).ok_or_else(|| ConfigError::InvalidValue {
            field: "attractor",
            reason: format!("unknown attractor '{}', expected one of {}", s, Attractor::NAMES.join(", ")),
        })
    }
}

impl EquationFn for Attractor {
    fn delta(&self, x: f64, y: f64, z: f64, dt: f64, w: f64) -> Delta {
        match *self {
            Attractor::Lorenz { a, b, c } => {
                let x = x + 5.0;
                let z = z + 25.0;
                Delta::new(a * (y - x) * dt, (x * (b - z) - y) * dt, (x * y - c * z) * dt)
            }
            Attractor::Aizawa { a, b, c, d, e, f } => Delta::new(
                ((z - b) * x - d * y) * dt,
                (d * x + (z - b) * y) * dt,
                (c + a * z - z.powi(3) / 3.0 - (x * x + y * y) * (1.0 + e * z) + f * z * x.powi(3)) * dt,
            ),
            Attractor::Halvorsen { a } => Delta::new(
                (-a * x - 4.0 * y - 4.0 * z - y * y) * dt,
                (-a * y - 4.0 * x - 4.0 * z - z * z) * dt,
                (-a * z - 4.0 * x - 4.0 * y - x * x) * dt,
            ),
            Attractor::Rossler { a, b, c } => {
                Delta::new((-y - z) * dt, (x + a * y) * dt, (b + z * (x - c)) * dt)
            }
            Attractor::Thomas { b } => Delta::new(
                (-b * x + y.sin()) * dt,
                (-b * y + z.sin()) * dt,
                (-b * z + x.sin()) * dt,
            ),
            Attractor::ChenLee { a, b, c } => Delta::new(
                (a * x - y * z) * dt,
                (b * y + x * z) * dt,
                (c * z + x * y / 3.0) * dt,
            ),
            Attractor::Dadras { a, b, c, d, e } => Delta::new(
                (y - a * x + b * y * z) * dt,
                (c * y - x * z + z) * dt,
                (d * x * y - e * z) * dt,
            ),
            Attractor::Sprott { a } => Delta::new(y * z * dt, (x - y) * dt, (a - x * y) * dt),
            Attractor::Arneodo { a, b, c } => {
                Delta::new(y * dt, z * dt, (-a * x - b * y - c * z + x * x) * dt)
            }
            Attractor::Bouali { a, b, c } => Delta::new(
                (x * (1.0 - y) + a * z) * dt,
                b * (x * x - 1.0) * y * dt,
                (x - c * z) * dt,
            ),
            Attractor::BurkeShaw { a, b } => Delta::new(
                -a * (x + y) * dt,
                (-y - a * x * z) * dt,
                (a * x * y + b) * dt,
            ),
            Attractor::Chua { a, b, k, p, q, r } => {
                let diode = b * x + 0.5 * (a - b) * ((x + 1.0).abs() - (x - 1.0).abs());
                Delta::new(
                    k * p * (y - x - diode) * dt,
                    k * (x - y + z) * dt,
                    k * (-q * y - r * z) * dt,
                )
            }
            Attractor::NewtonLeipnik { a, b } => Delta::new(
                (-a * x + y + 10.0 * y * z) * dt,
                (-x - 0.4 * y + 5.0 * x * z) * dt,
                (b * z - 5.0 * x * y) * dt,
            ),
            Attractor::NoseHoover { a } => Delta::new(y * dt, (-x + y * z) * dt, (a - y * y) * dt),
            Attractor::RabinovichFabrikant { alpha, gamma } => Delta::new(
                (y * (z - 1.0 + x * x) + gamma * x) * dt,
                (x * (3.0 * z + 1.0 - x * x) + gamma * y) * dt,
                -2.0 * z * (alpha + x * y) * dt,
            ),
            Attractor::HyperRossler { a, b, c, d, e } => Delta::with_w(
                (-y - z) * dt,
                (x + a * y + w) * dt,
                (b + z * (x - c)) * dt,
                (d * w + e * z) * dt,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_parses() {
        for name in Attractor::NAMES {
            let attractor: Attractor = name.parse().unwrap();
            assert_eq!(attractor.name(), name);
        }
    }

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!("chen-lee".parse::<Attractor>().unwrap().name(), "ChenLee");
        assert_eq!("HYPER_ROSSLER".parse::<Attractor>().unwrap().name(), "HyperRossler");
        assert!("duffing".parse::<Attractor>().is_err());
    }

    #[test]
    fn test_deltas_scale_with_dt() {
        for name in Attractor::NAMES {
            let attractor = Attractor::default_for(name).unwrap();
            let small = attractor.delta(0.3, -0.2, 0.1, 0.001, 0.05);
            let large = attractor.delta(0.3, -0.2, 0.1, 0.002, 0.05);
            assert!((large.dx - 2.0 * small.dx).abs() < 1e-9, "{name}");
            assert!((large.dz - 2.0 * small.dz).abs() < 1e-9, "{name}");
        }
    }

    #[test]
    fn test_only_hyper_rossler_drives_w() {
        for name in Attractor::NAMES {
            let attractor = Attractor::default_for(name).unwrap();
            let d = attractor.delta(1.0, 1.0, 1.0, 0.01, 0.5);
            assert_eq!(d.dw.is_some(), attractor.dimensions() == 4, "{name}");
        }
    }

    #[test]
    fn test_lorenz_recentering() {
        let lorenz = Attractor::default();
        // At (-5, 0, -25) the shifted system is at its origin fixed point.
        let d = lorenz.delta(-5.0, 0.0, -25.0, 0.01, 0.0);
        assert_eq!(d.xyz(), glam::DVec3::ZERO);
    }

    #[test]
    fn test_chua_diode_is_piecewise_linear() {
        let chua = Attractor::default_for("chua").unwrap();
        let dt = 0.01;
        // Inner segment: slope a = 0.1.
        let inner = chua.delta(0.5, 0.0, 0.0, dt, 0.0);
        assert!((inner.dx - (-1.3 * (-0.5 - 0.05) * dt)).abs() < 1e-12);
        // Outer segment: b * x + (a - b) = -0.38 at x = 2.
        let outer = chua.delta(2.0, 0.0, 0.0, dt, 0.0);
        assert!((outer.dx - (-1.3 * (-2.0 + 0.38) * dt)).abs() < 1e-12);
    }

    #[test]
    fn test_serde_tagged() {
        let json = serde_json::to_string(&Attractor::Thomas { b: 0.19 }).unwrap();
        assert!(json.contains("\"kind\":\"Thomas\""));
        let back: Attractor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Attractor::Thomas { b: 0.19 });
    }
}
