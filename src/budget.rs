//! Trail capacity derivation.
//!
//! The effective trail length is never stored; it is recomputed from the
//! particle count, the requested length, a total point budget, and the widest
//! vertex index the GPU accepts:
//!
//! ```text
//! effective = min(requested, max_total_points / N, index_limit / N)
//! ```
//!
//! When the result is shorter than requested a [`ClampNotice`] is produced.
//! It is advisory, the simulation keeps running with the shorter trails.

use std::fmt;

/// Largest `N * trail_length` addressable with 16-bit indices.
pub const U16_INDEX_LIMIT: u32 = 65_535;

/// Width of the entries in the line index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexFormat {
    #[default]
    U16,
    U32,
}

impl IndexFormat {
    /// Size of one index entry in bytes.
    pub const fn bytes(self) -> u64 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }

    /// The narrowest format able to address `vertex_count` vertices.
    pub fn for_vertex_count(vertex_count: u64) -> Self {
        if vertex_count <= U16_INDEX_LIMIT as u64 {
            IndexFormat::U16
        } else {
            IndexFormat::U32
        }
    }
}

impl fmt::Display for IndexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexFormat::U16 => f.write_str("16-bit"),
            IndexFormat::U32 => f.write_str("32-bit"),
        }
    }
}

/// Which limit shortened the trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampReason {
    /// `N * trail_length` exceeded the configured point budget.
    PointBudget,
    /// The GPU has no 32-bit indices and `N * trail_length` exceeded 65535.
    IndexWidth,
}

/// Advisory raised when the requested trail length could not be honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampNotice {
    pub requested: u32,
    pub effective: u32,
    pub particle_count: u32,
    pub reason: ClampReason,
}

impl fmt::Display for ClampNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let why = match self.reason {
            ClampReason::PointBudget => "total trail point budget",
            ClampReason::IndexWidth => "GPU lacks 32-bit indices",
        };
        write!(
            f,
            "Trail length reduced from {} to {} for {} particles ({})",
            self.requested, self.effective, self.particle_count, why
        )
    }
}

/// Inputs to the capacity calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityBudget {
    pub particle_count: u32,
    pub requested_trail_length: u32,
    pub max_total_trail_points: u32,
    pub supports_wide_index: bool,
}

/// Resolved trail geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub trail_length: u32,
    pub index_format: IndexFormat,
    pub clamp: Option<ClampNotice>,
}

impl CapacityBudget {
    /// Highest `N * trail_length` the index buffer can address.
    pub fn index_width_limit(&self) -> u32 {
        if self.supports_wide_index {
            u32::MAX
        } else {
            U16_INDEX_LIMIT
        }
    }

    /// Compute the effective trail length and index format.
    pub fn resolve(&self) -> Capacity {
        let n = self.particle_count;
        let requested = self.requested_trail_length;
        if n == 0 {
            return Capacity {
                trail_length: requested,
                index_format: IndexFormat::U16,
                clamp: None,
            };
        }

        let by_budget = self.max_total_trail_points / n;
        let by_index = self.index_width_limit() / n;
        let effective = requested.min(by_budget).min(by_index);

        let clamp = (effective < requested).then(|| ClampNotice {
            requested,
            effective,
            particle_count: n,
            reason: if by_index < by_budget {
                ClampReason::IndexWidth
            } else {
                ClampReason::PointBudget
            },
        });

        Capacity {
            trail_length: effective,
            index_format: IndexFormat::for_vertex_count(n as u64 * effective as u64),
            clamp,
        }
    }
}
