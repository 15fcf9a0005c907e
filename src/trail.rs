//! Shared trail storage for every particle.
//!
//! All trails live in three parallel arrays owned by one [`TrailStore`]:
//!
//! - `positions`: `[f32; 3]` per slot
//! - `colors`: `[f32; 3]` per slot
//! - `indices`: a line list of vertex index pairs
//!
//! # Vertex layout
//!
//! Slot `k` of particle `p` is vertex `k * N + p`. Slots are interleaved
//! trail-position-first, so one frame's writes (every particle at the same ring
//! slot) land in a single contiguous span of the vertex buffers.
//!
//! # Index layout
//!
//! Each particle owns `2 * L` consecutive index entries describing `L` edges.
//! Edge `i` joins slot `i` to slot `(i + 1) % L`, closing the ring. Because the
//! ring wraps, the edge leaving the newest slot would connect it back to the
//! oldest one. That edge is replaced by a degenerate pair `(v, v)`, the *break*.
//! Each write moves the break one edge forward, which touches at most two index
//! pairs per particle regardless of trail length.

use glam::Vec3;

use crate::budget::{Capacity, IndexFormat};
use crate::sink::{BufferId, BufferLayout, DirtyRange, GpuBufferSink};

/// Upload granularity required by the GPU copy path.
const COPY_ALIGNMENT: u64 = 4;

/// Index storage in the width chosen at configure time.
#[derive(Debug, Clone)]
pub enum LineIndices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl LineIndices {
    fn zeroed(format: IndexFormat, len: usize) -> Self {
        match format {
            IndexFormat::U16 => LineIndices::U16(vec![0; len]),
            IndexFormat::U32 => LineIndices::U32(vec![0; len]),
        }
    }

    pub fn format(&self) -> IndexFormat {
        match self {
            LineIndices::U16(_) => IndexFormat::U16,
            LineIndices::U32(_) => IndexFormat::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LineIndices::U16(v) => v.len(),
            LineIndices::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, entry: usize) -> u32 {
        match self {
            LineIndices::U16(v) => v[entry] as u32,
            LineIndices::U32(v) => v[entry],
        }
    }

    // Values always fit: `TrailStore::configure` widens to U32 above 65535 vertices.
    #[inline]
    fn set(&mut self, entry: usize, value: u32) {
        match self {
            LineIndices::U16(v) => v[entry] = value as u16,
            LineIndices::U32(v) => v[entry] = value,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            LineIndices::U16(v) => bytemuck::cast_slice(v),
            LineIndices::U32(v) => bytemuck::cast_slice(v),
        }
    }
}

impl Default for LineIndices {
    fn default() -> Self {
        LineIndices::U16(Vec::new())
    }
}

/// Min/max byte offsets touched in one buffer since the last flush.
#[derive(Debug, Clone, Copy, Default)]
struct DirtySpan(Option<(u64, u64)>);

impl DirtySpan {
    #[inline]
    fn touch(&mut self, offset: u64, len: u64) {
        let end = offset + len;
        self.0 = Some(match self.0 {
            Some((lo, hi)) => (lo.min(offset), hi.max(end)),
            None => (offset, end),
        });
    }

    /// Take the span widened to copy alignment and clipped to `buffer_len`.
    fn take_aligned(&mut self, buffer_len: u64) -> Option<(u64, u64)> {
        let (lo, hi) = self.0.take()?;
        let lo = lo - lo % COPY_ALIGNMENT;
        let hi = hi.div_ceil(COPY_ALIGNMENT) * COPY_ALIGNMENT;
        let hi = hi.min(buffer_len);
        (hi > lo).then_some((lo, hi))
    }
}

/// Ring-buffer trails for `N` particles, `L` slots each.
#[derive(Debug, Clone, Default)]
pub struct TrailStore {
    particle_count: u32,
    trail_length: u32,
    positions: Vec<f32>,
    colors: Vec<f32>,
    indices: LineIndices,
    /// Edge currently holding the degenerate pair, per particle.
    breaks: Vec<Option<u32>>,
    dirty_positions: DirtySpan,
    dirty_colors: DirtySpan,
    dirty_indices: DirtySpan,
}

impl TrailStore {
    /// An empty store with no particles and no slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reallocate every array for `particle_count` particles and the resolved
    /// capacity, rebuilding the full ring topology with no breaks.
    ///
    /// The index format of `capacity` is widened to 32 bits if it cannot
    /// address every vertex. Existing trail data is discarded and every buffer
    /// is marked dirty.
    pub fn configure(&mut self, particle_count: u32, capacity: &Capacity) {
        self.particle_count = particle_count;
        self.trail_length = capacity.trail_length;

        let slots = self.vertex_count();
        let mut format = capacity.index_format;
        if format == IndexFormat::U16 && IndexFormat::for_vertex_count(slots) == IndexFormat::U32 {
            log::warn!(
                "{} trail vertices do not fit 16-bit indices, using 32-bit",
                slots
            );
            format = IndexFormat::U32;
        }

        let slots = slots as usize;
        self.positions = vec![0.0; slots * 3];
        self.colors = vec![0.0; slots * 3];
        self.indices = LineIndices::zeroed(format, slots * 2);
        self.breaks = vec![None; particle_count as usize];

        for p in 0..particle_count {
            for edge in 0..self.trail_length {
                self.restore_edge(p, edge);
            }
        }

        self.dirty_positions = DirtySpan::default();
        self.dirty_colors = DirtySpan::default();
        self.dirty_indices = DirtySpan::default();
        self.mark_all_dirty();
    }

    #[inline]
    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    #[inline]
    pub fn trail_length(&self) -> u32 {
        self.trail_length
    }

    /// Total slots across all particles.
    #[inline]
    pub fn vertex_count(&self) -> u64 {
        self.particle_count as u64 * self.trail_length as u64
    }

    #[inline]
    pub fn index_format(&self) -> IndexFormat {
        self.indices.format()
    }

    /// Flat vertex index of `slot` for `particle`.
    #[inline]
    pub fn vertex(&self, slot: u32, particle: u32) -> u32 {
        slot * self.particle_count + particle
    }

    #[inline]
    fn edge_entry(&self, particle: u32, edge: u32) -> usize {
        (particle as usize * self.trail_length as usize + edge as usize) * 2
    }

    #[inline]
    fn in_range(&self, particle: u32, slot: u32) -> bool {
        particle < self.particle_count && slot < self.trail_length
    }

    /// Write one slot. Out-of-range coordinates are ignored.
    #[inline]
    pub fn write(&mut self, particle: u32, slot: u32, position: Vec3, color: Vec3) {
        if !self.in_range(particle, slot) {
            return;
        }
        let offset = self.vertex(slot, particle) as usize * 3;
        self.positions[offset..offset + 3].copy_from_slice(&position.to_array());
        self.colors[offset..offset + 3].copy_from_slice(&color.to_array());

        let byte_offset = offset as u64 * 4;
        self.dirty_positions.touch(byte_offset, 12);
        self.dirty_colors.touch(byte_offset, 12);
    }

    /// Fill every slot of `particle` with `position` and drop its break.
    ///
    /// Used on reset so that unwritten slots collapse onto the start point
    /// instead of drawing lines to stale data.
    pub fn seed(&mut self, particle: u32, position: Vec3, color: Vec3) {
        if particle >= self.particle_count {
            return;
        }
        for slot in 0..self.trail_length {
            self.write(particle, slot, position, color);
        }
        if let Some(prev) = self.breaks[particle as usize].take() {
            self.restore_edge(particle, prev);
        }
    }

    /// Move the break of `particle` to the edge leaving its newest slot,
    /// `(cursor - 1 + L) % L`, where `cursor` is the next slot to be written.
    ///
    /// Touches at most two index pairs. Returns whether anything changed.
    pub fn mark_break(&mut self, particle: u32, cursor: u32) -> bool {
        if !self.in_range(particle, cursor) {
            return false;
        }
        let len = self.trail_length;
        let next = (cursor + len - 1) % len;
        let prev = self.breaks[particle as usize];
        if prev == Some(next) {
            return false;
        }
        if let Some(prev) = prev {
            self.restore_edge(particle, prev);
        }
        let entry = self.edge_entry(particle, next);
        let v = self.vertex(next, particle);
        self.set_pair(entry, v, v);
        self.breaks[particle as usize] = Some(next);
        true
    }

    /// Edge currently broken for `particle`, if any.
    pub fn break_at(&self, particle: u32) -> Option<u32> {
        self.breaks.get(particle as usize).copied().flatten()
    }

    fn restore_edge(&mut self, particle: u32, edge: u32) {
        let entry = self.edge_entry(particle, edge);
        let from = self.vertex(edge, particle);
        let to = self.vertex((edge + 1) % self.trail_length, particle);
        self.set_pair(entry, from, to);
    }

    #[inline]
    fn set_pair(&mut self, entry: usize, a: u32, b: u32) {
        self.indices.set(entry, a);
        self.indices.set(entry + 1, b);
        let width = self.indices.format().bytes();
        self.dirty_indices.touch(entry as u64 * width, 2 * width);
    }

    /// Position stored in `slot` of `particle`.
    pub fn position(&self, particle: u32, slot: u32) -> Option<Vec3> {
        self.in_range(particle, slot).then(|| {
            let offset = self.vertex(slot, particle) as usize * 3;
            Vec3::from_slice(&self.positions[offset..offset + 3])
        })
    }

    /// Color stored in `slot` of `particle`.
    pub fn color(&self, particle: u32, slot: u32) -> Option<Vec3> {
        self.in_range(particle, slot).then(|| {
            let offset = self.vertex(slot, particle) as usize * 3;
            Vec3::from_slice(&self.colors[offset..offset + 3])
        })
    }

    /// The `L` index pairs of `particle`, breaks included.
    pub fn edges(&self, particle: u32) -> impl Iterator<Item = (u32, u32)> + '_ {
        let count = if particle < self.particle_count { self.trail_length } else { 0 };
        let base = if count > 0 { self.edge_entry(particle, 0) } else { 0 };
        (0..count as usize).map(move |i| {
            let entry = base + i * 2;
            (self.indices.get(entry), self.indices.get(entry + 1))
        })
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn indices(&self) -> &LineIndices {
        &self.indices
    }

    /// Buffer sizes of the trail arrays. `instance_bytes` is left at zero.
    pub fn layout(&self) -> BufferLayout {
        BufferLayout {
            position_bytes: self.positions.len() as u64 * 4,
            color_bytes: self.colors.len() as u64 * 4,
            index_bytes: self.indices.as_bytes().len() as u64,
            instance_bytes: 0,
            index_format: self.indices.format(),
        }
    }

    /// Mark the whole of every array as needing upload.
    pub fn mark_all_dirty(&mut self) {
        let layout = self.layout();
        self.dirty_positions.touch(0, layout.position_bytes);
        self.dirty_colors.touch(0, layout.color_bytes);
        self.dirty_indices.touch(0, layout.index_bytes);
    }

    /// Emit one coalesced upload per touched buffer and clear the dirty state.
    pub fn flush<S: GpuBufferSink + ?Sized>(&mut self, sink: &mut S) {
        let positions: &[u8] = bytemuck::cast_slice(&self.positions);
        let colors: &[u8] = bytemuck::cast_slice(&self.colors);
        let indices = self.indices.as_bytes();

        let spans = [
            (BufferId::Positions, &mut self.dirty_positions, positions),
            (BufferId::Colors, &mut self.dirty_colors, colors),
            (BufferId::Indices, &mut self.dirty_indices, indices),
        ];
        for (buffer, span, bytes) in spans {
            if let Some((lo, hi)) = span.take_aligned(bytes.len() as u64) {
                let range = DirtyRange {
                    buffer,
                    byte_offset: lo,
                    byte_length: hi - lo,
                };
                sink.mark_dirty(range, &bytes[lo as usize..hi as usize]);
            }
        }
    }
}
