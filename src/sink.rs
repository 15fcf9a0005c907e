//! The GPU-facing side of the engine.
//!
//! The simulation never talks to a graphics API directly. At the end of each
//! frame it hands every buffer it touched to a [`GpuBufferSink`] as a single
//! coalesced [`DirtyRange`] together with the bytes of that range. Running
//! headless is a matter of plugging in [`RecordingSink`].

use crate::budget::IndexFormat;

/// Buffers the engine keeps in sync with the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferId {
    /// Trail vertex positions, `[f32; 3]` per slot.
    Positions,
    /// Trail vertex colors, `[f32; 3]` per slot.
    Colors,
    /// Line-list index pairs, `u16` or `u32`.
    Indices,
    /// One translation matrix per particle for instanced heads.
    Instances,
}

impl BufferId {
    pub const ALL: [BufferId; 4] = [
        BufferId::Positions,
        BufferId::Colors,
        BufferId::Indices,
        BufferId::Instances,
    ];
}

/// A byte range of one buffer that changed since the last upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRange {
    pub buffer: BufferId,
    pub byte_offset: u64,
    pub byte_length: u64,
}

/// Sizes of every buffer after a reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferLayout {
    pub position_bytes: u64,
    pub color_bytes: u64,
    pub index_bytes: u64,
    pub instance_bytes: u64,
    pub index_format: IndexFormat,
}

impl BufferLayout {
    pub fn size_of(&self, buffer: BufferId) -> u64 {
        match buffer {
            BufferId::Positions => self.position_bytes,
            BufferId::Colors => self.color_bytes,
            BufferId::Indices => self.index_bytes,
            BufferId::Instances => self.instance_bytes,
        }
    }
}

/// Receiver of dirty-range uploads.
pub trait GpuBufferSink {
    /// Whether 32-bit vertex indices are available.
    fn supports_wide_index(&self) -> bool;

    /// Buffers were reallocated; every buffer will be uploaded in full on the next flush.
    fn configure(&mut self, _layout: &BufferLayout) {}

    /// Upload `bytes` at `range.byte_offset` of `range.buffer`.
    ///
    /// `bytes.len()` always equals `range.byte_length`.
    fn mark_dirty(&mut self, range: DirtyRange, bytes: &[u8]);
}

impl<S: GpuBufferSink + ?Sized> GpuBufferSink for Box<S> {
    fn supports_wide_index(&self) -> bool {
        (**self).supports_wide_index()
    }

    fn configure(&mut self, layout: &BufferLayout) {
        (**self).configure(layout)
    }

    fn mark_dirty(&mut self, range: DirtyRange, bytes: &[u8]) {
        (**self).mark_dirty(range, bytes)
    }
}

/// A sink that only remembers what it was told. Used headless and in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    wide_index: bool,
    layout: Option<BufferLayout>,
    uploads: Vec<DirtyRange>,
    bytes_uploaded: u64,
    configure_count: u32,
}

impl RecordingSink {
    pub fn new(wide_index: bool) -> Self {
        Self {
            wide_index,
            ..Default::default()
        }
    }

    /// Last layout passed to [`GpuBufferSink::configure`].
    pub fn layout(&self) -> Option<&BufferLayout> {
        self.layout.as_ref()
    }

    /// Uploads received since the last [`take_uploads`](Self::take_uploads).
    pub fn uploads(&self) -> &[DirtyRange] {
        &self.uploads
    }

    pub fn take_uploads(&mut self) -> Vec<DirtyRange> {
        std::mem::take(&mut self.uploads)
    }

    /// Total bytes received over the sink's lifetime.
    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded
    }

    pub fn configure_count(&self) -> u32 {
        self.configure_count
    }
}

impl GpuBufferSink for RecordingSink {
    fn supports_wide_index(&self) -> bool {
        self.wide_index
    }

    fn configure(&mut self, layout: &BufferLayout) {
        self.layout = Some(*layout);
        self.configure_count += 1;
    }

    fn mark_dirty(&mut self, range: DirtyRange, bytes: &[u8]) {
        debug_assert_eq!(bytes.len() as u64, range.byte_length);
        self.bytes_uploaded += range.byte_length;
        self.uploads.push(range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_accumulates() {
        let mut sink = RecordingSink::new(false);
        assert!(!sink.supports_wide_index());

        let range = DirtyRange {
            buffer: BufferId::Colors,
            byte_offset: 12,
            byte_length: 8,
        };
        sink.mark_dirty(range, &[0u8; 8]);
        sink.mark_dirty(range, &[0u8; 8]);

        assert_eq!(sink.uploads().len(), 2);
        assert_eq!(sink.bytes_uploaded(), 16);
        assert_eq!(sink.take_uploads().len(), 2);
        assert!(sink.uploads().is_empty());
        assert_eq!(sink.bytes_uploaded(), 16);
    }

    #[test]
    fn test_boxed_sink_forwards() {
        let mut sink: Box<dyn GpuBufferSink> = Box::new(RecordingSink::new(true));
        assert!(sink.supports_wide_index());
        sink.configure(&BufferLayout::default());
        sink.mark_dirty(
            DirtyRange {
                buffer: BufferId::Indices,
                byte_offset: 0,
                byte_length: 4,
            },
            &[1, 2, 3, 4],
        );
    }

    #[test]
    fn test_layout_size_of() {
        let layout = BufferLayout {
            position_bytes: 1,
            color_bytes: 2,
            index_bytes: 3,
            instance_bytes: 4,
            index_format: IndexFormat::U32,
        };
        let sizes: Vec<u64> = BufferId::ALL.iter().map(|&b| layout.size_of(b)).collect();
        assert_eq!(sizes, vec![1, 2, 3, 4]);
    }
}
