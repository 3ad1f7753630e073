use crate::{
    foundation::{
        core::ClipRect,
        error::{FilterError, FilterResult},
    },
    pixel::buffer::{ColorSpace, PixelBuffer},
};

/// Default number of buffers one pass may hand out.
pub const DEFAULT_BANK_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BankSlot(pub(crate) usize);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageBankStats {
    pub handed_out: usize,
    /// Largest `handed_out` over the bank's lifetime.
    pub high_water: usize,
    pub retained_buffers: usize,
    pub retained_bytes: usize,
    pub alloc_buffers: u64,
    pub alloc_bytes: u64,
}

/// Per-pass pool of recycled pixel buffers.
///
/// Buffers are handed out in strict sequential order and all returned at once by
/// [`ImageBank::reset`]; their allocations survive across passes.
#[derive(Debug)]
pub struct ImageBank {
    capacity: usize,
    buffers: Vec<PixelBuffer>,
    cursor: usize,
    stats: ImageBankStats,
}

impl ImageBank {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffers: Vec::new(),
            cursor: 0,
            stats: ImageBankStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rewind the cursor; every previously handed out slot becomes invalid.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.stats.handed_out = 0;
    }

    pub fn release_all(&mut self) {
        self.buffers.clear();
        self.cursor = 0;
        self.stats.handed_out = 0;
        self.stats.retained_buffers = 0;
        self.stats.retained_bytes = 0;
    }

    pub fn stats(&self) -> ImageBankStats {
        self.stats.clone()
    }

    /// Next buffer in sequence, cleared to transparent.
    pub fn acquire(
        &mut self,
        width: u32,
        height: u32,
        clip: ClipRect,
        color_space: ColorSpace,
    ) -> FilterResult<BankSlot> {
        if self.cursor >= self.capacity {
            return Err(FilterError::bank_full(self.capacity));
        }
        let idx = self.cursor;
        if idx == self.buffers.len() {
            self.buffers.push(PixelBuffer::default());
        }

        let buf = &mut self.buffers[idx];
        let before = buf.capacity_bytes();
        buf.resize(width, height)?;
        let after = buf.capacity_bytes();
        if after > before {
            self.stats.alloc_buffers = self.stats.alloc_buffers.saturating_add(1);
            self.stats.alloc_bytes = self
                .stats
                .alloc_bytes
                .saturating_add((after - before) as u64);
            tracing::trace!(slot = idx, width, height, bytes = after, "bank buffer grown");
        }
        buf.clear_transparent();
        buf.set_clip(clip);
        buf.set_color_space(color_space);
        buf.set_premultiplied(true);

        self.cursor += 1;
        self.stats.handed_out = self.cursor;
        self.stats.high_water = self.stats.high_water.max(self.cursor);
        self.stats.retained_buffers = self.buffers.len();
        self.stats.retained_bytes = self.buffers.iter().map(PixelBuffer::capacity_bytes).sum();
        Ok(BankSlot(idx))
    }

    pub fn get(&self, slot: BankSlot) -> &PixelBuffer {
        &self.buffers[slot.0]
    }

    pub fn get_mut(&mut self, slot: BankSlot) -> &mut PixelBuffer {
        &mut self.buffers[slot.0]
    }

    /// Move a buffer out so it can be written while other slots are read.
    pub(crate) fn take(&mut self, slot: BankSlot) -> PixelBuffer {
        std::mem::take(&mut self.buffers[slot.0])
    }

    pub(crate) fn restore(&mut self, slot: BankSlot, buf: PixelBuffer) {
        self.buffers[slot.0] = buf;
    }
}

impl Default for ImageBank {
    fn default() -> Self {
        Self::new(DEFAULT_BANK_CAPACITY)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/bank.rs"]
mod tests;
