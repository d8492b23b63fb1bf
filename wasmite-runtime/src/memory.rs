use {crate::error::LinkerError, wasmite_common::TrueOr};

/// The WebAssembly page size, 64 KiB.
pub const PAGE_SIZE: usize = 65536;

/// A memory instance is the runtime representation of a linear memory.
/// [Spec][Spec]
///
/// It records its declared limits (in pages) and holds a byte vector whose
/// length is always a multiple of the page size. The decoder writes active
/// data segments into it; everything else that happens to it at execution
/// time is out of scope here.
///
/// [Spec]: https://webassembly.github.io/spec/core/exec/runtime.html#memory-instances
#[derive(Debug, Default)]
pub struct MemInstance {
    pub initial_pages: u32,
    pub max_pages: Option<u32>,
    data: Vec<u8>,
}

impl MemInstance {
    /// Create a memory of `initial_pages` zeroed pages.
    pub fn new(initial_pages: u32, max_pages: Option<u32>) -> MemInstance {
        MemInstance {
            initial_pages,
            max_pages,
            data: vec![0u8; initial_pages as usize * PAGE_SIZE],
        }
    }

    /// Current size in pages.
    pub fn size(&self) -> u32 {
        (self.data.len() / PAGE_SIZE) as u32
    }

    pub fn byte_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Check that `[address, address + length)` lies inside the memory.
    pub fn validate_address(&self, address: i64, length: u32) -> Result<(), LinkerError> {
        let in_bounds = address >= 0 && address as u64 + length as u64 <= self.data.len() as u64;
        in_bounds.true_or(LinkerError::DataSegmentOutOfBounds {
            offset: address,
            length,
            size: self.data.len() as u64,
        })
    }

    /// Store a single byte. The address must have been validated.
    pub fn store_i32_8(&mut self, address: i64, value: u8) {
        self.data[address as usize] = value;
    }

    pub fn load_i32_8(&self, address: i64) -> u8 {
        self.data[address as usize]
    }

    /// Zero the memory contents.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn grow(&mut self, pages: u32) -> Option<u32> {
        let old_pages = self.size();
        let new_pages = old_pages as u64 + pages as u64;
        if new_pages > i32::MAX as u64 / PAGE_SIZE as u64 {
            return None;
        }
        if matches!(self.max_pages, Some(max) if new_pages > max as u64) {
            return None;
        }
        self.data.resize(new_pages as usize * PAGE_SIZE, 0);
        Some(old_pages)
    }
}
