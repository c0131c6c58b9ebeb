//! Region descriptor: the guest's growable linear memory
//!
//! The allocator never owns the guest's memory outright. It talks to it
//! through the [`Region`] port, which exposes the backing bytes, the two heap
//! bounds and an opaque "grow by one unit" primitive. [`LinearMemory`] is the
//! host-side implementation, modelled on a WebAssembly memory that grows a
//! page at a time up to a maximum.

use super::Address;
use crate::constants::{DEFAULT_HEAP_BASE, DEFAULT_INITIAL_PAGES, DEFAULT_MAX_PAGES, WASM_PAGE_SIZE};
use crate::errors::GrowError;

/// Host embedding seen from the allocator
///
/// Implementations must keep `bytes().len() >= heap_end()`, and a successful
/// `grow` is expected to raise `heap_end`.
pub trait Region {
    /// The whole backing buffer
    fn bytes(&self) -> &[u8];

    /// Mutable view of the whole backing buffer
    fn bytes_mut(&mut self) -> &mut [u8];

    /// First allocatable address
    fn heap_base(&self) -> Address;

    /// Current soft ceiling of the heap
    fn heap_end(&self) -> Address;

    /// Grow by one host-defined unit
    fn grow(&mut self) -> Result<(), GrowError>;
}

/// Shape of a [`LinearMemory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionConfig {
    /// Bytes added by each `grow`
    pub page_size: u32,
    /// Pages allocated up front
    pub initial_pages: u32,
    /// Page ceiling; `grow` fails once reached
    pub max_pages: u32,
    /// Where the heap starts inside the buffer
    pub heap_base: Address,
}

impl RegionConfig {
    /// Total bytes the memory may reach, saturating at the 32-bit address space
    pub fn max_bytes(&self) -> u64 {
        (self.page_size as u64 * self.max_pages as u64).min(u32::MAX as u64)
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        RegionConfig {
            page_size: WASM_PAGE_SIZE,
            initial_pages: DEFAULT_INITIAL_PAGES,
            max_pages: DEFAULT_MAX_PAGES,
            heap_base: DEFAULT_HEAP_BASE,
        }
    }
}

/// Page-granular linear memory backed by a `Vec<u8>`
#[derive(Debug, Clone)]
pub struct LinearMemory {
    data: Vec<u8>,
    page_size: u32,
    pages: u32,
    max_pages: u32,
    heap_base: Address,
    heap_end: Address,
}

impl LinearMemory {
    /// Create a zeroed memory of `initial_pages` pages
    ///
    /// `heap_end` starts at the end of the buffer.
    pub fn new(config: RegionConfig) -> Self {
        let len = (config.page_size as u64 * config.initial_pages as u64).min(u32::MAX as u64);
        LinearMemory {
            data: vec![0; len as usize],
            page_size: config.page_size,
            pages: config.initial_pages,
            max_pages: config.max_pages,
            heap_base: config.heap_base,
            heap_end: len as Address,
        }
    }

    /// Number of pages currently backing the memory
    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Move the soft ceiling, clamped to the buffer
    ///
    /// Embeddings use this when the guest reserves the top of its memory for
    /// something other than the heap.
    pub fn set_heap_end(&mut self, heap_end: Address) {
        self.heap_end = heap_end.min(self.data.len() as Address);
    }
}

impl Region for LinearMemory {
    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn heap_base(&self) -> Address {
        self.heap_base
    }

    fn heap_end(&self) -> Address {
        self.heap_end
    }

    fn grow(&mut self) -> Result<(), GrowError> {
        if self.pages >= self.max_pages {
            return Err(GrowError::LimitReached {
                pages: self.pages,
                max_pages: self.max_pages,
            });
        }

        let new_len = self.data.len() as u64 + self.page_size as u64;
        if new_len > u32::MAX as u64 {
            return Err(GrowError::AddressSpace);
        }

        self.data.resize(new_len as usize, 0);
        self.pages += 1;
        self.heap_end = new_len as Address;
        Ok(())
    }
}
