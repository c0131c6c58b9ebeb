//! Guest boundary: binding a heap to a region and the foreign functions
//!
//! This module provides:
//! - [`bind`]: builds an independent [`GuestHeap`] over a region
//! - [`GuestHeap`]: `malloc`/`free`/`realloc` with the guest's `u32` ABI,
//!   plus bounds-checked host reads, writes and the `mem*`/`strlen` helpers
//! - [`functions`]: dispatch of guest imports by name
//!
//! # Null Handling
//!
//! The allocator core works with `Option<Address>`. At this boundary `None`
//! becomes address 0, and address 0 coming from the guest means null, which
//! is why [`bind`] refuses a region whose heap starts at 0.

pub mod functions;

pub use functions::{HostFunctions, Import};

use std::ops::Range;

use crate::constants::NULL;
use crate::errors::{HeapError, HostError};
use crate::memory::{Address, AllocationSpace, Diagnostic, HeapStats, Region};

/// Build a fresh allocation space over `region`
///
/// Every call creates its own block table and bump cursor, so heaps bound to
/// different guest instances never see each other's blocks.
pub fn bind<R: Region>(region: R) -> Result<GuestHeap<R>, HeapError> {
    if region.heap_base() == NULL {
        return Err(HeapError::NullHeapBase);
    }
    let space = AllocationSpace::new(region)?;
    tracing::debug!(
        heap_base = space.region().heap_base(),
        heap_end = space.region().heap_end(),
        "bound guest heap"
    );
    Ok(GuestHeap { space })
}

/// The allocator operations bound to one space
#[derive(Debug, Clone)]
pub struct GuestHeap<R: Region> {
    space: AllocationSpace<R>,
}

impl<R: Region> GuestHeap<R> {
    /// `malloc(size)`; returns 0 when the heap is exhausted
    pub fn malloc(&mut self, size: u32) -> u32 {
        self.space.malloc(size).unwrap_or(NULL)
    }

    /// `free(address)`; `free(0)` only logs
    pub fn free(&mut self, address: u32) {
        if address == NULL {
            self.space.report(Diagnostic::NullFree);
            return;
        }
        self.space.free(address);
    }

    /// `realloc(address, size)`; returns 0 when the heap is exhausted
    ///
    /// On 0 the original allocation has already been released.
    pub fn realloc(&mut self, address: u32, size: u32) -> u32 {
        if address == NULL {
            return self.malloc(size);
        }
        self.space.realloc(address, size).unwrap_or(NULL)
    }

    /// Read `len` bytes of guest memory
    pub fn read(&self, address: Address, len: usize) -> Result<&[u8], HeapError> {
        let range = self.range(address, len)?;
        Ok(&self.space.region().bytes()[range])
    }

    /// Write `data` into guest memory
    pub fn write(&mut self, address: Address, data: &[u8]) -> Result<(), HeapError> {
        let range = self.range(address, data.len())?;
        self.space.region_mut().bytes_mut()[range].copy_from_slice(data);
        Ok(())
    }

    /// `memset(address, value, len)`
    pub fn memset(&mut self, address: Address, value: u8, len: u32) -> Result<(), HeapError> {
        let range = self.range(address, len as usize)?;
        self.space.region_mut().bytes_mut()[range].fill(value);
        Ok(())
    }

    /// `memcpy(dst, src, len)`; returns `dst`
    ///
    /// Overlapping ranges are copied as if through a temporary buffer.
    pub fn memcpy(&mut self, dst: Address, src: Address, len: u32) -> Result<Address, HostError> {
        if dst == NULL {
            return Err(HostError::NullPointer {
                function: "memcpy",
                operand: "destination",
            });
        }
        if src == NULL {
            return Err(HostError::NullPointer {
                function: "memcpy",
                operand: "source",
            });
        }

        let from = self.range(src, len as usize)?;
        let to = self.range(dst, len as usize)?;
        self.space
            .region_mut()
            .bytes_mut()
            .copy_within(from, to.start);
        Ok(dst)
    }

    /// `strlen(address)`: bytes before the first NUL
    ///
    /// A string that runs off the end of the region is out of bounds.
    pub fn strlen(&self, address: Address) -> Result<u32, HeapError> {
        let bytes = self.space.region().bytes();
        let out_of_bounds = |len| HeapError::OutOfBounds {
            address,
            len,
            size: bytes.len(),
        };

        let rest = bytes.get(address as usize..).ok_or_else(|| out_of_bounds(1))?;
        let len = rest
            .iter()
            .position(|&byte| byte == 0)
            .ok_or_else(|| out_of_bounds(rest.len() + 1))?;
        Ok(len as u32)
    }

    /// Byte range `address..address + len`, checked against the region
    fn range(&self, address: Address, len: usize) -> Result<Range<usize>, HeapError> {
        let size = self.space.region().bytes().len();
        let start = address as usize;
        match start.checked_add(len) {
            Some(end) if end <= size => Ok(start..end),
            _ => Err(HeapError::OutOfBounds { address, len, size }),
        }
    }

    /// Declare `second` as the physical continuation of `first`
    pub fn link(&mut self, first: Address, second: Address) -> Result<(), HeapError> {
        self.space.link(first, second)
    }

    /// Drain the diagnostics recorded since the last call
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.space.take_diagnostics()
    }

    pub fn stats(&self) -> HeapStats {
        self.space.stats()
    }

    pub fn space(&self) -> &AllocationSpace<R> {
        &self.space
    }

    pub fn region(&self) -> &R {
        self.space.region()
    }

    /// Tear the heap down and hand the region back to the embedding
    pub fn into_region(self) -> R {
        self.space.into_region()
    }
}
