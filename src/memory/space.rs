//! Allocation space: one guest heap and its `malloc`/`free`/`realloc`
//!
//! This module provides the allocator core with:
//! - Exact-fit reuse of freed blocks before anything else
//! - Reuse of a free block together with the free block it is chained to
//! - Bump allocation from untouched space, growing the region as needed
//! - Chain-aware `free` and a copy-through `realloc`
//!
//! # Failure Model
//!
//! The operations never return errors. Exhaustion comes back as `None` and
//! every other anomaly becomes a [`Diagnostic`] that is logged and queued on
//! the space. Physically adjacent free blocks are never coalesced.

use super::block::{Block, BlockTable};
use super::diagnostic::Diagnostic;
use super::region::Region;
use super::{is_aligned, round_up_8, Address, Hex};
use crate::constants::ALIGNMENT;
use crate::errors::{GrowError, HeapError};

/// Summary of a space for status displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    pub blocks: usize,
    pub occupied_blocks: usize,
    pub occupied_bytes: u64,
    pub free_bytes: u64,
    pub bump_cursor: Address,
    pub heap_end: Address,
    /// Bytes between the bump cursor and `heap_end`
    pub headroom: u32,
}

/// A region, its block table and the bump cursor
#[derive(Debug, Clone)]
pub struct AllocationSpace<R: Region> {
    region: R,
    bump_cursor: Address,
    blocks: BlockTable,
    diagnostics: Vec<Diagnostic>,
}

impl<R: Region> AllocationSpace<R> {
    /// Create an empty space rooted at the region's heap base
    pub fn new(region: R) -> Result<Self, HeapError> {
        let heap_base = region.heap_base();
        if !is_aligned(heap_base) {
            return Err(HeapError::MisalignedHeapBase { heap_base });
        }

        Ok(AllocationSpace {
            region,
            bump_cursor: heap_base,
            blocks: BlockTable::new(),
            diagnostics: Vec::new(),
        })
    }

    /// Allocate at least `requested` bytes
    ///
    /// Returns `None` when the region cannot grow enough.
    pub fn malloc(&mut self, requested: u32) -> Option<Address> {
        // A zero-byte request still gets its own 8-byte block
        let Some(size) = round_up_8(requested.max(1)) else {
            self.report(Diagnostic::Exhausted {
                requested,
                available: self.headroom(),
                cause: GrowError::AddressSpace,
            });
            return None;
        };

        if let Some(address) = self.reuse_exact(size) {
            return Some(address);
        }
        if let Some(address) = self.reuse_pair(size) {
            return Some(address);
        }
        self.bump(size)
    }

    /// Release the allocation at `address` and everything chained to it
    pub fn free(&mut self, address: Address) {
        if !self.blocks.contains(address) {
            self.report(Diagnostic::UnknownAddress { address });
            return;
        }

        let mut current = address;
        loop {
            let Some(block) = self.blocks.get_mut(current) else {
                break;
            };
            let was_occupied = block.occupied;
            block.occupied = false;
            tracing::trace!(address = %Hex(current), size = block.size, "freed block");

            let Some(next) = block.chain_next else {
                break;
            };
            if next <= current {
                break;
            }

            match self.blocks.get(next) {
                Some(continuation) => {
                    if was_occupied && !continuation.occupied {
                        self.report(Diagnostic::ChainCorruption {
                            address: current,
                            next,
                        });
                    }
                }
                None => {
                    self.report(Diagnostic::DanglingChain {
                        address: current,
                        next,
                    });
                    break;
                }
            }
            current = next;
        }
    }

    /// Move the allocation at `address` into a block of at least `new_size` bytes
    ///
    /// The old allocation is released before the new one is made, so on
    /// `None` its contents are gone. An unknown `address` is treated as a
    /// fresh `malloc`.
    pub fn realloc(&mut self, address: Address, new_size: u32) -> Option<Address> {
        let Some(data) = self.read_allocation(address) else {
            tracing::debug!(address = %Hex(address), "realloc of unknown address, allocating fresh");
            return self.malloc(new_size);
        };

        self.free(address);
        let new_address = self.malloc(new_size)?;

        let len = data.len().min(new_size as usize);
        let start = new_address as usize;
        if let Some(target) = self.region.bytes_mut().get_mut(start..start + len) {
            target.copy_from_slice(&data[..len]);
        }
        tracing::trace!(
            from = %Hex(address),
            to = %Hex(new_address),
            copied = len,
            "reallocated"
        );
        Some(new_address)
    }

    /// Bytes of the allocation at `address`, concatenated across its chain
    pub fn read_allocation(&self, address: Address) -> Option<Vec<u8>> {
        if !self.blocks.contains(address) {
            return None;
        }

        let bytes = self.region.bytes();
        let mut data = Vec::new();
        for block in self.blocks.chain(address) {
            let start = block.address as usize;
            let end = start + block.size as usize;
            data.extend_from_slice(bytes.get(start..end).unwrap_or_default());
        }
        Some(data)
    }

    /// Total size of the allocation at `address` across its chain
    pub fn chain_size(&self, address: Address) -> Option<u64> {
        self.blocks.chain_size(address)
    }

    /// Declare `second` as the physical continuation of `first`
    pub fn link(&mut self, first: Address, second: Address) -> Result<(), HeapError> {
        self.blocks.link(first, second)
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    /// Mutable access to the region, for the embedding's own reads and writes
    pub fn region_mut(&mut self) -> &mut R {
        &mut self.region
    }

    pub fn into_region(self) -> R {
        self.region
    }

    pub fn blocks(&self) -> &BlockTable {
        &self.blocks
    }

    /// Next never-allocated address
    pub fn bump_cursor(&self) -> Address {
        self.bump_cursor
    }

    /// Space left between the bump cursor and `heap_end`
    pub fn headroom(&self) -> u32 {
        self.region.heap_end().saturating_sub(self.bump_cursor)
    }

    /// Diagnostics recorded since the last drain
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            blocks: self.blocks.len(),
            bump_cursor: self.bump_cursor,
            heap_end: self.region.heap_end(),
            headroom: self.headroom(),
            ..HeapStats::default()
        };
        for block in self.blocks.iter() {
            if block.occupied {
                stats.occupied_blocks += 1;
                stats.occupied_bytes += block.size as u64;
            } else {
                stats.free_bytes += block.size as u64;
            }
        }
        stats
    }

    /// Log a diagnostic and keep it for the embedding
    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
    }

    /// First free block of exactly `size` bytes
    fn reuse_exact(&mut self, size: u32) -> Option<Address> {
        let block = self
            .blocks
            .iter_mut()
            .find(|block| !block.occupied && block.size == size)?;
        block.occupied = true;
        block.chain_next = None;
        tracing::trace!(address = %Hex(block.address), size, "reused free block");
        Some(block.address)
    }

    /// First free block that, with the free block chained after it, covers `size`
    fn reuse_pair(&mut self, size: u32) -> Option<Address> {
        let mut stale = Vec::new();
        let mut found = None;

        for block in self.blocks.iter() {
            if block.occupied || block.size >= size {
                continue;
            }
            let Some(next_address) = block.chain_next else {
                continue;
            };
            let Some(next) = self.blocks.get(next_address) else {
                continue;
            };
            if next.occupied {
                stale.push((block.address, next_address));
                continue;
            }
            if block.size as u64 + next.size as u64 >= size as u64 {
                found = Some((block.address, next_address));
                break;
            }
        }

        for (address, next) in stale {
            if let Some(block) = self.blocks.get_mut(address) {
                block.chain_next = None;
            }
            self.report(Diagnostic::StaleChain { address, next });
        }

        let (address, next) = found?;
        if let Some(block) = self.blocks.get_mut(address) {
            block.occupied = true;
        }
        if let Some(block) = self.blocks.get_mut(next) {
            block.occupied = true;
            block.chain_next = None;
        }
        tracing::trace!(address = %Hex(address), next = %Hex(next), size, "reused chained pair");
        Some(address)
    }

    /// Carve a new block at the bump cursor, growing the region first
    fn bump(&mut self, size: u32) -> Option<Address> {
        let address = self.bump_cursor;
        debug_assert!(size % ALIGNMENT == 0);

        let Some(end) = address.checked_add(size) else {
            self.report(Diagnostic::Exhausted {
                requested: size,
                available: self.headroom(),
                cause: GrowError::AddressSpace,
            });
            return None;
        };

        if let Err(cause) = self.grow_to(end) {
            self.report(Diagnostic::Exhausted {
                requested: size,
                available: self.headroom(),
                cause,
            });
            return None;
        }

        self.bump_cursor = end;
        self.blocks.insert(Block::new(address, size));
        tracing::trace!(address = %Hex(address), size, "carved new block");
        Some(address)
    }

    /// Grow the region one unit at a time until `heap_end >= end`
    fn grow_to(&mut self, end: Address) -> Result<(), GrowError> {
        while self.region.heap_end() < end {
            let before = self.region.heap_end();
            self.region.grow()?;
            let after = self.region.heap_end();
            if after <= before {
                return Err(GrowError::Stalled { heap_end: after });
            }
            tracing::debug!(heap_end = %Hex(after), "grew region");
        }
        Ok(())
    }
}
