//! Memory model for one guest heap
//!
//! This module provides the allocator state and algorithms:
//! - [`region`]: the growable linear byte buffer ([`Region`] port, [`LinearMemory`])
//! - [`block`]: block descriptors and the per-space [`BlockTable`]
//! - [`space`]: the [`AllocationSpace`] implementing `malloc`, `free` and `realloc`
//! - [`diagnostic`]: anomalies the allocator absorbs instead of failing
//!
//! # Layout
//!
//! ```text
//!   heap_base                      bump_cursor            heap_end
//!   │                              │                      │
//!   ▼                              ▼                      ▼
//!   ┌────────┬────┬────────┬──────┬──────────────────────┬──────────
//!   │ used   │free│ used   │ used │   never allocated    │ (grow)
//!   └────────┴────┴────────┴──────┴──────────────────────┴──────────
//! ```
//!
//! Blocks are carved from the bump cursor and stay in the [`BlockTable`]
//! forever; freeing only flips them back to reusable.
//!
//! # Alignment
//!
//! Every request is rounded up to a multiple of [`ALIGNMENT`] (8 bytes) and
//! the heap base must itself be aligned, so every address handed out is too.

pub mod block;
pub mod diagnostic;
pub mod region;
pub mod space;

pub use block::{Block, BlockTable};
pub use diagnostic::Diagnostic;
pub use region::{LinearMemory, Region, RegionConfig};
pub use space::{AllocationSpace, HeapStats};

use crate::constants::ALIGNMENT;
use std::fmt;

/// Guest address: a 32-bit offset into the region's backing buffer
pub type Address = u32;

/// Displays an address as `0x` followed by eight hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hex(pub Address);

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Round `size` up to the next multiple of [`ALIGNMENT`]
///
/// Returns `None` when the rounded size does not fit in 32 bits.
pub fn round_up_8(size: u32) -> Option<u32> {
    size.checked_add(ALIGNMENT - 1)
        .map(|padded| padded & !(ALIGNMENT - 1))
}

/// Check whether an address sits on the allocator's alignment boundary
pub fn is_aligned(address: Address) -> bool {
    address % ALIGNMENT == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up_8() {
        for i in 0..10u32 {
            for size in (8 * i + 1)..=(8 * (i + 1)) {
                assert_eq!(round_up_8(size), Some(8 * (i + 1)));
            }
        }
        assert_eq!(round_up_8(0), Some(0));
    }

    #[test]
    fn test_round_up_8_overflow() {
        assert_eq!(round_up_8(u32::MAX), None);
        assert_eq!(round_up_8(u32::MAX - 7), Some(u32::MAX - 7));
        assert_eq!(round_up_8(u32::MAX - 8), Some(u32::MAX - 7));
    }

    #[test]
    fn test_is_aligned() {
        assert!(is_aligned(0));
        assert!(is_aligned(1024));
        assert!(!is_aligned(1020));
    }
}
