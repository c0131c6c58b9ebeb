//! Error types for the guest heap
//!
//! None of these are raised by `malloc`, `free` or `realloc` themselves. The
//! allocator absorbs exhaustion and pointer misuse at its boundary (see
//! [`Diagnostic`](crate::memory::Diagnostic)); the errors here cover the setup
//! around it: binding a region, declaring chains, growing the region, touching
//! guest memory from the host and dispatching foreign calls.

use crate::memory::Address;
use thiserror::Error;

/// Failure of the host's region growth primitive
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrowError {
    /// The linear memory is already at its page ceiling
    #[error("linear memory limit reached ({pages} of {max_pages} pages)")]
    LimitReached { pages: u32, max_pages: u32 },

    /// Growing would push the buffer past the 32-bit address space
    #[error("region cannot grow past the 32-bit address space")]
    AddressSpace,

    /// The host reported success but `heap_end` did not move
    #[error("region grew but heap_end stayed at 0x{heap_end:08x}")]
    Stalled { heap_end: Address },

    /// The embedding refused for its own reasons
    #[error("host refused to grow the region: {0}")]
    Refused(String),
}

/// Errors from building or inspecting an allocation space
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    /// `heap_base` must keep every carved block 8-byte aligned
    #[error("heap base 0x{heap_base:08x} is not 8-byte aligned")]
    MisalignedHeapBase { heap_base: Address },

    /// The guest boundary uses address 0 as null, so the heap cannot start there
    #[error("heap base 0 collides with the null address")]
    NullHeapBase,

    /// Address is not the start of any block
    #[error("no block starts at 0x{address:08x}")]
    UnknownBlock { address: Address },

    /// Chains may only join a block to the block that physically follows it
    #[error(
        "block 0x{first:08x} ends at 0x{first_end:08x}, cannot chain it to 0x{second:08x}"
    )]
    NotAdjacent {
        first: Address,
        first_end: Address,
        second: Address,
    },

    /// Host access outside the backing buffer
    #[error("access of {len} bytes at 0x{address:08x} is outside the region ({size} bytes)")]
    OutOfBounds {
        address: Address,
        len: usize,
        size: usize,
    },
}

/// Errors from dispatching a guest import by name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("function '{0}' is not implemented by the host")]
    UnknownImport(String),

    #[error("'{function}' expects {expected} argument(s), got {got}")]
    ArgumentCount {
        function: &'static str,
        expected: usize,
        got: usize,
    },

    /// A memory import was handed address 0 for one of its buffers
    #[error("SEGV: '{function}' was given a NULL {operand} buffer")]
    NullPointer {
        function: &'static str,
        operand: &'static str,
    },

    /// A memory import reached outside the region
    #[error(transparent)]
    Memory(#[from] HeapError),
}
