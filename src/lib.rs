//! # Introduction
//!
//! guestheap services a sandboxed guest's `malloc`, `free` and `realloc`
//! from the host side, carving blocks out of the guest's growable linear
//! memory. Blocks are never returned to the region: freed blocks are reused
//! by exact size, or by pairing two adjacent blocks of a chain, and only
//! then does the bump cursor advance, growing the memory a page at a time
//! when it runs out of room.
//!
//! A small trace-script language drives a bound heap the way a guest would,
//! and a terminal inspector built with [ratatui](https://docs.rs/ratatui)
//! steps through the resulting snapshots.
//!
//! ## Pipeline
//!
//! ```text
//! Script → Lexer → Parser → Replay → GuestHeap → AllocationSpace → Region
//!                             ↓
//!                         Snapshots → TUI
//! ```
//!
//! 1. [`memory`]: the allocator itself. [`memory::Region`] describes the
//!    guest memory, [`memory::BlockTable`] records every block and chain,
//!    [`memory::AllocationSpace`] runs the allocation policy.
//! 2. [`host`]: binds a space to a region and exposes it with the guest's
//!    `u32` ABI, address 0 meaning null.
//! 3. [`script`]: tokenises and parses trace scripts.
//! 4. [`replay`]: runs a script through the host's import table and records
//!    a [`snapshot::Snapshot`] after every statement.
//! 5. [`ui`]: ratatui-based inspector; not part of the stable library API.
//!
//! ## Example
//!
//! ```
//! use guestheap::host::bind;
//! use guestheap::memory::{LinearMemory, RegionConfig};
//!
//! let mut heap = bind(LinearMemory::new(RegionConfig::default())).unwrap();
//! let p = heap.malloc(10);
//! assert_eq!(p, 1024);
//! heap.free(p);
//! assert_eq!(heap.malloc(16), p);
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod host;
pub mod memory;
pub mod replay;
pub mod script;
pub mod snapshot;
pub mod ui;
