// Constants for the guest heap

/// Block sizes and block addresses are always multiples of this
pub const ALIGNMENT: u32 = 8;

/// Address the guest reads as "no allocation"
pub const NULL: u32 = 0;

/// Size of one WebAssembly memory page, the default growth unit
pub const WASM_PAGE_SIZE: u32 = 64 * 1024;

/// Pages a fresh linear memory starts with
pub const DEFAULT_INITIAL_PAGES: u32 = 1;

/// Page ceiling for a linear memory (16 MiB with 64 KiB pages)
pub const DEFAULT_MAX_PAGES: u32 = 256;

/// Start of the guest heap
/// The guest's static data and shadow stack live below this address
pub const DEFAULT_HEAP_BASE: u32 = 1024;

/// Snapshot history limit used by the CLI (256 MB)
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 256 * 1024 * 1024;
