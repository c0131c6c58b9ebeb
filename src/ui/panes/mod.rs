//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`source`]: the trace script with the current statement highlighted
//! - [`bindings`]: names bound by the script and the blocks they point at
//! - [`heap`]: the block table with chain links and hex dumps
//! - [`log`]: call results and allocator diagnostics
//! - [`status`]: status bar with keybindings and replay position
//! - `utils`: border styles, scroll clamping and hex dumps shared by the panes
//!
//! Each pane module exports a `render_*` function that draws from a
//! [`Snapshot`](crate::snapshot::Snapshot) and owns no replay state.

mod utils;

pub mod bindings;
pub mod heap;
pub mod log;
pub mod source;
pub mod status;

pub use bindings::render_bindings_pane;
pub use heap::{render_heap_pane, HeapScrollState};
pub use log::render_log_pane;
pub use source::{render_source_pane, SourceScrollState};
pub use status::{render_status_bar, StatusRenderData};
