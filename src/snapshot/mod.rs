// Snapshot management for stepping back and forth through a replay

use crate::host::GuestHeap;
use crate::memory::{Address, Block, BlockTable, HeapStats, Region};
use crate::script::SourceLocation;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// A line of replay output with source location tracking
#[derive(Debug, Clone)]
pub struct LogLine {
    pub text: String,
    pub level: LogLevel,
    pub location: SourceLocation,
}

/// Everything the replay reported so far: call results and diagnostics
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub lines: Vec<LogLine>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog { lines: Vec::new() }
    }

    pub fn push(&mut self, text: String, level: LogLevel, location: SourceLocation) {
        self.lines.push(LogLine {
            text,
            level,
            location,
        });
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines at `level`
    pub fn count(&self, level: LogLevel) -> usize {
        self.lines.iter().filter(|line| line.level == level).count()
    }

    /// Plain text of every line
    pub fn get_output(&self) -> Vec<&str> {
        self.lines.iter().map(|line| line.text.as_str()).collect()
    }
}

/// Snapshot of the heap after one script statement
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub blocks: BlockTable,
    pub stats: HeapStats,
    pub heap_base: Address,
    /// Guest memory from `heap_base` up to the bump cursor
    pub heap_bytes: Vec<u8>,
    pub bindings: FxHashMap<String, Address>,
    pub log: EventLog,
    /// Statement just executed; `None` before the first one
    pub statement_index: Option<usize>,
    pub source_location: SourceLocation,
    pub last_result: Option<u32>,
}

impl Snapshot {
    /// Copy the observable state of `heap`
    pub fn capture<R: Region>(
        heap: &GuestHeap<R>,
        bindings: &FxHashMap<String, Address>,
        log: &EventLog,
        statement_index: Option<usize>,
        source_location: SourceLocation,
        last_result: Option<u32>,
    ) -> Self {
        let space = heap.space();
        let heap_base = space.region().heap_base();
        let start = heap_base as usize;
        let end = space.bump_cursor() as usize;
        let heap_bytes = space
            .region()
            .bytes()
            .get(start..end)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        Snapshot {
            blocks: space.blocks().clone(),
            stats: space.stats(),
            heap_base,
            heap_bytes,
            bindings: bindings.clone(),
            log: log.clone(),
            statement_index,
            source_location,
            last_result,
        }
    }

    /// Contents of `block` as they were when the snapshot was taken
    pub fn block_bytes(&self, block: &Block) -> &[u8] {
        let start = block.address.saturating_sub(self.heap_base) as usize;
        let end = start + block.size as usize;
        self.heap_bytes.get(start..end).unwrap_or_default()
    }

    /// Names bound to `address`, sorted
    pub fn names_for(&self, address: Address) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .bindings
            .iter()
            .filter(|(_, bound)| **bound == address)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        // This is a rough estimate
        let block_size = self.blocks.len() * std::mem::size_of::<Block>() * 2;
        let binding_size = self.bindings.len() * 48;
        // Log: assume 64 bytes per line on average
        let log_size = self.log.len() * 64;

        self.heap_bytes.len() + block_size + binding_size + log_size
    }
}

/// The history would grow past its memory limit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("snapshot memory limit exceeded: {current} + {needed} > {limit}")]
pub struct SnapshotLimitExceeded {
    pub current: usize,
    pub needed: usize,
    pub limit: usize,
}

/// Manages execution history for stepping backwards
#[derive(Debug)]
pub struct SnapshotManager {
    snapshots: Vec<Snapshot>,
    max_memory: usize,
    current_memory: usize,
}

impl SnapshotManager {
    pub fn new(max_memory: usize) -> Self {
        SnapshotManager {
            snapshots: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), SnapshotLimitExceeded> {
        let snapshot_size = snapshot.estimated_size();

        if self.current_memory + snapshot_size > self.max_memory {
            return Err(SnapshotLimitExceeded {
                current: self.current_memory,
                needed: snapshot_size,
                limit: self.max_memory,
            });
        }

        self.current_memory += snapshot_size;
        self.snapshots.push(snapshot);
        Ok(())
    }

    /// Get a snapshot by index
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// Get the number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Get current memory usage
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Get max memory limit
    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}
