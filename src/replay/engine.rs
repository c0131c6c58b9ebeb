//! Replay engine: runs a trace script against a bound guest heap
//!
//! Every statement goes through the host's foreign-function table exactly as
//! a guest import would. A snapshot is taken before the first statement and
//! after each one, so the whole run can be stepped through afterwards.

use super::errors::ReplayError;
use crate::host::{bind, GuestHeap, HostFunctions};
use crate::memory::{Address, Diagnostic, Hex, LinearMemory};
use crate::script::{Call, Operand, Script, SourceLocation, Statement, StatementKind};
use crate::snapshot::{EventLog, LogLevel, Snapshot, SnapshotManager};
use rustc_hash::FxHashMap;

/// Script, heap and history of one replay
pub struct Replay {
    script: Script,
    heap: GuestHeap<LinearMemory>,
    bindings: FxHashMap<String, Address>,
    log: EventLog,
    snapshot_manager: SnapshotManager,
    history_position: usize,
    finished: bool,
    error: Option<ReplayError>,
}

impl Replay {
    /// Bind a fresh heap over `region` for `script`
    pub fn new(
        script: Script,
        region: LinearMemory,
        snapshot_limit: usize,
    ) -> Result<Self, ReplayError> {
        let heap = bind(region).map_err(|source| ReplayError::Bind { source })?;
        Ok(Replay {
            script,
            heap,
            bindings: FxHashMap::default(),
            log: EventLog::new(),
            snapshot_manager: SnapshotManager::new(snapshot_limit),
            history_position: 0,
            finished: false,
            error: None,
        })
    }

    /// Execute every statement, building the history
    ///
    /// On error the history up to and including the failing statement is kept
    /// and the error stays available through [`Replay::error`].
    pub fn run(&mut self) -> Result<(), ReplayError> {
        if self.finished || !self.snapshot_manager.is_empty() {
            return Err(ReplayError::history("Replay has already run"));
        }

        let result = self.run_statements();
        self.finished = true;
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    fn run_statements(&mut self) -> Result<(), ReplayError> {
        self.take_snapshot(None, SourceLocation::default(), None)?;

        for index in 0..self.script.statements.len() {
            let statement = self.script.statements[index].clone();
            let result = self.execute(&statement);
            self.drain_diagnostics(statement.location);

            match result {
                Ok(value) => self.take_snapshot(Some(index), statement.location, value)?,
                Err(err) => {
                    self.log.push(
                        format!("error: {}", err),
                        LogLevel::Error,
                        statement.location,
                    );
                    // The statement error wins over running out of history
                    if let Err(limit) = self.take_snapshot(Some(index), statement.location, None) {
                        tracing::warn!(%limit, "no snapshot for the failing statement");
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Execute one statement, returning the guest-visible result if any
    fn execute(&mut self, statement: &Statement) -> Result<Option<u32>, ReplayError> {
        let location = statement.location;

        match &statement.kind {
            StatementKind::Assign { name, call } => {
                let result = self.call(call, location)?;
                if let Some(address) = result {
                    self.bindings.insert(name.clone(), address);
                }
                self.log.push(
                    format!("{} = {} -> {}", name, call, describe(result)),
                    LogLevel::Info,
                    location,
                );
                Ok(result)
            }
            StatementKind::Call(call) => {
                let result = self.call(call, location)?;
                let text = match result {
                    Some(_) => format!("{} -> {}", call, describe(result)),
                    None => call.to_string(),
                };
                self.log.push(text, LogLevel::Info, location);
                Ok(result)
            }
            StatementKind::Write { address, bytes } => {
                let address = self.resolve(address, location)?;
                self.heap
                    .write(address, bytes)
                    .map_err(|source| ReplayError::Heap { source, location })?;
                self.log.push(
                    format!("wrote {} byte(s) at {}", bytes.len(), Hex(address)),
                    LogLevel::Info,
                    location,
                );
                Ok(None)
            }
            StatementKind::Link { first, second } => {
                let first = self.resolve(first, location)?;
                let second = self.resolve(second, location)?;
                self.heap
                    .link(first, second)
                    .map_err(|source| ReplayError::Heap { source, location })?;
                self.log.push(
                    format!("linked {} -> {}", Hex(first), Hex(second)),
                    LogLevel::Info,
                    location,
                );
                Ok(None)
            }
        }
    }

    /// Route a call through the host's import table
    fn call(&mut self, call: &Call, location: SourceLocation) -> Result<Option<u32>, ReplayError> {
        let args = call
            .operands()
            .into_iter()
            .map(|operand| self.resolve(operand, location))
            .collect::<Result<Vec<_>, _>>()?;

        self.heap
            .call(call.import().name(), &args)
            .map_err(|source| ReplayError::Host { source, location })
    }

    fn resolve(&self, operand: &Operand, location: SourceLocation) -> Result<u32, ReplayError> {
        match operand {
            Operand::Literal(value) => Ok(*value),
            Operand::Name(name) => {
                self.bindings
                    .get(name)
                    .copied()
                    .ok_or_else(|| ReplayError::UndefinedName {
                        name: name.clone(),
                        location,
                    })
            }
        }
    }

    /// Move the allocator's diagnostics into the log
    fn drain_diagnostics(&mut self, location: SourceLocation) {
        for diagnostic in self.heap.take_diagnostics() {
            let level = if diagnostic.is_error() {
                LogLevel::Error
            } else {
                LogLevel::Warn
            };
            self.log.push(render_diagnostic(&diagnostic), level, location);
        }
    }

    fn take_snapshot(
        &mut self,
        statement_index: Option<usize>,
        location: SourceLocation,
        last_result: Option<u32>,
    ) -> Result<(), ReplayError> {
        let snapshot = Snapshot::capture(
            &self.heap,
            &self.bindings,
            &self.log,
            statement_index,
            location,
            last_result,
        );
        self.snapshot_manager.push(snapshot)?;
        self.history_position = self.snapshot_manager.len() - 1;
        Ok(())
    }

    /// Step backward in history
    pub fn step_backward(&mut self) -> Result<(), ReplayError> {
        if self.history_position == 0 {
            return Err(ReplayError::history("Already at the beginning of the replay"));
        }
        self.history_position -= 1;
        Ok(())
    }

    /// Step forward in history
    pub fn step_forward(&mut self) -> Result<(), ReplayError> {
        if self.history_position + 1 >= self.snapshot_manager.len() {
            return Err(ReplayError::history(
                "No more snapshots available (replay finished)",
            ));
        }
        self.history_position += 1;
        Ok(())
    }

    /// Rewind to the beginning of the history
    pub fn rewind_to_start(&mut self) -> Result<(), ReplayError> {
        if self.snapshot_manager.is_empty() {
            return Err(ReplayError::history("No snapshots available"));
        }
        self.history_position = 0;
        Ok(())
    }

    /// Jump to the last snapshot
    pub fn jump_to_end(&mut self) -> Result<(), ReplayError> {
        if self.snapshot_manager.is_empty() {
            return Err(ReplayError::history("No snapshots available"));
        }
        self.history_position = self.snapshot_manager.len() - 1;
        Ok(())
    }

    // ========== Getter methods for UI ==========

    /// Snapshot at the current history position
    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshot_manager.get(self.history_position)
    }

    /// Source location of the current snapshot
    pub fn current_location(&self) -> SourceLocation {
        self.current()
            .map(|snapshot| snapshot.source_location)
            .unwrap_or_default()
    }

    pub fn history_position(&self) -> usize {
        self.history_position
    }

    pub fn total_snapshots(&self) -> usize {
        self.snapshot_manager.len()
    }

    /// Estimated bytes held by the history, and the limit it may not pass
    pub fn snapshot_memory(&self) -> (usize, usize) {
        (
            self.snapshot_manager.memory_usage(),
            self.snapshot_manager.memory_limit(),
        )
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The error that stopped the replay, if any
    pub fn error(&self) -> Option<&ReplayError> {
        self.error.as_ref()
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// The live heap, in its state after the last executed statement
    pub fn heap(&self) -> &GuestHeap<LinearMemory> {
        &self.heap
    }

    pub fn bindings(&self) -> &FxHashMap<String, Address> {
        &self.bindings
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }
}

fn describe(result: Option<u32>) -> String {
    match result {
        Some(0) => "NULL".to_string(),
        Some(address) => Hex(address).to_string(),
        None => "void".to_string(),
    }
}

fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    format!("{}: {}", diagnostic.kind(), diagnostic)
}
