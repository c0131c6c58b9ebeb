//! Syntax tree for heap trace scripts

use crate::host::Import;
use std::fmt;

/// Line and column of a token or statement (both 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A value passed to a heap call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Integer literal; `null` parses to `Literal(0)`
    Literal(u32),
    /// A name bound by an earlier assignment
    Name(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(0) => write!(f, "null"),
            Operand::Literal(n) => write!(f, "{}", n),
            Operand::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A guest call into the allocator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Malloc { size: Operand },
    Free { address: Operand },
    Realloc { address: Operand, size: Operand },
}

impl Call {
    /// Whether the call produces an address that can be bound to a name
    pub fn returns_value(&self) -> bool {
        !matches!(self, Call::Free { .. })
    }

    /// The host import this call resolves to
    pub fn import(&self) -> Import {
        match self {
            Call::Malloc { .. } => Import::Malloc,
            Call::Free { .. } => Import::Free,
            Call::Realloc { .. } => Import::Realloc,
        }
    }

    /// Arguments in the order the guest passes them
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Call::Malloc { size } => vec![size],
            Call::Free { address } => vec![address],
            Call::Realloc { address, size } => vec![address, size],
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::Malloc { size } => write!(f, "malloc {}", size),
            Call::Free { address } => write!(f, "free {}", address),
            Call::Realloc { address, size } => write!(f, "realloc {} {}", address, size),
        }
    }
}

/// What a statement does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `name = malloc ...` / `name = realloc ...`
    Assign { name: String, call: Call },
    /// A call whose result is discarded
    Call(Call),
    /// `write address b0 b1 ...`
    Write { address: Operand, bytes: Vec<u8> },
    /// `link first second`
    Link { first: Operand, second: Operand },
}

/// One line of a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: SourceLocation,
}

/// A parsed script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

impl Script {
    pub fn new() -> Self {
        Script {
            statements: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
