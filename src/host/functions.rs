//! Foreign functions the host exports to the guest
//!
//! The guest's import table is resolved by name. Anything the host does not
//! implement fails loudly instead of silently returning garbage.

use super::GuestHeap;
use crate::errors::HostError;
use crate::memory::Region;
use std::fmt;
use std::str::FromStr;

/// Imports the heap services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Import {
    Malloc,
    Free,
    Realloc,
    Memset,
    Memcpy,
    Strlen,
}

impl Import {
    pub const ALL: [Import; 6] = [
        Import::Malloc,
        Import::Free,
        Import::Realloc,
        Import::Memset,
        Import::Memcpy,
        Import::Strlen,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Import::Malloc => "malloc",
            Import::Free => "free",
            Import::Realloc => "realloc",
            Import::Memset => "memset",
            Import::Memcpy => "memcpy",
            Import::Strlen => "strlen",
        }
    }

    /// Number of `u32` arguments the guest passes
    pub fn arity(self) -> usize {
        match self {
            Import::Malloc | Import::Free | Import::Strlen => 1,
            Import::Realloc => 2,
            Import::Memset | Import::Memcpy => 3,
        }
    }
}

impl FromStr for Import {
    type Err = HostError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Import::ALL
            .into_iter()
            .find(|import| import.name() == name)
            .ok_or_else(|| HostError::UnknownImport(name.to_string()))
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something that can service guest imports
pub trait HostFunctions {
    /// Invoke the import `name` with raw guest arguments
    ///
    /// Returns the guest-visible result, or `None` for `void` imports.
    fn call(&mut self, name: &str, args: &[u32]) -> Result<Option<u32>, HostError>;
}

impl<R: Region> HostFunctions for GuestHeap<R> {
    fn call(&mut self, name: &str, args: &[u32]) -> Result<Option<u32>, HostError> {
        let import: Import = name.parse()?;
        if args.len() != import.arity() {
            return Err(HostError::ArgumentCount {
                function: import.name(),
                expected: import.arity(),
                got: args.len(),
            });
        }

        let result = match import {
            Import::Malloc => Some(self.malloc(args[0])),
            Import::Free => {
                self.free(args[0]);
                None
            }
            Import::Realloc => Some(self.realloc(args[0], args[1])),
            // The fill value is truncated to a byte, as a C `int` argument would be
            Import::Memset => {
                self.memset(args[0], args[1] as u8, args[2])?;
                None
            }
            Import::Memcpy => Some(self.memcpy(args[0], args[1], args[2])?),
            Import::Strlen => Some(self.strlen(args[0])?),
        };
        Ok(result)
    }
}
