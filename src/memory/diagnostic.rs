//! Anomalies the allocator absorbs instead of failing
//!
//! The guest only ever sees a non-zero address or the null address. Anything
//! else that goes wrong is logged through `tracing` and kept as a
//! [`Diagnostic`] on the space, where the embedding can drain it.

use super::{Address, Hex};
use crate::errors::GrowError;
use std::fmt;

/// Something unusual the allocator noticed and worked around
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The region could not grow enough for a request
    Exhausted {
        requested: u32,
        available: u32,
        cause: GrowError,
    },

    /// `free(NULL)`
    NullFree,

    /// `free` of an address that is not the start of any block
    UnknownAddress { address: Address },

    /// An occupied block chains into a block that is already free
    ChainCorruption { address: Address, next: Address },

    /// A chain link names a block the table does not have
    DanglingChain { address: Address, next: Address },

    /// A free block chained into an occupied one; the link was dropped
    StaleChain { address: Address, next: Address },
}

impl Diagnostic {
    /// Short tag used in logs and the inspector
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::Exhausted { .. } => "exhausted",
            Diagnostic::NullFree => "null-free",
            Diagnostic::UnknownAddress { .. } => "unknown-address",
            Diagnostic::ChainCorruption { .. } => "chain-corruption",
            Diagnostic::DanglingChain { .. } => "dangling-chain",
            Diagnostic::StaleChain { .. } => "stale-chain",
        }
    }

    /// Whether the guest lost an allocation because of this
    pub fn is_error(&self) -> bool {
        matches!(self, Diagnostic::Exhausted { .. })
    }

    /// Forward to the `tracing` subscriber at the matching level
    pub(crate) fn emit(&self) {
        match self {
            Diagnostic::Exhausted {
                requested,
                available,
                cause,
            } => {
                tracing::error!(
                    requested,
                    available,
                    overflow = requested.saturating_sub(*available),
                    %cause,
                    "out of memory"
                );
            }
            Diagnostic::NullFree => {
                tracing::warn!("attempting to free a NULL pointer");
            }
            Diagnostic::UnknownAddress { address } => {
                tracing::warn!(address = %Hex(*address), "free of unknown address ignored");
            }
            Diagnostic::ChainCorruption { address, next } => {
                tracing::warn!(
                    address = %Hex(*address),
                    next = %Hex(*next),
                    "used block was pointing to unoccupied memory"
                );
            }
            Diagnostic::DanglingChain { address, next } => {
                tracing::warn!(
                    address = %Hex(*address),
                    next = %Hex(*next),
                    "chain points at a missing block"
                );
            }
            Diagnostic::StaleChain { address, next } => {
                tracing::debug!(
                    address = %Hex(*address),
                    next = %Hex(*next),
                    "dropped stale chain link"
                );
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Exhausted {
                requested,
                available,
                cause,
            } => write!(
                f,
                "out of memory: requested {} bytes but only {} available ({} bytes overflow): {}",
                requested,
                available,
                requested.saturating_sub(*available),
                cause
            ),
            Diagnostic::NullFree => write!(f, "attempting to free a NULL pointer"),
            Diagnostic::UnknownAddress { address } => {
                write!(f, "free of unknown address 0x{:08x} ignored", address)
            }
            Diagnostic::ChainCorruption { address, next } => write!(
                f,
                "used block 0x{:08x} was pointing to unoccupied block 0x{:08x}",
                address, next
            ),
            Diagnostic::DanglingChain { address, next } => write!(
                f,
                "block 0x{:08x} chains to missing block 0x{:08x}",
                address, next
            ),
            Diagnostic::StaleChain { address, next } => write!(
                f,
                "dropped stale link 0x{:08x} -> 0x{:08x} (target in use)",
                address, next
            ),
        }
    }
}
