//! Block descriptors and the block table
//!
//! The table is keyed by block address. Blocks are only ever inserted at the
//! bump cursor, which never moves backwards, so address order is also the
//! order in which blocks were carved. Scans that take "the first match" are
//! therefore deterministic.

use super::Address;
use crate::errors::HeapError;
use std::collections::BTreeMap;

/// A contiguous span `[address, address + size)` of the region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub address: Address,
    pub size: u32,
    pub occupied: bool,
    /// Physically adjacent continuation of the same allocation
    pub chain_next: Option<Address>,
}

impl Block {
    /// A freshly carved, occupied block with no chain
    pub fn new(address: Address, size: u32) -> Self {
        Block {
            address,
            size,
            occupied: true,
            chain_next: None,
        }
    }

    /// First address past the block
    pub fn end(&self) -> u64 {
        self.address as u64 + self.size as u64
    }
}

/// Every block ever carved out of one allocation space
#[derive(Debug, Clone, Default)]
pub struct BlockTable {
    blocks: BTreeMap<Address, Block>,
}

impl BlockTable {
    pub fn new() -> Self {
        BlockTable {
            blocks: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Look up the block starting at `address`
    pub fn get(&self, address: Address) -> Option<&Block> {
        self.blocks.get(&address)
    }

    pub fn get_mut(&mut self, address: Address) -> Option<&mut Block> {
        self.blocks.get_mut(&address)
    }

    pub fn contains(&self, address: Address) -> bool {
        self.blocks.contains_key(&address)
    }

    /// Record a new block, replacing any entry at the same address
    pub fn insert(&mut self, block: Block) {
        self.blocks.insert(block.address, block);
    }

    /// Blocks in address order
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.blocks.values_mut()
    }

    /// Follow the chain starting at `address`
    ///
    /// Yields nothing if `address` is unknown and stops early at a link whose
    /// target is missing from the table.
    pub fn chain(&self, address: Address) -> Chain<'_> {
        Chain {
            table: self,
            next: Some(address),
        }
    }

    /// Total size of the allocation starting at `address`, across its chain
    pub fn chain_size(&self, address: Address) -> Option<u64> {
        if !self.contains(address) {
            return None;
        }
        Some(self.chain(address).map(|block| block.size as u64).sum())
    }

    /// Declare `second` as the continuation of `first`
    ///
    /// Both blocks must exist and `second` must start exactly where `first`
    /// ends.
    pub fn link(&mut self, first: Address, second: Address) -> Result<(), HeapError> {
        let first_end = self
            .get(first)
            .ok_or(HeapError::UnknownBlock { address: first })?
            .end();
        if !self.contains(second) {
            return Err(HeapError::UnknownBlock { address: second });
        }
        if first_end != second as u64 {
            return Err(HeapError::NotAdjacent {
                first,
                first_end: first_end.min(u32::MAX as u64) as Address,
                second,
            });
        }

        if let Some(block) = self.get_mut(first) {
            block.chain_next = Some(second);
        }
        Ok(())
    }
}

/// Iterator over the blocks of one chain
pub struct Chain<'a> {
    table: &'a BlockTable,
    next: Option<Address>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.table.get(self.next?)?;
        // Links only ever point forward through the region
        self.next = block.chain_next.filter(|&next| next > block.address);
        Some(block)
    }
}
