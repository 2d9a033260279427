use super::{Block, BlockTypeIndex};
use crate::error::{Result, StructureError};

/// Ordered, deduplicated list of the blocks a structure uses.
///
/// Indices handed out by [`BlockPalette::intern`] are stable: entries are only
/// ever appended, never replaced or removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockPalette {
    blocks: Vec<Block>,
}

impl BlockPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of the block equal to `block`, appending it if there
    /// is none yet.
    pub fn intern(&mut self, block: &Block) -> BlockTypeIndex {
        // Very stupid implementation. Only fix if it shows up in a profile
        // because palettes rarely grow past a few hundred entries and interning
        // happens once per fill, not once per cell.
        if let Some(i) = self.find(block) {
            return i;
        }
        let iidx = self.blocks.len();
        self.blocks.push(block.clone());
        BlockTypeIndex::from(iidx)
    }

    pub fn find(&self, block: &Block) -> Option<BlockTypeIndex> {
        self.blocks
            .iter()
            .position(|b| b == block)
            .map(BlockTypeIndex::from)
    }

    /// Looks up a palette entry. [`BlockTypeIndex::NO_BLOCK`] resolves to `None`.
    pub fn get(&self, index: BlockTypeIndex) -> Result<Option<&Block>> {
        if index.is_no_block() {
            return Ok(None);
        }
        index
            .palette_slot()
            .and_then(|i| self.blocks.get(i))
            .map(Some)
            .ok_or(StructureError::PaletteIndexOutOfRange {
                index: index.raw(),
                len: self.blocks.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockTypeIndex, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (BlockTypeIndex::from(i), b))
    }
}
