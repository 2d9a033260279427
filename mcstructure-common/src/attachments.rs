//! Entity and block entity data carried alongside the block grid. Both are
//! opaque NBT to this crate and are passed through untouched, apart from the
//! entity position rebasing done by the document codec.

use std::collections::BTreeMap;

use quartz_nbt::{NbtCompound, NbtTag};

/// Key of the block entity payload inside a `block_position_data` entry.
pub const BLOCK_ENTITY_DATA: &str = "block_entity_data";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttachmentStore {
    entities: Vec<NbtCompound>,
    /// Keyed by primary layer linear index. Each value is the whole
    /// `block_position_data` entry so that keys other than
    /// [`BLOCK_ENTITY_DATA`] survive a round trip.
    position_data: BTreeMap<usize, NbtCompound>,
}

impl AttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_append(&mut self, data: NbtCompound) -> &mut Self {
        self.entities.push(data);
        self
    }

    pub fn entities(&self) -> &[NbtCompound] {
        &self.entities
    }

    /// Attaches block entity data to the primary layer cell at `linear_index`,
    /// replacing any block entity already there.
    pub fn attach_block_entity(&mut self, linear_index: usize, data: NbtCompound) -> &mut Self {
        self.position_data
            .entry(linear_index)
            .or_insert_with(NbtCompound::new)
            .insert(BLOCK_ENTITY_DATA, NbtTag::Compound(data));
        self
    }

    /// Stores a complete `block_position_data` entry as read from a file.
    pub fn insert_position_data(&mut self, linear_index: usize, entry: NbtCompound) -> &mut Self {
        self.position_data.insert(linear_index, entry);
        self
    }

    /// Removes everything attached to the cell at `linear_index`.
    pub fn detach(&mut self, linear_index: usize) -> Option<NbtCompound> {
        self.position_data.remove(&linear_index)
    }

    pub fn block_entity(&self, linear_index: usize) -> Option<&NbtCompound> {
        match self.position_data.get(&linear_index)?.inner().get(BLOCK_ENTITY_DATA) {
            Some(NbtTag::Compound(data)) => Some(data),
            _ => None,
        }
    }

    pub fn position_data(&self, linear_index: usize) -> Option<&NbtCompound> {
        self.position_data.get(&linear_index)
    }

    pub fn iter_position_data(&self) -> impl Iterator<Item = (usize, &NbtCompound)> {
        self.position_data.iter().map(|(i, data)| (*i, data))
    }

    pub fn block_entity_count(&self) -> usize {
        self.position_data
            .values()
            .filter(|entry| entry.inner().contains_key(BLOCK_ENTITY_DATA))
            .count()
    }

    /// Returns a copy with every cell keyed attachment moved through `remap`.
    /// Attachments for which `remap` returns `None` are dropped.
    pub fn remapped(&self, mut remap: impl FnMut(usize) -> Option<usize>) -> Self {
        Self {
            entities: self.entities.clone(),
            position_data: self
                .position_data
                .iter()
                .filter_map(|(i, data)| remap(*i).map(|j| (j, data.clone())))
                .collect(),
        }
    }
}
