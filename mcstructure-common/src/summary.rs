//! Serializable overview of a structure, for tools that want to print or
//! export what a file contains without dealing with the grid directly.

use quartz_nbt::NbtCompound;
use serde::Serialize;

use crate::block_storage::{Block, Layer};
use crate::document::StructureDocument;

#[derive(Debug, Serialize)]
pub struct PaletteUsage<'a> {
    pub index: i32,
    pub block: &'a Block,
    /// Number of primary layer cells using this entry.
    pub count: usize,
    /// Number of secondary layer cells using this entry.
    pub secondary_count: usize,
}

#[derive(Debug, Serialize)]
pub struct BlockEntitySummary<'a> {
    pub position: [i32; 3],
    pub data: &'a NbtCompound,
}

#[derive(Debug, Serialize)]
pub struct StructureSummary<'a> {
    pub format_version: i32,
    pub size: [u32; 3],
    pub origin: [i32; 3],
    pub palette: Vec<PaletteUsage<'a>>,
    /// Primary layer cells that leave the world untouched.
    pub no_block_cells: usize,
    /// Cells with something in the secondary layer, usually water.
    pub layered_cells: usize,
    pub entity_count: usize,
    pub block_entities: Vec<BlockEntitySummary<'a>>,
}

impl<'a> StructureSummary<'a> {
    pub fn new(doc: &'a StructureDocument) -> Self {
        let grid = doc.grid();
        let mut counts = vec![[0usize; 2]; doc.palette().len()];
        let mut no_block_cells = 0;
        let mut layered_cells = 0;

        for (column, layer) in [Layer::Primary, Layer::Secondary].into_iter().enumerate() {
            for index in grid.iter_block_indicies(layer) {
                match index.palette_slot().and_then(|slot| counts.get_mut(slot)) {
                    Some(count) => {
                        count[column] += 1;
                        if layer == Layer::Secondary {
                            layered_cells += 1;
                        }
                    }
                    None if layer == Layer::Primary => no_block_cells += 1,
                    None => {}
                }
            }
        }

        let palette = doc
            .palette()
            .iter()
            .zip(counts)
            .map(|((index, block), [count, secondary_count])| PaletteUsage {
                index: index.raw(),
                block,
                count,
                secondary_count,
            })
            .collect();

        let block_entities = doc
            .attachments()
            .iter_position_data()
            .filter_map(|(i, _)| {
                doc.attachments()
                    .block_entity(i)
                    .map(|data| BlockEntitySummary {
                        position: grid.position_of(i).as_array(),
                        data,
                    })
            })
            .collect();

        Self {
            format_version: doc.format_version(),
            size: doc.size(),
            origin: doc.origin().as_array(),
            palette,
            no_block_cells,
            layered_cells,
            entity_count: doc.attachments().entities().len(),
            block_entities,
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
