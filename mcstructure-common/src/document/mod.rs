//! A complete structure: palette, block grid, attachments and origin, plus the
//! operations that keep those consistent with one another.

mod codec;


use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;
use quartz_nbt::NbtCompound;

use crate::attachments::AttachmentStore;
use crate::block_storage::{
    checked_volume, Block, BlockPalette, BlockTypeIndex, Layer, Position, VoxelGrid,
};
use crate::error::{Result, StructureError};
use crate::transform::{self, MirrorAxis, OrientationTable, Rotation, Transform};
use crate::tree_io::{self, Endianness};

pub use codec::{DecodeOptions, FORMAT_VERSION};

#[derive(Clone, Debug, PartialEq)]
pub struct StructureDocument {
    format_version: i32,
    palette: BlockPalette,
    grid: VoxelGrid,
    attachments: AttachmentStore,
    /// World position the structure was captured at. Only used to rebase
    /// entity positions.
    origin: Position,
}

impl StructureDocument {
    /// A structure of the given size whose primary layer is entirely `fill`.
    pub fn new(size: [u32; 3], fill: &Block) -> Result<Self> {
        let mut palette = BlockPalette::new();
        let fill = palette.intern(fill);
        let grid = VoxelGrid::new(size[0], size[1], size[2], fill)?;
        Ok(Self::from_parts(palette, grid))
    }

    /// A structure of the given size that leaves every position untouched when placed.
    pub fn empty(size: [u32; 3]) -> Result<Self> {
        let grid = VoxelGrid::new(size[0], size[1], size[2], BlockTypeIndex::NO_BLOCK)?;
        Ok(Self::from_parts(BlockPalette::new(), grid))
    }

    fn from_parts(palette: BlockPalette, grid: VoxelGrid) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            palette,
            grid,
            attachments: AttachmentStore::new(),
            origin: Position::ZERO,
        }
    }

    pub fn size(&self) -> [u32; 3] {
        *self.grid.extents()
    }

    pub fn palette(&self) -> &BlockPalette {
        &self.palette
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Position) -> &mut Self {
        self.origin = origin;
        self
    }

    /// Version read from the source tree. Always written back as [`FORMAT_VERSION`].
    pub fn format_version(&self) -> i32 {
        self.format_version
    }

    /// The primary layer block at `pos`, `None` where the structure holds no block.
    pub fn get_block(&self, pos: Position) -> Result<Option<&Block>> {
        self.get_block_in(pos, Layer::Primary)
    }

    pub fn get_block_in(&self, pos: Position, layer: Layer) -> Result<Option<&Block>> {
        self.palette.get(self.grid.get(pos, layer)?)
    }

    /// Places `block` at `pos`, or clears the position to no block for `None`.
    pub fn set_block(&mut self, pos: Position, block: Option<&Block>) -> Result<&mut Self> {
        match block {
            Some(block) => self.set_single(pos, block),
            None => {
                self.grid.set(pos, Layer::Primary, BlockTypeIndex::NO_BLOCK)?;
                Ok(self)
            }
        }
    }

    pub fn set_single(&mut self, pos: Position, block: &Block) -> Result<&mut Self> {
        self.grid.set_single(&mut self.palette, pos, block)?;
        Ok(self)
    }

    pub fn fill_region(&mut self, a: Position, b: Position, block: &Block) -> Result<&mut Self> {
        self.grid.fill_region(&mut self.palette, a, b, block)?;
        Ok(self)
    }

    /// Puts still water in the secondary layer at `pos`, or clears it.
    pub fn set_waterlogged(&mut self, pos: Position, waterlogged: bool) -> Result<&mut Self> {
        // Bounds first so a failed call leaves the palette alone
        self.grid.linear_index(pos)?;
        let index = if waterlogged {
            self.palette.intern(&Block::water())
        } else {
            BlockTypeIndex::NO_BLOCK
        };
        self.grid.set(pos, Layer::Secondary, index)?;
        Ok(self)
    }

    pub fn add_entity(&mut self, data: NbtCompound) -> &mut Self {
        self.attachments.entity_append(data);
        self
    }

    pub fn attach_block_entity(&mut self, pos: Position, data: NbtCompound) -> Result<&mut Self> {
        let i = self.grid.linear_index(pos)?;
        self.attachments.attach_block_entity(i, data);
        Ok(self)
    }

    pub fn block_entity(&self, pos: Position) -> Result<Option<&NbtCompound>> {
        let i = self.grid.linear_index(pos)?;
        Ok(self.attachments.block_entity(i))
    }

    /// Rotates clockwise (seen from above) by 0, 90, 180 or 270 degrees.
    pub fn rotate(&mut self, degrees: i32) -> Result<&mut Self> {
        let rotation = Rotation::from_degrees(degrees)?;
        self.transform_with(Transform::Rotate(rotation), &OrientationTable::default())
    }

    pub fn mirror(&mut self, axis: MirrorAxis) -> Result<&mut Self> {
        self.transform_with(Transform::Mirror(axis), &OrientationTable::default())
    }

    /// Applies `t`, reorienting block states according to `table`. On error
    /// the document is left as it was.
    pub fn transform_with(&mut self, t: Transform, table: &OrientationTable) -> Result<&mut Self> {
        let out = transform::apply(t, table, &self.palette, &self.grid, &self.attachments)?;
        self.palette = out.palette;
        self.grid = out.grid;
        self.attachments = out.attachments;
        Ok(self)
    }

    /// Changes the size of the structure. Blocks and block entities outside
    /// the new size are dropped and new space is filled with `fill`.
    pub fn resize(&mut self, size: [u32; 3], fill: Option<&Block>) -> Result<&mut Self> {
        // Size first so a failed resize leaves the palette alone
        if checked_volume(size).is_none() {
            return Err(StructureError::SizeTooLarge { extents: size });
        }
        let fill = match fill {
            Some(block) => self.palette.intern(block),
            None => BlockTypeIndex::NO_BLOCK,
        };
        let mut grid = VoxelGrid::new(size[0], size[1], size[2], fill)?;
        let secondary = self.grid.layer(Layer::Secondary);
        let mut moved = Vec::with_capacity(self.grid.volume());
        for (pos, i, primary) in self.grid.iter_block_coords(Layer::Primary) {
            if grid.contains(pos) {
                grid.set(pos, Layer::Primary, primary)?;
                grid.set(pos, Layer::Secondary, secondary[i])?;
                moved.push(Some(grid.linear_index(pos)?));
            } else {
                moved.push(None);
            }
        }
        self.attachments = self
            .attachments
            .remapped(|i| moved.get(i).copied().flatten());
        debug!("Resized structure from {:?} to {:?}", self.grid.extents(), size);
        self.grid = grid;
        Ok(self)
    }

    /// Returns a new structure holding `self` at its origin with `other`
    /// overlaid at `offset`. Cells where `other` has no block keep the block
    /// from `self`. A negative `offset`, or one that pushes `other` past the
    /// largest addressable coordinate, is [`StructureError::CoordinateOutOfBounds`].
    pub fn combine(&self, other: &StructureDocument, offset: Position) -> Result<StructureDocument> {
        let out_of_bounds = || StructureError::CoordinateOutOfBounds {
            pos: offset,
            extents: self.size(),
        };
        // Far end of `other` along one axis, which must stay addressable
        let reach = |at: i32, len: u32| {
            u32::try_from(at)
                .ok()
                .and_then(|at| at.checked_add(len))
                .filter(|&end| end <= i32::MAX as u32)
        };
        let [sx, sy, sz] = self.size();
        let [ox, oy, oz] = other.size();
        let size = [
            sx.max(reach(offset.x, ox).ok_or_else(out_of_bounds)?),
            sy.max(reach(offset.y, oy).ok_or_else(out_of_bounds)?),
            sz.max(reach(offset.z, oz).ok_or_else(out_of_bounds)?),
        ];

        let mut combined = self.clone();
        combined.resize(size, None)?;

        let remap: Vec<BlockTypeIndex> = other
            .palette
            .iter()
            .map(|(_, block)| combined.palette.intern(block))
            .collect();
        let map_index = |index: BlockTypeIndex| {
            index
                .palette_slot()
                .and_then(|slot| remap.get(slot).copied())
                .unwrap_or(BlockTypeIndex::NO_BLOCK)
        };

        let other_secondary = other.grid.layer(Layer::Secondary);
        for (pos, i, primary) in other.grid.iter_block_coords(Layer::Primary) {
            let target = Position::new(pos.x + offset.x, pos.y + offset.y, pos.z + offset.z);
            let j = combined.grid.linear_index(target)?;
            if !primary.is_no_block() {
                combined.grid.set(target, Layer::Primary, map_index(primary))?;
                combined.attachments.detach(j);
                if let Some(entry) = other.attachments.position_data(i) {
                    combined.attachments.insert_position_data(j, entry.clone());
                }
            }
            if !other_secondary[i].is_no_block() {
                combined
                    .grid
                    .set(target, Layer::Secondary, map_index(other_secondary[i]))?;
            }
        }

        for entity in other.attachments.entities() {
            let mut entity = entity.clone();
            codec::offset_entity_pos(&mut entity, offset.as_array());
            combined.attachments.entity_append(entity);
        }

        Ok(combined)
    }

    /// Reads a structure from `reader` using the given byte order.
    pub fn load<R: Read>(
        reader: &mut R,
        endianness: Endianness,
        options: &DecodeOptions,
    ) -> Result<Self> {
        let (root, _) = tree_io::read_tree(reader, endianness)?;
        Self::decode(&root, options)
    }

    /// Reads a little-endian structure file.
    pub fn load_from_path(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::load(&mut reader, Endianness::Little, options)
    }

    pub fn dump<W: Write>(&self, writer: &mut W, endianness: Endianness) -> Result<()> {
        tree_io::write_tree(writer, "", &self.encode(), endianness)
    }

    /// Writes a little-endian structure file, replacing anything at `path`.
    pub fn dump_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.dump(&mut writer, Endianness::Little)?;
        writer.flush()?;
        Ok(())
    }
}
