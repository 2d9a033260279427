//! Mapping between [`StructureDocument`] and the NBT tree of a structure file.
//!
//! ```text
//! format_version: int
//! size: [int; 3]
//! structure:
//!     block_indices: [[int], [int]]       primary and secondary layer
//!     entities: [compound]
//!     palette:
//!         default:
//!             block_palette: [{name, states, version}]
//!             block_position_data: {"<primary index>": {block_entity_data, ..}}
//! structure_world_origin: [int; 3]
//! ```

use log::{debug, warn};
use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use super::StructureDocument;
use crate::attachments::AttachmentStore;
use crate::block_storage::{
    checked_volume, Block, BlockPalette, BlockTypeIndex, Layer, Position, VoxelGrid,
};
use crate::error::{MalformedCause, Result};
use crate::fields;

/// The only structure format version this crate writes.
pub const FORMAT_VERSION: i32 = 1;

const DEFAULT_PALETTE: &str = "default";
const ENTITY_POS: &str = "Pos";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// World position the structure is about to be placed at. Entity
    /// positions are moved from the capture origin to this one.
    pub placement_origin: Position,
}

impl DecodeOptions {
    pub fn placed_at(placement_origin: Position) -> Self {
        Self { placement_origin }
    }
}

pub(super) enum PosShift {
    Shifted,
    Missing,
    Malformed,
}

/// Adds `delta` to every component of an entity's `Pos`, keeping each
/// component's tag kind.
pub(super) fn offset_entity_pos(entity: &mut NbtCompound, delta: [i32; 3]) -> PosShift {
    let pos = match entity.inner_mut().get_mut(ENTITY_POS) {
        Some(NbtTag::List(pos)) => pos,
        Some(_) => return PosShift::Malformed,
        None => return PosShift::Missing,
    };
    if pos.len() != 3 {
        return PosShift::Malformed;
    }
    let numeric = pos
        .iter()
        .all(|c| matches!(c, NbtTag::Float(_) | NbtTag::Double(_) | NbtTag::Int(_)));
    if !numeric {
        return PosShift::Malformed;
    }
    for (component, d) in pos.iter_mut().zip(delta) {
        match component {
            NbtTag::Float(v) => *v += d as f32,
            NbtTag::Double(v) => *v += d as f64,
            NbtTag::Int(v) => *v += d,
            _ => {}
        }
    }
    PosShift::Shifted
}

fn read_ints(c: &NbtCompound, key: &str) -> Result<Vec<i32>> {
    fields::ints(fields::list(c, key, "")?, key)
}

fn read_size(root: &NbtCompound) -> Result<[u32; 3]> {
    let size = <[i32; 3]>::try_from(read_ints(root, "size")?).map_err(|v| {
        MalformedCause::BadSize(format!("size has {} entries, expected 3", v.len()))
    })?;
    let mut extents = [0u32; 3];
    for (e, s) in extents.iter_mut().zip(size) {
        *e = u32::try_from(s)
            .map_err(|_| MalformedCause::BadSize(format!("negative dimension in {:?}", size)))?;
    }
    Ok(extents)
}

fn read_origin(root: &NbtCompound) -> Result<Position> {
    let key = "structure_world_origin";
    let origin = <[i32; 3]>::try_from(read_ints(root, key)?).map_err(|_| MalformedCause::WrongKind {
        path: key.to_owned(),
        expected: "list of 3 ints",
    })?;
    Ok(Position::from(origin))
}

fn read_layer(indices: &NbtList, layer: usize) -> Result<Vec<BlockTypeIndex>> {
    let path = format!("structure.block_indices[{}]", layer);
    match indices.iter().nth(layer) {
        Some(NbtTag::List(values)) => Ok(fields::ints(values, &path)?
            .into_iter()
            .map(BlockTypeIndex::from_raw)
            .collect()),
        _ => Err(MalformedCause::WrongKind {
            path,
            expected: "list",
        }
        .into()),
    }
}

/// Validates every reference against the source palette and moves it through
/// `remap`, which folds duplicate source entries onto one palette index.
fn resolve_layer(
    cells: &mut [BlockTypeIndex],
    layer: Layer,
    remap: &[BlockTypeIndex],
) -> Result<()> {
    for (linear_index, cell) in cells.iter_mut().enumerate() {
        if cell.is_no_block() {
            continue;
        }
        match cell.palette_slot().and_then(|slot| remap.get(slot)) {
            Some(resolved) => *cell = *resolved,
            None => {
                return Err(MalformedCause::PaletteIndex {
                    layer,
                    linear_index,
                    index: cell.raw(),
                    len: remap.len(),
                }
                .into())
            }
        }
    }
    Ok(())
}

impl StructureDocument {
    /// Builds a document from a structure tree, validating its shape first.
    /// Nothing is returned unless the whole tree is well formed.
    pub fn decode(root: &NbtCompound, options: &DecodeOptions) -> Result<Self> {
        let format_version = match root.inner().get("format_version") {
            Some(_) => fields::int(root, "format_version", "")?,
            None => {
                warn!("Structure has no format_version, assuming {}", FORMAT_VERSION);
                FORMAT_VERSION
            }
        };
        if format_version != FORMAT_VERSION {
            warn!(
                "Structure has format_version {}, reading it as version {}",
                format_version, FORMAT_VERSION
            );
        }

        let extents = read_size(root)?;
        let volume = checked_volume(extents).ok_or_else(|| {
            MalformedCause::BadSize(format!("{:?} has more cells than can be addressed", extents))
        })?;

        let structure = fields::compound(root, "structure", "")?;

        let indices = fields::list(structure, "block_indices", "structure")?;
        if indices.len() != 2 {
            return Err(MalformedCause::LayerCount(indices.len()).into());
        }
        let mut primary = read_layer(indices, 0)?;
        let mut secondary = read_layer(indices, 1)?;
        if primary.len() != volume || secondary.len() != volume {
            return Err(MalformedCause::LayerLength {
                expected: volume,
                primary: primary.len(),
                secondary: secondary.len(),
            }
            .into());
        }

        let palettes = fields::compound(structure, "palette", "structure")?;
        for name in palettes.inner().keys().filter(|k| *k != DEFAULT_PALETTE) {
            warn!("Ignoring named palette {:?}, only \"default\" is read", name);
        }
        let default = match palettes.inner().get(DEFAULT_PALETTE) {
            Some(NbtTag::Compound(default)) => default,
            Some(_) => {
                return Err(MalformedCause::WrongKind {
                    path: "structure.palette.default".to_owned(),
                    expected: "compound",
                }
                .into())
            }
            None => return Err(MalformedCause::MissingDefaultPalette.into()),
        };

        let palette_path = "structure.palette.default";
        let mut palette = BlockPalette::new();
        let mut remap = Vec::new();
        for (i, entry) in fields::list(default, "block_palette", palette_path)?
            .iter()
            .enumerate()
        {
            let path = format!("{}.block_palette[{}]", palette_path, i);
            let entry = match entry {
                NbtTag::Compound(entry) => entry,
                _ => {
                    return Err(MalformedCause::WrongKind {
                        path,
                        expected: "compound",
                    }
                    .into())
                }
            };
            remap.push(palette.intern(&Block::from_palette_entry(entry, &path)?));
        }
        if palette.len() != remap.len() {
            debug!(
                "Folded {} duplicate palette entries",
                remap.len() - palette.len()
            );
        }

        resolve_layer(&mut primary, Layer::Primary, &remap)?;
        resolve_layer(&mut secondary, Layer::Secondary, &remap)?;

        let mut attachments = AttachmentStore::new();
        if default.inner().contains_key("block_position_data") {
            let position_data = fields::compound(default, "block_position_data", palette_path)?;
            for (key, entry) in position_data.inner().iter() {
                let linear_index = key
                    .parse::<usize>()
                    .ok()
                    .filter(|&i| i < volume)
                    .ok_or_else(|| MalformedCause::BadPositionKey(key.clone()))?;
                match entry {
                    NbtTag::Compound(entry) => {
                        attachments.insert_position_data(linear_index, entry.clone());
                    }
                    _ => {
                        return Err(MalformedCause::WrongKind {
                            path: format!("{}.block_position_data.{}", palette_path, key),
                            expected: "compound",
                        }
                        .into())
                    }
                }
            }
        }

        let origin = read_origin(root)?;
        let placement = options.placement_origin;
        let delta = [
            placement.x - origin.x,
            placement.y - origin.y,
            placement.z - origin.z,
        ];

        if structure.inner().contains_key("entities") {
            for (i, entity) in fields::list(structure, "entities", "structure")?
                .iter()
                .enumerate()
            {
                let mut entity = match entity {
                    NbtTag::Compound(entity) => entity.clone(),
                    _ => {
                        return Err(MalformedCause::WrongKind {
                            path: format!("structure.entities[{}]", i),
                            expected: "compound",
                        }
                        .into())
                    }
                };
                match offset_entity_pos(&mut entity, delta) {
                    PosShift::Shifted => {}
                    PosShift::Missing => warn!("Entity {} has no position, leaving it as is", i),
                    PosShift::Malformed => return Err(MalformedCause::BadEntityPosition(i).into()),
                }
                attachments.entity_append(entity);
            }
        }

        let grid = VoxelGrid::from_layers(extents, primary, secondary)?;

        debug!(
            "Decoded structure of size {:?} with {} palette entries, {} entities and {} block entities",
            extents,
            palette.len(),
            attachments.entities().len(),
            attachments.block_entity_count()
        );

        Ok(Self {
            format_version,
            palette,
            grid,
            attachments,
            origin,
        })
    }

    /// Produces the structure tree for this document. Entity positions are
    /// moved back into world space relative to the capture origin.
    pub fn encode(&self) -> NbtCompound {
        let mut block_palette = NbtList::with_capacity(self.palette.len());
        for (_, block) in self.palette.iter() {
            block_palette.push(NbtTag::Compound(block.to_palette_entry()));
        }

        let mut position_data = NbtCompound::new();
        for (i, entry) in self.attachments.iter_position_data() {
            position_data.insert(i.to_string(), NbtTag::Compound(entry.clone()));
        }

        let mut default = NbtCompound::new();
        default.insert("block_palette", NbtTag::List(block_palette));
        default.insert("block_position_data", NbtTag::Compound(position_data));

        let mut palettes = NbtCompound::new();
        palettes.insert(DEFAULT_PALETTE, NbtTag::Compound(default));

        let mut block_indices = NbtList::with_capacity(2);
        for layer in [Layer::Primary, Layer::Secondary] {
            let cells = self.grid.iter_block_indicies(layer).map(BlockTypeIndex::raw);
            block_indices.push(NbtTag::List(fields::int_list(cells)));
        }

        let mut entities = NbtList::with_capacity(self.attachments.entities().len());
        for (i, entity) in self.attachments.entities().iter().enumerate() {
            let mut entity = entity.clone();
            if let PosShift::Malformed = offset_entity_pos(&mut entity, self.origin.as_array()) {
                warn!("Entity {} has a malformed position, writing it unchanged", i);
            }
            entities.push(NbtTag::Compound(entity));
        }

        let mut structure = NbtCompound::new();
        structure.insert("block_indices", NbtTag::List(block_indices));
        structure.insert("entities", NbtTag::List(entities));
        structure.insert("palette", NbtTag::Compound(palettes));

        let [sx, sy, sz] = *self.grid.extents();
        let size = [sx as i32, sy as i32, sz as i32];

        let mut root = NbtCompound::new();
        root.insert("format_version", NbtTag::Int(FORMAT_VERSION));
        root.insert("size", NbtTag::List(fields::int_list(size)));
        root.insert("structure", NbtTag::Compound(structure));
        root.insert(
            "structure_world_origin",
            NbtTag::List(fields::int_list(self.origin.as_array())),
        );
        root
    }
}
