//! Rotation and mirroring of a structure's blocks about the vertical axis.
//!
//! A transform never edits its input. It produces a new grid, a palette that
//! extends the old one with any reoriented block variants, and attachments
//! rekeyed to the cells' new linear indices. The caller swaps all three in at
//! once.

pub mod orientation;

#[cfg(test)]
mod tests;

use std::fmt::Display;
use std::str::FromStr;

use log::debug;

use crate::attachments::AttachmentStore;
use crate::block_storage::{BlockPalette, BlockTypeIndex, Direction, Layer, Position, VoxelGrid};
use crate::error::{Result, StructureError};

pub use orientation::{OrientationEncoding, OrientationRule, OrientationTable};

/// Clockwise quarter turns about the Y axis, seen from above.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees {
            0 => Ok(Self::None),
            90 => Ok(Self::Clockwise90),
            180 => Ok(Self::Clockwise180),
            270 => Ok(Self::Clockwise270),
            _ => Err(StructureError::UnsupportedRotationAngle(degrees)),
        }
    }

    pub fn degrees(self) -> i32 {
        self.quarter_turns() as i32 * 90
    }

    pub fn quarter_turns(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Clockwise90 => 1,
            Self::Clockwise180 => 2,
            Self::Clockwise270 => 3,
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = StructureError;

    fn try_from(degrees: i32) -> Result<Self> {
        Self::from_degrees(degrees)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorAxis {
    /// Reflect X coordinates, swapping east and west.
    X,
    /// Reflect Z coordinates, swapping north and south.
    Z,
}

impl FromStr for MirrorAxis {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" | "X" => Ok(Self::X),
            "z" | "Z" => Ok(Self::Z),
            _ => Err(StructureError::UnsupportedMirrorAxis(s.to_owned())),
        }
    }
}

impl Display for MirrorAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::Z => write!(f, "Z"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    Rotate(Rotation),
    Mirror(MirrorAxis),
}

impl Transform {
    pub fn extents(self, e: [u32; 3]) -> [u32; 3] {
        match self {
            Transform::Rotate(r) if r.quarter_turns() % 2 == 1 => [e[2], e[1], e[0]],
            _ => e,
        }
    }

    /// Where the cell at `pos` of a grid sized `e` ends up.
    pub fn map_position(self, pos: Position, e: [u32; 3]) -> Position {
        let (sx, sz) = (e[0] as i32, e[2] as i32);
        let Position { x, y, z } = pos;
        match self {
            Transform::Rotate(Rotation::None) => pos,
            Transform::Rotate(Rotation::Clockwise90) => Position::new(sz - 1 - z, y, x),
            Transform::Rotate(Rotation::Clockwise180) => Position::new(sx - 1 - x, y, sz - 1 - z),
            Transform::Rotate(Rotation::Clockwise270) => Position::new(z, y, sx - 1 - x),
            Transform::Mirror(MirrorAxis::X) => Position::new(sx - 1 - x, y, z),
            Transform::Mirror(MirrorAxis::Z) => Position::new(x, y, sz - 1 - z),
        }
    }

    pub fn map_direction(self, d: Direction) -> Direction {
        match self {
            Transform::Rotate(r) => {
                (0..r.quarter_turns()).fold(d, |d, _| d.rotate_clockwise())
            }
            Transform::Mirror(MirrorAxis::X) => match d {
                Direction::East | Direction::West => d.opposite(),
                _ => d,
            },
            Transform::Mirror(MirrorAxis::Z) => match d {
                Direction::North | Direction::South => d.opposite(),
                _ => d,
            },
        }
    }
}

impl Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transform::Rotate(r) => write!(f, "rotate {} degrees", r.degrees()),
            Transform::Mirror(a) => write!(f, "mirror across {}", a),
        }
    }
}

/// The output of [`apply`], ready to replace the corresponding parts of a document.
#[derive(Clone, Debug)]
pub struct Transformed {
    pub palette: BlockPalette,
    pub grid: VoxelGrid,
    pub attachments: AttachmentStore,
}

pub fn apply(
    t: Transform,
    table: &OrientationTable,
    palette: &BlockPalette,
    grid: &VoxelGrid,
    attachments: &AttachmentStore,
) -> Result<Transformed> {
    let mut out_palette = palette.clone();
    // Reorient each palette entry once rather than once per cell
    let remap: Vec<BlockTypeIndex> = palette
        .iter()
        .map(|(i, block)| match table.transform_block(block, t) {
            Some(variant) => out_palette.intern(&variant),
            None => i,
        })
        .collect();
    let map_index = |index: BlockTypeIndex| {
        index
            .palette_slot()
            .and_then(|slot| remap.get(slot).copied())
            .unwrap_or(index)
    };

    let src_extents = *grid.extents();
    let [ex, ey, ez] = t.extents(src_extents);
    let mut out_grid = VoxelGrid::new(ex, ey, ez, BlockTypeIndex::NO_BLOCK)?;
    let secondary = grid.layer(Layer::Secondary);
    for (pos, i, primary) in grid.iter_block_coords(Layer::Primary) {
        let target = t.map_position(pos, src_extents);
        out_grid.set(target, Layer::Primary, map_index(primary))?;
        out_grid.set(target, Layer::Secondary, map_index(secondary[i]))?;
    }

    let volume = grid.volume();
    let out_attachments = attachments.remapped(|i| {
        if i >= volume {
            return None;
        }
        out_grid
            .linear_index(t.map_position(grid.position_of(i), src_extents))
            .ok()
    });

    debug!(
        "{}: {} palette entries became {}, extents {:?} became {:?}",
        t,
        palette.len(),
        out_palette.len(),
        src_extents,
        out_grid.extents()
    );

    Ok(Transformed {
        palette: out_palette,
        grid: out_grid,
        attachments: out_attachments,
    })
}
