//! Types for storing bedrock-format blocks: the block definitions themselves,
//! the palette that deduplicates them, and the two-layer grid of palette
//! references that makes up the body of a structure.

pub mod iter;
pub mod palette;
mod serialization;


use std::collections::BTreeMap;
use std::fmt::Display;
use std::vec::Vec;

use crate::error::{Result, StructureError};
use crate::COMPATIBILITY_VERSION;

pub use palette::BlockPalette;

/// A single block state value. The kind is part of the value's identity, so
/// `Bool(true)` and `Int(1)` are different states.
#[derive(Clone, Debug)]
pub enum StateValue {
    String(String),
    Int(i32),
    Float(f32),
    Bool(bool),
}

impl PartialEq for StateValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            // Bitwise so that equality stays reflexive for every stored float
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for StateValue {}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for StateValue {
    fn from(i: i32) -> Self {
        Self::Int(i)
    }
}

impl From<f32> for StateValue {
    fn from(f: f32) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl Display for StateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{:?}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A block definition as stored in a structure palette.
///
/// Two blocks are equal when their identifiers and complete state maps are
/// equal. `version` is carried along for serialization but does not take part
/// in equality.
#[derive(Clone, Debug)]
pub struct Block {
    pub identifier: String,
    pub states: BTreeMap<String, StateValue>,
    pub version: i32,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier && self.states == other.states
    }
}

impl Eq for Block {}

impl Block {
    pub const AIR: &'static str = "minecraft:air";
    pub const STRUCTURE_VOID: &'static str = "minecraft:structure_void";
    pub const WATER: &'static str = "minecraft:water";

    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            states: BTreeMap::new(),
            version: COMPATIBILITY_VERSION,
        }
    }

    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.states.insert(key.into(), value.into());
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    /// Still water, which is what the secondary layer holds for waterlogged cells.
    pub fn water() -> Self {
        Self::new(Self::WATER).with_state("liquid_depth", 0)
    }

    pub fn state(&self, key: &str) -> Option<&StateValue> {
        self.states.get(key)
    }

    pub fn namespace_and_name(&self) -> (Option<&str>, &str) {
        match self.identifier.split_once(':') {
            Some((ns, name)) => (Some(ns), name),
            None => (None, &self.identifier),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace_and_name().0
    }

    pub fn name(&self) -> &str {
        self.namespace_and_name().1
    }

    /// Renders the block the way commands such as `setblock` spell it, e.g.
    /// `minecraft:wool ["color"="red"]`.
    pub fn stringify(&self, with_namespace: bool, with_states: bool) -> String {
        let mut result = String::new();
        if with_namespace {
            if let Some(ns) = self.namespace() {
                result.push_str(ns);
                result.push(':');
            }
        }
        result.push_str(self.name());
        if with_states {
            let states = self
                .states
                .iter()
                .map(|(k, v)| format!("{:?}={}", k, v))
                .collect::<Vec<_>>()
                .join(",");
            result.push_str(" [");
            result.push_str(&states);
            result.push(']');
        }
        result
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.stringify(true, true))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<[i32; 3]> for Position {
    fn from(p: [i32; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

impl Position {
    pub const ZERO: Position = Position { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn as_array(&self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    /// Returns the componentwise minimum and maximum of the two corners.
    pub fn normalize_box(a: Self, b: Self) -> (Self, Self) {
        (
            Self::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            Self::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Z-
    North,
    /// Z+
    South,
    /// X+
    East,
    /// X-
    West,
    /// +Y
    Up,
    /// -Y
    Down,
}

impl Direction {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Quarter turn clockwise when looking down the Y axis.
    #[inline]
    pub fn rotate_clockwise(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            vertical => vertical,
        }
    }
}

/// Which of the two per-cell references is meant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    /// The block itself. Only this layer can carry block entity data.
    Primary,
    /// Usually water for waterlogged blocks.
    Secondary,
}

/// Represents a type index into a [`BlockPalette`], or [`BlockTypeIndex::NO_BLOCK`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BlockTypeIndex(i32);

impl BlockTypeIndex {
    /// Leave whatever is already in the world at this position alone.
    pub const NO_BLOCK: BlockTypeIndex = BlockTypeIndex(-1);

    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn is_no_block(self) -> bool {
        self == Self::NO_BLOCK
    }

    /// Position in the palette, or `None` for anything negative.
    pub fn palette_slot(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl From<usize> for BlockTypeIndex {
    fn from(i: usize) -> Self {
        Self(i as i32)
    }
}

/// Number of cells in a grid of `extents`, or `None` if the grid could not
/// be addressed with `i32` coordinates and `usize` indices.
pub fn checked_volume(extents: [u32; 3]) -> Option<usize> {
    if extents.iter().any(|&e| e > i32::MAX as u32) {
        return None;
    }
    extents
        .iter()
        .try_fold(1usize, |volume, &e| volume.checked_mul(e as usize))
}

fn filled_layer(volume: usize, fill: BlockTypeIndex, extents: [u32; 3]) -> Result<Vec<BlockTypeIndex>> {
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(volume)
        .map_err(|_| StructureError::SizeTooLarge { extents })?;
    cells.resize(volume, fill);
    Ok(cells)
}

/// The block body of a structure: two parallel layers of palette references.
///
/// Cells are stored with Z varying fastest, then Y, then X. This is the order
/// the structure format lays out `block_indices` and must not change.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid {
    /// 3D extents. Every other field is sized from these, so they are fixed
    /// for the lifetime of the grid; transforms build a new grid instead.
    pub(self) extents: [u32; 3],
    /// Scale to use for X coordinates when computing indicies
    pub(self) xsi: usize,
    /// Scale to use for Y coordinates when computing indicies
    pub(self) ysi: usize,

    pub(self) primary: Vec<BlockTypeIndex>,
    pub(self) secondary: Vec<BlockTypeIndex>,
}

impl VoxelGrid {
    /// A grid with every primary cell set to `fill` and an empty secondary layer.
    pub fn new(sx: u32, sy: u32, sz: u32, fill: BlockTypeIndex) -> Result<Self> {
        let extents = [sx, sy, sz];
        let total_size =
            checked_volume(extents).ok_or(StructureError::SizeTooLarge { extents })?;

        Ok(Self {
            extents,
            xsi: sy as usize * sz as usize,
            ysi: sz as usize,
            primary: filled_layer(total_size, fill, extents)?,
            secondary: filled_layer(total_size, BlockTypeIndex::NO_BLOCK, extents)?,
        })
    }

    /// Builds a grid from already linearized layers.
    pub fn from_layers(
        extents: [u32; 3],
        primary: Vec<BlockTypeIndex>,
        secondary: Vec<BlockTypeIndex>,
    ) -> Result<Self> {
        let expected = checked_volume(extents).ok_or(StructureError::SizeTooLarge { extents })?;
        if primary.len() != expected || secondary.len() != expected {
            return Err(StructureError::DimensionMismatch {
                expected,
                primary: primary.len(),
                secondary: secondary.len(),
            });
        }
        Ok(Self {
            extents,
            xsi: extents[1] as usize * extents[2] as usize,
            ysi: extents[2] as usize,
            primary,
            secondary,
        })
    }

    pub fn extents(&self) -> &[u32; 3] {
        &self.extents
    }

    pub fn volume(&self) -> usize {
        self.primary.len()
    }

    pub fn contains(&self, pos: Position) -> bool {
        let inside = |c: i32, e: u32| c >= 0 && (c as u32) < e;
        inside(pos.x, self.extents[0])
            && inside(pos.y, self.extents[1])
            && inside(pos.z, self.extents[2])
    }

    fn check_bounds(&self, pos: Position) -> Result<()> {
        if self.contains(pos) {
            Ok(())
        } else {
            Err(StructureError::CoordinateOutOfBounds {
                pos,
                extents: self.extents,
            })
        }
    }

    /// Index of `pos` in the linearized layers.
    #[inline]
    pub fn linear_index(&self, pos: Position) -> Result<usize> {
        self.check_bounds(pos)?;
        Ok(pos.x as usize * self.xsi + pos.y as usize * self.ysi + pos.z as usize)
    }

    /// Inverse of [`Self::linear_index`]. `index` must be below [`Self::volume`].
    #[inline]
    pub fn position_of(&self, index: usize) -> Position {
        debug_assert!(index < self.volume());
        let z = index % self.ysi;
        let y = (index % self.xsi) / self.ysi;
        let x = index / self.xsi;
        Position::new(x as i32, y as i32, z as i32)
    }

    pub fn layer(&self, layer: Layer) -> &[BlockTypeIndex] {
        match layer {
            Layer::Primary => &self.primary,
            Layer::Secondary => &self.secondary,
        }
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut Vec<BlockTypeIndex> {
        match layer {
            Layer::Primary => &mut self.primary,
            Layer::Secondary => &mut self.secondary,
        }
    }

    #[inline]
    pub fn get(&self, pos: Position, layer: Layer) -> Result<BlockTypeIndex> {
        let i = self.linear_index(pos)?;
        Ok(self.layer(layer)[i])
    }

    #[inline]
    pub fn set(&mut self, pos: Position, layer: Layer, index: BlockTypeIndex) -> Result<&mut Self> {
        let i = self.linear_index(pos)?;
        self.layer_mut(layer)[i] = index;
        Ok(self)
    }

    /// Writes `index` into `layer` for every cell of the closed box spanned by
    /// the two corners, in whichever order they are given.
    pub fn fill(
        &mut self,
        a: Position,
        b: Position,
        layer: Layer,
        index: BlockTypeIndex,
    ) -> Result<&mut Self> {
        self.check_bounds(a)?;
        self.check_bounds(b)?;
        let (min, max) = Position::normalize_box(a, b);
        let (xsi, ysi) = (self.xsi, self.ysi);
        let cells = self.layer_mut(layer);
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                let row = x as usize * xsi + y as usize * ysi;
                cells[row + min.z as usize..=row + max.z as usize].fill(index);
            }
        }
        Ok(self)
    }

    /// Interns `block` and writes it into the primary layer of every cell in
    /// the box. The secondary layer is never touched.
    pub fn fill_region(
        &mut self,
        palette: &mut BlockPalette,
        a: Position,
        b: Position,
        block: &Block,
    ) -> Result<&mut Self> {
        // Check before interning so a failed fill leaves the palette alone
        self.check_bounds(a)?;
        self.check_bounds(b)?;
        let index = palette.intern(block);
        self.fill(a, b, Layer::Primary, index)
    }

    pub fn set_single(
        &mut self,
        palette: &mut BlockPalette,
        pos: Position,
        block: &Block,
    ) -> Result<&mut Self> {
        self.fill_region(palette, pos, pos, block)
    }

    pub fn iter_block_indicies(&self, layer: Layer) -> iter::BlockIndexIter {
        iter::BlockIndexIter::new(self, layer)
    }

    pub fn iter_block_coords(&self, layer: Layer) -> iter::BlockCoordIter {
        iter::BlockCoordIter::new(self, layer)
    }
}
