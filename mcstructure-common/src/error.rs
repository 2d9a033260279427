use quartz_nbt::io::NbtIoError;
use thiserror::Error;

use crate::block_storage::{Layer, Position};

/// Everything that can go wrong while building, transforming, or (de)serializing a structure.
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("palette index {index} is out of range for a palette of {len} entries")]
    PaletteIndexOutOfRange { index: i32, len: usize },

    #[error(
        "coordinate {pos} is out of bounds for a structure of size ({}, {}, {})",
        .extents[0],
        .extents[1],
        .extents[2]
    )]
    CoordinateOutOfBounds { pos: Position, extents: [u32; 3] },

    #[error(
        "a structure of size ({}, {}, {}) is too large to address",
        .extents[0],
        .extents[1],
        .extents[2]
    )]
    SizeTooLarge { extents: [u32; 3] },

    #[error(
        "block layers do not match the structure volume: expected {expected}, \
         primary has {primary}, secondary has {secondary}"
    )]
    DimensionMismatch {
        expected: usize,
        primary: usize,
        secondary: usize,
    },

    #[error("malformed structure: {0}")]
    MalformedStructure(MalformedCause),

    #[error("unsupported rotation angle {0}, expected one of 0, 90, 180 or 270")]
    UnsupportedRotationAngle(i32),

    #[error("unsupported mirror axis {0:?}, expected X or Z")]
    UnsupportedMirrorAxis(String),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("NBT error")]
    Nbt(#[from] NbtIoError),
}

/// The specific reason a tree was rejected by [`crate::document::StructureDocument::decode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MalformedCause {
    MissingField(String),
    WrongKind {
        path: String,
        expected: &'static str,
    },
    BadSize(String),
    LayerCount(usize),
    LayerLength {
        expected: usize,
        primary: usize,
        secondary: usize,
    },
    PaletteIndex {
        layer: Layer,
        linear_index: usize,
        index: i32,
        len: usize,
    },
    MissingDefaultPalette,
    BadPositionKey(String),
    UnsupportedStateValue {
        block: String,
        key: String,
    },
    BadEntityPosition(usize),
    TreeEncoding(String),
}

impl std::fmt::Display for MalformedCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(path) => write!(f, "missing required field {:?}", path),
            Self::WrongKind { path, expected } => {
                write!(f, "field {:?} is not a {}", path, expected)
            }
            Self::BadSize(why) => write!(f, "bad size: {}", why),
            Self::LayerCount(n) => write!(f, "expected 2 block index layers, found {}", n),
            Self::LayerLength {
                expected,
                primary,
                secondary,
            } => write!(
                f,
                "block index layers have lengths {} and {}, expected {}",
                primary, secondary, expected
            ),
            Self::PaletteIndex {
                layer,
                linear_index,
                index,
                len,
            } => write!(
                f,
                "{:?} layer cell {} references palette index {} but the palette has {} entries",
                layer, linear_index, index, len
            ),
            Self::MissingDefaultPalette => write!(f, "palette has no \"default\" entry"),
            Self::BadPositionKey(key) => {
                write!(f, "block_position_data key {:?} is not a cell index", key)
            }
            Self::UnsupportedStateValue { block, key } => write!(
                f,
                "state {:?} of block {:?} has an unsupported value kind",
                key, block
            ),
            Self::BadEntityPosition(i) => {
                write!(f, "entity {} has a Pos that is not three numbers", i)
            }
            Self::TreeEncoding(why) => write!(f, "bad tag encoding: {}", why),
        }
    }
}

impl From<MalformedCause> for StructureError {
    fn from(cause: MalformedCause) -> Self {
        StructureError::MalformedStructure(cause)
    }
}

pub type Result<T, E = StructureError> = std::result::Result<T, E>;
