//! Reading, writing and reshaping bedrock `.mcstructure` files.

pub mod attachments;
pub mod block_storage;
pub mod document;
pub mod error;
mod fields;
pub mod summary;
pub mod transform;
pub mod tree_io;

pub use quartz_nbt;

pub use document::{DecodeOptions, StructureDocument};
pub use error::{MalformedCause, StructureError};

/// Compatibility version written into every palette entry. The four bytes
/// are the game version the block states were defined for, e.g. `17959425`
/// is `01 12 0A 01`, version 1.18.10.01.
pub const COMPATIBILITY_VERSION: i32 = 17959425;

/// Largest structure the game's structure block can capture.
pub const STRUCTURE_MAX_SIZE: [u32; 3] = [64, 384, 64];

/// True if a structure of `size` could have been captured in game. Larger
/// structures are still valid files.
pub fn has_suitable_size(size: [u32; 3]) -> bool {
    size.iter().zip(STRUCTURE_MAX_SIZE).all(|(s, max)| *s <= max)
}

/// Checks a structure name for characters the game rejects. With
/// `with_prefix` a single `namespace:` separator is allowed.
pub fn is_valid_structure_name(name: &str, with_prefix: bool) -> bool {
    let name = if with_prefix {
        name.replacen(':', "", 1)
    } else {
        name.to_owned()
    };

    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_names() {
        assert!(is_valid_structure_name("my_house-2", false));
        assert!(!is_valid_structure_name("mystructure:house", false));
        assert!(is_valid_structure_name("mystructure:house", true));
        assert!(!is_valid_structure_name("a:b:c", true));
        assert!(!is_valid_structure_name("has space", false));
        assert!(!is_valid_structure_name("", false));
    }

    #[test]
    fn capture_limits() {
        assert!(has_suitable_size(STRUCTURE_MAX_SIZE));
        assert!(has_suitable_size([1, 1, 1]));
        assert!(!has_suitable_size([65, 0, 0]));
        assert!(!has_suitable_size([1, 385, 1]));
    }
}
