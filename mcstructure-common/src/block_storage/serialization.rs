use quartz_nbt::{NbtCompound, NbtTag};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::{Block, StateValue};
use crate::error::{MalformedCause, Result};
use crate::{fields, COMPATIBILITY_VERSION};

impl Serialize for StateValue {
    fn serialize<S>(&self, s: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where
        S: Serializer,
    {
        match self {
            Self::String(st) => s.serialize_str(st),
            Self::Int(i) => s.serialize_i32(*i),
            Self::Float(f) => s.serialize_f32(*f),
            Self::Bool(b) => s.serialize_bool(*b),
        }
    }
}

impl Serialize for Block {
    fn serialize<S>(&self, s: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where
        S: Serializer,
    {
        let mut map = s.serialize_map(Some(3))?;
        map.serialize_entry("name", &self.identifier)?;
        map.serialize_entry("states", &self.states)?;
        map.serialize_entry("version", &self.version)?;
        map.end()
    }
}

impl StateValue {
    /// Maps a state tag onto a value. Bytes are how the format spells booleans,
    /// so only 0 and 1 are accepted for them.
    pub fn from_tag(tag: &NbtTag) -> Option<Self> {
        match tag {
            NbtTag::String(s) => Some(Self::String(s.clone())),
            NbtTag::Int(i) => Some(Self::Int(*i)),
            NbtTag::Float(f) => Some(Self::Float(*f)),
            NbtTag::Byte(0) => Some(Self::Bool(false)),
            NbtTag::Byte(1) => Some(Self::Bool(true)),
            _ => None,
        }
    }

    pub fn to_tag(&self) -> NbtTag {
        match self {
            Self::String(s) => NbtTag::String(s.clone()),
            Self::Int(i) => NbtTag::Int(*i),
            Self::Float(f) => NbtTag::Float(*f),
            Self::Bool(b) => NbtTag::Byte(*b as i8),
        }
    }
}

impl Block {
    /// Reads one `block_palette` entry. `states` and `version` may be absent,
    /// `name` may not.
    pub fn from_palette_entry(entry: &NbtCompound, path: &str) -> Result<Self> {
        let identifier = fields::string(entry, "name", path)?;
        let mut block = Block::new(identifier);

        if entry.inner().contains_key("states") {
            let states = fields::compound(entry, "states", path)?;
            for (key, value) in states.inner().iter() {
                let value = StateValue::from_tag(value).ok_or_else(|| {
                    MalformedCause::UnsupportedStateValue {
                        block: identifier.to_owned(),
                        key: key.clone(),
                    }
                })?;
                block.states.insert(key.clone(), value);
            }
        }

        block.version = match entry.inner().get("version") {
            Some(_) => fields::int(entry, "version", path)?,
            None => COMPATIBILITY_VERSION,
        };

        Ok(block)
    }

    pub fn to_palette_entry(&self) -> NbtCompound {
        let mut states = NbtCompound::new();
        for (key, value) in self.states.iter() {
            states.insert(key.clone(), value.to_tag());
        }

        let mut entry = NbtCompound::new();
        entry.insert("name", NbtTag::String(self.identifier.clone()));
        entry.insert("states", NbtTag::Compound(states));
        entry.insert("version", NbtTag::Int(self.version));
        entry
    }
}
