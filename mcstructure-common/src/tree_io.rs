//! Byte transport for NBT trees.
//!
//! Structure files are written in little-endian NBT, which `quartz_nbt::io`
//! does not speak, so the little-endian tag reader and writer live here.
//! Big-endian trees go through `quartz_nbt::io` unchanged.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use quartz_nbt::io::Flavor;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use crate::error::{MalformedCause, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Endianness {
    /// Bedrock edition, including every structure file the game writes.
    #[default]
    Little,
    /// Java edition, uncompressed.
    Big,
}

/// Deepest nesting of lists and compounds accepted when reading.
pub const MAX_DEPTH: usize = 512;

/// Array elements read per step. Lengths in the input are not trusted for
/// the up-front allocation, so arrays only grow as their data arrives.
const ARRAY_CHUNK: usize = 4096;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

fn bad(why: impl Into<String>) -> crate::error::StructureError {
    MalformedCause::TreeEncoding(why.into()).into()
}

/// Reads a root compound and its name.
pub fn read_tree<R: Read>(reader: &mut R, endianness: Endianness) -> Result<(NbtCompound, String)> {
    match endianness {
        Endianness::Big => Ok(quartz_nbt::io::read_nbt(reader, Flavor::Uncompressed)?),
        Endianness::Little => {
            let id = reader.read_u8()?;
            if id != TAG_COMPOUND {
                return Err(bad(format!("root tag has id {}, expected a compound", id)));
            }
            let name = read_string(reader)?;
            let root = read_compound(reader, 0)?;
            Ok((root, name))
        }
    }
}

pub fn write_tree<W: Write>(
    writer: &mut W,
    root_name: &str,
    root: &NbtCompound,
    endianness: Endianness,
) -> Result<()> {
    match endianness {
        Endianness::Big => Ok(quartz_nbt::io::write_nbt(
            writer,
            Some(root_name),
            root,
            Flavor::Uncompressed,
        )?),
        Endianness::Little => {
            writer.write_u8(TAG_COMPOUND)?;
            write_string(writer, root_name)?;
            write_compound(writer, root)
        }
    }
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u16::<LittleEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| bad(format!("string is not UTF-8: {}", e)))
}

fn read_len<R: Read>(reader: &mut R) -> Result<usize> {
    let len = reader.read_i32::<LittleEndian>()?;
    usize::try_from(len).map_err(|_| bad(format!("negative length {}", len)))
}

fn read_array<R: Read, T: Clone + Default>(
    reader: &mut R,
    len: usize,
    mut read_into: impl FnMut(&mut R, &mut [T]) -> std::io::Result<()>,
) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(len.min(ARRAY_CHUNK));
    while values.len() < len {
        let start = values.len();
        values.resize(start + (len - start).min(ARRAY_CHUNK), T::default());
        read_into(reader, &mut values[start..])?;
    }
    Ok(values)
}

fn read_compound<R: Read>(reader: &mut R, depth: usize) -> Result<NbtCompound> {
    if depth > MAX_DEPTH {
        return Err(bad("nesting too deep"));
    }
    let mut compound = NbtCompound::new();
    loop {
        let id = reader.read_u8()?;
        if id == TAG_END {
            return Ok(compound);
        }
        let name = read_string(reader)?;
        let value = read_payload(reader, id, depth + 1)?;
        compound.insert(name, value);
    }
}

fn read_payload<R: Read>(reader: &mut R, id: u8, depth: usize) -> Result<NbtTag> {
    Ok(match id {
        TAG_BYTE => NbtTag::Byte(reader.read_i8()?),
        TAG_SHORT => NbtTag::Short(reader.read_i16::<LittleEndian>()?),
        TAG_INT => NbtTag::Int(reader.read_i32::<LittleEndian>()?),
        TAG_LONG => NbtTag::Long(reader.read_i64::<LittleEndian>()?),
        TAG_FLOAT => NbtTag::Float(reader.read_f32::<LittleEndian>()?),
        TAG_DOUBLE => NbtTag::Double(reader.read_f64::<LittleEndian>()?),
        TAG_BYTE_ARRAY => {
            let len = read_len(reader)?;
            NbtTag::ByteArray(read_array(reader, len, |r, buf| r.read_i8_into(buf))?)
        }
        TAG_STRING => NbtTag::String(read_string(reader)?),
        TAG_LIST => {
            if depth > MAX_DEPTH {
                return Err(bad("nesting too deep"));
            }
            let element = reader.read_u8()?;
            let len = read_len(reader)?;
            if element == TAG_END && len > 0 {
                return Err(bad("non-empty list of end tags"));
            }
            let mut list = NbtList::new();
            for _ in 0..len {
                list.push(read_payload(reader, element, depth + 1)?);
            }
            NbtTag::List(list)
        }
        TAG_COMPOUND => NbtTag::Compound(read_compound(reader, depth)?),
        TAG_INT_ARRAY => {
            let len = read_len(reader)?;
            NbtTag::IntArray(read_array(reader, len, |r, buf| {
                r.read_i32_into::<LittleEndian>(buf)
            })?)
        }
        TAG_LONG_ARRAY => {
            let len = read_len(reader)?;
            NbtTag::LongArray(read_array(reader, len, |r, buf| {
                r.read_i64_into::<LittleEndian>(buf)
            })?)
        }
        _ => return Err(bad(format!("unknown tag id {}", id))),
    })
}

fn tag_id(tag: &NbtTag) -> u8 {
    match tag {
        NbtTag::Byte(_) => TAG_BYTE,
        NbtTag::Short(_) => TAG_SHORT,
        NbtTag::Int(_) => TAG_INT,
        NbtTag::Long(_) => TAG_LONG,
        NbtTag::Float(_) => TAG_FLOAT,
        NbtTag::Double(_) => TAG_DOUBLE,
        NbtTag::ByteArray(_) => TAG_BYTE_ARRAY,
        NbtTag::String(_) => TAG_STRING,
        NbtTag::List(_) => TAG_LIST,
        NbtTag::Compound(_) => TAG_COMPOUND,
        NbtTag::IntArray(_) => TAG_INT_ARRAY,
        NbtTag::LongArray(_) => TAG_LONG_ARRAY,
    }
}

fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    let len = u16::try_from(s.len()).map_err(|_| bad("string longer than 65535 bytes"))?;
    writer.write_u16::<LittleEndian>(len)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<()> {
    let len = i32::try_from(len).map_err(|_| bad("sequence too long"))?;
    writer.write_i32::<LittleEndian>(len)?;
    Ok(())
}

fn write_compound<W: Write>(writer: &mut W, compound: &NbtCompound) -> Result<()> {
    for (name, value) in compound.inner().iter() {
        writer.write_u8(tag_id(value))?;
        write_string(writer, name)?;
        write_payload(writer, value)?;
    }
    writer.write_u8(TAG_END)?;
    Ok(())
}

fn write_payload<W: Write>(writer: &mut W, tag: &NbtTag) -> Result<()> {
    match tag {
        NbtTag::Byte(v) => writer.write_i8(*v)?,
        NbtTag::Short(v) => writer.write_i16::<LittleEndian>(*v)?,
        NbtTag::Int(v) => writer.write_i32::<LittleEndian>(*v)?,
        NbtTag::Long(v) => writer.write_i64::<LittleEndian>(*v)?,
        NbtTag::Float(v) => writer.write_f32::<LittleEndian>(*v)?,
        NbtTag::Double(v) => writer.write_f64::<LittleEndian>(*v)?,
        NbtTag::ByteArray(values) => {
            write_len(writer, values.len())?;
            for v in values {
                writer.write_i8(*v)?;
            }
        }
        NbtTag::String(s) => write_string(writer, s)?,
        NbtTag::List(list) => {
            let element = list.iter().next().map_or(TAG_END, tag_id);
            if list.iter().any(|t| tag_id(t) != element) {
                return Err(bad("list elements have differing tag kinds"));
            }
            writer.write_u8(element)?;
            write_len(writer, list.len())?;
            for t in list.iter() {
                write_payload(writer, t)?;
            }
        }
        NbtTag::Compound(c) => write_compound(writer, c)?,
        NbtTag::IntArray(values) => {
            write_len(writer, values.len())?;
            for v in values {
                writer.write_i32::<LittleEndian>(*v)?;
            }
        }
        NbtTag::LongArray(values) => {
            write_len(writer, values.len())?;
            for v in values {
                writer.write_i64::<LittleEndian>(*v)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn little_endian_layout_matches_format() -> Result<()> {
        let mut root = NbtCompound::new();
        root.insert("format_version", NbtTag::Int(1));

        let mut bytes = Vec::new();
        write_tree(&mut bytes, "", &root, Endianness::Little)?;

        assert_eq!(
            bytes,
            vec![
                TAG_COMPOUND, 0, 0, // unnamed root
                TAG_INT, 14, 0, b'f', b'o', b'r', b'm', b'a', b't', b'_', b'v', b'e', b'r', b's',
                b'i', b'o', b'n', 1, 0, 0, 0, // format_version = 1
                TAG_END,
            ]
        );
        Ok(())
    }

    #[test]
    fn nested_tree_survives_both_byte_orders() -> Result<()> {
        let mut inner = NbtCompound::new();
        inner.insert("name", NbtTag::String("minecraft:chest".to_owned()));
        inner.insert("bytes", NbtTag::ByteArray(vec![1, -2, 3]));
        inner.insert("longs", NbtTag::LongArray(vec![i64::MIN, 7]));
        let mut list = NbtList::new();
        list.push(NbtTag::Compound(inner.clone()));
        list.push(NbtTag::Compound(NbtCompound::new()));

        let mut root = NbtCompound::new();
        root.insert("items", NbtTag::List(list));
        root.insert("empty", NbtTag::List(NbtList::new()));
        root.insert("pos", NbtTag::IntArray(vec![-1, 0, 1]));
        root.insert("f", NbtTag::Float(0.5));
        root.insert("d", NbtTag::Double(-2.25));
        root.insert("s", NbtTag::Short(-300));

        for endianness in [Endianness::Little, Endianness::Big] {
            let mut bytes = Vec::new();
            write_tree(&mut bytes, "root", &root, endianness)?;
            let (read, name) = read_tree(&mut &bytes[..], endianness)?;
            assert_eq!(name, "root");
            assert_eq!(read, root);
        }
        Ok(())
    }

    #[test]
    fn heterogeneous_lists_are_rejected() {
        let mut list = NbtList::new();
        list.push(NbtTag::Int(1));
        list.push(NbtTag::String("two".to_owned()));
        let mut root = NbtCompound::new();
        root.insert("mixed", NbtTag::List(list));

        let mut bytes = Vec::new();
        let err = write_tree(&mut bytes, "", &root, Endianness::Little)
            .expect_err("Mixed list unexpectedly encoded");
        assert!(matches!(
            err,
            crate::error::StructureError::MalformedStructure(MalformedCause::TreeEncoding(_))
        ));
    }

    #[test]
    fn oversized_array_length_fails_on_missing_data() {
        let mut bytes = vec![TAG_COMPOUND, 0, 0, TAG_LONG_ARRAY, 1, 0, b'a'];
        bytes.extend_from_slice(&i32::MAX.to_le_bytes());
        bytes.extend_from_slice(&7i64.to_le_bytes());

        let err = read_tree(&mut &bytes[..], Endianness::Little)
            .expect_err("Array longer than its data unexpectedly read");
        assert!(matches!(err, crate::error::StructureError::Io(_)));
    }

    #[test]
    fn arrays_longer_than_one_chunk_are_read_whole() -> Result<()> {
        let values: Vec<i32> = (0..ARRAY_CHUNK as i32 * 2 + 3).collect();
        let mut root = NbtCompound::new();
        root.insert("values", NbtTag::IntArray(values));

        let mut bytes = Vec::new();
        write_tree(&mut bytes, "", &root, Endianness::Little)?;
        let (read, _) = read_tree(&mut &bytes[..], Endianness::Little)?;
        assert_eq!(read, root);
        Ok(())
    }

    #[test]
    fn truncated_input_is_an_io_error() {
        let bytes = [TAG_COMPOUND, 0, 0, TAG_INT, 1, 0, b'a', 1, 0];
        let err = read_tree(&mut &bytes[..], Endianness::Little).expect_err("Read past the end");
        assert!(matches!(err, crate::error::StructureError::Io(_)));
    }
}
