//! Typed lookups into NBT compounds that report the dotted path of whatever
//! was missing or of the wrong kind.

use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use crate::error::{MalformedCause, Result};

pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{}.{}", path, key)
    }
}

fn wrong_kind(path: String, expected: &'static str) -> MalformedCause {
    MalformedCause::WrongKind { path, expected }
}

pub(crate) fn field<'a>(c: &'a NbtCompound, key: &str, path: &str) -> Result<&'a NbtTag> {
    c.inner()
        .get(key)
        .ok_or_else(|| MalformedCause::MissingField(join(path, key)).into())
}

pub(crate) fn compound<'a>(c: &'a NbtCompound, key: &str, path: &str) -> Result<&'a NbtCompound> {
    match field(c, key, path)? {
        NbtTag::Compound(inner) => Ok(inner),
        _ => Err(wrong_kind(join(path, key), "compound").into()),
    }
}

pub(crate) fn list<'a>(c: &'a NbtCompound, key: &str, path: &str) -> Result<&'a NbtList> {
    match field(c, key, path)? {
        NbtTag::List(inner) => Ok(inner),
        _ => Err(wrong_kind(join(path, key), "list").into()),
    }
}

pub(crate) fn string<'a>(c: &'a NbtCompound, key: &str, path: &str) -> Result<&'a str> {
    match field(c, key, path)? {
        NbtTag::String(s) => Ok(s),
        _ => Err(wrong_kind(join(path, key), "string").into()),
    }
}

pub(crate) fn int(c: &NbtCompound, key: &str, path: &str) -> Result<i32> {
    match field(c, key, path)? {
        NbtTag::Int(i) => Ok(*i),
        _ => Err(wrong_kind(join(path, key), "int").into()),
    }
}

/// Every element of `list` as an int. Int arrays are not accepted here since
/// the structure format always writes lists.
pub(crate) fn ints(list: &NbtList, path: &str) -> Result<Vec<i32>> {
    list.iter()
        .enumerate()
        .map(|(i, tag)| match tag {
            NbtTag::Int(v) => Ok(*v),
            _ => Err(wrong_kind(format!("{}[{}]", path, i), "int").into()),
        })
        .collect()
}

pub(crate) fn int_list(values: impl IntoIterator<Item = i32>) -> NbtList {
    let mut list = NbtList::new();
    for v in values {
        list.push(NbtTag::Int(v));
    }
    list
}
