use crate::codec::{Primitive, Value};
use crate::util::read_up_to;
use indexmap::IndexMap;
use serde::Serialize;
use std::io::Read;

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: u64, available: u64 },
    #[error("entry {index}: declared size {size} does not fit in {remaining} remaining bytes")]
    EntrySize { index: u32, size: u32, remaining: u64 },
}

/// One named slot of a fixed layout.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: Primitive,
}

impl Field {
    pub const fn new(name: &'static str, kind: Primitive) -> Self {
        Self { name, kind }
    }
}

pub fn layout_width(layout: &[Field]) -> usize {
    layout.iter().map(|f| f.kind.width()).sum()
}

/// Decoded fields of a box, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldMap(IndexMap<&'static str, Value>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: &'static str, value: Value) {
        self.0.insert(name, value);
    }

    pub fn extend(&mut self, other: FieldMap) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }
}

/// Read exactly the bytes `layout` describes in a single read and decode them
/// in order. A short read is reported, never padded.
pub fn read_layout<R: Read + ?Sized>(r: &mut R, layout: &[Field]) -> Result<FieldMap, DecodeError> {
    let needed = layout_width(layout);
    let buf = read_up_to(r, needed as u64)?;
    if buf.len() < needed {
        return Err(DecodeError::Truncated {
            needed: needed as u64,
            available: buf.len() as u64,
        });
    }

    let mut map = FieldMap::new();
    let mut pos = 0usize;
    for f in layout {
        let w = f.kind.width();
        map.insert(f.name, f.kind.decode(&buf[pos..pos + w]));
        pos += w;
    }
    Ok(map)
}
