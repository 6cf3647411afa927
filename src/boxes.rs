use crate::layout::{DecodeError, FieldMap};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const FTYP: FourCC = FourCC(*b"ftyp");

    pub fn from_code(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl Serialize for FourCC {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

impl PartialEq<&str> for FourCC {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub start: u64, // file offset of header start
    pub size: u64,  // total size including the 8-byte header
    pub typ: FourCC,
}

impl BoxHeader {
    pub const SIZE: u64 = 8;

    pub fn payload_len(&self) -> u64 {
        self.size.saturating_sub(Self::SIZE)
    }

    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// Result of offering a box body to the decoder registry.
#[derive(Debug)]
pub enum AtomFields {
    Decoded(FieldMap),
    /// No decoder is registered; the body was not read.
    Opaque,
    /// The decoder committed to the body and failed. Siblings are unaffected.
    Failed(DecodeError),
}

impl AtomFields {
    pub fn decoded(&self) -> Option<&FieldMap> {
        match self {
            AtomFields::Decoded(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, AtomFields::Opaque)
    }
}

impl Serialize for AtomFields {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            AtomFields::Decoded(m) => m.serialize(s),
            AtomFields::Opaque => s.serialize_str("opaque"),
            AtomFields::Failed(e) => {
                let mut map = s.serialize_map(Some(1))?;
                map.serialize_entry("error", &e.to_string())?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AtomBody {
    Branch { children: Vec<Atom> },
    Leaf { fields: AtomFields },
    BranchAndLeaf { children: Vec<Atom>, fields: AtomFields },
}

/// One node of the atom tree.
#[derive(Debug, Serialize)]
pub struct Atom {
    pub offset: u64,
    pub size: u64,
    #[serde(rename = "type")]
    pub typ: FourCC,
    /// Ancestor type codes followed by this atom's own.
    pub path: Vec<FourCC>,
    #[serde(flatten)]
    pub body: AtomBody,
}

impl Atom {
    /// `None` for leaves; an empty slice for a branch with nothing inside.
    pub fn children(&self) -> Option<&[Atom]> {
        match &self.body {
            AtomBody::Branch { children } | AtomBody::BranchAndLeaf { children, .. } => {
                Some(children)
            }
            AtomBody::Leaf { .. } => None,
        }
    }

    /// `None` for pure branches.
    pub fn fields(&self) -> Option<&AtomFields> {
        match &self.body {
            AtomBody::Leaf { fields } | AtomBody::BranchAndLeaf { fields, .. } => Some(fields),
            AtomBody::Branch { .. } => None,
        }
    }

    pub fn decoded(&self) -> Option<&FieldMap> {
        self.fields().and_then(AtomFields::decoded)
    }

    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Look up a descendant by a path relative to this atom's children.
    pub fn find(&self, path: &[&str]) -> Option<&Atom> {
        find_by_path(self.children()?, path)
    }
}

/// Find the first atom whose type codes match `path`, starting at `atoms`.
///
/// `find_by_path(&tree, &["moov", "trak", "mdia", "hdlr"])` follows the first
/// matching sibling at every level.
pub fn find_by_path<'a>(atoms: &'a [Atom], path: &[&str]) -> Option<&'a Atom> {
    let (head, rest) = path.split_first()?;
    let atom = atoms.iter().find(|a| a.typ == *head)?;
    if rest.is_empty() {
        Some(atom)
    } else {
        find_by_path(atom.children()?, rest)
    }
}

/// Every atom matching `path`, across all matching siblings at each level.
pub fn find_all_by_path<'a>(atoms: &'a [Atom], path: &[&str]) -> Vec<&'a Atom> {
    let Some((head, rest)) = path.split_first() else {
        return Vec::new();
    };
    let matches = atoms.iter().filter(|a| a.typ == *head);
    if rest.is_empty() {
        return matches.collect();
    }
    matches
        .filter_map(|a| a.children())
        .flat_map(|kids| find_all_by_path(kids, rest))
        .collect()
}
