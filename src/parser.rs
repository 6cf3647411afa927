use crate::boxes::{Atom, AtomBody, AtomFields, BoxHeader, FourCC};
use crate::codec::{Primitive, Value};
use crate::config::ParseOptions;
use crate::known_boxes::{AtomClass, KnownBox};
use crate::layout::{DecodeError, Field, FieldMap, read_layout};
use crate::registry::Registry;
use crate::util::read_up_to;
use byteorder::{BigEndian, ByteOrder};
use std::io::{Read, Seek, SeekFrom};

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid box size {size} at {offset:#x}")]
    InvalidSize { offset: u64, size: u64 },
    #[error("64-bit extended box size at {offset:#x} is not supported")]
    ExtendedSize { offset: u64 },
    #[error("box at {offset:#x} declares {size} bytes but its parent has {remaining} left")]
    Overrun { offset: u64, size: u64, remaining: u64 },
    #[error("box at {offset:#x} nests deeper than {depth} levels")]
    TooDeep { offset: u64, depth: usize },
    #[error("file type box has no decodable major brand")]
    MissingBrand,
}

pub type Result<T> = std::result::Result<T, ParseError>;

const META_PREFIX: &[Field] = &[
    Field::new("version", Primitive::U8),
    Field::new("flags", Primitive::U24),
];

/// Read an 8-byte box header at the current position.
///
/// `Ok(None)` means fewer than 8 bytes were left. A declared size of 0
/// ("to the end of the enclosing scope") is returned as-is.
pub fn read_box_header<R: Read + Seek>(r: &mut R) -> Result<Option<BoxHeader>> {
    let start = r.stream_position()?;
    let buf = read_up_to(r, BoxHeader::SIZE)?;
    if buf.len() < BoxHeader::SIZE as usize {
        return Ok(None);
    }

    let size = BigEndian::read_u32(&buf[0..4]) as u64;
    let typ = FourCC([buf[4], buf[5], buf[6], buf[7]]);

    if size == 1 {
        return Err(ParseError::ExtendedSize { offset: start });
    }
    if size != 0 && size < BoxHeader::SIZE {
        return Err(ParseError::InvalidSize { offset: start, size });
    }

    Ok(Some(BoxHeader { start, size, typ }))
}

/// Recursive-descent walker over a box tree.
pub struct Walker<'a> {
    opts: &'a ParseOptions,
    registry: &'a Registry,
    stream_len: Option<u64>,
}

impl<'a> Walker<'a> {
    pub fn new(opts: &'a ParseOptions, registry: &'a Registry) -> Self {
        Self {
            opts,
            registry,
            stream_len: None,
        }
    }

    /// Walk sibling boxes from the current position, consuming at most
    /// `max_read` bytes.
    pub fn walk<R: Read + Seek>(&mut self, r: &mut R, max_read: u64) -> Result<Vec<Atom>> {
        self.walk_level(r, max_read, &[], 0)
    }

    fn walk_level<R: Read + Seek>(
        &mut self,
        r: &mut R,
        max_read: u64,
        path: &[FourCC],
        depth: usize,
    ) -> Result<Vec<Atom>> {
        let initial = r.stream_position()?;
        let mut atoms = Vec::new();

        for _ in 0..self.opts.max_atoms_per_level {
            let pos = r.stream_position()?;
            let consumed = pos.saturating_sub(initial);
            if consumed >= max_read {
                return Ok(atoms);
            }
            let remaining = max_read - consumed;
            if remaining < BoxHeader::SIZE {
                log::trace!("{} trailing bytes under '{}'", remaining, join_path(path));
                return Ok(atoms);
            }

            let Some(mut hdr) = read_box_header(r)? else {
                return Ok(atoms);
            };
            if hdr.size == 0 {
                hdr.size = self.scope_len(r, pos, remaining)?;
            }
            if hdr.size > remaining {
                return Err(ParseError::Overrun {
                    offset: pos,
                    size: hdr.size,
                    remaining,
                });
            }

            let mut atom_path = path.to_vec();
            atom_path.push(hdr.typ);

            let body = match KnownBox::from(hdr.typ).class() {
                AtomClass::Branch => {
                    self.check_depth(&hdr, depth)?;
                    let children = self.walk_level(r, hdr.payload_len(), &atom_path, depth + 1)?;
                    AtomBody::Branch { children }
                }
                AtomClass::BranchAndLeaf => {
                    self.check_depth(&hdr, depth)?;
                    self.branch_and_leaf(r, &hdr, &atom_path, depth)?
                }
                AtomClass::Leaf => AtomBody::Leaf {
                    fields: self.leaf_fields(r, &hdr)?,
                },
            };

            log::debug!("{} at {:#x}: {} bytes", join_path(&atom_path), hdr.start, hdr.size);

            // Resynchronise on the declared size, whatever the body consumed.
            r.seek(SeekFrom::Start(hdr.end()))?;
            atoms.push(Atom {
                offset: hdr.start,
                size: hdr.size,
                typ: hdr.typ,
                path: atom_path,
                body,
            });
        }

        let pos = r.stream_position()?;
        if pos.saturating_sub(initial) < max_read {
            log::warn!(
                "stopped after {} atoms under '{}' at {:#x}",
                self.opts.max_atoms_per_level,
                join_path(path),
                pos
            );
        }
        Ok(atoms)
    }

    fn check_depth(&self, hdr: &BoxHeader, depth: usize) -> Result<()> {
        if depth + 1 > self.opts.max_depth {
            return Err(ParseError::TooDeep {
                offset: hdr.start,
                depth: self.opts.max_depth,
            });
        }
        Ok(())
    }

    fn leaf_fields<R: Read + Seek>(&self, r: &mut R, hdr: &BoxHeader) -> Result<AtomFields> {
        if !self.registry.contains(&hdr.typ) {
            return Ok(AtomFields::Opaque);
        }
        let mut body = (&mut *r).take(hdr.payload_len());
        match self.registry.decode(&hdr.typ, &mut body, hdr) {
            None => Ok(AtomFields::Opaque),
            Some(Ok(map)) => Ok(AtomFields::Decoded(map)),
            Some(Err(e)) => recorded_failure(hdr, e),
        }
    }

    // iTunes writes `udta.meta` as a full box (version + flags, then children);
    // QuickTime writes it without the prefix, starting straight at `hdlr`.
    fn branch_and_leaf<R: Read + Seek>(
        &mut self,
        r: &mut R,
        hdr: &BoxHeader,
        path: &[FourCC],
        depth: usize,
    ) -> Result<AtomBody> {
        if hdr.payload_len() == 0 {
            return Ok(AtomBody::BranchAndLeaf {
                children: Vec::new(),
                fields: AtomFields::Decoded(FieldMap::new()),
            });
        }

        let body_start = hdr.start + BoxHeader::SIZE;
        let peek = read_up_to(r, hdr.payload_len().min(8))?;
        let quicktime = peek.len() == 8 && &peek[4..8] == b"hdlr";
        r.seek(SeekFrom::Start(body_start))?;

        let mut fields = FieldMap::new();
        if !quicktime {
            let mut limited = (&mut *r).take(hdr.payload_len());
            match read_layout(&mut limited, META_PREFIX) {
                Ok(prefix) => fields = prefix,
                Err(e) => {
                    return Ok(AtomBody::BranchAndLeaf {
                        children: Vec::new(),
                        fields: recorded_failure(hdr, e)?,
                    });
                }
            }
        }

        let children_start = r.stream_position()?;
        let children = self.walk_level(r, hdr.end() - children_start, path, depth + 1)?;

        // A capped walk leaves bytes unvisited rather than trailing.
        if children.len() < self.opts.max_atoms_per_level {
            let covered = children.last().map_or(children_start, Atom::end);
            let trailing = hdr.end().saturating_sub(covered);
            if trailing > 0 {
                fields.insert("trailing_len", Value::U64(trailing));
            }
        }

        Ok(AtomBody::BranchAndLeaf {
            children,
            fields: AtomFields::Decoded(fields),
        })
    }

    // Length of a size-0 box: the rest of its scope, clamped to the stream.
    fn scope_len<R: Read + Seek>(&mut self, r: &mut R, start: u64, remaining: u64) -> Result<u64> {
        let stream_len = match self.stream_len {
            Some(len) => len,
            None => {
                let here = r.stream_position()?;
                let len = r.seek(SeekFrom::End(0))?;
                r.seek(SeekFrom::Start(here))?;
                self.stream_len = Some(len);
                len
            }
        };
        Ok(remaining.min(stream_len.saturating_sub(start)))
    }
}

/// Stream errors stay fatal; anything else is kept on the node.
fn recorded_failure(hdr: &BoxHeader, e: DecodeError) -> Result<AtomFields> {
    match e {
        DecodeError::Io(io) => Err(io.into()),
        e => {
            log::warn!("{} at {:#x}: {}", hdr.typ, hdr.start, e);
            Ok(AtomFields::Failed(e))
        }
    }
}

fn join_path(path: &[FourCC]) -> String {
    path.iter()
        .map(FourCC::as_str_lossy)
        .collect::<Vec<_>>()
        .join(".")
}

/// Walk the sibling boxes at the current position with the given limits.
pub fn walk<R: Read + Seek>(
    r: &mut R,
    max_read: u64,
    opts: &ParseOptions,
    registry: &Registry,
) -> Result<Vec<Atom>> {
    Walker::new(opts, registry).walk(r, max_read)
}
