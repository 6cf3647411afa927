use crate::boxes::{BoxHeader, FourCC};
use crate::codec::Value;
use crate::layout::{DecodeError, Field, FieldMap, layout_width, read_layout};
use crate::util::read_up_to;
use std::collections::HashMap;
use std::io::Read;

/// Trait for box body decoders.
///
/// `r` is positioned just past the 8-byte header and limited to the box's
/// declared extent, so a decoder can never read into the next sibling.
pub trait BoxDecoder: Send + Sync {
    fn decode(&self, r: &mut dyn Read, hdr: &BoxHeader) -> Result<FieldMap, DecodeError>;
}

impl<F> BoxDecoder for F
where
    F: Fn(&mut dyn Read, &BoxHeader) -> Result<FieldMap, DecodeError> + Send + Sync,
{
    fn decode(&self, r: &mut dyn Read, hdr: &BoxHeader) -> Result<FieldMap, DecodeError> {
        self(r, hdr)
    }
}

/// Registry of decoders keyed by type code.
///
/// The registry is immutable once constructed; use [`Registry::with_decoder`]
/// to build it fluently.
pub struct Registry {
    map: HashMap<FourCC, BoxDecoderEntry>,
}

struct BoxDecoderEntry {
    inner: Box<dyn BoxDecoder>,
    name: String,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Return a new registry with the given decoder added, replacing any
    /// decoder already registered for `key`.
    ///
    /// `name` is human-readable and used only for logging.
    pub fn with_decoder(mut self, key: FourCC, name: &str, dec: Box<dyn BoxDecoder>) -> Self {
        self.map.insert(
            key,
            BoxDecoderEntry {
                inner: dec,
                name: name.to_string(),
            },
        );
        self
    }

    pub fn contains(&self, key: &FourCC) -> bool {
        self.map.contains_key(key)
    }

    /// Decode a box body with the registered decoder.
    ///
    /// Returns `None` if no decoder exists for the given key.
    pub fn decode(
        &self,
        key: &FourCC,
        r: &mut dyn Read,
        hdr: &BoxHeader,
    ) -> Option<Result<FieldMap, DecodeError>> {
        self.map.get(key).map(|d| {
            log::trace!("decoding {} at {:#x} with {}", key, hdr.start, d.name);
            d.inner.decode(r, hdr)
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------- Layouts ----------

mod layouts {
    use crate::codec::Primitive::*;
    use crate::layout::Field;

    pub(super) const VERSION_FLAGS: &[Field] = &[Field::new("version", U8), Field::new("flags", U24)];

    pub(super) const FTYP_LAYOUT: &[Field] = &[
        Field::new("major_brand", FourCC),
        Field::new("minor_version", Bcd),
    ];

    pub(super) const MVHD_TIMES_V0: &[Field] = &[
        Field::new("creation_time", U32),
        Field::new("modification_time", U32),
        Field::new("time_scale", U32),
        Field::new("duration", U32),
    ];

    pub(super) const MVHD_TIMES_V1: &[Field] = &[
        Field::new("creation_time", U64),
        Field::new("modification_time", U64),
        Field::new("time_scale", U32),
        Field::new("duration", U64),
    ];

    pub(super) const MVHD_TAIL: &[Field] = &[
        Field::new("preferred_rate", U32),
        Field::new("preferred_volume", U16),
        Field::new("reserved", Bytes(10)),
        Field::new("matrix_structure", Matrix),
        Field::new("preview_time", U32),
        Field::new("preview_duration", U32),
        Field::new("poster_time", U32),
        Field::new("selection_time", U32),
        Field::new("selection_duration", U32),
        Field::new("current_time", U32),
        Field::new("next_track_id", U32),
    ];

    pub(super) const TKHD_TIMES_V0: &[Field] = &[
        Field::new("creation_time", U32),
        Field::new("modification_time", U32),
        Field::new("track_id", U32),
        Field::new("reserved_1", Bytes(4)),
        Field::new("duration", U32),
    ];

    pub(super) const TKHD_TIMES_V1: &[Field] = &[
        Field::new("creation_time", U64),
        Field::new("modification_time", U64),
        Field::new("track_id", U32),
        Field::new("reserved_1", Bytes(4)),
        Field::new("duration", U64),
    ];

    pub(super) const TKHD_TAIL: &[Field] = &[
        Field::new("reserved_2", Bytes(8)),
        Field::new("layer", U16),
        Field::new("alternate_group", U16),
        Field::new("volume", U16),
        Field::new("reserved_3", Bytes(2)),
        Field::new("matrix_structure", Matrix),
        Field::new("track_width", Fixed16),
        Field::new("track_height", Fixed16),
    ];

    pub(super) const MDHD_TIMES_V0: &[Field] = &[
        Field::new("creation_time", U32),
        Field::new("modification_time", U32),
        Field::new("time_scale", U32),
        Field::new("duration", U32),
    ];

    pub(super) const MDHD_TIMES_V1: &[Field] = &[
        Field::new("creation_time", U64),
        Field::new("modification_time", U64),
        Field::new("time_scale", U32),
        Field::new("duration", U64),
    ];

    pub(super) const MDHD_TAIL: &[Field] = &[Field::new("language", U16), Field::new("quality", U16)];

    pub(super) const ENTRY_TABLE_HEADER: &[Field] = &[
        Field::new("version", U8),
        Field::new("flags", U24),
        Field::new("entry_count", U32),
    ];

    pub(super) const DREF_ENTRY_HEADER: &[Field] = &[
        Field::new("size", U32),
        Field::new("type", FourCC),
        Field::new("version", U8),
        Field::new("flags", U24),
    ];

    pub(super) const ELST_ENTRY_V0: &[Field] = &[
        Field::new("track_duration", U32),
        Field::new("media_time", U32),
        Field::new("media_rate", U32),
    ];

    pub(super) const ELST_ENTRY_V1: &[Field] = &[
        Field::new("track_duration", U64),
        Field::new("media_time", U64),
        Field::new("media_rate", U32),
    ];

    pub(super) const HDLR_LAYOUT: &[Field] = &[
        Field::new("version", U8),
        Field::new("flags", U24),
        Field::new("component_type", FourCC),
        Field::new("component_subtype", FourCC),
        Field::new("component_manufacturer", FourCC),
        Field::new("component_flags", U32),
        Field::new("component_flags_mask", U32),
    ];
}

use layouts::*;

// ---------- Helpers ----------

/// Version and flags, then the version-1 or version-0 layout, then `tail`.
fn read_versioned(
    r: &mut dyn Read,
    v0: &[Field],
    v1: &[Field],
    tail: &[Field],
) -> Result<FieldMap, DecodeError> {
    let mut map = read_layout(r, VERSION_FLAGS)?;
    let body = if map.u64("version") == Some(1) { v1 } else { v0 };
    map.extend(read_layout(r, body)?);
    map.extend(read_layout(r, tail)?);
    Ok(map)
}

fn read_exact_or_truncated(r: &mut dyn Read, len: u64) -> Result<Vec<u8>, DecodeError> {
    let buf = read_up_to(r, len)?;
    if (buf.len() as u64) < len {
        return Err(DecodeError::Truncated {
            needed: len,
            available: buf.len() as u64,
        });
    }
    Ok(buf)
}

fn lang_from_u16(code: u16) -> String {
    if code == 0 {
        return "und".to_string();
    }
    let c1 = ((code >> 10) & 0x1F) as u8 + 0x60;
    let c2 = ((code >> 5) & 0x1F) as u8 + 0x60;
    let c3 = (code & 0x1F) as u8 + 0x60;
    format!("{}{}{}", c1 as char, c2 as char, c3 as char)
}

// ---------- Decoders ----------

// ftyp: major brand, BCD minor version, then brands filling the rest of the box
pub struct FtypDecoder;

impl BoxDecoder for FtypDecoder {
    fn decode(&self, r: &mut dyn Read, hdr: &BoxHeader) -> Result<FieldMap, DecodeError> {
        let mut map = read_layout(r, FTYP_LAYOUT)?;

        let count = hdr.size.saturating_sub(16) / 4;
        let raw = read_exact_or_truncated(r, count * 4)?;
        let brands = raw
            .chunks_exact(4)
            .map(|c| FourCC([c[0], c[1], c[2], c[3]]).as_str_lossy())
            .collect();
        map.insert("compatible_brands", Value::Brands(brands));
        Ok(map)
    }
}

pub struct MvhdDecoder;

impl BoxDecoder for MvhdDecoder {
    fn decode(&self, r: &mut dyn Read, _hdr: &BoxHeader) -> Result<FieldMap, DecodeError> {
        read_versioned(r, MVHD_TIMES_V0, MVHD_TIMES_V1, MVHD_TAIL)
    }
}

pub struct TkhdDecoder;

impl BoxDecoder for TkhdDecoder {
    fn decode(&self, r: &mut dyn Read, _hdr: &BoxHeader) -> Result<FieldMap, DecodeError> {
        read_versioned(r, TKHD_TIMES_V0, TKHD_TIMES_V1, TKHD_TAIL)
    }
}

pub struct MdhdDecoder;

impl BoxDecoder for MdhdDecoder {
    fn decode(&self, r: &mut dyn Read, _hdr: &BoxHeader) -> Result<FieldMap, DecodeError> {
        let mut map = read_versioned(r, MDHD_TIMES_V0, MDHD_TIMES_V1, MDHD_TAIL)?;
        if let Some(Value::U16(code)) = map.get("language") {
            let lang = lang_from_u16(*code);
            map.insert("language_code", Value::Text(lang));
        }
        Ok(map)
    }
}

// dref: entry_count self-sized entries, each payload left as raw bytes
pub struct DrefDecoder;

impl BoxDecoder for DrefDecoder {
    fn decode(&self, r: &mut dyn Read, hdr: &BoxHeader) -> Result<FieldMap, DecodeError> {
        let mut map = read_layout(r, ENTRY_TABLE_HEADER)?;
        let entry_count = map.u64("entry_count").unwrap_or(0) as u32;
        let entry_header = layout_width(DREF_ENTRY_HEADER) as u64;
        let mut remaining = hdr
            .payload_len()
            .saturating_sub(layout_width(ENTRY_TABLE_HEADER) as u64);

        let mut entries = Vec::new();
        for index in 0..entry_count {
            let mut entry = read_layout(r, DREF_ENTRY_HEADER)?;
            remaining = remaining.saturating_sub(entry_header);

            let size = entry.u64("size").unwrap_or(0) as u32;
            let payload = (size as u64).checked_sub(entry_header);
            let payload = match payload {
                Some(p) if p <= remaining => p,
                _ => {
                    return Err(DecodeError::EntrySize {
                        index,
                        size,
                        remaining: remaining + entry_header,
                    });
                }
            };

            let data = read_exact_or_truncated(r, payload)?;
            remaining -= payload;
            entry.insert("data", Value::Bytes(data));
            entries.push(entry);
        }

        map.insert("entries", Value::Records(entries));
        Ok(map)
    }
}

// elst: entry_count (duration, media time, rate) triples
pub struct ElstDecoder;

impl BoxDecoder for ElstDecoder {
    fn decode(&self, r: &mut dyn Read, _hdr: &BoxHeader) -> Result<FieldMap, DecodeError> {
        let mut map = read_layout(r, ENTRY_TABLE_HEADER)?;
        let entry_count = map.u64("entry_count").unwrap_or(0);
        let layout = if map.u64("version") == Some(1) {
            ELST_ENTRY_V1
        } else {
            ELST_ENTRY_V0
        };

        let mut entries = Vec::new();
        for _ in 0..entry_count {
            entries.push(read_layout(r, layout)?);
        }

        map.insert("entries", Value::Records(entries));
        Ok(map)
    }
}

// hdlr: fixed header, then a name with no length prefix filling the box
// zero pre_defined as rendered by the FourCC primitive
const NO_COMPONENT: &str = "....";

pub struct HdlrDecoder;

impl BoxDecoder for HdlrDecoder {
    fn decode(&self, r: &mut dyn Read, hdr: &BoxHeader) -> Result<FieldMap, DecodeError> {
        let mut map = read_layout(r, HDLR_LAYOUT)?;

        let remaining = hdr
            .payload_len()
            .saturating_sub(layout_width(HDLR_LAYOUT) as u64);
        let mut name = read_up_to(r, remaining)?;
        let terminated = name.last() == Some(&0);
        while name.last() == Some(&0) {
            name.pop();
        }
        // QuickTime names a component type and writes a Pascal string; MP4
        // leaves pre_defined at zero and writes a C string.
        let quicktime = !terminated
            && map.get("component_type") != Some(&Value::FourCC(NO_COMPONENT.into()));
        if quicktime && name.first().is_some_and(|&n| n as usize == name.len() - 1) {
            name.remove(0);
        }

        map.insert("name", Value::Text(String::from_utf8_lossy(&name).into_owned()));
        Ok(map)
    }
}

// ---------- Default registry ----------

pub fn default_registry() -> Registry {
    Registry::new()
        .with_decoder(FourCC(*b"ftyp"), "ftyp", Box::new(FtypDecoder))
        .with_decoder(FourCC(*b"mvhd"), "mvhd", Box::new(MvhdDecoder))
        .with_decoder(FourCC(*b"tkhd"), "tkhd", Box::new(TkhdDecoder))
        .with_decoder(FourCC(*b"mdhd"), "mdhd", Box::new(MdhdDecoder))
        .with_decoder(FourCC(*b"dref"), "dref", Box::new(DrefDecoder))
        .with_decoder(FourCC(*b"elst"), "elst", Box::new(ElstDecoder))
        .with_decoder(FourCC(*b"hdlr"), "hdlr", Box::new(HdlrDecoder))
}
