use crate::{
    boxes::{Atom, FourCC, find_by_path},
    config::ParseOptions,
    parser::{ParseError, Result, Walker},
    registry::{Registry, default_registry},
    util::read_up_to,
};
use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom};
use std::sync::OnceLock;

// size + type + major brand + minor version
const MIN_FTYP_SIZE: u32 = 4 + 4 + 4 + 4;

/// What [`identify`] recovered from a matching stream.
#[derive(Debug, Serialize)]
pub struct MoovInfo {
    /// First three characters of the major brand, e.g. `"mp4"` for `mp42`.
    pub brand: String,
    pub major_brand: String,
    /// Root-level atoms in file order.
    pub atoms: Vec<Atom>,
}

impl MoovInfo {
    pub fn find(&self, path: &[&str]) -> Option<&Atom> {
        find_by_path(&self.atoms, path)
    }
}

fn shared_registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(default_registry)
}

/// Cheap check that the stream opens with a plausible `ftyp` box.
///
/// Reads at most 8 bytes from the start. A stream shorter than that is simply
/// not a match.
pub fn sniff<R: Read + Seek>(r: &mut R) -> std::io::Result<bool> {
    r.seek(SeekFrom::Start(0))?;
    let head = read_up_to(r, 8)?;
    if head.len() < 8 {
        return Ok(false);
    }
    let size = BigEndian::read_u32(&head[0..4]);
    Ok(size >= MIN_FTYP_SIZE && head[4..8] == FourCC::FTYP.0)
}

/// Identify an MP4/MOV/M4A stream and extract its atom tree.
///
/// Returns `Ok(None)` when the stream is not in this format so that callers
/// can go on to try other parsers.
///
/// # Example
/// ```no_run
/// use std::fs::File;
///
/// let mut file = File::open("video.mp4")?;
/// if let Some(info) = moovtree::identify(&mut file)? {
///     println!("{} with {} root atoms", info.brand, info.atoms.len());
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn identify<R: Read + Seek>(r: &mut R) -> Result<Option<MoovInfo>> {
    identify_with(r, &ParseOptions::default(), shared_registry())
}

/// [`identify`] with custom limits and decoders.
pub fn identify_with<R: Read + Seek>(
    r: &mut R,
    opts: &ParseOptions,
    registry: &Registry,
) -> Result<Option<MoovInfo>> {
    if !sniff(r)? {
        log::debug!("no ftyp signature, not a match");
        return Ok(None);
    }

    r.seek(SeekFrom::Start(0))?;
    let atoms = Walker::new(opts, registry).walk(r, opts.root_budget)?;

    let major_brand = find_by_path(&atoms, &["ftyp"])
        .and_then(Atom::decoded)
        .and_then(|f| f.str("major_brand"))
        .ok_or(ParseError::MissingBrand)?
        .to_string();
    let brand = major_brand.chars().take(3).collect();

    log::debug!("identified ISO-BMFF stream, major brand {}", major_brand);
    Ok(Some(MoovInfo {
        brand,
        major_brand,
        atoms,
    }))
}
