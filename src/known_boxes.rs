use crate::boxes::FourCC;

/// How the walker treats a box body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomClass {
    /// Body is nothing but child boxes.
    Branch,
    /// Body holds fields and child boxes (the iTunes `udta.meta`).
    BranchAndLeaf,
    /// Body is raw fields, decoded when a decoder is registered.
    Leaf,
}

/// Typed view over the type codes this crate cares about.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    Ftyp,
    Moov,
    Mdat,
    Free,
    Skip,
    Wide,
    Meta,
    Uuid,

    Mvhd,
    Trak,
    Udta,
    Clip,
    Matt,

    Tkhd,
    Edts,
    Elst,
    Mdia,

    Mdhd,
    Hdlr,
    Minf,

    Vmhd,
    Smhd,
    Gmhd,
    Dinf,
    Dref,
    Stbl,
    Stsd,
    Stts,
    Stss,
    Stsc,
    Stsz,
    Stco,
    Co64,

    Ilst,
    Mvex,
    Moof,
    Traf,
    Mfra,

    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"moov" => KnownBox::Moov,
            b"mdat" => KnownBox::Mdat,
            b"free" => KnownBox::Free,
            b"skip" => KnownBox::Skip,
            b"wide" => KnownBox::Wide,
            b"meta" => KnownBox::Meta,
            b"uuid" => KnownBox::Uuid,

            b"mvhd" => KnownBox::Mvhd,
            b"trak" => KnownBox::Trak,
            b"udta" => KnownBox::Udta,
            b"clip" => KnownBox::Clip,
            b"matt" => KnownBox::Matt,

            b"tkhd" => KnownBox::Tkhd,
            b"edts" => KnownBox::Edts,
            b"elst" => KnownBox::Elst,
            b"mdia" => KnownBox::Mdia,

            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,

            b"vmhd" => KnownBox::Vmhd,
            b"smhd" => KnownBox::Smhd,
            b"gmhd" => KnownBox::Gmhd,
            b"dinf" => KnownBox::Dinf,
            b"dref" => KnownBox::Dref,
            b"stbl" => KnownBox::Stbl,
            b"stsd" => KnownBox::Stsd,
            b"stts" => KnownBox::Stts,
            b"stss" => KnownBox::Stss,
            b"stsc" => KnownBox::Stsc,
            b"stsz" => KnownBox::Stsz,
            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,

            b"ilst" => KnownBox::Ilst,
            b"mvex" => KnownBox::Mvex,
            b"moof" => KnownBox::Moof,
            b"traf" => KnownBox::Traf,
            b"mfra" => KnownBox::Mfra,

            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    pub fn class(&self) -> AtomClass {
        match self {
            KnownBox::Meta => AtomClass::BranchAndLeaf,
            KnownBox::Moov
            | KnownBox::Trak
            | KnownBox::Mdia
            | KnownBox::Minf
            | KnownBox::Dinf
            | KnownBox::Stbl
            | KnownBox::Edts
            | KnownBox::Udta
            | KnownBox::Clip
            | KnownBox::Matt
            | KnownBox::Mvex
            | KnownBox::Moof
            | KnownBox::Traf
            | KnownBox::Mfra => AtomClass::Branch,
            _ => AtomClass::Leaf,
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Skip => "Skip Box",
            KnownBox::Wide => "Wide Box",
            KnownBox::Meta => "Metadata Box",
            KnownBox::Uuid => "User Extension Box",
            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Clip => "Clipping Box",
            KnownBox::Matt => "Track Matte Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Elst => "Edit List Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Vmhd => "Video Media Header Box",
            KnownBox::Smhd => "Sound Media Header Box",
            KnownBox::Gmhd => "Base Media Information Header Box",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Dref => "Data Reference Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Stts => "Decoding Time to Sample Box",
            KnownBox::Stss => "Sync Sample Box",
            KnownBox::Stsc => "Sample To Chunk Box",
            KnownBox::Stsz => "Sample Size Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "64-bit Chunk Offset Box",
            KnownBox::Ilst => "Metadata Item List Box",
            KnownBox::Mvex => "Movie Extends Box",
            KnownBox::Moof => "Movie Fragment Box",
            KnownBox::Traf => "Track Fragment Box",
            KnownBox::Mfra => "Movie Fragment Random Access Box",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }
}
