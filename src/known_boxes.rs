use crate::boxes::FourCC;

/// Box types the registry decodes into typed structures.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)` and is
/// carried through as opaque bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level
    Ftyp,
    Styp,
    Pdin,
    Moov,
    Moof,
    Mdat,
    Free,
    Skip,
    Sidx,
    Mfra,
    Meta,
    Udta,

    // moov / trak
    Mvhd,
    Iods,
    Trak,
    Tkhd,
    Edts,
    Elst,
    Mdia,
    Mdhd,
    Hdlr,
    Minf,
    Vmhd,
    Smhd,
    Dinf,
    Dref,
    Url,

    // stbl
    Stbl,
    Stsd,
    Stts,
    Ctts,
    Stsc,
    Stsz,
    Stco,
    Co64,
    Stss,
    Sbgp,
    Sgpd,

    // fragments
    Mvex,
    Mehd,
    Trex,
    Mfhd,
    Traf,
    Tfhd,
    Tfdt,
    Trun,
    Tfra,
    Mfro,

    // meta / udta
    Bxml,
    Iloc,
    Cprt,

    // Anything else
    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"styp" => KnownBox::Styp,
            b"pdin" => KnownBox::Pdin,
            b"moov" => KnownBox::Moov,
            b"moof" => KnownBox::Moof,
            b"mdat" => KnownBox::Mdat,
            b"free" => KnownBox::Free,
            b"skip" => KnownBox::Skip,
            b"sidx" => KnownBox::Sidx,
            b"mfra" => KnownBox::Mfra,
            b"meta" => KnownBox::Meta,
            b"udta" => KnownBox::Udta,

            b"mvhd" => KnownBox::Mvhd,
            b"iods" => KnownBox::Iods,
            b"trak" => KnownBox::Trak,
            b"tkhd" => KnownBox::Tkhd,
            b"edts" => KnownBox::Edts,
            b"elst" => KnownBox::Elst,
            b"mdia" => KnownBox::Mdia,
            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,
            b"vmhd" => KnownBox::Vmhd,
            b"smhd" => KnownBox::Smhd,
            b"dinf" => KnownBox::Dinf,
            b"dref" => KnownBox::Dref,
            b"url " => KnownBox::Url,

            b"stbl" => KnownBox::Stbl,
            b"stsd" => KnownBox::Stsd,
            b"stts" => KnownBox::Stts,
            b"ctts" => KnownBox::Ctts,
            b"stsc" => KnownBox::Stsc,
            b"stsz" => KnownBox::Stsz,
            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,
            b"stss" => KnownBox::Stss,
            b"sbgp" => KnownBox::Sbgp,
            b"sgpd" => KnownBox::Sgpd,

            b"mvex" => KnownBox::Mvex,
            b"mehd" => KnownBox::Mehd,
            b"trex" => KnownBox::Trex,
            b"mfhd" => KnownBox::Mfhd,
            b"traf" => KnownBox::Traf,
            b"tfhd" => KnownBox::Tfhd,
            b"tfdt" => KnownBox::Tfdt,
            b"trun" => KnownBox::Trun,
            b"tfra" => KnownBox::Tfra,
            b"mfro" => KnownBox::Mfro,

            b"bxml" => KnownBox::Bxml,
            b"iloc" => KnownBox::Iloc,
            b"cprt" => KnownBox::Cprt,

            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    /// Human-readable name as used in ISO/IEC 14496-12.
    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Styp => "Segment Type Box",
            KnownBox::Pdin => "Progressive Download Information Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Moof => "Movie Fragment Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Skip => "Free Space Box (skip)",
            KnownBox::Sidx => "Segment Index Box",
            KnownBox::Mfra => "Movie Fragment Random Access Box",
            KnownBox::Meta => "Meta Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Iods => "Object Descriptor Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Elst => "Edit List Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Vmhd => "Video Media Header Box",
            KnownBox::Smhd => "Sound Media Header Box",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Dref => "Data Reference Box",
            KnownBox::Url => "Data Entry URL Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Stts => "Decoding Time to Sample Box",
            KnownBox::Ctts => "Composition Time to Sample Box",
            KnownBox::Stsc => "Sample To Chunk Box",
            KnownBox::Stsz => "Sample Size Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "Chunk Large Offset Box",
            KnownBox::Stss => "Sync Sample Box",
            KnownBox::Sbgp => "Sample To Group Box",
            KnownBox::Sgpd => "Sample Group Description Box",
            KnownBox::Mvex => "Movie Extends Box",
            KnownBox::Mehd => "Movie Extends Header Box",
            KnownBox::Trex => "Track Extends Box",
            KnownBox::Mfhd => "Movie Fragment Header Box",
            KnownBox::Traf => "Track Fragment Box",
            KnownBox::Tfhd => "Track Fragment Header Box",
            KnownBox::Tfdt => "Track Fragment Decode Time Box",
            KnownBox::Trun => "Track Fragment Run Box",
            KnownBox::Tfra => "Track Fragment Random Access Box",
            KnownBox::Mfro => "Movie Fragment Random Access Offset Box",
            KnownBox::Bxml => "Binary XML Box",
            KnownBox::Iloc => "Item Location Box",
            KnownBox::Cprt => "Copyright Box",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }

    /// Does this box *contain* child boxes (container semantics)?
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            KnownBox::Moov
                | KnownBox::Trak
                | KnownBox::Edts
                | KnownBox::Mdia
                | KnownBox::Minf
                | KnownBox::Dinf
                | KnownBox::Stbl
                | KnownBox::Udta
                | KnownBox::Meta
                | KnownBox::Mvex
                | KnownBox::Moof
                | KnownBox::Traf
                | KnownBox::Mfra
        )
    }

    /// Is this a FullBox (version + flags)?
    pub fn is_full_box(&self) -> bool {
        matches!(
            self,
            KnownBox::Pdin
                | KnownBox::Iods
                | KnownBox::Sidx
                | KnownBox::Mvhd
                | KnownBox::Tkhd
                | KnownBox::Elst
                | KnownBox::Mdhd
                | KnownBox::Hdlr
                | KnownBox::Vmhd
                | KnownBox::Smhd
                | KnownBox::Dref
                | KnownBox::Url
                | KnownBox::Stsd
                | KnownBox::Stts
                | KnownBox::Ctts
                | KnownBox::Stsc
                | KnownBox::Stsz
                | KnownBox::Stco
                | KnownBox::Co64
                | KnownBox::Stss
                | KnownBox::Sbgp
                | KnownBox::Sgpd
                | KnownBox::Mehd
                | KnownBox::Trex
                | KnownBox::Mfhd
                | KnownBox::Tfhd
                | KnownBox::Tfdt
                | KnownBox::Trun
                | KnownBox::Tfra
                | KnownBox::Mfro
                | KnownBox::Bxml
                | KnownBox::Iloc
                | KnownBox::Cprt
        )
    }
}
