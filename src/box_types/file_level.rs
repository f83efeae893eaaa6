//! Boxes that normally sit at the top level of a file: ftyp/styp, free/skip,
//! mdat, pdin, plus iods and the opaque passthrough box.

use crate::boxes::{BoxHeader, Decode, FourCC, FullBoxHeader, HeaderForm, Mp4Atom};
use crate::error::{Error, Result};
use crate::file::MdatPolicy;
use crate::parser::{BoxReader, write_box_header};
use crate::primitives::hex_bytes;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

pub const FTYP: FourCC = FourCC::new(b"ftyp");
pub const STYP: FourCC = FourCC::new(b"styp");
pub const FREE: FourCC = FourCC::new(b"free");
pub const SKIP: FourCC = FourCC::new(b"skip");
pub const MDAT: FourCC = FourCC::new(b"mdat");

/// File Type Box, also used for the Segment Type Box (`styp`), which
/// shares its layout.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FtypBox {
    pub typ: FourCC,
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl FtypBox {
    pub fn new(major_brand: FourCC, minor_version: u32, compatible_brands: Vec<FourCC>) -> Self {
        FtypBox {
            typ: FTYP,
            major_brand,
            minor_version,
            compatible_brands,
            header_form: HeaderForm::Compact,
        }
    }

    pub fn is_segment_type(&self) -> bool {
        self.typ == STYP
    }
}

impl Decode for FtypBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let major_brand = FourCC::read(r)?;
        let minor_version = r.read_u32::<BigEndian>()?;
        let rest = r.remaining_or_spill()?;
        if rest % 4 != 0 {
            return Err(Error::bad_format(format!(
                "{rest} bytes of compatible brands is not a multiple of 4"
            )));
        }
        let n = r.check_entries(rest / 4, 4)?;
        let mut compatible_brands = Vec::with_capacity(n);
        for _ in 0..n {
            compatible_brands.push(FourCC::read(r)?);
        }
        Ok(FtypBox {
            typ: h.typ,
            major_brand,
            minor_version,
            compatible_brands,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for FtypBox {
    fn box_type(&self) -> FourCC {
        self.typ
    }

    fn payload_size(&self) -> u64 {
        8 + 4 * self.compatible_brands.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.major_brand.write(w)?;
        w.write_u32::<BigEndian>(self.minor_version)?;
        for b in &self.compatible_brands {
            b.write(w)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        let brands: Vec<String> = self.compatible_brands.iter().map(|b| b.to_string()).collect();
        format!(
            "major={} minor={} compatible=[{}]",
            self.major_brand,
            self.minor_version,
            brands.join(", ")
        )
    }
}

/// Free Space Box (`free` or `skip`); contents are kept so round-trips stay exact.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FreeBox {
    pub typ: FourCC,
    #[serde(skip)]
    pub header_form: HeaderForm,
    #[serde(serialize_with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl FreeBox {
    pub fn new(len: usize) -> Self {
        FreeBox {
            typ: FREE,
            header_form: HeaderForm::Compact,
            data: vec![0; len],
        }
    }
}

impl Decode for FreeBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(FreeBox {
            typ: h.typ,
            header_form: h.form,
            data: r.read_rest()?,
        })
    }
}

impl Mp4Atom for FreeBox {
    fn box_type(&self) -> FourCC {
        self.typ
    }

    fn payload_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&self.data)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!("{} bytes", self.data.len())
    }
}

/// Where the bytes of a media data box live.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MdatPayload {
    Buffered(#[serde(serialize_with = "hex_bytes")] Vec<u8>),
    /// Left in the source stream: `len` bytes starting at absolute `offset`.
    Deferred { offset: u64, len: u64 },
}

/// Media Data Box. The payload is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MdatBox {
    #[serde(skip)]
    pub header_form: HeaderForm,
    pub payload: MdatPayload,
    /// Stream offset of the header this box was decoded from. Chunk offsets
    /// that point into the box are relocated against it when the box moves.
    #[serde(skip)]
    pub source_start: Option<u64>,
}

impl MdatBox {
    pub fn new(data: Vec<u8>) -> Self {
        MdatBox {
            payload: MdatPayload::Buffered(data),
            source_start: None,
            header_form: HeaderForm::Compact,
        }
    }

    /// A box whose payload stays in the source stream, right after header `h`.
    pub(crate) fn deferred(h: &BoxHeader) -> Self {
        MdatBox {
            header_form: h.form,
            payload: MdatPayload::Deferred {
                offset: h.start + h.header_size,
                len: h.payload_size(),
            },
            source_start: Some(h.start),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.payload, MdatPayload::Deferred { .. })
    }

    /// Encodes the box, copying a deferred payload out of `source`.
    pub fn encode_from<S: Read + Seek>(&self, source: &mut S, w: &mut dyn Write) -> Result<()> {
        match self.payload {
            MdatPayload::Buffered(_) => self.encode(w),
            MdatPayload::Deferred { offset, len } => {
                write_box_header(w, self.box_type(), len, self.header_form)?;
                source.seek(SeekFrom::Start(offset))?;
                let copied = io::copy(&mut source.by_ref().take(len), w)?;
                if copied < len {
                    return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
                }
                Ok(())
            }
        }
    }
}

impl Decode for MdatBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        if r.options().mdat == MdatPolicy::Defer {
            r.skip(h.payload_size())?;
            tracing::debug!(offset = h.start + h.header_size, len = h.payload_size(), "deferring mdat payload");
            return Ok(Self::deferred(h));
        }
        Ok(MdatBox {
            payload: MdatPayload::Buffered(r.read_rest()?),
            source_start: Some(h.start),
            header_form: h.form,
        })
    }
}

impl Mp4Atom for MdatBox {
    fn box_type(&self) -> FourCC {
        MDAT
    }

    fn payload_size(&self) -> u64 {
        match &self.payload {
            MdatPayload::Buffered(data) => data.len() as u64,
            MdatPayload::Deferred { len, .. } => *len,
        }
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        match &self.payload {
            MdatPayload::Buffered(data) => {
                w.write_all(data)?;
                Ok(())
            }
            MdatPayload::Deferred { .. } => Err(Error::DeferredPayload),
        }
    }

    fn summary(&self) -> String {
        match &self.payload {
            MdatPayload::Buffered(data) => format!("{} bytes", data.len()),
            MdatPayload::Deferred { offset, len } => format!("{len} bytes deferred at {offset:#x}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PdinEntry {
    pub rate: u32,
    pub initial_delay: u32,
}

/// Progressive Download Information Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct PdinBox {
    pub full: FullBoxHeader,
    pub entries: Vec<PdinEntry>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for PdinBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let rest = r.remaining_or_spill()?;
        if rest % 8 != 0 {
            return Err(Error::bad_format(format!("{rest} bytes is not a whole number of pdin entries")));
        }
        let n = r.check_entries(rest / 8, 8)?;
        let mut entries = Vec::with_capacity(n);
        for _ in 0..n {
            entries.push(PdinEntry {
                rate: r.read_u32::<BigEndian>()?,
                initial_delay: r.read_u32::<BigEndian>()?,
            });
        }
        Ok(PdinBox {
            full,
            entries,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for PdinBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"pdin")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 8 * self.entries.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        for e in &self.entries {
            w.write_u32::<BigEndian>(e.rate)?;
            w.write_u32::<BigEndian>(e.initial_delay)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!("entries={}", self.entries.len())
    }
}

/// Object Descriptor Box; the descriptor itself is carried undecoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct IodsBox {
    pub full: FullBoxHeader,
    #[serde(serialize_with = "hex_bytes")]
    pub descriptor: Vec<u8>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for IodsBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(IodsBox {
            full: FullBoxHeader::read(r)?,
            descriptor: r.read_rest()?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for IodsBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"iods")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + self.descriptor.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_all(&self.descriptor)?;
        Ok(())
    }
}

/// Any box without a typed decoder. Type, header form and payload are kept
/// verbatim so the box re-encodes byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UnknownBox {
    pub typ: FourCC,
    #[serde(skip)]
    pub header_form: HeaderForm,
    #[serde(serialize_with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl UnknownBox {
    pub fn new(typ: FourCC, data: Vec<u8>) -> Self {
        UnknownBox {
            typ,
            header_form: HeaderForm::Compact,
            data,
        }
    }
}

impl Decode for UnknownBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(UnknownBox {
            typ: h.typ,
            header_form: h.form,
            data: r.read_rest()?,
        })
    }
}

impl Mp4Atom for UnknownBox {
    fn box_type(&self) -> FourCC {
        self.typ
    }

    fn payload_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&self.data)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!("{} bytes (not decoded)", self.data.len())
    }
}
