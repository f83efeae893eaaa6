//! Metadata boxes: meta, udta and the leaves they carry.

use super::{DinfBox, HdlrBox, count_u16, count_u32, read_children};
use crate::boxes::{
    BoxHeader, ChildOrder, Decode, FourCC, FullBoxHeader, HeaderForm, Mp4Atom,
    encode_all, push_all, push_some,
};
use crate::error::{Error, Result};
use crate::parser::{BoxReader, decode_container_terminated};
use crate::primitives::{Language, hex_bytes, packed, read_uint_n, text_bytes, write_uint_n};
use crate::registry::Mp4Box;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Meta Box.
///
/// ISO files give meta a version/flags prefix; QuickTime files do not. The
/// prefix is absent when the payload starts directly with an `hdlr` box.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct MetaBox {
    pub full: Option<FullBoxHeader>,
    pub hdlr: Option<HdlrBox>,
    pub dinf: Option<DinfBox>,
    pub iloc: Option<IlocBox>,
    pub bxml: Option<BxmlBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MetaBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let avail = r.remaining_or_spill()?;
        let mut head = [0u8; 8];
        let peeked = avail.min(8) as usize;
        r.read_exact(&mut head[..peeked])?;

        let quicktime = peeked == 8 && &head[4..8] == b"hdlr";
        let (full, replay) = if quicktime {
            (None, &head[..])
        } else if peeked >= 4 {
            (Some(FullBoxHeader::read(&mut &head[..4])?), &head[4..peeked])
        } else {
            return Err(Error::bad_format("meta payload shorter than its version/flags prefix"));
        };

        // Decode the children from the already-consumed bytes followed by the rest.
        let start = r.offset() - replay.len() as u64;
        let options = r.options();
        let rest = r.remaining_or_spill()?;
        let mut chained = replay.chain(&mut *r);
        let mut inner = BoxReader::with_len(&mut chained, replay.len() as u64 + rest)
            .with_options(options)
            .starting_at(start);
        let (children, order) = read_children(&mut inner)?;

        let mut meta = MetaBox {
            full,
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Hdlr(b) if meta.hdlr.is_none() => meta.hdlr = Some(b),
                Mp4Box::Dinf(b) if meta.dinf.is_none() => meta.dinf = Some(b),
                Mp4Box::Iloc(b) if meta.iloc.is_none() => meta.iloc = Some(b),
                Mp4Box::Bxml(b) if meta.bxml.is_none() => meta.bxml = Some(b),
                other => meta.boxes.push(other),
            }
        }
        Ok(meta)
    }
}

impl MetaBox {
    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.hdlr);
        push_some(&mut out, &self.dinf);
        push_some(&mut out, &self.iloc);
        push_some(&mut out, &self.bxml);
        push_all(&mut out, &self.boxes);
        out
    }
}

impl Mp4Atom for MetaBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"meta")
    }

    fn payload_size(&self) -> u64 {
        let prefix = if self.full.is_some() { FullBoxHeader::SIZE } else { 0 };
        prefix + self.canonical_children().iter().map(|c| c.size()).sum::<u64>()
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        if let Some(full) = &self.full {
            full.write(w)?;
        }
        encode_all(&self.children(), w)
    }

    fn children(&self) -> Vec<&dyn Mp4Atom> {
        self.order.arrange(self.canonical_children())
    }

    fn summary(&self) -> String {
        match self.full {
            Some(_) => String::new(),
            None => "quicktime layout".to_string(),
        }
    }
}

/// User Data Box.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct UdtaBox {
    pub meta: Option<MetaBox>,
    pub cprt: Vec<CprtBox>,
    pub boxes: Vec<Mp4Box>,
    /// QuickTime writers may end the child list with a 32-bit zero.
    pub terminator: bool,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for UdtaBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, terminator) = decode_container_terminated(r)?;
        let mut udta = UdtaBox {
            order: ChildOrder::record(children.iter().map(|c| c.box_type())),
            terminator,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Meta(b) if udta.meta.is_none() => udta.meta = Some(b),
                Mp4Box::Cprt(b) => udta.cprt.push(b),
                other => udta.boxes.push(other),
            }
        }
        Ok(udta)
    }
}

impl UdtaBox {
    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_all(&mut out, &self.cprt);
        push_some(&mut out, &self.meta);
        push_all(&mut out, &self.boxes);
        out
    }

    fn terminator_size(&self) -> u64 {
        if self.terminator { 4 } else { 0 }
    }
}

impl Mp4Atom for UdtaBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"udta")
    }

    fn payload_size(&self) -> u64 {
        self.canonical_children().iter().map(|c| c.size()).sum::<u64>() + self.terminator_size()
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        encode_all(&self.children(), w)?;
        if self.terminator {
            w.write_u32::<BigEndian>(0)?;
        }
        Ok(())
    }

    fn children(&self) -> Vec<&dyn Mp4Atom> {
        self.order.arrange(self.canonical_children())
    }

    fn children_start(&self) -> u64 {
        self.header_form.header_size(self.payload_size())
    }
}

/// Copyright Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct CprtBox {
    pub full: FullBoxHeader,
    pub language: Language,
    #[serde(serialize_with = "text_bytes")]
    pub notice: Vec<u8>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for CprtBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(CprtBox {
            full: FullBoxHeader::read(r)?,
            language: Language(r.read_u16::<BigEndian>()?),
            notice: r.read_rest()?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for CprtBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"cprt")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 2 + self.notice.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u16::<BigEndian>(self.language.0)?;
        w.write_all(&self.notice)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!(
            "language={} notice={:?}",
            self.language.code(),
            crate::primitives::c_string(&self.notice)
        )
    }
}

/// Binary XML Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct BxmlBox {
    pub full: FullBoxHeader,
    #[serde(serialize_with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for BxmlBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(BxmlBox {
            full: FullBoxHeader::read(r)?,
            data: r.read_rest()?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for BxmlBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"bxml")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + self.data.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_all(&self.data)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!("{} bytes", self.data.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct IlocExtent {
    /// Only present in versions 1 and 2 when `index_size` is non-zero.
    pub index: u64,
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct IlocItem {
    pub item_id: u32,
    /// Reserved bits preceding the construction method (versions 1 and 2).
    #[serde(skip)]
    pub reserved: u16,
    pub construction_method: u8,
    pub data_reference_index: u16,
    pub base_offset: u64,
    pub extents: Vec<IlocExtent>,
}

/// Item Location Box. Field widths are given in bytes and must be 0, 4 or 8.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct IlocBox {
    pub full: FullBoxHeader,
    pub offset_size: u8,
    pub length_size: u8,
    pub base_offset_size: u8,
    /// Reserved in version 0, kept so the byte round-trips.
    pub index_size: u8,
    pub items: Vec<IlocItem>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

fn check_size(name: &str, size: u8) -> Result<u8> {
    match size {
        0 | 4 | 8 => Ok(size),
        _ => Err(Error::bad_format(format!("iloc {name} {size} is not 0, 4 or 8"))),
    }
}

impl IlocBox {
    fn has_index(&self) -> bool {
        self.full.version >= 1 && self.index_size > 0
    }

    fn id_width(&self) -> u64 {
        if self.full.version < 2 { 2 } else { 4 }
    }

    fn item_header_width(&self) -> u64 {
        let method = if self.full.version >= 1 { 2 } else { 0 };
        self.id_width() + method + 2 + self.base_offset_size as u64 + 2
    }

    fn extent_width(&self) -> u64 {
        let index = if self.has_index() { self.index_size as u64 } else { 0 };
        index + self.offset_size as u64 + self.length_size as u64
    }

    fn write_sizes(&self, w: &mut dyn Write) -> Result<()> {
        let a = packed::ILOC_HIGH_NIBBLE.put(0, self.offset_size as u64)?;
        let a = packed::ILOC_LOW_NIBBLE.put(a, self.length_size as u64)?;
        let b = packed::ILOC_HIGH_NIBBLE.put(0, self.base_offset_size as u64)?;
        let b = packed::ILOC_LOW_NIBBLE.put(b, self.index_size as u64)?;
        w.write_u8(a as u8)?;
        w.write_u8(b as u8)?;
        Ok(())
    }
}

impl Decode for IlocBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let a = r.read_u8()? as u64;
        let b = r.read_u8()? as u64;
        let mut iloc = IlocBox {
            full,
            offset_size: check_size("offset_size", packed::ILOC_HIGH_NIBBLE.get(a) as u8)?,
            length_size: check_size("length_size", packed::ILOC_LOW_NIBBLE.get(a) as u8)?,
            base_offset_size: check_size("base_offset_size", packed::ILOC_HIGH_NIBBLE.get(b) as u8)?,
            index_size: packed::ILOC_LOW_NIBBLE.get(b) as u8,
            items: Vec::new(),
            header_form: h.form,
        };
        if full.version >= 1 {
            check_size("index_size", iloc.index_size)?;
        }

        let item_count = if full.version < 2 {
            r.read_u16::<BigEndian>()? as u32
        } else {
            r.read_u32::<BigEndian>()?
        };
        let n = r.check_entries(item_count as u64, iloc.item_header_width())?;
        iloc.items.reserve(n);
        for _ in 0..n {
            let item_id = if full.version < 2 {
                r.read_u16::<BigEndian>()? as u32
            } else {
                r.read_u32::<BigEndian>()?
            };
            let (reserved, construction_method) = if full.version >= 1 {
                let word = r.read_u16::<BigEndian>()? as u64;
                (
                    packed::ILOC_RESERVED.get(word) as u16,
                    packed::ILOC_CONSTRUCTION_METHOD.get(word) as u8,
                )
            } else {
                (0, 0)
            };
            let data_reference_index = r.read_u16::<BigEndian>()?;
            let base_offset = read_uint_n(r, iloc.base_offset_size)?;
            let extent_count = r.read_u16::<BigEndian>()?;
            let m = r.check_entries(extent_count as u64, iloc.extent_width())?;
            let mut extents = Vec::with_capacity(m);
            for _ in 0..m {
                let index = if iloc.has_index() { read_uint_n(r, iloc.index_size)? } else { 0 };
                extents.push(IlocExtent {
                    index,
                    offset: read_uint_n(r, iloc.offset_size)?,
                    length: read_uint_n(r, iloc.length_size)?,
                });
            }
            iloc.items.push(IlocItem {
                item_id,
                reserved,
                construction_method,
                data_reference_index,
                base_offset,
                extents,
            });
        }
        Ok(iloc)
    }
}

impl Mp4Atom for IlocBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"iloc")
    }

    fn payload_size(&self) -> u64 {
        let count = if self.full.version < 2 { 2 } else { 4 };
        let items: u64 = self
            .items
            .iter()
            .map(|i| self.item_header_width() + self.extent_width() * i.extents.len() as u64)
            .sum();
        FullBoxHeader::SIZE + 2 + count + items
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        self.write_sizes(w)?;
        if self.full.version < 2 {
            w.write_u16::<BigEndian>(count_u16(self.items.len())?)?;
        } else {
            w.write_u32::<BigEndian>(count_u32(self.items.len())?)?;
        }
        for item in &self.items {
            write_uint_n(w, item.item_id as u64, self.id_width() as u8)?;
            if self.full.version >= 1 {
                let word = packed::ILOC_RESERVED.put(0, item.reserved as u64)?;
                let word = packed::ILOC_CONSTRUCTION_METHOD.put(word, item.construction_method as u64)?;
                w.write_u16::<BigEndian>(word as u16)?;
            }
            w.write_u16::<BigEndian>(item.data_reference_index)?;
            write_uint_n(w, item.base_offset, self.base_offset_size)?;
            w.write_u16::<BigEndian>(count_u16(item.extents.len())?)?;
            for e in &item.extents {
                if self.has_index() {
                    write_uint_n(w, e.index, self.index_size)?;
                }
                write_uint_n(w, e.offset, self.offset_size)?;
                write_uint_n(w, e.length, self.length_size)?;
            }
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!("items={}", self.items.len())
    }
}
