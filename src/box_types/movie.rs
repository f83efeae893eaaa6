//! The movie header tree: moov, trak, edts, mdia, minf, dinf and their leaves.

use super::{
    IodsBox, MetaBox, MvexBox, StblBox, UdtaBox, count_u32, read_children, read_versioned,
    versioned_width, write_versioned,
};
use crate::boxes::{
    BoxHeader, ChildOrder, ContainerBox, Decode, FourCC, FullBoxHeader, HeaderForm, Mp4Atom,
    encode_all, push_all, push_some,
};
use crate::error::{Error, Result};
use crate::parser::{BoxReader, decode_container};
use crate::primitives::{Fixed16, Fixed32, Language, hex_bytes, text_bytes};
use crate::registry::Mp4Box;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Identity transformation matrix used by mvhd and tkhd.
pub const UNITY_MATRIX: [i32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

fn read_matrix<R: Read + ?Sized>(r: &mut R) -> Result<[i32; 9]> {
    let mut m = [0i32; 9];
    r.read_i32_into::<BigEndian>(&mut m)?;
    Ok(m)
}

fn write_matrix(w: &mut dyn Write, m: &[i32; 9]) -> Result<()> {
    for v in m {
        w.write_i32::<BigEndian>(*v)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct MoovBox {
    pub mvhd: Option<MvhdBox>,
    pub iods: Option<IodsBox>,
    pub trak: Vec<TrakBox>,
    pub mvex: Option<MvexBox>,
    pub meta: Option<MetaBox>,
    pub udta: Option<UdtaBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MoovBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut moov = MoovBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Mvhd(b) if moov.mvhd.is_none() => moov.mvhd = Some(b),
                Mp4Box::Iods(b) if moov.iods.is_none() => moov.iods = Some(b),
                Mp4Box::Trak(b) => moov.trak.push(b),
                Mp4Box::Mvex(b) if moov.mvex.is_none() => moov.mvex = Some(b),
                Mp4Box::Meta(b) if moov.meta.is_none() => moov.meta = Some(b),
                Mp4Box::Udta(b) if moov.udta.is_none() => moov.udta = Some(b),
                other => moov.boxes.push(other),
            }
        }
        Ok(moov)
    }
}

impl ContainerBox for MoovBox {
    const TYPE: FourCC = FourCC::new(b"moov");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.mvhd);
        push_some(&mut out, &self.iods);
        push_all(&mut out, &self.trak);
        push_some(&mut out, &self.mvex);
        push_some(&mut out, &self.meta);
        push_some(&mut out, &self.udta);
        push_all(&mut out, &self.boxes);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

/// Movie Header Box.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MvhdBox {
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    pub rate: Fixed32,
    pub volume: Fixed16,
    #[serde(skip)]
    pub reserved: [u8; 10],
    pub matrix: [i32; 9],
    #[serde(skip)]
    pub pre_defined: [u8; 24],
    pub next_track_id: u32,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Default for MvhdBox {
    fn default() -> Self {
        MvhdBox {
            full: FullBoxHeader::default(),
            creation_time: 0,
            modification_time: 0,
            timescale: 1000,
            duration: 0,
            rate: Fixed32::ONE,
            volume: Fixed16::ONE,
            reserved: [0; 10],
            matrix: UNITY_MATRIX,
            pre_defined: [0; 24],
            next_track_id: 1,
            header_form: HeaderForm::Compact,
        }
    }
}

impl Decode for MvhdBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let v = full.version;
        let creation_time = read_versioned(r, v)?;
        let modification_time = read_versioned(r, v)?;
        let timescale = r.read_u32::<BigEndian>()?;
        let duration = read_versioned(r, v)?;
        let rate = Fixed32::read(r)?;
        let volume = Fixed16::read(r)?;
        let mut reserved = [0u8; 10];
        r.read_exact(&mut reserved)?;
        let matrix = read_matrix(r)?;
        let mut pre_defined = [0u8; 24];
        r.read_exact(&mut pre_defined)?;
        let next_track_id = r.read_u32::<BigEndian>()?;
        Ok(MvhdBox {
            full,
            creation_time,
            modification_time,
            timescale,
            duration,
            rate,
            volume,
            reserved,
            matrix,
            pre_defined,
            next_track_id,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for MvhdBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"mvhd")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 3 * versioned_width(self.full.version) + 4 + 80
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        let v = self.full.version;
        self.full.write(w)?;
        write_versioned(w, v, self.creation_time)?;
        write_versioned(w, v, self.modification_time)?;
        w.write_u32::<BigEndian>(self.timescale)?;
        write_versioned(w, v, self.duration)?;
        self.rate.write(w)?;
        self.volume.write(w)?;
        w.write_all(&self.reserved)?;
        write_matrix(w, &self.matrix)?;
        w.write_all(&self.pre_defined)?;
        w.write_u32::<BigEndian>(self.next_track_id)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!(
            "timescale={} duration={} rate={} volume={} next_track_id={}",
            self.timescale, self.duration, self.rate, self.volume, self.next_track_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct TrakBox {
    pub tkhd: Option<TkhdBox>,
    pub edts: Option<EdtsBox>,
    pub mdia: Option<MdiaBox>,
    pub meta: Option<MetaBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl TrakBox {
    pub fn stbl(&self) -> Option<&StblBox> {
        self.mdia.as_ref()?.minf.as_ref()?.stbl.as_ref()
    }

    pub fn stbl_mut(&mut self) -> Option<&mut StblBox> {
        self.mdia.as_mut()?.minf.as_mut()?.stbl.as_mut()
    }
}

impl Decode for TrakBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut trak = TrakBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Tkhd(b) if trak.tkhd.is_none() => trak.tkhd = Some(b),
                Mp4Box::Edts(b) if trak.edts.is_none() => trak.edts = Some(b),
                Mp4Box::Mdia(b) if trak.mdia.is_none() => trak.mdia = Some(b),
                Mp4Box::Meta(b) if trak.meta.is_none() => trak.meta = Some(b),
                other => trak.boxes.push(other),
            }
        }
        Ok(trak)
    }
}

impl ContainerBox for TrakBox {
    const TYPE: FourCC = FourCC::new(b"trak");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.tkhd);
        push_some(&mut out, &self.edts);
        push_some(&mut out, &self.mdia);
        push_some(&mut out, &self.meta);
        push_all(&mut out, &self.boxes);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

/// Track Header Box.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TkhdBox {
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    #[serde(skip)]
    pub reserved1: u32,
    pub duration: u64,
    #[serde(skip)]
    pub reserved2: [u8; 8],
    pub layer: i16,
    pub alternate_group: i16,
    pub volume: Fixed16,
    #[serde(skip)]
    pub reserved3: u16,
    pub matrix: [i32; 9],
    pub width: Fixed32,
    pub height: Fixed32,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Default for TkhdBox {
    fn default() -> Self {
        TkhdBox {
            full: FullBoxHeader::new(0, 0x000003),
            creation_time: 0,
            modification_time: 0,
            track_id: 1,
            reserved1: 0,
            duration: 0,
            reserved2: [0; 8],
            layer: 0,
            alternate_group: 0,
            volume: Fixed16::default(),
            reserved3: 0,
            matrix: UNITY_MATRIX,
            width: Fixed32::default(),
            height: Fixed32::default(),
            header_form: HeaderForm::Compact,
        }
    }
}

impl Decode for TkhdBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let v = full.version;
        let creation_time = read_versioned(r, v)?;
        let modification_time = read_versioned(r, v)?;
        let track_id = r.read_u32::<BigEndian>()?;
        let reserved1 = r.read_u32::<BigEndian>()?;
        let duration = read_versioned(r, v)?;
        let mut reserved2 = [0u8; 8];
        r.read_exact(&mut reserved2)?;
        Ok(TkhdBox {
            full,
            creation_time,
            modification_time,
            track_id,
            reserved1,
            duration,
            reserved2,
            layer: r.read_i16::<BigEndian>()?,
            alternate_group: r.read_i16::<BigEndian>()?,
            volume: Fixed16::read(r)?,
            reserved3: r.read_u16::<BigEndian>()?,
            matrix: read_matrix(r)?,
            width: Fixed32::read(r)?,
            height: Fixed32::read(r)?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for TkhdBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"tkhd")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 3 * versioned_width(self.full.version) + 8 + 60
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        let v = self.full.version;
        self.full.write(w)?;
        write_versioned(w, v, self.creation_time)?;
        write_versioned(w, v, self.modification_time)?;
        w.write_u32::<BigEndian>(self.track_id)?;
        w.write_u32::<BigEndian>(self.reserved1)?;
        write_versioned(w, v, self.duration)?;
        w.write_all(&self.reserved2)?;
        w.write_i16::<BigEndian>(self.layer)?;
        w.write_i16::<BigEndian>(self.alternate_group)?;
        self.volume.write(w)?;
        w.write_u16::<BigEndian>(self.reserved3)?;
        write_matrix(w, &self.matrix)?;
        self.width.write(w)?;
        self.height.write(w)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!(
            "track_id={} duration={} size={}x{} flags=0x{:06x}",
            self.track_id, self.duration, self.width, self.height, self.full.flags
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct EdtsBox {
    pub elst: Option<ElstBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for EdtsBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut edts = EdtsBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Elst(b) if edts.elst.is_none() => edts.elst = Some(b),
                other => edts.boxes.push(other),
            }
        }
        Ok(edts)
    }
}

impl ContainerBox for EdtsBox {
    const TYPE: FourCC = FourCC::new(b"edts");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.elst);
        push_all(&mut out, &self.boxes);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ElstEntry {
    pub segment_duration: u64,
    pub media_time: i64,
    pub media_rate_integer: i16,
    pub media_rate_fraction: i16,
}

/// Edit List Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct ElstBox {
    pub full: FullBoxHeader,
    pub entries: Vec<ElstEntry>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl ElstBox {
    fn entry_width(&self) -> u64 {
        2 * versioned_width(self.full.version) + 4
    }
}

impl Decode for ElstBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let mut elst = ElstBox {
            full,
            entries: Vec::new(),
            header_form: h.form,
        };
        let count = r.read_u32::<BigEndian>()?;
        let n = r.check_entries(count as u64, elst.entry_width())?;
        elst.entries.reserve(n);
        for _ in 0..n {
            let (segment_duration, media_time) = if full.version == 1 {
                (r.read_u64::<BigEndian>()?, r.read_i64::<BigEndian>()?)
            } else {
                (r.read_u32::<BigEndian>()? as u64, r.read_i32::<BigEndian>()? as i64)
            };
            elst.entries.push(ElstEntry {
                segment_duration,
                media_time,
                media_rate_integer: r.read_i16::<BigEndian>()?,
                media_rate_fraction: r.read_i16::<BigEndian>()?,
            });
        }
        Ok(elst)
    }
}

impl Mp4Atom for ElstBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"elst")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4 + self.entry_width() * self.entries.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(count_u32(self.entries.len())?)?;
        for e in &self.entries {
            write_versioned(w, self.full.version, e.segment_duration)?;
            if self.full.version == 1 {
                w.write_i64::<BigEndian>(e.media_time)?;
            } else {
                let t = i32::try_from(e.media_time).map_err(|_| {
                    Error::bad_format(format!("media_time {} needs a version 1 elst", e.media_time))
                })?;
                w.write_i32::<BigEndian>(t)?;
            }
            w.write_i16::<BigEndian>(e.media_rate_integer)?;
            w.write_i16::<BigEndian>(e.media_rate_fraction)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!("entries={}", self.entries.len())
    }
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct MdiaBox {
    pub mdhd: Option<MdhdBox>,
    pub hdlr: Option<HdlrBox>,
    pub minf: Option<MinfBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MdiaBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut mdia = MdiaBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Mdhd(b) if mdia.mdhd.is_none() => mdia.mdhd = Some(b),
                Mp4Box::Hdlr(b) if mdia.hdlr.is_none() => mdia.hdlr = Some(b),
                Mp4Box::Minf(b) if mdia.minf.is_none() => mdia.minf = Some(b),
                other => mdia.boxes.push(other),
            }
        }
        Ok(mdia)
    }
}

impl ContainerBox for MdiaBox {
    const TYPE: FourCC = FourCC::new(b"mdia");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.mdhd);
        push_some(&mut out, &self.hdlr);
        push_some(&mut out, &self.minf);
        push_all(&mut out, &self.boxes);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

/// Media Header Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MdhdBox {
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    pub language: Language,
    #[serde(skip)]
    pub pre_defined: u16,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MdhdBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let v = full.version;
        Ok(MdhdBox {
            full,
            creation_time: read_versioned(r, v)?,
            modification_time: read_versioned(r, v)?,
            timescale: r.read_u32::<BigEndian>()?,
            duration: read_versioned(r, v)?,
            language: Language(r.read_u16::<BigEndian>()?),
            pre_defined: r.read_u16::<BigEndian>()?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for MdhdBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"mdhd")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 3 * versioned_width(self.full.version) + 4 + 4
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        let v = self.full.version;
        self.full.write(w)?;
        write_versioned(w, v, self.creation_time)?;
        write_versioned(w, v, self.modification_time)?;
        w.write_u32::<BigEndian>(self.timescale)?;
        write_versioned(w, v, self.duration)?;
        w.write_u16::<BigEndian>(self.language.0)?;
        w.write_u16::<BigEndian>(self.pre_defined)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!(
            "timescale={} duration={} language={}",
            self.timescale,
            self.duration,
            self.language.code()
        )
    }
}

/// Handler Reference Box. The name is kept as raw bytes, terminator
/// included, since writers disagree on whether it is NUL-terminated.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct HdlrBox {
    pub full: FullBoxHeader,
    pub pre_defined: u32,
    pub handler_type: FourCC,
    #[serde(skip)]
    pub reserved: [u8; 12],
    #[serde(serialize_with = "text_bytes")]
    pub name: Vec<u8>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl HdlrBox {
    pub fn new(handler_type: FourCC, name: &str) -> Self {
        let mut name = name.as_bytes().to_vec();
        name.push(0);
        HdlrBox {
            handler_type,
            name,
            header_form: HeaderForm::Compact,
            ..Default::default()
        }
    }
}

impl Decode for HdlrBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let pre_defined = r.read_u32::<BigEndian>()?;
        let handler_type = FourCC::read(r)?;
        let mut reserved = [0u8; 12];
        r.read_exact(&mut reserved)?;
        Ok(HdlrBox {
            full,
            pre_defined,
            handler_type,
            reserved,
            name: r.read_rest()?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for HdlrBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"hdlr")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 20 + self.name.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(self.pre_defined)?;
        self.handler_type.write(w)?;
        w.write_all(&self.reserved)?;
        w.write_all(&self.name)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!(
            "handler={} name={:?}",
            self.handler_type,
            crate::primitives::c_string(&self.name)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct MinfBox {
    pub vmhd: Option<VmhdBox>,
    pub smhd: Option<SmhdBox>,
    pub dinf: Option<DinfBox>,
    pub stbl: Option<StblBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MinfBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut minf = MinfBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Vmhd(b) if minf.vmhd.is_none() => minf.vmhd = Some(b),
                Mp4Box::Smhd(b) if minf.smhd.is_none() => minf.smhd = Some(b),
                Mp4Box::Dinf(b) if minf.dinf.is_none() => minf.dinf = Some(b),
                Mp4Box::Stbl(b) if minf.stbl.is_none() => minf.stbl = Some(b),
                other => minf.boxes.push(other),
            }
        }
        Ok(minf)
    }
}

impl ContainerBox for MinfBox {
    const TYPE: FourCC = FourCC::new(b"minf");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.vmhd);
        push_some(&mut out, &self.smhd);
        push_some(&mut out, &self.dinf);
        push_some(&mut out, &self.stbl);
        push_all(&mut out, &self.boxes);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

/// Video Media Header Box.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VmhdBox {
    pub full: FullBoxHeader,
    pub graphics_mode: u16,
    pub opcolor: [u16; 3],
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Default for VmhdBox {
    fn default() -> Self {
        VmhdBox {
            full: FullBoxHeader::new(0, 1),
            graphics_mode: 0,
            opcolor: [0; 3],
            header_form: HeaderForm::Compact,
        }
    }
}

impl Decode for VmhdBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let graphics_mode = r.read_u16::<BigEndian>()?;
        let mut opcolor = [0u16; 3];
        r.read_u16_into::<BigEndian>(&mut opcolor)?;
        Ok(VmhdBox {
            full,
            graphics_mode,
            opcolor,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for VmhdBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"vmhd")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 8
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u16::<BigEndian>(self.graphics_mode)?;
        for c in self.opcolor {
            w.write_u16::<BigEndian>(c)?;
        }
        Ok(())
    }
}

/// Sound Media Header Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct SmhdBox {
    pub full: FullBoxHeader,
    pub balance: Fixed16,
    #[serde(skip)]
    pub reserved: u16,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for SmhdBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(SmhdBox {
            full: FullBoxHeader::read(r)?,
            balance: Fixed16::read(r)?,
            reserved: r.read_u16::<BigEndian>()?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for SmhdBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"smhd")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        self.balance.write(w)?;
        w.write_u16::<BigEndian>(self.reserved)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!("balance={}", self.balance)
    }
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct DinfBox {
    pub dref: Option<DrefBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for DinfBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut dinf = DinfBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Dref(b) if dinf.dref.is_none() => dinf.dref = Some(b),
                other => dinf.boxes.push(other),
            }
        }
        Ok(dinf)
    }
}

impl ContainerBox for DinfBox {
    const TYPE: FourCC = FourCC::new(b"dinf");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.dref);
        push_all(&mut out, &self.boxes);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

/// Reads a FullBox entry count followed by exactly that many child boxes.
pub(crate) fn read_entry_boxes(r: &mut BoxReader<'_>) -> Result<(FullBoxHeader, Vec<Mp4Box>)> {
    let full = FullBoxHeader::read(r)?;
    let count = r.read_u32::<BigEndian>()?;
    let entries = decode_container(r)?;
    if entries.len() as u64 != count as u64 {
        return Err(Error::bad_format(format!(
            "entry count {count} disagrees with {} entries present",
            entries.len()
        )));
    }
    Ok((full, entries))
}

pub(crate) fn write_entry_boxes(
    w: &mut dyn Write,
    full: &FullBoxHeader,
    entries: &[Mp4Box],
) -> Result<()> {
    full.write(w)?;
    w.write_u32::<BigEndian>(count_u32(entries.len())?)?;
    let refs: Vec<&dyn Mp4Atom> = entries.iter().map(|e| e as &dyn Mp4Atom).collect();
    encode_all(&refs, w)
}

/// Data Reference Box; entries are `url ` boxes or passthrough boxes.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct DrefBox {
    pub full: FullBoxHeader,
    pub entries: Vec<Mp4Box>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for DrefBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (full, entries) = read_entry_boxes(r)?;
        Ok(DrefBox {
            full,
            entries,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for DrefBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"dref")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4 + self.entries.iter().map(|e| e.size()).sum::<u64>()
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        write_entry_boxes(w, &self.full, &self.entries)
    }

    fn children(&self) -> Vec<&dyn Mp4Atom> {
        self.entries.iter().map(|e| e as &dyn Mp4Atom).collect()
    }

    fn summary(&self) -> String {
        format!("entries={}", self.entries.len())
    }
}

/// Data Entry URL Box. Flag 0x000001 means the media is in the same file
/// and the location is normally empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct UrlBox {
    pub full: FullBoxHeader,
    #[serde(serialize_with = "hex_bytes")]
    pub location: Vec<u8>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl UrlBox {
    pub const SELF_CONTAINED: u32 = 0x000001;

    pub fn self_contained() -> Self {
        UrlBox {
            full: FullBoxHeader::new(0, Self::SELF_CONTAINED),
            location: Vec::new(),
            header_form: HeaderForm::Compact,
        }
    }
}

impl Decode for UrlBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(UrlBox {
            full: FullBoxHeader::read(r)?,
            location: r.read_rest()?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for UrlBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"url ")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + self.location.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_all(&self.location)?;
        Ok(())
    }

    fn summary(&self) -> String {
        if self.full.has(Self::SELF_CONTAINED) {
            "self-contained".to_string()
        } else {
            format!("location={:?}", crate::primitives::c_string(&self.location))
        }
    }
}
