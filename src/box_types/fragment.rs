//! Movie fragments: mvex/mehd/trex in the movie, moof/traf/tfhd/tfdt/trun
//! in each fragment.
//!
//! tfhd and trun carry optional fields gated by flag bits. Each has one
//! table listing the gated fields in wire order; size, decode and encode
//! all walk the same table, so they cannot disagree.

use super::{
    MetaBox, SbgpBox, SgpdBox, count_u32, read_children, read_versioned, versioned_width,
    write_versioned,
};
use crate::boxes::{
    BoxHeader, ChildOrder, ContainerBox, Decode, FourCC, FullBoxHeader, HeaderForm, Mp4Atom,
    push_all, push_some,
};
use crate::error::Result;
use crate::parser::BoxReader;
use crate::primitives::{read_uint_n, write_uint_n};
use crate::registry::Mp4Box;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Write;

/// An optional field present when `bit` is set in the box flags.
pub struct FlagField<T> {
    pub bit: u32,
    pub width: u8,
    pub get: fn(&T) -> u64,
    pub set: fn(&mut T, u64),
}

fn present<T>(table: &'static [FlagField<T>], flags: u32) -> impl Iterator<Item = &'static FlagField<T>> {
    table.iter().filter(move |f| flags & f.bit != 0)
}

fn fields_width<T>(table: &'static [FlagField<T>], flags: u32) -> u64 {
    present(table, flags).map(|f| f.width as u64).sum()
}

fn read_fields<T>(table: &'static [FlagField<T>], flags: u32, r: &mut BoxReader<'_>, out: &mut T) -> Result<()> {
    for f in present(table, flags) {
        (f.set)(out, read_uint_n(r, f.width)?);
    }
    Ok(())
}

fn write_fields<T>(table: &'static [FlagField<T>], flags: u32, w: &mut dyn Write, src: &T) -> Result<()> {
    for f in present(table, flags) {
        write_uint_n(w, (f.get)(src), f.width)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct MvexBox {
    pub mehd: Option<MehdBox>,
    pub trex: Vec<TrexBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MvexBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut mvex = MvexBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Mehd(b) if mvex.mehd.is_none() => mvex.mehd = Some(b),
                Mp4Box::Trex(b) => mvex.trex.push(b),
                other => mvex.boxes.push(other),
            }
        }
        Ok(mvex)
    }
}

impl ContainerBox for MvexBox {
    const TYPE: FourCC = FourCC::new(b"mvex");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.mehd);
        push_all(&mut out, &self.trex);
        push_all(&mut out, &self.boxes);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

/// Movie Extends Header Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MehdBox {
    pub full: FullBoxHeader,
    pub fragment_duration: u64,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MehdBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        Ok(MehdBox {
            full,
            fragment_duration: read_versioned(r, full.version)?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for MehdBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"mehd")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + versioned_width(self.full.version)
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        write_versioned(w, self.full.version, self.fragment_duration)
    }

    fn summary(&self) -> String {
        format!("fragment_duration={}", self.fragment_duration)
    }
}

/// Track Extends Box: per-track sample defaults for fragments.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct TrexBox {
    pub full: FullBoxHeader,
    pub track_id: u32,
    pub default_sample_description_index: u32,
    pub default_sample_duration: u32,
    pub default_sample_size: u32,
    pub default_sample_flags: u32,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for TrexBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(TrexBox {
            full: FullBoxHeader::read(r)?,
            track_id: r.read_u32::<BigEndian>()?,
            default_sample_description_index: r.read_u32::<BigEndian>()?,
            default_sample_duration: r.read_u32::<BigEndian>()?,
            default_sample_size: r.read_u32::<BigEndian>()?,
            default_sample_flags: r.read_u32::<BigEndian>()?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for TrexBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"trex")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 20
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(self.track_id)?;
        w.write_u32::<BigEndian>(self.default_sample_description_index)?;
        w.write_u32::<BigEndian>(self.default_sample_duration)?;
        w.write_u32::<BigEndian>(self.default_sample_size)?;
        w.write_u32::<BigEndian>(self.default_sample_flags)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!("track_id={}", self.track_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct MoofBox {
    pub mfhd: Option<MfhdBox>,
    pub traf: Vec<TrafBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MoofBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut moof = MoofBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Mfhd(b) if moof.mfhd.is_none() => moof.mfhd = Some(b),
                Mp4Box::Traf(b) => moof.traf.push(b),
                other => moof.boxes.push(other),
            }
        }
        Ok(moof)
    }
}

impl ContainerBox for MoofBox {
    const TYPE: FourCC = FourCC::new(b"moof");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.mfhd);
        push_all(&mut out, &self.traf);
        push_all(&mut out, &self.boxes);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

/// Movie Fragment Header Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MfhdBox {
    pub full: FullBoxHeader,
    pub sequence_number: u32,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MfhdBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(MfhdBox {
            full: FullBoxHeader::read(r)?,
            sequence_number: r.read_u32::<BigEndian>()?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for MfhdBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"mfhd")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(self.sequence_number)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!("sequence_number={}", self.sequence_number)
    }
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct TrafBox {
    pub tfhd: Option<TfhdBox>,
    pub tfdt: Option<TfdtBox>,
    pub trun: Vec<TrunBox>,
    pub sbgp: Vec<SbgpBox>,
    pub sgpd: Vec<SgpdBox>,
    pub meta: Option<MetaBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for TrafBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut traf = TrafBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Tfhd(b) if traf.tfhd.is_none() => traf.tfhd = Some(b),
                Mp4Box::Tfdt(b) if traf.tfdt.is_none() => traf.tfdt = Some(b),
                Mp4Box::Trun(b) => traf.trun.push(b),
                Mp4Box::Sbgp(b) => traf.sbgp.push(b),
                Mp4Box::Sgpd(b) => traf.sgpd.push(b),
                Mp4Box::Meta(b) if traf.meta.is_none() => traf.meta = Some(b),
                other => traf.boxes.push(other),
            }
        }
        Ok(traf)
    }
}

impl ContainerBox for TrafBox {
    const TYPE: FourCC = FourCC::new(b"traf");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.tfhd);
        push_some(&mut out, &self.tfdt);
        push_all(&mut out, &self.trun);
        push_all(&mut out, &self.sbgp);
        push_all(&mut out, &self.sgpd);
        push_some(&mut out, &self.meta);
        push_all(&mut out, &self.boxes);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

/// Track Fragment Header Box. Optional fields are only meaningful when
/// their flag bit is set; the flags decide what is written.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct TfhdBox {
    pub full: FullBoxHeader,
    pub track_id: u32,
    pub base_data_offset: u64,
    pub sample_description_index: u32,
    pub default_sample_duration: u32,
    pub default_sample_size: u32,
    pub default_sample_flags: u32,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl TfhdBox {
    pub const BASE_DATA_OFFSET_PRESENT: u32 = 0x000001;
    pub const SAMPLE_DESCRIPTION_INDEX_PRESENT: u32 = 0x000002;
    pub const DEFAULT_SAMPLE_DURATION_PRESENT: u32 = 0x000008;
    pub const DEFAULT_SAMPLE_SIZE_PRESENT: u32 = 0x000010;
    pub const DEFAULT_SAMPLE_FLAGS_PRESENT: u32 = 0x000020;
    pub const DURATION_IS_EMPTY: u32 = 0x010000;
    pub const DEFAULT_BASE_IS_MOOF: u32 = 0x020000;

    pub const FIELDS: &'static [FlagField<TfhdBox>] = &[
        FlagField {
            bit: Self::BASE_DATA_OFFSET_PRESENT,
            width: 8,
            get: |b| b.base_data_offset,
            set: |b, v| b.base_data_offset = v,
        },
        FlagField {
            bit: Self::SAMPLE_DESCRIPTION_INDEX_PRESENT,
            width: 4,
            get: |b| b.sample_description_index as u64,
            set: |b, v| b.sample_description_index = v as u32,
        },
        FlagField {
            bit: Self::DEFAULT_SAMPLE_DURATION_PRESENT,
            width: 4,
            get: |b| b.default_sample_duration as u64,
            set: |b, v| b.default_sample_duration = v as u32,
        },
        FlagField {
            bit: Self::DEFAULT_SAMPLE_SIZE_PRESENT,
            width: 4,
            get: |b| b.default_sample_size as u64,
            set: |b, v| b.default_sample_size = v as u32,
        },
        FlagField {
            bit: Self::DEFAULT_SAMPLE_FLAGS_PRESENT,
            width: 4,
            get: |b| b.default_sample_flags as u64,
            set: |b, v| b.default_sample_flags = v as u32,
        },
    ];
}

impl Decode for TfhdBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let mut b = TfhdBox {
            full,
            track_id: r.read_u32::<BigEndian>()?,
            header_form: h.form,
            ..Default::default()
        };
        read_fields(Self::FIELDS, full.flags, r, &mut b)?;
        Ok(b)
    }
}

impl Mp4Atom for TfhdBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"tfhd")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4 + fields_width(Self::FIELDS, self.full.flags)
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(self.track_id)?;
        write_fields(Self::FIELDS, self.full.flags, w, self)
    }

    fn summary(&self) -> String {
        format!("track_id={} flags=0x{:06x}", self.track_id, self.full.flags)
    }
}

/// Track Fragment Decode Time Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct TfdtBox {
    pub full: FullBoxHeader,
    pub base_media_decode_time: u64,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for TfdtBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        Ok(TfdtBox {
            full,
            base_media_decode_time: read_versioned(r, full.version)?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for TfdtBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"tfdt")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + versioned_width(self.full.version)
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        write_versioned(w, self.full.version, self.base_media_decode_time)
    }

    fn summary(&self) -> String {
        format!("base_media_decode_time={}", self.base_media_decode_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct TrunSample {
    pub duration: u32,
    pub size: u32,
    pub flags: u32,
    /// Unsigned in version 0; the bits round-trip either way.
    pub composition_time_offset: i32,
}

/// Track Fragment Run Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct TrunBox {
    pub full: FullBoxHeader,
    pub data_offset: i32,
    pub first_sample_flags: u32,
    pub samples: Vec<TrunSample>,
    /// Sample count of a run without per-sample fields. Such samples carry
    /// no data, so `samples` stays empty and only the count is kept.
    pub implicit_sample_count: u32,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl TrunBox {
    pub const DATA_OFFSET_PRESENT: u32 = 0x000001;
    pub const FIRST_SAMPLE_FLAGS_PRESENT: u32 = 0x000004;
    pub const SAMPLE_DURATION_PRESENT: u32 = 0x000100;
    pub const SAMPLE_SIZE_PRESENT: u32 = 0x000200;
    pub const SAMPLE_FLAGS_PRESENT: u32 = 0x000400;
    pub const SAMPLE_COMPOSITION_TIME_OFFSET_PRESENT: u32 = 0x000800;

    pub const FIELDS: &'static [FlagField<TrunBox>] = &[
        FlagField {
            bit: Self::DATA_OFFSET_PRESENT,
            width: 4,
            get: |b| b.data_offset as u32 as u64,
            set: |b, v| b.data_offset = v as u32 as i32,
        },
        FlagField {
            bit: Self::FIRST_SAMPLE_FLAGS_PRESENT,
            width: 4,
            get: |b| b.first_sample_flags as u64,
            set: |b, v| b.first_sample_flags = v as u32,
        },
    ];

    pub const SAMPLE_FIELDS: &'static [FlagField<TrunSample>] = &[
        FlagField {
            bit: Self::SAMPLE_DURATION_PRESENT,
            width: 4,
            get: |s| s.duration as u64,
            set: |s, v| s.duration = v as u32,
        },
        FlagField {
            bit: Self::SAMPLE_SIZE_PRESENT,
            width: 4,
            get: |s| s.size as u64,
            set: |s, v| s.size = v as u32,
        },
        FlagField {
            bit: Self::SAMPLE_FLAGS_PRESENT,
            width: 4,
            get: |s| s.flags as u64,
            set: |s, v| s.flags = v as u32,
        },
        FlagField {
            bit: Self::SAMPLE_COMPOSITION_TIME_OFFSET_PRESENT,
            width: 4,
            get: |s| s.composition_time_offset as u32 as u64,
            set: |s, v| s.composition_time_offset = v as u32 as i32,
        },
    ];

    pub fn sample_width(&self) -> u64 {
        fields_width(Self::SAMPLE_FIELDS, self.full.flags)
    }

    /// The count written to the box: the sample list length, or the implicit
    /// count when the list is empty and no per-sample fields are present.
    pub fn sample_count(&self) -> Result<u32> {
        if self.samples.is_empty() && self.sample_width() == 0 {
            return Ok(self.implicit_sample_count);
        }
        count_u32(self.samples.len())
    }
}

impl Decode for TrunBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let mut b = TrunBox {
            full,
            header_form: h.form,
            ..Default::default()
        };
        read_fields(Self::FIELDS, full.flags, r, &mut b)?;

        let width = b.sample_width();
        if width == 0 {
            b.implicit_sample_count = count;
            return Ok(b);
        }
        let n = r.check_entries(count as u64, width)?;
        b.samples.reserve(n);
        for _ in 0..n {
            let mut s = TrunSample::default();
            read_fields(Self::SAMPLE_FIELDS, full.flags, r, &mut s)?;
            b.samples.push(s);
        }
        Ok(b)
    }
}

impl Mp4Atom for TrunBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"trun")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE
            + 4
            + fields_width(Self::FIELDS, self.full.flags)
            + self.sample_width() * self.samples.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(self.sample_count()?)?;
        write_fields(Self::FIELDS, self.full.flags, w, self)?;
        for s in &self.samples {
            write_fields(Self::SAMPLE_FIELDS, self.full.flags, w, s)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        let count = self.sample_count().unwrap_or(u32::MAX);
        format!("samples={count} flags=0x{:06x}", self.full.flags)
    }
}
