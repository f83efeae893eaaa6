//! Sample table boxes: stbl and the entry tables beneath it.

use super::movie::{read_entry_boxes, write_entry_boxes};
use super::{count_u32, read_children};
use crate::boxes::{
    BoxHeader, ChildOrder, ContainerBox, Decode, FourCC, FullBoxHeader, HeaderForm, Mp4Atom,
    push_all, push_some,
};
use crate::error::{Error, Result};
use crate::parser::BoxReader;
use crate::primitives::hex_bytes;
use crate::registry::Mp4Box;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct StblBox {
    pub stsd: Option<StsdBox>,
    pub stts: Option<SttsBox>,
    pub ctts: Option<CttsBox>,
    pub stsc: Option<StscBox>,
    pub stsz: Option<StszBox>,
    pub stco: Option<StcoBox>,
    pub co64: Option<Co64Box>,
    pub stss: Option<StssBox>,
    pub sgpd: Vec<SgpdBox>,
    pub sbgp: Vec<SbgpBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for StblBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut stbl = StblBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Stsd(b) if stbl.stsd.is_none() => stbl.stsd = Some(b),
                Mp4Box::Stts(b) if stbl.stts.is_none() => stbl.stts = Some(b),
                Mp4Box::Ctts(b) if stbl.ctts.is_none() => stbl.ctts = Some(b),
                Mp4Box::Stsc(b) if stbl.stsc.is_none() => stbl.stsc = Some(b),
                Mp4Box::Stsz(b) if stbl.stsz.is_none() => stbl.stsz = Some(b),
                Mp4Box::Stco(b) if stbl.stco.is_none() => stbl.stco = Some(b),
                Mp4Box::Co64(b) if stbl.co64.is_none() => stbl.co64 = Some(b),
                Mp4Box::Stss(b) if stbl.stss.is_none() => stbl.stss = Some(b),
                Mp4Box::Sgpd(b) => stbl.sgpd.push(b),
                Mp4Box::Sbgp(b) => stbl.sbgp.push(b),
                other => stbl.boxes.push(other),
            }
        }
        Ok(stbl)
    }
}

impl ContainerBox for StblBox {
    const TYPE: FourCC = FourCC::new(b"stbl");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.stsd);
        push_some(&mut out, &self.stts);
        push_some(&mut out, &self.ctts);
        push_some(&mut out, &self.stsc);
        push_some(&mut out, &self.stsz);
        push_some(&mut out, &self.stco);
        push_some(&mut out, &self.co64);
        push_some(&mut out, &self.stss);
        push_all(&mut out, &self.sgpd);
        push_all(&mut out, &self.sbgp);
        push_all(&mut out, &self.boxes);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

/// Sample Description Box. Sample entries (avc1, mp4a, ...) are codec
/// specific and pass through undecoded.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct StsdBox {
    pub full: FullBoxHeader,
    pub entries: Vec<Mp4Box>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for StsdBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (full, entries) = read_entry_boxes(r)?;
        Ok(StsdBox {
            full,
            entries,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for StsdBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"stsd")
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
        let codecs: Vec<String> = self.entries.iter().map(|e| e.box_type().to_string()).collect();
        format!("entries=[{}]", codecs.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// Decoding Time to Sample Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct SttsBox {
    pub full: FullBoxHeader,
    pub entries: Vec<SttsEntry>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for SttsBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let n = r.check_entries(count as u64, 8)?;
        let mut entries = Vec::with_capacity(n);
        for _ in 0..n {
            entries.push(SttsEntry {
                sample_count: r.read_u32::<BigEndian>()?,
                sample_delta: r.read_u32::<BigEndian>()?,
            });
        }
        Ok(SttsBox {
            full,
            entries,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for SttsBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"stts")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4 + 8 * self.entries.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(count_u32(self.entries.len())?)?;
        for e in &self.entries {
            w.write_u32::<BigEndian>(e.sample_count)?;
            w.write_u32::<BigEndian>(e.sample_delta)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        let samples: u64 = self.entries.iter().map(|e| e.sample_count as u64).sum();
        format!("entries={} samples={samples}", self.entries.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CttsEntry {
    pub sample_count: u32,
    /// Unsigned in version 0, signed in version 1.
    pub sample_offset: i64,
}

/// Composition Time to Sample Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct CttsBox {
    pub full: FullBoxHeader,
    pub entries: Vec<CttsEntry>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for CttsBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let n = r.check_entries(count as u64, 8)?;
        let mut entries = Vec::with_capacity(n);
        for _ in 0..n {
            let sample_count = r.read_u32::<BigEndian>()?;
            let sample_offset = if full.version == 0 {
                r.read_u32::<BigEndian>()? as i64
            } else {
                r.read_i32::<BigEndian>()? as i64
            };
            entries.push(CttsEntry {
                sample_count,
                sample_offset,
            });
        }
        Ok(CttsBox {
            full,
            entries,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for CttsBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"ctts")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4 + 8 * self.entries.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(count_u32(self.entries.len())?)?;
        for e in &self.entries {
            w.write_u32::<BigEndian>(e.sample_count)?;
            let out_of_range = || {
                Error::bad_format(format!(
                    "ctts offset {} out of range for version {}",
                    e.sample_offset, self.full.version
                ))
            };
            if self.full.version == 0 {
                w.write_u32::<BigEndian>(u32::try_from(e.sample_offset).map_err(|_| out_of_range())?)?;
            } else {
                w.write_i32::<BigEndian>(i32::try_from(e.sample_offset).map_err(|_| out_of_range())?)?;
            }
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!("entries={}", self.entries.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StscEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// Sample To Chunk Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct StscBox {
    pub full: FullBoxHeader,
    pub entries: Vec<StscEntry>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for StscBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let n = r.check_entries(count as u64, 12)?;
        let mut entries = Vec::with_capacity(n);
        for _ in 0..n {
            entries.push(StscEntry {
                first_chunk: r.read_u32::<BigEndian>()?,
                samples_per_chunk: r.read_u32::<BigEndian>()?,
                sample_description_index: r.read_u32::<BigEndian>()?,
            });
        }
        Ok(StscBox {
            full,
            entries,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for StscBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"stsc")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4 + 12 * self.entries.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(count_u32(self.entries.len())?)?;
        for e in &self.entries {
            w.write_u32::<BigEndian>(e.first_chunk)?;
            w.write_u32::<BigEndian>(e.samples_per_chunk)?;
            w.write_u32::<BigEndian>(e.sample_description_index)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!("entries={}", self.entries.len())
    }
}

/// Sample Size Box. When `sample_size` is non-zero every sample has that
/// size and `entry_sizes` is empty; otherwise `entry_sizes` lists them all.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct StszBox {
    pub full: FullBoxHeader,
    pub sample_size: u32,
    pub sample_count: u32,
    pub entry_sizes: Vec<u32>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for StszBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let sample_size = r.read_u32::<BigEndian>()?;
        let sample_count = r.read_u32::<BigEndian>()?;
        let mut entry_sizes = Vec::new();
        if sample_size == 0 {
            let n = r.check_entries(sample_count as u64, 4)?;
            entry_sizes.reserve(n);
            for _ in 0..n {
                entry_sizes.push(r.read_u32::<BigEndian>()?);
            }
        }
        Ok(StszBox {
            full,
            sample_size,
            sample_count,
            entry_sizes,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for StszBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"stsz")
    }

    fn payload_size(&self) -> u64 {
        let table = if self.sample_size == 0 { 4 * self.entry_sizes.len() as u64 } else { 0 };
        FullBoxHeader::SIZE + 8 + table
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(self.sample_size)?;
        if self.sample_size == 0 {
            w.write_u32::<BigEndian>(count_u32(self.entry_sizes.len())?)?;
            for s in &self.entry_sizes {
                w.write_u32::<BigEndian>(*s)?;
            }
        } else {
            w.write_u32::<BigEndian>(self.sample_count)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        if self.sample_size == 0 {
            format!("samples={} (per-sample sizes)", self.entry_sizes.len())
        } else {
            format!("samples={} size={}", self.sample_count, self.sample_size)
        }
    }
}

/// Chunk Offset Box (32-bit offsets).
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct StcoBox {
    pub full: FullBoxHeader,
    pub chunk_offsets: Vec<u32>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for StcoBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let n = r.check_entries(count as u64, 4)?;
        let mut chunk_offsets = vec![0u32; n];
        r.read_u32_into::<BigEndian>(&mut chunk_offsets)?;
        Ok(StcoBox {
            full,
            chunk_offsets,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for StcoBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"stco")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4 + 4 * self.chunk_offsets.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(count_u32(self.chunk_offsets.len())?)?;
        for o in &self.chunk_offsets {
            w.write_u32::<BigEndian>(*o)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!("chunks={}", self.chunk_offsets.len())
    }
}

/// Chunk Large Offset Box (64-bit offsets).
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct Co64Box {
    pub full: FullBoxHeader,
    pub chunk_offsets: Vec<u64>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for Co64Box {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let n = r.check_entries(count as u64, 8)?;
        let mut chunk_offsets = vec![0u64; n];
        r.read_u64_into::<BigEndian>(&mut chunk_offsets)?;
        Ok(Co64Box {
            full,
            chunk_offsets,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for Co64Box {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"co64")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4 + 8 * self.chunk_offsets.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(count_u32(self.chunk_offsets.len())?)?;
        for o in &self.chunk_offsets {
            w.write_u64::<BigEndian>(*o)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!("chunks={}", self.chunk_offsets.len())
    }
}

/// Sync Sample Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct StssBox {
    pub full: FullBoxHeader,
    pub sample_numbers: Vec<u32>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for StssBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let n = r.check_entries(count as u64, 4)?;
        let mut sample_numbers = vec![0u32; n];
        r.read_u32_into::<BigEndian>(&mut sample_numbers)?;
        Ok(StssBox {
            full,
            sample_numbers,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for StssBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"stss")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4 + 4 * self.sample_numbers.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(count_u32(self.sample_numbers.len())?)?;
        for s in &self.sample_numbers {
            w.write_u32::<BigEndian>(*s)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!("sync_samples={}", self.sample_numbers.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SbgpEntry {
    pub sample_count: u32,
    pub group_description_index: u32,
}

/// Sample To Group Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct SbgpBox {
    pub full: FullBoxHeader,
    pub grouping_type: FourCC,
    /// Present in version 1 only.
    pub grouping_type_parameter: Option<u32>,
    pub entries: Vec<SbgpEntry>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for SbgpBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let grouping_type = FourCC::read(r)?;
        let grouping_type_parameter = match full.version {
            1 => Some(r.read_u32::<BigEndian>()?),
            _ => None,
        };
        let count = r.read_u32::<BigEndian>()?;
        let n = r.check_entries(count as u64, 8)?;
        let mut entries = Vec::with_capacity(n);
        for _ in 0..n {
            entries.push(SbgpEntry {
                sample_count: r.read_u32::<BigEndian>()?,
                group_description_index: r.read_u32::<BigEndian>()?,
            });
        }
        Ok(SbgpBox {
            full,
            grouping_type,
            grouping_type_parameter,
            entries,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for SbgpBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"sbgp")
    }

    fn payload_size(&self) -> u64 {
        let param = if self.full.version == 1 { 4 } else { 0 };
        FullBoxHeader::SIZE + 4 + param + 4 + 8 * self.entries.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        self.grouping_type.write(w)?;
        if self.full.version == 1 {
            w.write_u32::<BigEndian>(self.grouping_type_parameter.unwrap_or(0))?;
        }
        w.write_u32::<BigEndian>(count_u32(self.entries.len())?)?;
        for e in &self.entries {
            w.write_u32::<BigEndian>(e.sample_count)?;
            w.write_u32::<BigEndian>(e.group_description_index)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!("grouping_type={} entries={}", self.grouping_type, self.entries.len())
    }
}

/// One sample group description. `description_length` is only written when
/// the box is version 1 with a zero `default_length`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SgpdEntry {
    pub description_length: Option<u32>,
    #[serde(serialize_with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// Group entries are only delimited in version 1; otherwise their layout
/// depends on the grouping type and they are kept as one opaque run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SgpdEntries {
    Sized(Vec<SgpdEntry>),
    Opaque {
        entry_count: u32,
        #[serde(serialize_with = "hex_bytes")]
        data: Vec<u8>,
    },
}

impl Default for SgpdEntries {
    fn default() -> Self {
        SgpdEntries::Sized(Vec::new())
    }
}

/// Sample Group Description Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct SgpdBox {
    pub full: FullBoxHeader,
    pub grouping_type: FourCC,
    /// Version 1 only.
    pub default_length: u32,
    /// Version 2 and later.
    pub default_sample_description_index: u32,
    pub entries: SgpdEntries,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for SgpdBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let grouping_type = FourCC::read(r)?;
        let mut b = SgpdBox {
            full,
            grouping_type,
            header_form: h.form,
            ..Default::default()
        };
        match full.version {
            0 => {}
            1 => b.default_length = r.read_u32::<BigEndian>()?,
            _ => b.default_sample_description_index = r.read_u32::<BigEndian>()?,
        }
        let entry_count = r.read_u32::<BigEndian>()?;

        if full.version != 1 {
            b.entries = SgpdEntries::Opaque {
                entry_count,
                data: r.read_rest()?,
            };
            return Ok(b);
        }

        let min_width = if b.default_length == 0 { 4 } else { b.default_length as u64 };
        let n = r.check_entries(entry_count as u64, min_width)?;
        let mut entries = Vec::with_capacity(n);
        for _ in 0..n {
            let (description_length, len) = match b.default_length {
                0 => {
                    let len = r.read_u32::<BigEndian>()?;
                    (Some(len), len)
                }
                len => (None, len),
            };
            entries.push(SgpdEntry {
                description_length,
                data: r.read_bytes(len as u64)?,
            });
        }
        b.entries = SgpdEntries::Sized(entries);
        Ok(b)
    }
}

impl Mp4Atom for SgpdBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"sgpd")
    }

    fn payload_size(&self) -> u64 {
        let defaults = if self.full.version == 0 { 0 } else { 4 };
        let body = match &self.entries {
            SgpdEntries::Sized(entries) => entries
                .iter()
                .map(|e| e.description_length.map_or(0, |_| 4) + e.data.len() as u64)
                .sum(),
            SgpdEntries::Opaque { data, .. } => data.len() as u64,
        };
        FullBoxHeader::SIZE + 4 + defaults + 4 + body
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        self.grouping_type.write(w)?;
        match self.full.version {
            0 => {}
            1 => w.write_u32::<BigEndian>(self.default_length)?,
            _ => w.write_u32::<BigEndian>(self.default_sample_description_index)?,
        }
        match &self.entries {
            SgpdEntries::Sized(entries) => {
                w.write_u32::<BigEndian>(count_u32(entries.len())?)?;
                for e in entries {
                    if let Some(len) = e.description_length {
                        if len as usize != e.data.len() {
                            return Err(Error::bad_format(format!(
                                "sgpd description_length {len} but {} bytes of data",
                                e.data.len()
                            )));
                        }
                        w.write_u32::<BigEndian>(len)?;
                    }
                    w.write_all(&e.data)?;
                }
            }
            SgpdEntries::Opaque { entry_count, data } => {
                w.write_u32::<BigEndian>(*entry_count)?;
                w.write_all(data)?;
            }
        }
        Ok(())
    }

    fn summary(&self) -> String {
        let n = match &self.entries {
            SgpdEntries::Sized(entries) => entries.len() as u64,
            SgpdEntries::Opaque { entry_count, .. } => *entry_count as u64,
        };
        format!("grouping_type={} entries={n}", self.grouping_type)
    }
}
