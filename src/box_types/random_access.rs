//! Random access and segment indexing: mfra/tfra/mfro and sidx.

use super::{count_u16, count_u32, read_children, read_versioned, versioned_width, write_versioned};
use crate::boxes::{
    BoxHeader, ChildOrder, ContainerBox, Decode, FourCC, FullBoxHeader, HeaderForm, Mp4Atom,
    push_all, push_some,
};
use crate::error::{Error, Result};
use crate::parser::BoxReader;
use crate::primitives::{packed, read_uint_n, write_uint_n};
use crate::registry::Mp4Box;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct MfraBox {
    pub tfra: Vec<TfraBox>,
    pub mfro: Option<MfroBox>,
    pub boxes: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MfraBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let (children, order) = read_children(r)?;
        let mut mfra = MfraBox {
            order,
            header_form: h.form,
            ..Default::default()
        };
        for c in children {
            match c {
                Mp4Box::Tfra(b) => mfra.tfra.push(b),
                Mp4Box::Mfro(b) if mfra.mfro.is_none() => mfra.mfro = Some(b),
                other => mfra.boxes.push(other),
            }
        }
        Ok(mfra)
    }
}

impl ContainerBox for MfraBox {
    const TYPE: FourCC = FourCC::new(b"mfra");

    fn canonical_children(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_all(&mut out, &self.tfra);
        push_all(&mut out, &self.boxes);
        push_some(&mut out, &self.mfro);
        out
    }

    fn child_order(&self) -> &ChildOrder {
        &self.order
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TfraEntry {
    pub time: u64,
    pub moof_offset: u64,
    pub traf_number: u32,
    pub trun_number: u32,
    pub sample_number: u32,
}

/// Track Fragment Random Access Box.
///
/// The widths of the three entry numbers are stored as byte counts (1 to 4)
/// and written as the `length_size_of_*_num` selectors.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TfraBox {
    pub full: FullBoxHeader,
    pub track_id: u32,
    #[serde(skip)]
    pub reserved: u32,
    pub traf_num_size: u8,
    pub trun_num_size: u8,
    pub sample_num_size: u8,
    pub entries: Vec<TfraEntry>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Default for TfraBox {
    fn default() -> Self {
        TfraBox {
            full: FullBoxHeader::default(),
            track_id: 0,
            reserved: 0,
            traf_num_size: 1,
            trun_num_size: 1,
            sample_num_size: 1,
            entries: Vec::new(),
            header_form: HeaderForm::Compact,
        }
    }
}

impl TfraBox {
    fn entry_width(&self) -> u64 {
        2 * versioned_width(self.full.version)
            + self.traf_num_size as u64
            + self.trun_num_size as u64
            + self.sample_num_size as u64
    }

    fn sizes_word(&self) -> Result<u32> {
        let mut word = packed::TFRA_RESERVED.put(0, self.reserved as u64)?;
        for (field, size) in [
            (packed::TFRA_TRAF_NUM_SIZE, self.traf_num_size),
            (packed::TFRA_TRUN_NUM_SIZE, self.trun_num_size),
            (packed::TFRA_SAMPLE_NUM_SIZE, self.sample_num_size),
        ] {
            if !(1..=4).contains(&size) {
                return Err(Error::bad_format(format!("tfra field size {size} not in 1..=4")));
            }
            word = field.put(word, size as u64 - 1)?;
        }
        Ok(word as u32)
    }
}

impl Decode for TfraBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let track_id = r.read_u32::<BigEndian>()?;
        let word = r.read_u32::<BigEndian>()? as u64;
        let mut b = TfraBox {
            full,
            track_id,
            reserved: packed::TFRA_RESERVED.get(word) as u32,
            traf_num_size: packed::TFRA_TRAF_NUM_SIZE.get(word) as u8 + 1,
            trun_num_size: packed::TFRA_TRUN_NUM_SIZE.get(word) as u8 + 1,
            sample_num_size: packed::TFRA_SAMPLE_NUM_SIZE.get(word) as u8 + 1,
            entries: Vec::new(),
            header_form: h.form,
        };
        let count = r.read_u32::<BigEndian>()?;
        let n = r.check_entries(count as u64, b.entry_width())?;
        b.entries.reserve(n);
        for _ in 0..n {
            b.entries.push(TfraEntry {
                time: read_versioned(r, full.version)?,
                moof_offset: read_versioned(r, full.version)?,
                traf_number: read_uint_n(r, b.traf_num_size)? as u32,
                trun_number: read_uint_n(r, b.trun_num_size)? as u32,
                sample_number: read_uint_n(r, b.sample_num_size)? as u32,
            });
        }
        Ok(b)
    }
}

impl Mp4Atom for TfraBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"tfra")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 12 + self.entry_width() * self.entries.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(self.track_id)?;
        w.write_u32::<BigEndian>(self.sizes_word()?)?;
        w.write_u32::<BigEndian>(count_u32(self.entries.len())?)?;
        for e in &self.entries {
            write_versioned(w, self.full.version, e.time)?;
            write_versioned(w, self.full.version, e.moof_offset)?;
            write_uint_n(w, e.traf_number as u64, self.traf_num_size)?;
            write_uint_n(w, e.trun_number as u64, self.trun_num_size)?;
            write_uint_n(w, e.sample_number as u64, self.sample_num_size)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!("track_id={} entries={}", self.track_id, self.entries.len())
    }
}

/// Movie Fragment Random Access Offset Box; `mfra_size` is the size of the
/// enclosing mfra box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MfroBox {
    pub full: FullBoxHeader,
    pub mfra_size: u32,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for MfroBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(MfroBox {
            full: FullBoxHeader::read(r)?,
            mfra_size: r.read_u32::<BigEndian>()?,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for MfroBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"mfro")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 4
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(self.mfra_size)?;
        Ok(())
    }

    fn summary(&self) -> String {
        format!("mfra_size={}", self.mfra_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct SidxReference {
    /// 1 when the reference points at another sidx, 0 for media.
    pub reference_type: u8,
    pub referenced_size: u32,
    pub subsegment_duration: u32,
    pub starts_with_sap: bool,
    pub sap_type: u8,
    pub sap_delta_time: u32,
}

/// Segment Index Box.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct SidxBox {
    pub full: FullBoxHeader,
    pub reference_id: u32,
    pub timescale: u32,
    pub earliest_presentation_time: u64,
    pub first_offset: u64,
    #[serde(skip)]
    pub reserved: u16,
    pub references: Vec<SidxReference>,
    #[serde(skip)]
    pub header_form: HeaderForm,
}

impl Decode for SidxBox {
    fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        let full = FullBoxHeader::read(r)?;
        let reference_id = r.read_u32::<BigEndian>()?;
        let timescale = r.read_u32::<BigEndian>()?;
        let earliest_presentation_time = read_versioned(r, full.version)?;
        let first_offset = read_versioned(r, full.version)?;
        let reserved = r.read_u16::<BigEndian>()?;
        let count = r.read_u16::<BigEndian>()?;
        let n = r.check_entries(count as u64, 12)?;
        let mut references = Vec::with_capacity(n);
        for _ in 0..n {
            let a = r.read_u32::<BigEndian>()? as u64;
            let subsegment_duration = r.read_u32::<BigEndian>()?;
            let c = r.read_u32::<BigEndian>()? as u64;
            references.push(SidxReference {
                reference_type: packed::SIDX_REFERENCE_TYPE.get(a) as u8,
                referenced_size: packed::SIDX_REFERENCED_SIZE.get(a) as u32,
                subsegment_duration,
                starts_with_sap: packed::SIDX_STARTS_WITH_SAP.get(c) == 1,
                sap_type: packed::SIDX_SAP_TYPE.get(c) as u8,
                sap_delta_time: packed::SIDX_SAP_DELTA_TIME.get(c) as u32,
            });
        }
        Ok(SidxBox {
            full,
            reference_id,
            timescale,
            earliest_presentation_time,
            first_offset,
            reserved,
            references,
            header_form: h.form,
        })
    }
}

impl Mp4Atom for SidxBox {
    fn box_type(&self) -> FourCC {
        FourCC::new(b"sidx")
    }

    fn payload_size(&self) -> u64 {
        FullBoxHeader::SIZE + 8 + 2 * versioned_width(self.full.version) + 4 + 12 * self.references.len() as u64
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        self.full.write(w)?;
        w.write_u32::<BigEndian>(self.reference_id)?;
        w.write_u32::<BigEndian>(self.timescale)?;
        write_versioned(w, self.full.version, self.earliest_presentation_time)?;
        write_versioned(w, self.full.version, self.first_offset)?;
        w.write_u16::<BigEndian>(self.reserved)?;
        w.write_u16::<BigEndian>(count_u16(self.references.len())?)?;
        for rf in &self.references {
            let a = packed::SIDX_REFERENCE_TYPE.put(0, rf.reference_type as u64)?;
            let a = packed::SIDX_REFERENCED_SIZE.put(a, rf.referenced_size as u64)?;
            let c = packed::SIDX_STARTS_WITH_SAP.put(0, rf.starts_with_sap as u64)?;
            let c = packed::SIDX_SAP_TYPE.put(c, rf.sap_type as u64)?;
            let c = packed::SIDX_SAP_DELTA_TIME.put(c, rf.sap_delta_time as u64)?;
            w.write_u32::<BigEndian>(a as u32)?;
            w.write_u32::<BigEndian>(rf.subsegment_duration)?;
            w.write_u32::<BigEndian>(c as u32)?;
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!(
            "reference_id={} timescale={} references={}",
            self.reference_id,
            self.timescale,
            self.references.len()
        )
    }
}
