//! The whole-file model: top-level slots, encode ordering and text dumps.

use crate::box_types::{FtypBox, FreeBox, MdatBox, MetaBox, MfraBox, MoofBox, MoovBox, PdinBox, SidxBox, UdtaBox};
use crate::boxes::{ChildOrder, Mp4Atom, push_all, push_some};
use crate::error::{Error, Result};
use crate::known_boxes::KnownBox;
use crate::parser::{BoxReader, decode_container};
use crate::registry::Mp4Box;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::{Read, Seek, Write};

/// What to do with media data payloads while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MdatPolicy {
    /// Read the payload into memory. Memory use grows with the file.
    #[default]
    Buffer,
    /// Skip the payload and remember where it was; encode it with
    /// [`Mp4File::encode_from`].
    Defer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub mdat: MdatPolicy,
}

/// A decoded file: well-known top-level boxes in named slots, everything
/// else in `extra`, and the order the boxes were read in.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct Mp4File {
    pub ftyp: Option<FtypBox>,
    pub styp: Option<FtypBox>,
    pub pdin: Option<PdinBox>,
    pub moov: Option<MoovBox>,
    pub moof: Vec<MoofBox>,
    pub mdat: Vec<MdatBox>,
    pub sidx: Vec<SidxBox>,
    pub free: Vec<FreeBox>,
    pub mfra: Option<MfraBox>,
    pub meta: Option<MetaBox>,
    pub udta: Option<UdtaBox>,
    pub extra: Vec<Mp4Box>,
    #[serde(skip)]
    pub order: ChildOrder,
}

impl Mp4File {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        Self::decode_with(r, DecodeOptions::default())
    }

    pub fn decode_with<R: Read>(r: &mut R, options: DecodeOptions) -> Result<Self> {
        let mut reader = BoxReader::new(r).with_options(options);
        let boxes = decode_container(&mut reader)?;
        Ok(Self::from_boxes(boxes))
    }

    /// Sorts decoded top-level boxes into their slots.
    pub fn from_boxes(boxes: Vec<Mp4Box>) -> Self {
        let mut f = Mp4File {
            order: ChildOrder::record(boxes.iter().map(|b| b.box_type())),
            ..Default::default()
        };
        for b in boxes {
            match b {
                Mp4Box::Ftyp(x) if x.is_segment_type() && f.styp.is_none() => f.styp = Some(x),
                Mp4Box::Ftyp(x) if !x.is_segment_type() && f.ftyp.is_none() => f.ftyp = Some(x),
                Mp4Box::Pdin(x) if f.pdin.is_none() => f.pdin = Some(x),
                Mp4Box::Moov(x) if f.moov.is_none() => f.moov = Some(x),
                Mp4Box::Moof(x) => f.moof.push(x),
                Mp4Box::Mdat(x) => f.mdat.push(x),
                Mp4Box::Sidx(x) => f.sidx.push(x),
                Mp4Box::Free(x) => f.free.push(x),
                Mp4Box::Mfra(x) if f.mfra.is_none() => f.mfra = Some(x),
                Mp4Box::Meta(x) if f.meta.is_none() => f.meta = Some(x),
                Mp4Box::Udta(x) if f.udta.is_none() => f.udta = Some(x),
                other => f.extra.push(other),
            }
        }
        f
    }

    /// A media segment starts with `styp` and carries no movie box.
    pub fn is_segment(&self) -> bool {
        self.styp.is_some()
    }

    fn canonical_boxes(&self) -> Vec<&dyn Mp4Atom> {
        let mut out: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut out, &self.ftyp);
        push_some(&mut out, &self.styp);
        push_some(&mut out, &self.pdin);
        push_some(&mut out, &self.moov);
        push_all(&mut out, &self.sidx);
        push_all(&mut out, &self.moof);
        push_all(&mut out, &self.mdat);
        push_all(&mut out, &self.free);
        push_some(&mut out, &self.mfra);
        push_some(&mut out, &self.meta);
        push_some(&mut out, &self.udta);
        push_all(&mut out, &self.extra);
        out
    }

    /// All top-level boxes in encode order: ftyp, then moov, then the rest
    /// in the order they were read. Segments keep their read order.
    pub fn top_level_boxes(&self) -> Vec<&dyn Mp4Atom> {
        let arranged = self.order.arrange(self.canonical_boxes());
        if self.is_segment() {
            return arranged;
        }
        let mut head: Vec<&dyn Mp4Atom> = Vec::new();
        push_some(&mut head, &self.ftyp);
        push_some(&mut head, &self.moov);
        let rest: Vec<&dyn Mp4Atom> = arranged
            .into_iter()
            .filter(|b| !head.iter().any(|h| same_box(*h, *b)))
            .collect();
        head.extend(rest);
        head
    }

    fn check_mandatory(&self) -> Result<()> {
        if self.is_segment() {
            return Ok(());
        }
        if self.ftyp.is_none() {
            return Err(Error::MissingBox("ftyp"));
        }
        if self.moov.is_none() {
            return Err(Error::MissingBox("moov"));
        }
        Ok(())
    }

    /// Encodes the file. Fails with `DeferredPayload` if an mdat was decoded
    /// with [`MdatPolicy::Defer`].
    pub fn encode(&self, w: &mut dyn Write) -> Result<()> {
        self.check_mandatory()?;
        let layout = self.top_level_boxes();
        let moov = self.relocated_moov(&layout)?;
        for b in &layout {
            self.encode_top_level(*b, moov.as_deref(), w)?;
        }
        Ok(())
    }

    /// Like [`encode`](Self::encode), but copies deferred mdat payloads out
    /// of `source`, the stream this file was decoded from.
    pub fn encode_from<S: Read + Seek>(&self, source: &mut S, w: &mut dyn Write) -> Result<()> {
        self.check_mandatory()?;
        let layout = self.top_level_boxes();
        let moov = self.relocated_moov(&layout)?;
        for b in &layout {
            match self.mdat.iter().find(|m| same_box(*b, *m)) {
                Some(mdat) => mdat.encode_from(source, w)?,
                None => self.encode_top_level(*b, moov.as_deref(), w)?,
            }
        }
        Ok(())
    }

    fn encode_top_level(&self, b: &dyn Mp4Atom, moov: Option<&MoovBox>, w: &mut dyn Write) -> Result<()> {
        match (moov, &self.moov) {
            (Some(relocated), Some(orig)) if same_box(b, orig) => relocated.encode(w),
            _ => b.encode(w),
        }
    }

    /// The movie box with chunk offsets shifted to follow every mdat whose
    /// position changes in `layout`. Borrowed when nothing moves.
    fn relocated_moov(&self, layout: &[&dyn Mp4Atom]) -> Result<Option<Cow<'_, MoovBox>>> {
        let Some(moov) = &self.moov else {
            return Ok(None);
        };

        let mut moves = Vec::new();
        let mut pos = 0u64;
        for b in layout {
            if let Some(mdat) = self.mdat.iter().find(|m| same_box(*b, *m)) {
                if let Some(src) = mdat.source_start {
                    if src != pos {
                        moves.push((src, src + mdat.size(), pos as i128 - src as i128));
                    }
                }
            }
            pos += b.size();
        }
        if moves.is_empty() {
            return Ok(Some(Cow::Borrowed(moov)));
        }

        tracing::debug!(moved = moves.len(), "relocating chunk offsets");
        let shift = |offset: u64| -> Option<i128> {
            moves
                .iter()
                .find(|(start, end, _)| (*start..*end).contains(&offset))
                .map(|(_, _, delta)| offset as i128 + delta)
        };

        let mut moov = moov.clone();
        for trak in &mut moov.trak {
            let Some(stbl) = trak.stbl_mut() else { continue };
            if let Some(stco) = &mut stbl.stco {
                for o in &mut stco.chunk_offsets {
                    if let Some(n) = shift(*o as u64) {
                        *o = u32::try_from(n).map_err(|_| {
                            Error::bad_format(format!("relocated chunk offset {n} does not fit stco"))
                        })?;
                    }
                }
            }
            if let Some(co64) = &mut stbl.co64 {
                for o in &mut co64.chunk_offsets {
                    if let Some(n) = shift(*o) {
                        *o = u64::try_from(n).map_err(|_| {
                            Error::bad_format(format!("relocated chunk offset {n} is negative"))
                        })?;
                    }
                }
            }
        }
        Ok(Some(Cow::Owned(moov)))
    }

    /// Indented text report: offset, size, type, name and a field summary.
    pub fn dump(&self) -> String {
        self.dump_depth(usize::MAX)
    }

    pub fn dump_depth(&self, max_depth: usize) -> String {
        let mut out = String::new();
        let mut offset = 0;
        for b in self.top_level_boxes() {
            dump_box(&mut out, b, offset, 0, max_depth);
            offset += b.size();
        }
        out
    }
}

fn same_box(a: &dyn Mp4Atom, b: &dyn Mp4Atom) -> bool {
    std::ptr::addr_eq(a as *const dyn Mp4Atom, b as *const dyn Mp4Atom)
}

fn dump_box(out: &mut String, b: &dyn Mp4Atom, offset: u64, depth: usize, max_depth: usize) {
    let indent = "  ".repeat(depth);
    let typ = b.box_type();
    let _ = write!(
        out,
        "{indent}{:>8} {:>10} {} ({})",
        format!("{offset:#x}"),
        b.size(),
        typ,
        KnownBox::from(typ).full_name()
    );
    let summary = b.summary();
    if !summary.is_empty() {
        let _ = write!(out, " {summary}");
    }
    out.push('\n');

    if depth + 1 >= max_depth {
        return;
    }
    let children = b.children();
    let mut child_offset = offset + b.children_start();
    for c in children {
        dump_box(out, c, child_offset, depth + 1, max_depth);
        child_offset += c.size();
    }
}
