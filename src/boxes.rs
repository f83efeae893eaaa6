use crate::error::Result;
use crate::parser::{BoxReader, write_box_header};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io::{Read, Write};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn new(b: &[u8; 4]) -> Self {
        FourCC(*b)
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }

    /// Builds a code from `s`, truncated or space-padded to four bytes.
    pub fn padded(s: &str) -> Self {
        let mut out = [b' '; 4];
        for (dst, src) in out.iter_mut().zip(s.bytes()) {
            *dst = src;
        }
        FourCC(out)
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }

    pub fn read<R: Read + ?Sized>(r: &mut R) -> std::io::Result<Self> {
        let mut b = [0u8; 4];
        r.read_exact(&mut b)?;
        Ok(FourCC(b))
    }

    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&self.0)
    }
}
impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl serde::Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

/// How a box header encodes its size field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum HeaderForm {
    /// 32-bit size. Promoted to `Large` on encode if the box outgrows 32 bits.
    #[default]
    Compact,
    /// size == 1 followed by a 64-bit size.
    Large,
    /// size == 0: the box runs to the end of its enclosing region.
    ToEnd,
}

impl HeaderForm {
    pub fn header_size(self, payload_size: u64) -> u64 {
        match self {
            HeaderForm::Large => 16,
            HeaderForm::ToEnd => 8,
            HeaderForm::Compact if payload_size + 8 > u32::MAX as u64 => 16,
            HeaderForm::Compact => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHeader {
    pub typ: FourCC,
    pub size: u64,        // effective total size including header
    pub header_size: u64, // 8 or 16
    pub form: HeaderForm,
    pub start: u64, // stream offset of header start
}

impl BoxHeader {
    pub fn payload_size(&self) -> u64 {
        self.size - self.header_size
    }
}

/// The version + flags prefix of a FullBox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct FullBoxHeader {
    pub version: u8,
    pub flags: u32, // 24 bits
}

impl FullBoxHeader {
    pub const SIZE: u64 = 4;

    pub fn new(version: u8, flags: u32) -> Self {
        FullBoxHeader { version, flags }
    }

    pub fn read<R: Read + ?Sized>(r: &mut R) -> std::io::Result<Self> {
        let version = r.read_u8()?;
        let flags = r.read_u24::<BigEndian>()?;
        Ok(FullBoxHeader { version, flags })
    }

    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u8(self.version)?;
        w.write_u24::<BigEndian>(self.flags & 0x00ff_ffff)
    }

    pub fn has(&self, bit: u32) -> bool {
        self.flags & bit == bit
    }
}

/// The header form a box was decoded with, replayed when it is encoded.
///
/// Every registered box stores it in a `header_form` field; the registry
/// implements this trait for all of them.
pub trait Framed {
    fn header_form(&self) -> HeaderForm;
}

/// Behaviour shared by every box: identity, size and serialization.
///
/// `size()` is always derived from current field values, so a tree edited
/// after decoding still encodes with consistent headers.
pub trait Mp4Atom: Framed {
    fn box_type(&self) -> FourCC;

    /// Payload length in bytes, excluding the header.
    fn payload_size(&self) -> u64;

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()>;

    /// Child boxes in the order they are encoded. Empty for leaf boxes.
    fn children(&self) -> Vec<&dyn Mp4Atom> {
        Vec::new()
    }

    /// One-line field summary used by dumps.
    fn summary(&self) -> String {
        String::new()
    }

    /// Distance from the start of the box to its first child. Children
    /// normally run to the end of the box.
    fn children_start(&self) -> u64 {
        self.size() - self.children().iter().map(|c| c.size()).sum::<u64>()
    }

    fn size(&self) -> u64 {
        let payload = self.payload_size();
        self.header_form().header_size(payload) + payload
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        write_box_header(w, self.box_type(), self.payload_size(), self.header_form())?;
        self.encode_payload(w)
    }
}

pub trait Decode: Sized {
    /// Decodes a box from a reader bounded to exactly its payload.
    fn decode(header: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self>;
}

/// A box whose payload is nothing but child boxes.
pub trait ContainerBox {
    const TYPE: FourCC;

    /// Known children first, in canonical order, then the overflow list.
    fn canonical_children(&self) -> Vec<&dyn Mp4Atom>;

    fn child_order(&self) -> &ChildOrder;
}

impl<T: ContainerBox + Framed> Mp4Atom for T {
    fn box_type(&self) -> FourCC {
        T::TYPE
    }

    fn payload_size(&self) -> u64 {
        self.canonical_children().iter().map(|c| c.size()).sum()
    }

    fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
        encode_all(&self.children(), w)
    }

    fn children(&self) -> Vec<&dyn Mp4Atom> {
        self.child_order().arrange(self.canonical_children())
    }
}

pub(crate) fn encode_all(boxes: &[&dyn Mp4Atom], w: &mut dyn Write) -> Result<()> {
    for b in boxes {
        b.encode(w)?;
    }
    Ok(())
}

/// The sequence of child types as they were read from the stream.
///
/// Replaying it on encode keeps round-trips byte-exact even when the
/// source did not use the canonical child order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildOrder(Vec<FourCC>);

impl ChildOrder {
    pub fn record(types: impl IntoIterator<Item = FourCC>) -> Self {
        ChildOrder(types.into_iter().collect())
    }

    pub fn types(&self) -> &[FourCC] {
        &self.0
    }

    /// Orders `canonical` by the recorded sequence; boxes the record does
    /// not account for keep their canonical position at the end.
    pub fn arrange<'a>(&self, canonical: Vec<&'a dyn Mp4Atom>) -> Vec<&'a dyn Mp4Atom> {
        if self.0.is_empty() {
            return canonical;
        }
        let mut by_type: HashMap<FourCC, VecDeque<usize>> = HashMap::new();
        for (i, b) in canonical.iter().enumerate() {
            by_type.entry(b.box_type()).or_default().push_back(i);
        }
        let mut taken = vec![false; canonical.len()];
        let mut out = Vec::with_capacity(canonical.len());
        for typ in &self.0 {
            if let Some(i) = by_type.get_mut(typ).and_then(|q| q.pop_front()) {
                taken[i] = true;
                out.push(canonical[i]);
            }
        }
        for (i, b) in canonical.iter().enumerate() {
            if !taken[i] {
                out.push(*b);
            }
        }
        out
    }
}

pub(crate) fn push_some<'a, T: Mp4Atom>(out: &mut Vec<&'a dyn Mp4Atom>, b: &'a Option<T>) {
    if let Some(b) = b {
        out.push(b);
    }
}

pub(crate) fn push_all<'a, T: Mp4Atom>(out: &mut Vec<&'a dyn Mp4Atom>, bs: &'a [T]) {
    for b in bs {
        out.push(b);
    }
}
