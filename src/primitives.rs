//! Fixed-point numbers, variable-width integers and packed bit fields.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{Read, Write};

/// Signed 8.8 fixed-point number (volume, balance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fixed16(pub i16);

impl Fixed16 {
    pub const ONE: Fixed16 = Fixed16(0x0100);

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 256.0
    }

    pub fn read<R: Read + ?Sized>(r: &mut R) -> std::io::Result<Self> {
        r.read_i16::<BigEndian>().map(Fixed16)
    }

    pub fn write<W: Write + ?Sized>(self, w: &mut W) -> std::io::Result<()> {
        w.write_i16::<BigEndian>(self.0)
    }
}

/// Signed 16.16 fixed-point number (rate, matrix, track width/height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fixed32(pub i32);

impl Fixed32 {
    pub const ONE: Fixed32 = Fixed32(0x0001_0000);

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 65536.0
    }

    pub fn read<R: Read + ?Sized>(r: &mut R) -> std::io::Result<Self> {
        r.read_i32::<BigEndian>().map(Fixed32)
    }

    pub fn write<W: Write + ?Sized>(self, w: &mut W) -> std::io::Result<()> {
        w.write_i32::<BigEndian>(self.0)
    }
}

impl fmt::Display for Fixed16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

impl fmt::Display for Fixed32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

impl serde::Serialize for Fixed16 {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_f64(self.to_f64())
    }
}

impl serde::Serialize for Fixed32 {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_f64(self.to_f64())
    }
}

/// A run of bits inside a packed word, counted from the least significant bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub shift: u32,
    pub width: u32,
}

impl BitField {
    pub const fn new(shift: u32, width: u32) -> Self {
        BitField { shift, width }
    }

    pub const fn max(self) -> u64 {
        (1u64 << self.width) - 1
    }

    pub fn get(self, word: u64) -> u64 {
        (word >> self.shift) & self.max()
    }

    /// Stores `value` into `word`; values wider than the field are rejected.
    pub fn put(self, word: u64, value: u64) -> Result<u64> {
        if value > self.max() {
            return Err(Error::bad_format(format!(
                "value {value} does not fit in {} bits",
                self.width
            )));
        }
        Ok((word & !(self.max() << self.shift)) | (value << self.shift))
    }
}

/// Bit layouts of every packed field, shared by decoders and encoders.
pub mod packed {
    use super::BitField;

    // sidx reference, first word
    pub const SIDX_REFERENCE_TYPE: BitField = BitField::new(31, 1);
    pub const SIDX_REFERENCED_SIZE: BitField = BitField::new(0, 31);
    // sidx reference, third word
    pub const SIDX_STARTS_WITH_SAP: BitField = BitField::new(31, 1);
    pub const SIDX_SAP_TYPE: BitField = BitField::new(28, 3);
    pub const SIDX_SAP_DELTA_TIME: BitField = BitField::new(0, 28);

    // iloc size bytes
    pub const ILOC_HIGH_NIBBLE: BitField = BitField::new(4, 4);
    pub const ILOC_LOW_NIBBLE: BitField = BitField::new(0, 4);
    // iloc per-item word (versions 1 and 2)
    pub const ILOC_RESERVED: BitField = BitField::new(4, 12);
    pub const ILOC_CONSTRUCTION_METHOD: BitField = BitField::new(0, 4);

    // tfra length sizes word
    pub const TFRA_RESERVED: BitField = BitField::new(6, 26);
    pub const TFRA_TRAF_NUM_SIZE: BitField = BitField::new(4, 2);
    pub const TFRA_TRUN_NUM_SIZE: BitField = BitField::new(2, 2);
    pub const TFRA_SAMPLE_NUM_SIZE: BitField = BitField::new(0, 2);

    // ISO-639-2/T language word (mdhd, cprt); bit 15 is padding
    pub const LANG_CHARS: [BitField; 3] = [
        BitField::new(10, 5),
        BitField::new(5, 5),
        BitField::new(0, 5),
    ];
}

/// Reads a big-endian unsigned integer `width` bytes wide (0 yields 0).
pub fn read_uint_n<R: Read + ?Sized>(r: &mut R, width: u8) -> Result<u64> {
    match width {
        0 => Ok(0),
        1..=8 => Ok(r.read_uint::<BigEndian>(width as usize)?),
        _ => Err(Error::bad_format(format!("integer width {width} exceeds 8 bytes"))),
    }
}

pub fn write_uint_n<W: Write + ?Sized>(w: &mut W, value: u64, width: u8) -> Result<()> {
    if width > 8 {
        return Err(Error::bad_format(format!("integer width {width} exceeds 8 bytes")));
    }
    if width < 8 && value >> (8 * width as u32) != 0 {
        return Err(Error::bad_format(format!(
            "value {value} does not fit in {width} bytes"
        )));
    }
    if width > 0 {
        w.write_uint::<BigEndian>(value, width as usize)?;
    }
    Ok(())
}

/// Packed ISO-639-2/T language code: three 5-bit letters offset from 0x60.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Language(pub u16);

impl Language {
    pub fn code(self) -> String {
        packed::LANG_CHARS
            .iter()
            .map(|f| (f.get(self.0 as u64) as u8 + 0x60) as char)
            .collect()
    }

    pub fn from_code(code: &str) -> Result<Self> {
        let b = code.as_bytes();
        if b.len() != 3 || !b.iter().all(|c| c.is_ascii_lowercase()) {
            return Err(Error::bad_format(format!("bad language code {code:?}")));
        }
        let mut word = 0u64;
        for (f, c) in packed::LANG_CHARS.iter().zip(b) {
            word = f.put(word, (*c - 0x60) as u64)?;
        }
        Ok(Language(word as u16))
    }
}

impl serde::Serialize for Language {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.code())
    }
}

/// Serializes raw bytes as a lowercase hex string.
pub(crate) fn hex_bytes<T: AsRef<[u8]>, S: serde::Serializer>(
    bytes: &T,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes.as_ref()))
}

/// Serializes NUL-terminated text bytes as a string.
pub(crate) fn text_bytes<T: AsRef<[u8]>, S: serde::Serializer>(
    bytes: &T,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&c_string(bytes.as_ref()))
}

/// Text up to the first NUL, lossily decoded.
pub(crate) fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
