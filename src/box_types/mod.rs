//! Typed decoders and encoders, one module per area of the box tree.

pub mod file_level;
pub mod fragment;
pub mod meta;
pub mod movie;
pub mod random_access;
pub mod sample_table;

pub use file_level::*;
pub use fragment::*;
pub use meta::*;
pub use movie::*;
pub use random_access::*;
pub use sample_table::*;

use crate::boxes::{ChildOrder, Mp4Atom};
use crate::error::{Error, Result};
use crate::parser::{BoxReader, decode_container};
use crate::registry::Mp4Box;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Decodes a container payload and records the order its children arrived in.
pub(crate) fn read_children(r: &mut BoxReader<'_>) -> Result<(Vec<Mp4Box>, ChildOrder)> {
    let children = decode_container(r)?;
    let order = ChildOrder::record(children.iter().map(|c| c.box_type()));
    Ok((children, order))
}

/// Width of a time or offset field that is 64-bit in version 1, 32-bit otherwise.
pub(crate) fn versioned_width(version: u8) -> u64 {
    if version == 1 { 8 } else { 4 }
}

pub(crate) fn read_versioned<R: Read + ?Sized>(r: &mut R, version: u8) -> Result<u64> {
    Ok(if version == 1 {
        r.read_u64::<BigEndian>()?
    } else {
        r.read_u32::<BigEndian>()? as u64
    })
}

pub(crate) fn write_versioned<W: Write + ?Sized>(w: &mut W, version: u8, value: u64) -> Result<()> {
    if version == 1 {
        w.write_u64::<BigEndian>(value)?;
    } else {
        let v = u32::try_from(value).map_err(|_| {
            Error::bad_format(format!("{value} needs version 1 (64-bit) fields"))
        })?;
        w.write_u32::<BigEndian>(v)?;
    }
    Ok(())
}

/// Entry counts are written from the list length; a list too long for the
/// count field cannot be encoded.
pub(crate) fn count_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::bad_format(format!("{len} entries overflow a 32-bit count")))
}

pub(crate) fn count_u16(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::bad_format(format!("{len} entries overflow a 16-bit count")))
}
