//! Decoder and encoder for the ISO Base Media File Format box tree.
//!
//! ```no_run
//! let mut f = std::fs::File::open("in.mp4")?;
//! let file = mp4tree::decode(&mut f)?;
//! print!("{}", file.dump());
//! let mut out = Vec::<u8>::new();
//! file.encode(&mut out)?;
//! # Ok::<(), mp4tree::Error>(())
//! ```

pub mod box_types;
pub mod boxes;
pub mod error;
pub mod file;
pub mod known_boxes;
pub mod parser;
pub mod primitives;
pub mod registry;
pub mod util;

pub use boxes::{
    BoxHeader, ChildOrder, ContainerBox, Decode, FourCC, Framed, FullBoxHeader, HeaderForm, Mp4Atom,
};
pub use error::{Error, Result};
pub use file::{DecodeOptions, MdatPolicy, Mp4File};
pub use known_boxes::KnownBox;
pub use parser::{BoxReader, decode_container, read_box_header, write_box_header};
pub use registry::Mp4Box;

use std::io::Read;

/// Decodes a whole file from `r`, buffering media data in memory.
pub fn decode<R: Read>(r: &mut R) -> Result<Mp4File> {
    Mp4File::decode(r)
}

/// Decodes a single box, header included, from the start of `bytes`.
///
/// Bytes after the box are left unread.
pub fn decode_box(bytes: &[u8]) -> Result<Mp4Box> {
    let mut cursor = bytes;
    let mut r = BoxReader::new(&mut cursor);
    let h = read_box_header(&mut r)?.ok_or(Error::TruncatedHeader {
        needed: 8,
        available: 0,
    })?;
    parser::decode_child(&mut r, &h)
}

/// Encodes any box, header included, into a new buffer.
pub fn encode_box(b: &dyn Mp4Atom) -> Result<Vec<u8>> {
    let mut out = Vec::<u8>::with_capacity(b.size().min(1 << 20) as usize);
    b.encode(&mut out)?;
    Ok(out)
}
