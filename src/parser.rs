use crate::box_types::{MDAT, MdatBox};
use crate::boxes::{BoxHeader, FourCC, HeaderForm};
use crate::error::{Error, Result};
use crate::file::{DecodeOptions, MdatPolicy};
use crate::registry::Mp4Box;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};

enum Source<'a> {
    Stream(&'a mut dyn Read),
    Spilled(Cursor<Vec<u8>>),
}

/// A reader confined to one box payload (or to a whole stream).
///
/// Child readers borrow their parent, so every byte a child consumes is
/// also counted against the parent's remaining length. A decoder can never
/// read past the payload its header declared.
pub struct BoxReader<'a> {
    source: Source<'a>,
    remaining: Option<u64>, // None: unbounded stream of unknown length
    offset: u64,
    options: DecodeOptions,
}

impl<'a> BoxReader<'a> {
    /// Reader over a stream whose length is unknown.
    pub fn new(inner: &'a mut dyn Read) -> Self {
        BoxReader {
            source: Source::Stream(inner),
            remaining: None,
            offset: 0,
            options: DecodeOptions::default(),
        }
    }

    /// Reader limited to `len` bytes of `inner`.
    pub fn with_len(inner: &'a mut dyn Read, len: u64) -> Self {
        BoxReader {
            remaining: Some(len),
            ..BoxReader::new(inner)
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the absolute stream offset of the next byte.
    pub fn starting_at(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Absolute stream offset of the next byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    /// Remaining byte count; an unbounded stream is read to its end and
    /// kept in memory so the count becomes known.
    pub fn remaining_or_spill(&mut self) -> Result<u64> {
        if let Some(n) = self.remaining {
            return Ok(n);
        }
        let mut rest = Vec::new();
        self.read_to_end(&mut rest)?;
        // read_to_end advanced the offset; rewind it to the spill start.
        self.offset -= rest.len() as u64;
        let len = rest.len() as u64;
        self.source = Source::Spilled(Cursor::new(rest));
        self.remaining = Some(len);
        Ok(len)
    }

    /// Reads to the end without keeping anything and returns the byte count.
    pub fn drain(&mut self) -> Result<u64> {
        let n = io::copy(self, &mut io::sink())?;
        self.remaining = Some(0);
        Ok(n)
    }

    /// A reader bounded to the next `len` bytes.
    pub fn child(&mut self, len: u64) -> BoxReader<'_> {
        let offset = self.offset;
        let options = self.options;
        BoxReader {
            source: Source::Stream(self),
            remaining: Some(len),
            offset,
            options,
        }
    }

    /// Reads exactly `n` bytes.
    pub fn read_bytes(&mut self, n: u64) -> Result<Vec<u8>> {
        let cap = self.remaining.map_or(n, |r| r.min(n)).min(1 << 20);
        let mut v = Vec::with_capacity(cap as usize);
        self.by_ref().take(n).read_to_end(&mut v)?;
        if (v.len() as u64) < n {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(v)
    }

    /// Reads everything left in the region.
    pub fn read_rest(&mut self) -> Result<Vec<u8>> {
        let n = self.remaining_or_spill()?;
        self.read_bytes(n)
    }

    /// Consumes `n` bytes without keeping them.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let copied = io::copy(&mut self.by_ref().take(n), &mut io::sink())?;
        if copied < n {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(())
    }

    /// Checks that `count` records of `width` bytes fit in what is left,
    /// so a corrupt count cannot trigger a huge allocation.
    pub fn check_entries(&self, count: u64, width: u64) -> Result<usize> {
        let needed = count
            .checked_mul(width)
            .ok_or_else(|| Error::bad_format(format!("entry count {count} overflows")))?;
        if let Some(rem) = self.remaining {
            if needed > rem {
                return Err(Error::bad_format(format!(
                    "{count} entries of {width} bytes need {needed} bytes, {rem} left"
                )));
            }
        }
        Ok(count as usize)
    }
}

impl Read for BoxReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let max = match self.remaining {
            Some(0) => return Ok(0),
            Some(r) => buf.len().min(r.min(usize::MAX as u64) as usize),
            None => buf.len(),
        };
        let n = match &mut self.source {
            Source::Stream(r) => r.read(&mut buf[..max])?,
            Source::Spilled(c) => c.read(&mut buf[..max])?,
        };
        self.offset += n as u64;
        if let Some(r) = self.remaining.as_mut() {
            *r -= n as u64;
        }
        Ok(n)
    }
}

fn read_up_to(r: &mut BoxReader<'_>, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Reads the next box header, or `None` if the region ends exactly here.
pub fn read_box_header(r: &mut BoxReader<'_>) -> Result<Option<BoxHeader>> {
    let start = r.offset();
    let mut buf = [0u8; 8];
    let got = read_up_to(r, &mut buf)?;
    if got == 0 {
        return Ok(None);
    }
    if got < 8 {
        return Err(Error::TruncatedHeader {
            needed: 8,
            available: got as u64,
        });
    }

    let size32 = BigEndian::read_u32(&buf[0..4]);
    let typ = FourCC([buf[4], buf[5], buf[6], buf[7]]);

    let (size, header_size, form) = match size32 {
        1 => {
            let mut ext = [0u8; 8];
            let got = read_up_to(r, &mut ext)?;
            if got < 8 {
                return Err(Error::TruncatedHeader {
                    needed: 16,
                    available: 8 + got as u64,
                });
            }
            (BigEndian::read_u64(&ext), 16, HeaderForm::Large)
        }
        0 => (8 + to_end_len(r, typ)?, 8, HeaderForm::ToEnd),
        n => (n as u64, 8, HeaderForm::Compact),
    };

    if size < header_size {
        return Err(Error::bad_format(format!(
            "{typ} declares size {size}, smaller than its {header_size}-byte header"
        )));
    }

    Ok(Some(BoxHeader {
        typ,
        size,
        header_size,
        form,
        start,
    }))
}

/// Payload length of a size-0 box. On a stream of unknown length the rest of
/// the stream is consumed: a deferred mdat is only counted, anything else is
/// kept in memory for its decoder.
fn to_end_len(r: &mut BoxReader<'_>, typ: FourCC) -> Result<u64> {
    if r.remaining().is_none() && typ == MDAT && r.options().mdat == MdatPolicy::Defer {
        return r.drain();
    }
    r.remaining_or_spill()
}

pub fn write_box_header(
    w: &mut dyn Write,
    typ: FourCC,
    payload_size: u64,
    form: HeaderForm,
) -> Result<()> {
    let header_size = form.header_size(payload_size);
    let total = header_size + payload_size;
    if form == HeaderForm::ToEnd {
        w.write_u32::<BigEndian>(0)?;
        typ.write(w)?;
    } else if header_size == 16 {
        w.write_u32::<BigEndian>(1)?;
        typ.write(w)?;
        w.write_u64::<BigEndian>(total)?;
    } else {
        w.write_u32::<BigEndian>(total as u32)?;
        typ.write(w)?;
    }
    Ok(())
}

/// Decodes one box whose header has just been read from `r`.
///
/// The decoder sees only the declared payload and must consume all of it.
pub fn decode_child(r: &mut BoxReader<'_>, h: &BoxHeader) -> Result<Mp4Box> {
    let declared = h.payload_size();
    if h.typ == MDAT && h.form == HeaderForm::ToEnd && declared > 0 && r.remaining() == Some(0) {
        // Already counted and skipped by `to_end_len`.
        return Ok(MdatBox::deferred(h).into());
    }
    if let Some(available) = r.remaining() {
        if declared > available {
            return Err(Error::TruncatedBody {
                typ: h.typ,
                declared,
                available,
            });
        }
    }

    let mut child = r.child(declared);
    let payload_start = child.offset();
    let decoded = Mp4Box::decode(h, &mut child);
    let consumed = child.offset() - payload_start;
    let left = child.remaining().unwrap_or(0);

    match decoded {
        Ok(b) if left == 0 => Ok(b),
        Ok(_) => Err(Error::bad_format(format!("{left} trailing bytes not decoded"))
            .in_box(h.typ, h.start)),
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::TruncatedBody {
            typ: h.typ,
            declared,
            available: consumed,
        }),
        Err(e) => Err(e.in_box(h.typ, h.start)),
    }
}

/// Decodes boxes back to back until the region is exhausted.
pub fn decode_container(r: &mut BoxReader<'_>) -> Result<Vec<Mp4Box>> {
    decode_children(r, false).map(|(boxes, _)| boxes)
}

/// Like [`decode_container`], but also accepts the 32-bit zero some
/// QuickTime writers put after the last child. Reports whether it was there.
pub fn decode_container_terminated(r: &mut BoxReader<'_>) -> Result<(Vec<Mp4Box>, bool)> {
    decode_children(r, true)
}

fn decode_children(r: &mut BoxReader<'_>, allow_terminator: bool) -> Result<(Vec<Mp4Box>, bool)> {
    let mut boxes = Vec::new();
    loop {
        if allow_terminator && r.remaining() == Some(4) {
            let mut word = [0u8; 4];
            r.read_exact(&mut word)?;
            if word != [0; 4] {
                return Err(Error::TruncatedHeader {
                    needed: 8,
                    available: 4,
                });
            }
            tracing::trace!(offset = r.offset() - 4, "zero terminator after children");
            return Ok((boxes, true));
        }
        match read_box_header(r)? {
            Some(h) => {
                tracing::trace!(typ = %h.typ, size = h.size, offset = h.start, "box header");
                boxes.push(decode_child(r, &h)?);
            }
            None => return Ok((boxes, false)),
        }
    }
}
