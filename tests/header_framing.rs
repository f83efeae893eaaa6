mod common;

use common::*;
use mp4tree::box_types::MdatPayload;
use mp4tree::{
    BoxReader, DecodeOptions, Error, FourCC, HeaderForm, MdatPolicy, Mp4Atom, Mp4Box, Mp4File,
    decode, decode_box, encode_box, read_box_header, write_box_header,
};
use std::io::{self, Read};

#[test]
fn compact_header() {
    let bytes = bx(b"abcd", &[1, 2, 3, 4]);
    let mut cursor: &[u8] = &bytes;
    let mut r = BoxReader::new(&mut cursor);
    let h = read_box_header(&mut r).expect("header").expect("not at end");
    assert_eq!(h.typ, FourCC::new(b"abcd"));
    assert_eq!(h.size, 12);
    assert_eq!(h.header_size, 8);
    assert_eq!(h.form, HeaderForm::Compact);
    assert_eq!(h.payload_size(), 4);
    assert_eq!(h.start, 0);
}

#[test]
fn empty_region_has_no_header() {
    let mut cursor: &[u8] = &[];
    let mut r = BoxReader::new(&mut cursor);
    assert!(read_box_header(&mut r).expect("clean end").is_none());
}

#[test]
fn large_header_round_trips() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.extend_from_slice(b"abcd");
    bytes.extend_from_slice(&1_000_000u64.to_be_bytes());
    bytes.extend((0..999_984u32).map(|i| i as u8));

    let mut cursor: &[u8] = &bytes;
    let mut r = BoxReader::new(&mut cursor);
    let h = read_box_header(&mut r).expect("header").expect("not at end");
    assert_eq!(h.size, 1_000_000);
    assert_eq!(h.header_size, 16);
    assert_eq!(h.form, HeaderForm::Large);
    assert_eq!(h.payload_size(), 999_984);

    let b = decode_box(&bytes).expect("decode");
    match &b {
        Mp4Box::Unknown(u) => {
            assert_eq!(u.data.len(), 999_984);
            assert_eq!(u.header_form, HeaderForm::Large);
        }
        other => panic!("expected unknown box, got {:?}", other.box_type()),
    }
    assert_eq!(b.size(), 1_000_000);
    assert_eq!(encode_box(&b).expect("encode"), bytes);
}

#[test]
fn size_zero_runs_to_end_of_file() {
    let mut bytes = minimal_file();
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(b"mdat");
    bytes.extend_from_slice(&[0xab; 100]);

    let file = decode(&mut bytes.as_slice()).expect("decode");
    assert_eq!(file.mdat.len(), 1);
    let mdat = &file.mdat[0];
    assert_eq!(mdat.header_form, HeaderForm::ToEnd);
    assert_eq!(mdat.size(), 108);

    let mut out = Vec::<u8>::new();
    file.encode(&mut out).expect("encode");
    assert_eq!(out, bytes);
}

#[test]
fn size_zero_typed_box_keeps_its_header() {
    let tfra = bx(b"tfra", &full(0, 0, &[&u32b(1)[..], &u32b(0), &u32b(0)].concat()));
    let mfro = bx(b"mfro", &full(0, 0, &u32b(8 + tfra.len() as u32 + 16)));
    let mut bytes = minimal_file();
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(b"mfra");
    bytes.extend_from_slice(&tfra);
    bytes.extend_from_slice(&mfro);

    let file = decode(&mut bytes.as_slice()).expect("decode");
    let mfra = file.mfra.as_ref().expect("mfra");
    assert_eq!(mfra.header_form, HeaderForm::ToEnd);
    assert_eq!(mfra.tfra.len(), 1);
    assert_eq!(mfra.size(), 8 + tfra.len() as u64 + 16);

    let mut out = Vec::<u8>::new();
    file.encode(&mut out).expect("encode");
    assert_eq!(out, bytes);
}

#[test]
fn large_header_on_a_container_is_kept() {
    let inner = [mvhd(), bx(b"trak", &tkhd(1))].concat();
    let mut moov = Vec::new();
    moov.extend_from_slice(&1u32.to_be_bytes());
    moov.extend_from_slice(b"moov");
    moov.extend_from_slice(&(16 + inner.len() as u64).to_be_bytes());
    moov.extend_from_slice(&inner);
    let bytes = [ftyp(), moov].concat();

    let file = decode(&mut bytes.as_slice()).expect("decode");
    let moov = file.moov.as_ref().expect("moov");
    assert_eq!(moov.header_form, HeaderForm::Large);
    assert_eq!(moov.size(), 16 + inner.len() as u64);

    let mut out = Vec::<u8>::new();
    file.encode(&mut out).expect("encode");
    assert_eq!(out, bytes);
}

/// Refuses any single read wider than `limit` bytes.
struct NarrowReads<R> {
    inner: R,
    limit: usize,
}

impl<R: Read> Read for NarrowReads<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.len() > self.limit {
            return Err(io::Error::other(format!("read of {} bytes", buf.len())));
        }
        self.inner.read(buf)
    }
}

#[test]
fn deferred_size_zero_mdat_is_not_held_in_memory() {
    let prefix = [minimal_file(), 0u32.to_be_bytes().to_vec(), b"mdat".to_vec()].concat();
    let len = 1u64 << 20;
    let mut stream = NarrowReads {
        inner: prefix.as_slice().chain(io::repeat(0x5a).take(len)),
        limit: 64 * 1024,
    };
    let options = DecodeOptions {
        mdat: MdatPolicy::Defer,
    };

    let file = Mp4File::decode_with(&mut stream, options).expect("decode");
    assert_eq!(file.mdat.len(), 1);
    let mdat = &file.mdat[0];
    assert_eq!(mdat.header_form, HeaderForm::ToEnd);
    assert_eq!(
        mdat.payload,
        MdatPayload::Deferred {
            offset: prefix.len() as u64,
            len,
        }
    );
    assert_eq!(mdat.size(), 8 + len);
}

#[test]
fn deferred_size_zero_mdat_from_a_single_box() {
    let bytes = [&0u32.to_be_bytes()[..], b"mdat", &[7u8; 32]].concat();
    let mut cursor: &[u8] = &bytes;
    let mut r = BoxReader::new(&mut cursor).with_options(DecodeOptions {
        mdat: MdatPolicy::Defer,
    });
    let h = read_box_header(&mut r).expect("header").expect("not at end");
    assert_eq!(h.size, 40);
    assert_eq!(r.remaining(), Some(0));
    match mp4tree::parser::decode_child(&mut r, &h).expect("decode") {
        Mp4Box::Mdat(m) => assert_eq!(m.payload, MdatPayload::Deferred { offset: 8, len: 32 }),
        other => panic!("expected mdat, got {:?}", other.box_type()),
    }
}

#[test]
fn short_header_is_truncated() {
    let bytes = [0u8, 0, 0, 16, b'f'];
    let err = decode(&mut &bytes[..]).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::TruncatedHeader { needed: 8, available: 5 }
    ));
}

#[test]
fn short_large_size_is_truncated() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.extend_from_slice(b"free");
    bytes.extend_from_slice(&[0, 0, 0]);
    let err = decode(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::TruncatedHeader { needed: 16, available: 11 }
    ));
}

#[test]
fn body_past_end_of_stream_is_truncated() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&100u32.to_be_bytes());
    bytes.extend_from_slice(b"abcd");
    bytes.extend_from_slice(&[7; 12]);
    let err = decode(&mut bytes.as_slice()).unwrap_err();
    match err.root_cause() {
        Error::TruncatedBody {
            typ,
            declared,
            available,
        } => {
            assert_eq!(*typ, FourCC::new(b"abcd"));
            assert_eq!(*declared, 92);
            assert_eq!(*available, 12);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn child_larger_than_parent_is_truncated() {
    // moov holds 8 payload bytes, but its child claims 100.
    let mut child = Vec::new();
    child.extend_from_slice(&100u32.to_be_bytes());
    child.extend_from_slice(b"free");
    let bytes = bx(b"moov", &child);

    let err = decode_box(&bytes).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::TruncatedBody { declared: 92, available: 0, .. }
    ));
}

#[test]
fn size_below_header_is_bad_format() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&4u32.to_be_bytes());
    bytes.extend_from_slice(b"free");
    let err = decode_box(&bytes).unwrap_err();
    assert!(matches!(err.root_cause(), Error::BadFormat(_)));
}

#[test]
fn leaf_with_trailing_bytes_is_bad_format() {
    let payload = full(0, 0, &[&u32b(7)[..], &[0xee, 0xee]].concat());
    let err = decode_box(&bx(b"mfhd", &payload)).unwrap_err();
    match &err {
        Error::Box { typ, offset, .. } => {
            assert_eq!(*typ, FourCC::new(b"mfhd"));
            assert_eq!(*offset, 0);
        }
        other => panic!("expected box context, got {other}"),
    }
    assert!(matches!(err.root_cause(), Error::BadFormat(_)));
}

#[test]
fn decoding_stops_at_the_declared_size() {
    let mut bytes = stco(&[10, 20]);
    let sentinel = [0xde, 0xad, 0xbe, 0xef];
    bytes.extend_from_slice(&sentinel);

    let mut cursor: &[u8] = &bytes;
    {
        let mut r = BoxReader::new(&mut cursor);
        let h = read_box_header(&mut r).expect("header").expect("not at end");
        let b = mp4tree::parser::decode_child(&mut r, &h).expect("decode");
        match b {
            Mp4Box::Stco(s) => assert_eq!(s.chunk_offsets, vec![10, 20]),
            other => panic!("expected stco, got {:?}", other.box_type()),
        }
    }
    assert_eq!(cursor, &sentinel[..]);
}

#[test]
fn compact_header_promotes_when_too_large() {
    let mut out = Vec::<u8>::new();
    write_box_header(&mut out, FourCC::new(b"mdat"), u32::MAX as u64, HeaderForm::Compact)
        .expect("write");
    assert_eq!(out.len(), 16);
    assert_eq!(&out[0..4], &1u32.to_be_bytes());
    assert_eq!(&out[4..8], b"mdat");
    assert_eq!(&out[8..16], &(u32::MAX as u64 + 16).to_be_bytes());

    let mut out = Vec::<u8>::new();
    write_box_header(&mut out, FourCC::new(b"free"), 4, HeaderForm::Compact).expect("write");
    assert_eq!(out, [0, 0, 0, 12, b'f', b'r', b'e', b'e']);
}
