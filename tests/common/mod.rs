#![allow(dead_code)]

//! Hand-built byte fixtures shared by the integration tests.

/// A compact-header box around `payload`.
pub fn bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

/// A FullBox payload: version, 24-bit flags, then `body`.
pub fn full(version: u8, flags: u32, body: &[u8]) -> Vec<u8> {
    let mut v = vec![version];
    v.extend_from_slice(&flags.to_be_bytes()[1..]);
    v.extend_from_slice(body);
    v
}

pub fn u16b(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

pub fn u32b(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

pub fn ftyp() -> Vec<u8> {
    // major brand "isom", minor version 0x200, compatible ["isom"]
    bx(b"ftyp", &[&b"isom"[..], &u32b(0x200), b"isom"].concat())
}

const UNITY: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

pub fn mvhd() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&u32b(0)); // creation_time
    body.extend_from_slice(&u32b(0)); // modification_time
    body.extend_from_slice(&u32b(1000)); // timescale
    body.extend_from_slice(&u32b(5000)); // duration
    body.extend_from_slice(&u32b(0x0001_0000)); // rate
    body.extend_from_slice(&u16b(0x0100)); // volume
    body.extend_from_slice(&[0; 10]);
    for m in UNITY {
        body.extend_from_slice(&u32b(m));
    }
    body.extend_from_slice(&[0; 24]);
    body.extend_from_slice(&u32b(2)); // next_track_id
    bx(b"mvhd", &full(0, 0, &body))
}

pub fn tkhd(track_id: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&u32b(0)); // creation_time
    body.extend_from_slice(&u32b(0)); // modification_time
    body.extend_from_slice(&u32b(track_id));
    body.extend_from_slice(&u32b(0)); // reserved
    body.extend_from_slice(&u32b(5000)); // duration
    body.extend_from_slice(&[0; 8]);
    body.extend_from_slice(&u16b(0)); // layer
    body.extend_from_slice(&u16b(0)); // alternate_group
    body.extend_from_slice(&u16b(0)); // volume
    body.extend_from_slice(&u16b(0)); // reserved
    for m in UNITY {
        body.extend_from_slice(&u32b(m));
    }
    body.extend_from_slice(&u32b(640 << 16));
    body.extend_from_slice(&u32b(480 << 16));
    bx(b"tkhd", &full(0, 3, &body))
}

pub fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut body = u32b(offsets.len() as u32).to_vec();
    for o in offsets {
        body.extend_from_slice(&u32b(*o));
    }
    bx(b"stco", &full(0, 0, &body))
}

/// trak > (tkhd, mdia > minf > stbl > stco)
pub fn trak_with_stco(offsets: &[u32]) -> Vec<u8> {
    let stbl = bx(b"stbl", &stco(offsets));
    let minf = bx(b"minf", &stbl);
    let mdia = bx(b"mdia", &minf);
    bx(b"trak", &[tkhd(1), mdia].concat())
}

pub fn moov(children: &[Vec<u8>]) -> Vec<u8> {
    bx(b"moov", &children.concat())
}

/// ftyp(isom, 0x200, [isom]) + moov(mvhd, trak(tkhd)).
pub fn minimal_file() -> Vec<u8> {
    let trak = bx(b"trak", &tkhd(1));
    [ftyp(), moov(&[mvhd(), trak])].concat()
}
