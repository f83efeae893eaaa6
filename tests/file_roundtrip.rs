mod common;

use common::*;
use mp4tree::box_types::*;
use mp4tree::{
    DecodeOptions, Error, FourCC, FullBoxHeader, MdatPolicy, Mp4Atom, Mp4Box, Mp4File, decode,
    decode_box, encode_box,
};
use std::io::Cursor;

fn encode(file: &Mp4File) -> Vec<u8> {
    let mut out = Vec::<u8>::new();
    file.encode(&mut out).expect("encode");
    out
}

#[test]
fn minimal_file_decodes_and_round_trips() {
    let bytes = minimal_file();
    let file = decode(&mut bytes.as_slice()).expect("decode");

    let ftyp = file.ftyp.as_ref().expect("ftyp");
    assert_eq!(ftyp.major_brand, FourCC::new(b"isom"));
    assert_eq!(ftyp.minor_version, 0x200);
    assert_eq!(ftyp.compatible_brands, vec![FourCC::new(b"isom")]);

    let moov = file.moov.as_ref().expect("moov");
    let mvhd = moov.mvhd.as_ref().expect("mvhd");
    assert_eq!(mvhd.timescale, 1000);
    assert_eq!(mvhd.duration, 5000);
    assert_eq!(mvhd.next_track_id, 2);
    assert_eq!(moov.trak.len(), 1);
    assert_eq!(moov.trak[0].tkhd.as_ref().expect("tkhd").track_id, 1);

    let out = encode(&file);
    assert_eq!(out.len(), bytes.len());
    assert_eq!(out, bytes);
}

#[test]
fn size_matches_encoded_length() {
    let file = decode(&mut minimal_file().as_slice()).expect("decode");
    for b in file.top_level_boxes() {
        assert_eq!(encode_box(b).expect("encode").len() as u64, b.size());
        for c in b.children() {
            assert_eq!(encode_box(c).expect("encode").len() as u64, c.size());
        }
    }
}

#[test]
fn edited_tree_encodes_with_fresh_sizes() {
    let mut file = decode(&mut minimal_file().as_slice()).expect("decode");
    let moov = file.moov.as_mut().expect("moov");
    moov.udta = Some(UdtaBox {
        cprt: vec![CprtBox {
            notice: b"(c) nobody\0".to_vec(),
            ..Default::default()
        }],
        ..Default::default()
    });
    let expected = moov.size();

    let out = encode(&file);
    let again = decode(&mut out.as_slice()).expect("decode");
    let moov = again.moov.as_ref().expect("moov");
    assert_eq!(moov.size(), expected);
    let udta = moov.udta.as_ref().expect("udta");
    assert_eq!(udta.cprt[0].notice, b"(c) nobody\0".to_vec());
}

fn cprt_eng(notice: &[u8]) -> Vec<u8> {
    bx(b"cprt", &full(0, 0, &[&u16b(0x15c7)[..], notice].concat()))
}

#[test]
fn udta_zero_terminator_round_trips() {
    let cprt = cprt_eng(b"(c) nobody\0");
    let udta = bx(b"udta", &[cprt.clone(), u32b(0).to_vec()].concat());
    let bytes = [ftyp(), moov(&[mvhd(), bx(b"trak", &tkhd(1)), udta])].concat();

    let file = decode(&mut bytes.as_slice()).expect("decode");
    let udta = file.moov.as_ref().and_then(|m| m.udta.as_ref()).expect("udta");
    assert!(udta.terminator);
    assert_eq!(udta.cprt.len(), 1);
    assert_eq!(udta.cprt[0].language.code(), "eng");
    assert_eq!(udta.size(), 8 + cprt.len() as u64 + 4);
    assert_eq!(encode(&file), bytes);

    // The terminator sits after the children, so cprt starts right after the udta header.
    let roots = file.top_level_boxes();
    let found = mp4tree::util::find_boxes(&roots, FourCC::new(b"cprt"));
    let udta_at = bytes.windows(4).position(|w| w == b"udta").expect("udta") as u64 - 4;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].offset, udta_at + 8);
}

#[test]
fn udta_nonzero_trailing_word_is_truncated() {
    let udta = bx(b"udta", &[cprt_eng(b"x\0"), vec![0, 0, 0, 9]].concat());
    let err = decode_box(&udta).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::TruncatedHeader {
            needed: 8,
            available: 4
        }
    ));
}

#[test]
fn unknown_boxes_pass_through() {
    let mut bytes = minimal_file();
    let mystery = bx(b"zzzz", &[9, 8, 7, 6, 5]);
    bytes.extend_from_slice(&mystery);

    let file = decode(&mut bytes.as_slice()).expect("decode");
    assert_eq!(file.extra.len(), 1);
    match &file.extra[0] {
        Mp4Box::Unknown(u) => {
            assert_eq!(u.typ, FourCC::new(b"zzzz"));
            assert_eq!(u.data, vec![9, 8, 7, 6, 5]);
        }
        other => panic!("expected unknown box, got {:?}", other.box_type()),
    }
    assert_eq!(encode(&file), bytes);
}

#[test]
fn unknown_child_keeps_its_position() {
    // trak before mvhd, with an unknown box between them.
    let trak = bx(b"trak", &tkhd(1));
    let moov = moov(&[trak, bx(b"xtra", b"hello"), mvhd()]);
    let bytes = [ftyp(), moov].concat();

    let file = decode(&mut bytes.as_slice()).expect("decode");
    let kids: Vec<FourCC> = file
        .moov
        .as_ref()
        .expect("moov")
        .children()
        .iter()
        .map(|c| c.box_type())
        .collect();
    assert_eq!(
        kids,
        vec![FourCC::new(b"trak"), FourCC::new(b"xtra"), FourCC::new(b"mvhd")]
    );
    assert_eq!(encode(&file), bytes);
}

#[test]
fn added_children_follow_recorded_ones() {
    let mut file = decode(&mut minimal_file().as_slice()).expect("decode");
    let moov = file.moov.as_mut().expect("moov");
    moov.mvex = Some(MvexBox {
        trex: vec![TrexBox {
            track_id: 1,
            ..Default::default()
        }],
        ..Default::default()
    });
    moov.trak.push(TrakBox::default());

    let kids: Vec<FourCC> = moov.children().iter().map(|c| c.box_type()).collect();
    assert_eq!(
        kids,
        vec![
            FourCC::new(b"mvhd"),
            FourCC::new(b"trak"),
            FourCC::new(b"trak"),
            FourCC::new(b"mvex"),
        ]
    );
}

#[test]
fn moov_is_hoisted_before_media_data() {
    let media = bx(b"mdat", &[0x11; 32]);
    let ftyp_len = ftyp().len() as u32;
    // The only chunk starts right after the mdat header.
    let chunk = ftyp_len + 8;
    let bytes = [ftyp(), media, moov(&[mvhd(), trak_with_stco(&[chunk])])].concat();

    let file = decode(&mut bytes.as_slice()).expect("decode");
    let order: Vec<FourCC> = file.top_level_boxes().iter().map(|b| b.box_type()).collect();
    assert_eq!(
        order,
        vec![FourCC::new(b"ftyp"), FourCC::new(b"moov"), FourCC::new(b"mdat")]
    );

    let out = encode(&file);
    assert_eq!(out.len(), bytes.len());
    let moved = decode(&mut out.as_slice()).expect("decode");
    let mdat_start = ftyp_len as u64 + moved.moov.as_ref().expect("moov").size();
    let stbl = moved.moov.as_ref().expect("moov").trak[0].stbl().expect("stbl");
    let offset = stbl.stco.as_ref().expect("stco").chunk_offsets[0] as u64;
    assert_eq!(offset, mdat_start + 8);
    assert_eq!(&out[offset as usize..offset as usize + 32], &[0x11; 32][..]);

    // The decoded tree itself is untouched.
    let stbl = file.moov.as_ref().expect("moov").trak[0].stbl().expect("stbl");
    assert_eq!(stbl.stco.as_ref().expect("stco").chunk_offsets, vec![chunk]);
}

#[test]
fn offsets_outside_moved_media_are_kept() {
    let bytes = [ftyp(), moov(&[mvhd(), trak_with_stco(&[3])])].concat();
    let file = decode(&mut bytes.as_slice()).expect("decode");
    assert_eq!(encode(&file), bytes);
}

#[test]
fn relocated_offset_that_overflows_stco_is_rejected() {
    let stbl = StblBox {
        stco: Some(StcoBox {
            full: FullBoxHeader::default(),
            chunk_offsets: vec![u32::MAX - 1],
            ..Default::default()
        }),
        ..Default::default()
    };
    let trak = TrakBox {
        mdia: Some(MdiaBox {
            minf: Some(MinfBox {
                stbl: Some(stbl),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };
    // A 4 GiB mdat recorded at offset 0 that now has to follow ftyp and moov.
    let mdat = MdatBox {
        payload: MdatPayload::Deferred {
            offset: 16,
            len: u32::MAX as u64,
        },
        source_start: Some(0),
        ..MdatBox::new(Vec::new())
    };
    let file = Mp4File {
        ftyp: Some(FtypBox::new(FourCC::new(b"isom"), 0, vec![])),
        moov: Some(MoovBox {
            mvhd: Some(MvhdBox::default()),
            trak: vec![trak],
            ..Default::default()
        }),
        mdat: vec![mdat],
        ..Default::default()
    };

    let err = file.encode(&mut std::io::sink()).unwrap_err();
    assert!(matches!(err.root_cause(), Error::BadFormat(_)));
}

#[test]
fn missing_mandatory_boxes() {
    let only_ftyp = Mp4File {
        ftyp: Some(FtypBox::new(FourCC::new(b"isom"), 0, vec![])),
        ..Default::default()
    };
    let err = only_ftyp.encode(&mut std::io::sink()).unwrap_err();
    assert!(matches!(err, Error::MissingBox("moov")));

    let only_moov = Mp4File {
        moov: Some(MoovBox::default()),
        ..Default::default()
    };
    let err = only_moov.encode(&mut std::io::sink()).unwrap_err();
    assert!(matches!(err, Error::MissingBox("ftyp")));
}

fn segment() -> Vec<u8> {
    let styp = bx(b"styp", &[&b"msdh"[..], &u32b(0), b"msdh", b"msix"].concat());
    let mfhd = bx(b"mfhd", &full(0, 0, &u32b(1)));
    let tfhd = bx(b"tfhd", &full(0, 0x02_0008, &[&u32b(1)[..], &u32b(1024)].concat()));
    let trun = bx(
        b"trun",
        &full(0, 0x000201, &[&u32b(2)[..], &u32b(116), &u32b(10), &u32b(6)].concat()),
    );
    let traf = bx(b"traf", &[tfhd, trun].concat());
    let moof = bx(b"moof", &[mfhd, traf].concat());
    let mdat = bx(b"mdat", &[0x55; 16]);
    [styp, moof, mdat].concat()
}

#[test]
fn media_segment_round_trips_without_moov() {
    let bytes = segment();
    let file = decode(&mut bytes.as_slice()).expect("decode");
    assert!(file.is_segment());
    assert!(file.ftyp.is_none());
    assert!(file.moov.is_none());

    let moof = &file.moof[0];
    assert_eq!(moof.mfhd.as_ref().expect("mfhd").sequence_number, 1);
    let traf = &moof.traf[0];
    let tfhd = traf.tfhd.as_ref().expect("tfhd");
    assert!(tfhd.full.has(TfhdBox::DEFAULT_BASE_IS_MOOF));
    assert_eq!(tfhd.default_sample_duration, 1024);
    let trun = &traf.trun[0];
    assert_eq!(trun.data_offset, 116);
    assert_eq!(
        trun.samples.iter().map(|s| s.size).collect::<Vec<_>>(),
        vec![10, 6]
    );

    assert_eq!(encode(&file), bytes);
}

#[test]
fn deferred_media_data_needs_its_source() {
    let mut bytes = minimal_file();
    bytes.extend_from_slice(&bx(b"mdat", &[0x42; 64]));

    let options = DecodeOptions {
        mdat: MdatPolicy::Defer,
    };
    let file = Mp4File::decode_with(&mut Cursor::new(&bytes), options).expect("decode");
    let mdat = &file.mdat[0];
    assert!(mdat.is_deferred());
    assert_eq!(
        mdat.payload,
        MdatPayload::Deferred {
            offset: minimal_file().len() as u64 + 8,
            len: 64,
        }
    );
    assert_eq!(mdat.size(), 72);

    let err = file.encode(&mut std::io::sink()).unwrap_err();
    assert!(matches!(err, Error::DeferredPayload));

    let mut out = Vec::<u8>::new();
    file.encode_from(&mut Cursor::new(&bytes), &mut out)
        .expect("encode from source");
    assert_eq!(out, bytes);
}

#[test]
fn deferred_media_data_follows_a_hoisted_moov() {
    let ftyp_len = ftyp().len() as u32;
    let bytes = [
        ftyp(),
        bx(b"mdat", &[1, 2, 3, 4, 5, 6, 7, 8]),
        moov(&[mvhd(), trak_with_stco(&[ftyp_len + 8])]),
    ]
    .concat();
    let options = DecodeOptions {
        mdat: MdatPolicy::Defer,
    };
    let file = Mp4File::decode_with(&mut Cursor::new(&bytes), options).expect("decode");

    let mut out = Vec::<u8>::new();
    file.encode_from(&mut Cursor::new(&bytes), &mut out).expect("encode");
    let buffered = decode(&mut bytes.as_slice()).expect("decode");
    assert_eq!(out, encode(&buffered));
}

#[test]
fn dump_lists_every_box() {
    let file = decode(&mut minimal_file().as_slice()).expect("decode");
    let text = file.dump();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].contains("ftyp (File Type Box) major=isom minor=512 compatible=[isom]"));
    assert!(lines[1].contains("moov (Movie Box)"));
    assert!(lines[2].starts_with("  "));
    assert!(lines[2].contains("mvhd (Movie Header Box)"));
    assert!(lines[2].contains("timescale=1000"));
    assert!(lines[3].contains("trak (Track Box)"));
    assert!(lines[4].starts_with("    "));
    assert!(lines[4].contains("tkhd (Track Header Box)"));

    // Offsets: ftyp at 0, moov at 20, mvhd right after the moov header.
    assert!(lines[0].trim_start().starts_with("0x0 "));
    assert!(lines[1].trim_start().starts_with("0x14 "));
    assert!(lines[2].trim_start().starts_with("0x1c "));

    let shallow = file.dump_depth(1);
    assert_eq!(shallow.lines().count(), 2);
}

#[test]
fn decode_box_reads_any_single_box() {
    let b = decode_box(&ftyp()).expect("decode");
    match b {
        Mp4Box::Ftyp(f) => {
            assert!(!f.is_segment_type());
            assert_eq!(f.major_brand, FourCC::new(b"isom"));
        }
        other => panic!("expected ftyp, got {:?}", other.box_type()),
    }
}
