mod common;

use common::*;
use mp4tree::box_types::{TfhdBox, TrunBox, TrunSample};
use mp4tree::{Error, FullBoxHeader, Mp4Atom, Mp4Box, decode_box, encode_box};

const TFHD_BITS: [(u32, u64); 5] = [
    (TfhdBox::BASE_DATA_OFFSET_PRESENT, 8),
    (TfhdBox::SAMPLE_DESCRIPTION_INDEX_PRESENT, 4),
    (TfhdBox::DEFAULT_SAMPLE_DURATION_PRESENT, 4),
    (TfhdBox::DEFAULT_SAMPLE_SIZE_PRESENT, 4),
    (TfhdBox::DEFAULT_SAMPLE_FLAGS_PRESENT, 4),
];

fn tfhd_with(flags: u32) -> TfhdBox {
    let on = |bit: u32| flags & bit != 0;
    TfhdBox {
        full: FullBoxHeader::new(0, flags),
        track_id: 7,
        base_data_offset: if on(TfhdBox::BASE_DATA_OFFSET_PRESENT) { 0x1_0000_0010 } else { 0 },
        sample_description_index: if on(TfhdBox::SAMPLE_DESCRIPTION_INDEX_PRESENT) { 2 } else { 0 },
        default_sample_duration: if on(TfhdBox::DEFAULT_SAMPLE_DURATION_PRESENT) { 3000 } else { 0 },
        default_sample_size: if on(TfhdBox::DEFAULT_SAMPLE_SIZE_PRESENT) { 512 } else { 0 },
        default_sample_flags: if on(TfhdBox::DEFAULT_SAMPLE_FLAGS_PRESENT) { 0x0101_0000 } else { 0 },
        ..Default::default()
    }
}

#[test]
fn tfhd_every_flag_combination() {
    for mask in 0u32..(1 << TFHD_BITS.len()) {
        let mut flags = 0;
        let mut expected = 8 + 4 + 4;
        for (i, (bit, width)) in TFHD_BITS.iter().enumerate() {
            if mask & (1 << i) != 0 {
                flags |= bit;
                expected += width;
            }
        }
        // The non-field bits ride along without changing the layout.
        if mask % 2 == 1 {
            flags |= TfhdBox::DURATION_IS_EMPTY;
        }
        if mask % 3 == 0 {
            flags |= TfhdBox::DEFAULT_BASE_IS_MOOF;
        }

        let tfhd = tfhd_with(flags);
        assert_eq!(tfhd.size(), expected, "flags {flags:#08x}");
        let bytes = encode_box(&tfhd).expect("encode");
        assert_eq!(bytes.len() as u64, expected, "flags {flags:#08x}");
        assert_eq!(decode_box(&bytes).expect("decode"), Mp4Box::Tfhd(tfhd), "flags {flags:#08x}");
    }
}

#[test]
fn tfhd_duration_only() {
    let tfhd = tfhd_with(TfhdBox::DEFAULT_SAMPLE_DURATION_PRESENT);
    assert_eq!(tfhd.size(), 20);
    let bytes = encode_box(&tfhd).expect("encode");
    let expected = bx(b"tfhd", &full(0, 0x08, &[&u32b(7)[..], &u32b(3000)].concat()));
    assert_eq!(bytes, expected);
}

const TRUN_BITS: [u32; 6] = [
    TrunBox::DATA_OFFSET_PRESENT,
    TrunBox::FIRST_SAMPLE_FLAGS_PRESENT,
    TrunBox::SAMPLE_DURATION_PRESENT,
    TrunBox::SAMPLE_SIZE_PRESENT,
    TrunBox::SAMPLE_FLAGS_PRESENT,
    TrunBox::SAMPLE_COMPOSITION_TIME_OFFSET_PRESENT,
];

fn trun_with(version: u8, flags: u32, count: u32) -> TrunBox {
    let on = |bit: u32| flags & bit != 0;
    // Samples without fields are carried as a bare count.
    let implicit = flags & 0xf00 == 0;
    let samples = (0..if implicit { 0 } else { count })
        .map(|i| TrunSample {
            duration: if on(TrunBox::SAMPLE_DURATION_PRESENT) { 1000 + i } else { 0 },
            size: if on(TrunBox::SAMPLE_SIZE_PRESENT) { 400 * (i + 1) } else { 0 },
            flags: if on(TrunBox::SAMPLE_FLAGS_PRESENT) { 0x0001_0000 * (i % 2) } else { 0 },
            composition_time_offset: if on(TrunBox::SAMPLE_COMPOSITION_TIME_OFFSET_PRESENT) {
                if version == 1 { -(i as i32) * 512 } else { (i as i32) * 512 }
            } else {
                0
            },
        })
        .collect();
    TrunBox {
        full: FullBoxHeader::new(version, flags),
        data_offset: if on(TrunBox::DATA_OFFSET_PRESENT) { -8 } else { 0 },
        first_sample_flags: if on(TrunBox::FIRST_SAMPLE_FLAGS_PRESENT) { 0x0200_0000 } else { 0 },
        samples,
        implicit_sample_count: if implicit { count } else { 0 },
        ..Default::default()
    }
}

#[test]
fn trun_every_flag_combination() {
    for version in [0u8, 1] {
        for mask in 0u32..(1 << TRUN_BITS.len()) {
            let flags = TRUN_BITS
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .fold(0u32, |acc, (_, bit)| acc | *bit);
            let trun = trun_with(version, flags, 3);

            let header_fields = 4 * (flags & 0x5).count_ones() as u64;
            let per_sample = 4 * (flags & 0xf00).count_ones() as u64;
            let expected = 8 + 4 + 4 + header_fields + 3 * per_sample;
            assert_eq!(trun.sample_width(), per_sample);
            assert_eq!(trun.size(), expected, "v{version} flags {flags:#08x}");

            let bytes = encode_box(&trun).expect("encode");
            assert_eq!(bytes.len() as u64, expected, "v{version} flags {flags:#08x}");
            assert_eq!(
                decode_box(&bytes).expect("decode"),
                Mp4Box::Trun(trun),
                "v{version} flags {flags:#08x}"
            );
        }
    }
}

#[test]
fn trun_field_order_on_the_wire() {
    let trun = trun_with(
        1,
        TrunBox::DATA_OFFSET_PRESENT
            | TrunBox::SAMPLE_SIZE_PRESENT
            | TrunBox::SAMPLE_COMPOSITION_TIME_OFFSET_PRESENT,
        2,
    );
    let bytes = encode_box(&trun).expect("encode");
    let mut body = Vec::new();
    body.extend_from_slice(&u32b(2)); // sample_count
    body.extend_from_slice(&(-8i32).to_be_bytes()); // data_offset
    body.extend_from_slice(&u32b(400));
    body.extend_from_slice(&0i32.to_be_bytes());
    body.extend_from_slice(&u32b(800));
    body.extend_from_slice(&(-512i32).to_be_bytes());
    assert_eq!(bytes, bx(b"trun", &full(1, 0x000a01, &body)));
}

#[test]
fn trun_without_sample_fields_keeps_its_count() {
    let bytes = bx(b"trun", &full(0, 0, &u32b(5)));
    match decode_box(&bytes).expect("decode") {
        Mp4Box::Trun(t) => {
            assert!(t.samples.is_empty());
            assert_eq!(t.implicit_sample_count, 5);
            assert_eq!(t.sample_count().expect("count"), 5);
            assert_eq!(encode_box(&t).expect("encode"), bytes);
        }
        other => panic!("expected trun, got {:?}", other.box_type()),
    }
}

#[test]
fn trun_maximum_implicit_count_round_trips() {
    let body = [&u32b(u32::MAX)[..], &(-8i32).to_be_bytes()].concat();
    let bytes = bx(b"trun", &full(0, TrunBox::DATA_OFFSET_PRESENT, &body));
    let decoded = decode_box(&bytes).expect("decode");
    match &decoded {
        Mp4Box::Trun(t) => {
            assert!(t.samples.is_empty());
            assert_eq!(t.implicit_sample_count, u32::MAX);
            assert_eq!(t.data_offset, -8);
        }
        other => panic!("expected trun, got {:?}", other.box_type()),
    }
    assert_eq!(encode_box(&decoded).expect("encode"), bytes);
}

#[test]
fn trun_explicit_samples_take_precedence_over_the_implicit_count() {
    let trun = TrunBox {
        full: FullBoxHeader::new(0, TrunBox::SAMPLE_SIZE_PRESENT),
        samples: vec![TrunSample { size: 10, ..Default::default() }],
        implicit_sample_count: 99,
        ..Default::default()
    };
    assert_eq!(trun.sample_count().expect("count"), 1);
    let bytes = encode_box(&trun).expect("encode");
    assert_eq!(&bytes[12..16], &u32b(1));
}

#[test]
fn trun_count_larger_than_payload_is_rejected() {
    let body = [&u32b(1000)[..], &u32b(1), &u32b(2)].concat();
    let bytes = bx(b"trun", &full(0, TrunBox::SAMPLE_SIZE_PRESENT, &body));
    let err = decode_box(&bytes).unwrap_err();
    assert!(matches!(err.root_cause(), Error::BadFormat(_)));
}
