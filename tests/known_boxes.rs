mod common;

use mp4tree::util::describe;
use mp4tree::{FourCC, KnownBox, decode_box, encode_box};

#[test]
fn known_box_from_ftyp() {
    let kb = KnownBox::from(FourCC(*b"ftyp"));
    assert!(matches!(kb, KnownBox::Ftyp));
    assert_eq!(kb.full_name(), "File Type Box");
}

#[test]
fn known_box_classifies_container() {
    for typ in [b"moov", b"trak", b"stbl", b"moof", b"traf", b"mfra", b"meta"] {
        assert!(KnownBox::from(FourCC(*typ)).is_container(), "{:?}", typ);
    }
    assert!(!KnownBox::from(FourCC(*b"ftyp")).is_container());
    assert!(!KnownBox::from(FourCC(*b"stsd")).is_container());
}

#[test]
fn known_box_classifies_full_box() {
    for typ in [b"mvhd", b"tfhd", b"trun", b"sidx", b"iloc", b"iods"] {
        assert!(KnownBox::from(FourCC(*typ)).is_full_box(), "{:?}", typ);
    }
    assert!(!KnownBox::from(FourCC(*b"mdat")).is_full_box());
    assert!(!KnownBox::from(FourCC(*b"moov")).is_full_box());
}

#[test]
fn url_type_includes_the_space() {
    assert!(matches!(KnownBox::from(FourCC(*b"url ")), KnownBox::Url));
    assert!(matches!(KnownBox::from(FourCC(*b"urn ")), KnownBox::Unknown(_)));
}

#[test]
fn unknown_types_keep_their_code() {
    let kb = KnownBox::from(FourCC(*b"avc1"));
    assert_eq!(kb, KnownBox::Unknown(FourCC(*b"avc1")));
    assert_eq!(kb.full_name(), "Unknown Box");
}

#[test]
fn decoded_box_reports_its_kind() {
    let b = decode_box(&common::bx(b"free", &[0; 4])).expect("decode");
    assert_eq!(b.kind(), KnownBox::Free);
    let b = decode_box(&common::bx(b"skip", &[])).expect("decode");
    assert_eq!(b.kind(), KnownBox::Skip);
}

#[test]
fn padded_four_character_codes() {
    assert_eq!(FourCC::padded("url"), FourCC(*b"url "));
    assert_eq!(FourCC::padded("stsdx"), FourCC(*b"stsd"));
    assert_eq!(FourCC::from_str("moov"), Some(FourCC(*b"moov")));
    assert_eq!(FourCC::from_str("moo"), None);
    assert_eq!(FourCC([0x00, b'a', 0xff, b'b']).to_string(), ".a.b");
}

#[test]
fn describe_reads_version_and_flags_of_full_boxes() {
    let stco = decode_box(&common::stco(&[1, 2])).expect("decode");
    let bytes = encode_box(&stco).expect("encode");
    assert_eq!(
        describe(&stco, &bytes[8..]),
        "stco (Chunk Offset Box) version=0 flags=0x000000"
    );
}

#[test]
fn describe_counts_container_children() {
    let trak = decode_box(&common::trak_with_stco(&[0])).expect("decode");
    let bytes = encode_box(&trak).expect("encode");
    assert_eq!(describe(&trak, &bytes[8..]), "trak (Track Box) children=2");

    let free = decode_box(&common::bx(b"free", &[1, 2, 3, 4])).expect("decode");
    assert_eq!(describe(&free, &[1, 2, 3, 4]), "free (Free Space Box)");
}
