use mp4tree::box_types::{SttsBox, SttsEntry, TfhdBox, TrunBox, TrunSample};
use mp4tree::{FullBoxHeader, Mp4Atom, Mp4Box, decode_box, encode_box};
use proptest::prelude::*;

const TFHD_FIELD_BITS: u32 = 0x00_003b;
const TRUN_FIELD_BITS: u32 = 0x00_0f05;
const TRUN_SAMPLE_BITS: u32 = 0x00_0f00;

fn arb_tfhd() -> impl Strategy<Value = TfhdBox> {
    (
        any::<u32>(),
        any::<u32>(),
        any::<u64>(),
        any::<[u32; 4]>(),
    )
        .prop_map(|(raw_flags, track_id, base, [sdi, dur, size, sflags])| {
            let flags = raw_flags & (TFHD_FIELD_BITS | TfhdBox::DURATION_IS_EMPTY | TfhdBox::DEFAULT_BASE_IS_MOOF);
            let keep = |bit: u32, v: u32| if flags & bit != 0 { v } else { 0 };
            TfhdBox {
                full: FullBoxHeader::new(0, flags),
                track_id,
                base_data_offset: if flags & TfhdBox::BASE_DATA_OFFSET_PRESENT != 0 { base } else { 0 },
                sample_description_index: keep(TfhdBox::SAMPLE_DESCRIPTION_INDEX_PRESENT, sdi),
                default_sample_duration: keep(TfhdBox::DEFAULT_SAMPLE_DURATION_PRESENT, dur),
                default_sample_size: keep(TfhdBox::DEFAULT_SAMPLE_SIZE_PRESENT, size),
                default_sample_flags: keep(TfhdBox::DEFAULT_SAMPLE_FLAGS_PRESENT, sflags),
                ..Default::default()
            }
        })
}

fn arb_trun() -> impl Strategy<Value = TrunBox> {
    (
        0u8..=1,
        any::<u32>(),
        any::<i32>(),
        any::<u32>(),
        prop::collection::vec(any::<(u32, u32, u32, i32)>(), 0..16),
    )
        .prop_map(|(version, raw_flags, data_offset, first_flags, raw_samples)| {
            let flags = raw_flags & TRUN_FIELD_BITS;
            let on = |bit: u32| flags & bit != 0;
            let implicit = flags & TRUN_SAMPLE_BITS == 0;
            let implicit_sample_count = if implicit { raw_samples.len() as u32 } else { 0 };
            let samples = raw_samples
                .into_iter()
                .filter(|_| !implicit)
                .map(|(duration, size, sflags, cto)| TrunSample {
                    duration: if on(TrunBox::SAMPLE_DURATION_PRESENT) { duration } else { 0 },
                    size: if on(TrunBox::SAMPLE_SIZE_PRESENT) { size } else { 0 },
                    flags: if on(TrunBox::SAMPLE_FLAGS_PRESENT) { sflags } else { 0 },
                    composition_time_offset: if on(TrunBox::SAMPLE_COMPOSITION_TIME_OFFSET_PRESENT) {
                        cto
                    } else {
                        0
                    },
                })
                .collect();
            TrunBox {
                full: FullBoxHeader::new(version, flags),
                data_offset: if on(TrunBox::DATA_OFFSET_PRESENT) { data_offset } else { 0 },
                first_sample_flags: if on(TrunBox::FIRST_SAMPLE_FLAGS_PRESENT) { first_flags } else { 0 },
                samples,
                implicit_sample_count,
                ..Default::default()
            }
        })
}

fn arb_stts() -> impl Strategy<Value = SttsBox> {
    prop::collection::vec(any::<(u32, u32)>(), 0..32).prop_map(|entries| SttsBox {
        full: FullBoxHeader::default(),
        entries: entries
            .into_iter()
            .map(|(sample_count, sample_delta)| SttsEntry {
                sample_count,
                sample_delta,
            })
            .collect(),
        ..Default::default()
    })
}

proptest! {
    #[test]
    fn tfhd_encodes_what_it_decodes(tfhd in arb_tfhd()) {
        let bytes = encode_box(&tfhd).unwrap();
        prop_assert_eq!(bytes.len() as u64, tfhd.size());
        prop_assert_eq!(decode_box(&bytes).unwrap(), Mp4Box::Tfhd(tfhd));
    }

    #[test]
    fn trun_encodes_what_it_decodes(trun in arb_trun()) {
        let bytes = encode_box(&trun).unwrap();
        let per_sample = 4 * (trun.full.flags & TRUN_SAMPLE_BITS).count_ones() as u64;
        prop_assert_eq!(trun.sample_width(), per_sample);
        prop_assert_eq!(bytes.len() as u64, trun.size());
        prop_assert_eq!(decode_box(&bytes).unwrap(), Mp4Box::Trun(trun));
    }

    #[test]
    fn stts_encodes_what_it_decodes(stts in arb_stts()) {
        let bytes = encode_box(&stts).unwrap();
        prop_assert_eq!(bytes.len() as u64, 16 + 8 * stts.entries.len() as u64);
        prop_assert_eq!(decode_box(&bytes).unwrap(), Mp4Box::Stts(stts));
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = mp4tree::decode(&mut bytes.as_slice());
        let _ = decode_box(&bytes);
    }
}
