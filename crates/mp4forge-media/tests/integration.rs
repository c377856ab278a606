//! Integration tests for mp4forge-media

use assert_matches::assert_matches;
use mp4forge_media::{
    boxes::{parse_box_str, BoxNode, Field, FourCc, Width},
    builders::{self, CodecConfig, TrackFlags, TrackHeader, VideoTrak, VisualSampleEntry},
    container::LayoutRegistry,
    inspect::read_video_track,
    open_container, serialize, serialize_all,
    tables::{self, samples_from_durations, ChunkPolicy, RunLengthEntry, Sample, SampleTables},
    Error, Violation,
};

fn xorshift(state: &mut u32) -> u32 {
    *state ^= *state << 13;
    *state ^= *state >> 17;
    *state ^= *state << 5;
    *state
}

/// Build a box whose children carry only fixed-width and array fields.
fn random_tree(state: &mut u32, child_count: usize) -> (BoxNode, Vec<(FourCc, u64)>) {
    let mut parent = BoxNode::new(*b"moov");
    let mut declared = Vec::new();
    for i in 0..child_count {
        let code = FourCc::from([b'a' + (i % 26) as u8, b'b', b'o', b'x']);
        let mut child = if xorshift(state) % 2 == 0 {
            BoxNode::new(code)
        } else {
            BoxNode::full(code, 0, 0)
        };
        for _ in 0..xorshift(state) % 4 {
            child.push_field(match xorshift(state) % 4 {
                0 => Field::u8(xorshift(state) as u8),
                1 => Field::u16(xorshift(state) as u16),
                2 => Field::u32(xorshift(state)),
                _ => Field::array(Width::U16, vec![7; (xorshift(state) % 5) as usize]),
            });
        }
        declared.push((code, mp4forge_media::compute_size(&child)));
        parent.push_child(child);
    }
    (parent, declared)
}

/// Test that enumerating an encoded box yields the declared children
#[test]
fn test_round_trip_children_offsets() {
    let mut state = 0x9E37_79B9;
    for child_count in [1usize, 2, 5, 12] {
        let (node, declared) = random_tree(&mut state, child_count);
        let bytes = serialize(&node).unwrap();
        let container = open_container(&bytes).unwrap();
        let children = container.enumerate_children();

        assert_eq!(children.len(), declared.len());
        let mut expected_offset = 8;
        for (child, (code, size)) in children.iter().zip(&declared) {
            assert_eq!(child.box_type, *code);
            assert_eq!(child.size, *size);
            assert_eq!(child.offset, expected_offset);
            expected_offset += *size as usize;
        }
    }
}

/// Test a top-level sequence starting with ftyp is read as a root
#[test]
fn test_file_level_sequence() {
    let isom = FourCc::from(*b"isom");
    let bytes = serialize_all(&[
        builders::ftyp(isom, 512, &[isom]),
        BoxNode::new(FourCc::FREE),
        builders::mdat(&[1, 2, 3]),
    ])
    .unwrap();
    let root = open_container(&bytes).unwrap();
    assert!(root.is_root());
    let types: Vec<FourCc> = root.children().map(|c| c.box_type).collect();
    assert_eq!(types, vec![FourCc::FTYP, FourCc::FREE, FourCc::MDAT]);
}

/// Test that raw opaque bytes are copied, not aliased
#[test]
fn test_opaque_payload_copied_on_ingest() {
    let mut payload = vec![0xAA; 16];
    let node = builders::mdat(&payload);
    payload.iter_mut().for_each(|b| *b = 0);
    let bytes = serialize(&node).unwrap();
    assert!(bytes[8..].iter().all(|&b| b == 0xAA));
}

/// Test that an unwrapped box in a body is rejected at any depth
#[test]
fn test_unwrapped_box_in_body_rejected_at_depth() {
    let bare = r#"{"type": "xxxx", "body": [{"u8": 1}]}"#;
    let mut json = format!(r#"{{"type": "leaf", "body": [{bare}]}}"#);
    for depth in 0..4 {
        let result = parse_box_str(&json);
        assert_matches!(
            result,
            Err(Error::Structural { violation: Violation::RawBoxInBody, .. }),
            "depth {depth}"
        );
        json = format!(r#"{{"type": "wrap", "children": [{json}]}}"#);
    }
}

/// Test setting a flag that has no bit mapping
#[test]
fn test_unknown_flag_rejected() {
    let json = r#"{"type": "tkhd", "version": 0, "flags": {"visible": true}, "flagBits": {"enabled": 1}}"#;
    let err = parse_box_str(json).unwrap_err();
    assert_eq!(err.violation(), Some(&Violation::UnknownFlagBit("visible".into())));
}

/// Test the derivation scenarios end to end
#[test]
fn test_derivation_scenarios() {
    let samples = samples_from_durations(&[512, 512, 512, 256, 256, 512], &[1; 6]);
    assert_eq!(
        tables::derive_duration_table(&samples).unwrap(),
        vec![RunLengthEntry::new(3, 512), RunLengthEntry::new(2, 256), RunLengthEntry::new(1, 512)]
    );

    let samples = samples_from_durations(&[5, 7], &[10, 20]);
    let chunks = tables::derive_chunks(&samples, ChunkPolicy::OnePerChunk);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].byte_len(), 10);
    assert_eq!(chunks[1].duration(), 7);

    let samples = samples_from_durations(&[1; 2], &[30, 30]);
    let chunks = tables::derive_chunks(&samples, ChunkPolicy::OnePerChunk);
    assert_eq!(tables::derive_chunk_offsets(&chunks, 100), vec![100, 130]);

    let samples: Vec<Sample> = samples_from_durations(&[512; 6], &[1; 6])
        .into_iter()
        .zip([0u64, 0, 512, 512, 512, 0])
        .map(|(s, offset)| s.with_pts(s.dts + offset))
        .collect();
    assert_eq!(
        tables::derive_composition_table(&samples).unwrap(),
        vec![RunLengthEntry::new(2, 0), RunLengthEntry::new(3, 512), RunLengthEntry::new(1, 0)]
    );

    let samples: Vec<Sample> = [true, false, false, true, false, true]
        .into_iter()
        .enumerate()
        .map(|(i, key)| Sample::new(i as u64, 1, 1).with_keyframe(key))
        .collect();
    assert_eq!(tables::derive_sync_samples(&samples), vec![1, 4, 6]);
}

/// Test that a built track reads back to the same samples
#[test]
fn test_built_track_reads_back() {
    let samples: Vec<Sample> = samples_from_durations(&[3003; 6], &[900, 120, 80, 700, 110, 95])
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let offset = if i % 3 == 1 { 6006 } else { 0 };
            s.with_pts(s.dts + offset).with_keyframe(i % 3 == 0)
        })
        .collect();
    let payload: Vec<u8> = samples
        .iter()
        .enumerate()
        .flat_map(|(i, s)| std::iter::repeat(i as u8).take(s.size as usize))
        .collect();

    let tables = SampleTables::derive(&samples, ChunkPolicy::OnePerChunk).unwrap();
    let entry = VisualSampleEntry::new(CodecConfig::Avc(vec![1, 0x64, 0, 0x28]), 1920, 1080);
    let isom = FourCc::from(*b"isom");
    let ftyp = builders::ftyp(isom, 512, &[isom]);

    let build = |offsets: &[u32]| {
        let trak = VideoTrak {
            header: TrackHeader {
                track_id: 1,
                duration: 601,
                width: 1920,
                height: 1080,
                flags: TrackFlags::default(),
            },
            media_timescale: 30000,
            media_duration: 18018,
            language: builders::pack_language("und").unwrap(),
            handler_name: "VideoHandler",
            edit: None,
            entry: &entry,
            tables: &tables,
            chunk_offsets: offsets,
        };
        builders::moov(builders::mvhd(1000, 601, 2), [trak.to_box().unwrap()])
    };
    let placeholder = build(&vec![0; tables.chunks.len()]);
    let data_start = mp4forge_media::compute_size(&ftyp) + mp4forge_media::compute_size(&placeholder) + 8;
    let offsets = tables.chunk_offsets(data_start).unwrap();
    let file = serialize_all(&[ftyp, build(&offsets), builders::mdat(&payload)]).unwrap();

    let track = read_video_track(&file).unwrap();
    assert_eq!(track.codec, FourCc::AVC1);
    assert_eq!((track.width, track.height), (1920, 1080));
    assert_eq!(track.media_timescale, 30000);
    assert_eq!(track.codec_config, vec![1, 0x64, 0, 0x28]);

    let resolved = track.resolve_samples().unwrap();
    assert_eq!(resolved.len(), samples.len());
    for (located, original) in resolved.iter().zip(&samples) {
        assert_eq!(located.sample, *original);
        let start = located.offset as usize;
        let index = original.dts / 3003;
        assert!(file[start..start + original.size as usize]
            .iter()
            .all(|&b| b as u64 == index));
    }
}

/// Test the heuristic alone cannot see inside stsd but the registry can
#[test]
fn test_registry_resolves_sample_description() {
    let entry = VisualSampleEntry::new(CodecConfig::Hevc(vec![1; 30]), 1280, 720);
    let bytes = serialize(&builders::stsd(&entry).unwrap()).unwrap();
    let registry = LayoutRegistry::standard();
    let stsd = mp4forge_media::Container::open_with(&bytes, &registry).unwrap();
    let entries = stsd.enumerate_children();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].box_type, FourCc::HVC1);
}
