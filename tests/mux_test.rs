//! End-to-end muxing tests: mux a track, read it back, compare.

use mp4forge::{mux::Muxer, Config, VideoTrack};
use mp4forge_media::{
    builders::CodecConfig,
    container::LayoutRegistry,
    inspect::read_video_track,
    open_container, ChunkPolicy, FourCc,
};

const AVCC: &[u8] = &[
    0x01, 0x64, 0x00, 0x1f, 0xff, 0xe1, 0x00, 0x04, 0x67, 0x64, 0x00, 0x1f, 0x01, 0x00, 0x04,
    0x68, 0xeb, 0xe3, 0xcb,
];

/// 24000/1001 fps, keyframe every 4 samples, B-frame style offsets.
fn make_track(count: usize, reorder: bool) -> VideoTrack {
    let mut track = VideoTrack::new(CodecConfig::Avc(AVCC.to_vec()), 1280, 720, 24000);
    for i in 0..count {
        let data = vec![(i % 251) as u8; 200 + (i * 37) % 900];
        let offset = if reorder && i % 2 == 1 { 2002 } else { 0 };
        track.push_sample(&data, 1001, offset, i % 4 == 0).unwrap();
    }
    track
}

fn top_level(bytes: &[u8]) -> Vec<FourCc> {
    open_container(bytes).unwrap().children().map(|c| c.box_type).collect()
}

fn stbl_children(bytes: &[u8]) -> Vec<FourCc> {
    let registry = LayoutRegistry::standard();
    let root = open_container(bytes).unwrap();
    let stbl = root
        .find_container("moov/trak/mdia/minf/stbl", &registry)
        .unwrap()
        .unwrap();
    stbl.children().map(|c| c.box_type).collect()
}

#[test]
fn test_mux_round_trip_one_per_chunk() {
    let track = make_track(20, true);
    let bytes = Muxer::new(Config::default()).mux(&track).unwrap();
    assert_eq!(top_level(&bytes), vec![FourCc::FTYP, FourCc::MOOV, FourCc::MDAT]);

    let tables = read_video_track(&bytes).unwrap();
    assert_eq!(tables.track_id, 1);
    assert_eq!(tables.track_flags, 0x3);
    assert_eq!((tables.width, tables.height), (1280, 720));
    assert_eq!(tables.media_timescale, 24000);
    assert_eq!(tables.movie_timescale, 1000);
    assert_eq!(tables.media_duration, 20 * 1001);
    assert_eq!(tables.codec_config, AVCC);
    assert_eq!(tables.chunk_offsets.len(), 20);

    let resolved = tables.resolve_samples().unwrap();
    for (located, original) in resolved.iter().zip(&track.samples) {
        assert_eq!(located.sample, *original);
    }

    // Every sample's bytes in the file match the input payload.
    let mut cursor = 0usize;
    for (located, original) in resolved.iter().zip(&track.samples) {
        let start = located.offset as usize;
        let size = original.size as usize;
        assert_eq!(&bytes[start..start + size], &track.payload[cursor..cursor + size]);
        cursor += size;
    }
}

#[test]
fn test_first_chunk_offset_points_past_mdat_header() {
    let bytes = Muxer::new(Config::default()).mux(&make_track(3, false)).unwrap();
    let root = open_container(&bytes).unwrap();
    let mdat = root.find_child(FourCc::MDAT).unwrap();
    let tables = read_video_track(&bytes).unwrap();
    assert_eq!(tables.chunk_offsets[0], mdat.data_offset() as u64);
}

#[test]
fn test_all_in_one_chunk() {
    let mut config = Config::default();
    config.video.chunk_policy = ChunkPolicy::AllInOneChunk;
    let track = make_track(9, false);
    let bytes = Muxer::new(config).mux(&track).unwrap();

    let tables = read_video_track(&bytes).unwrap();
    assert_eq!(tables.chunk_offsets.len(), 1);
    assert_eq!(tables.sample_to_chunk.len(), 1);
    assert_eq!(tables.sample_to_chunk[0].samples_per_chunk, 9);
    let resolved = tables.resolve_samples().unwrap();
    assert_eq!(resolved.last().unwrap().offset + track.samples[8].size as u64, bytes.len() as u64);
}

#[test]
fn test_optional_tables_omitted() {
    let mut track = VideoTrack::new(CodecConfig::Avc(AVCC.to_vec()), 64, 64, 1000);
    for _ in 0..5 {
        track.push_sample(&[7; 32], 40, 0, true).unwrap();
    }
    let bytes = Muxer::new(Config::default()).mux(&track).unwrap();
    let children = stbl_children(&bytes);
    assert!(!children.contains(&FourCc::CTTS));
    assert!(!children.contains(&FourCc::STSS));

    let tables = read_video_track(&bytes).unwrap();
    assert!(tables.sync_samples.is_none());
    assert_eq!(tables.sizes, mp4forge_media::tables::SampleSizes::Uniform { size: 32, count: 5 });
}

#[test]
fn test_optional_tables_present() {
    let bytes = Muxer::new(Config::default()).mux(&make_track(8, true)).unwrap();
    let children = stbl_children(&bytes);
    assert_eq!(
        children,
        vec![
            FourCc::STSD,
            FourCc::STTS,
            FourCc::CTTS,
            FourCc::STSC,
            FourCc::STSZ,
            FourCc::STCO,
            FourCc::STSS,
        ]
    );
    let tables = read_video_track(&bytes).unwrap();
    assert_eq!(tables.sync_samples, Some(vec![1, 5]));
}

#[test]
fn test_config_flags_reach_tkhd() {
    let mut config = Config::default();
    config.video.track_in_preview = true;
    config.video.track_id = 7;
    let bytes = Muxer::new(config).mux(&make_track(2, false)).unwrap();
    let tables = read_video_track(&bytes).unwrap();
    assert_eq!(tables.track_flags, 0x7);
    assert_eq!(tables.track_id, 7);
}

#[test]
fn test_hevc_track() {
    let mut track = VideoTrack::new(CodecConfig::Hevc(vec![1u8; 23]), 3840, 2160, 60000);
    track.push_sample(&[0; 64], 1001, 0, true).unwrap();
    let mut config = Config::default();
    config.video.pixel_aspect = Some([1, 1]);
    let bytes = Muxer::new(config).mux(&track).unwrap();
    let tables = read_video_track(&bytes).unwrap();
    assert_eq!(tables.codec, FourCc::HVC1);
    assert_eq!(tables.codec_config, vec![1u8; 23]);
}

#[test]
fn test_mux_rejects_bad_tracks() {
    let muxer = Muxer::new(Config::default());
    let empty = VideoTrack::new(CodecConfig::Avc(AVCC.to_vec()), 16, 16, 1000);
    assert!(muxer.mux(&empty).is_err());

    let mut truncated = make_track(3, false);
    truncated.payload.truncate(10);
    assert!(muxer.mux(&truncated).is_err());

    let mut negative = make_track(2, false);
    negative.samples[1].pts = 0;
    let err = muxer.mux(&negative).unwrap_err();
    assert!(format!("{:#}", err).contains("negative composition offsets"));
}
