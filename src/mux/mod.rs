//! Progressive MP4 assembly: `ftyp`, `moov`, `mdat`.
//!
//! Chunk offsets in `stco` point into `mdat`, which follows `moov`, so the
//! offsets depend on the encoded size of the box that holds them. The
//! muxer builds `moov` once with placeholder offsets to measure it, then
//! again with the real ones. Offsets are fixed-width, so both passes have
//! the same size.

mod track;

pub use track::VideoTrack;

use crate::config::Config;
use anyhow::{Context, Result};
use mp4forge_media::{
    builders::{self, BitrateHint, EditEntry, TrackFlags, TrackHeader, VideoTrak, VisualSampleEntry},
    compute_size, serialize_all,
    tables::derive_uniform_duration,
    BoxNode, FourCc, SampleTables,
};
use std::path::Path;

/// Size of the `mdat` header preceding the sample data.
const MDAT_HEADER_SIZE: u64 = 8;

pub struct Muxer {
    config: Config,
}

impl Muxer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Encode a complete single-track file.
    pub fn mux(&self, track: &VideoTrack) -> Result<Vec<u8>> {
        track.validate()?;
        let video = &self.config.video;

        if video.constant_frame_rate {
            derive_uniform_duration(&track.samples).context("Constant frame rate required")?;
        }

        let tables = SampleTables::derive(&track.samples, video.chunk_policy)
            .context("Failed to derive sample tables")?;

        let (major, compatible) = self.config.file.brands()?;
        let ftyp = builders::ftyp(major, self.config.file.minor_version, &compatible);
        let entry = self.sample_entry(track);
        let layout = Layout::new(&self.config, track, &tables)?;

        let placeholder = layout.moov(&entry, &tables, &vec![0; tables.chunks.len()])?;
        let moov_size = compute_size(&placeholder);
        let data_start = compute_size(&ftyp) + moov_size + MDAT_HEADER_SIZE;

        let offsets = tables
            .chunk_offsets(data_start)
            .context("Sample data does not fit 32-bit chunk offsets")?;
        let moov = layout.moov(&entry, &tables, &offsets)?;
        if compute_size(&moov) != moov_size {
            anyhow::bail!(
                "moov size changed between passes ({} then {} bytes)",
                moov_size,
                compute_size(&moov)
            );
        }

        let bytes = serialize_all(&[ftyp, moov, builders::mdat(&track.payload)])
            .context("Failed to serialize file")?;

        tracing::debug!(
            samples = tables.sample_count(),
            chunks = tables.chunks.len(),
            moov_size,
            data_start,
            total = bytes.len(),
            "muxed video track"
        );
        Ok(bytes)
    }

    /// Encode and write to `path`.
    pub fn mux_to_file(&self, track: &VideoTrack, path: &Path) -> Result<()> {
        let bytes = self.mux(track)?;
        std::fs::write(path, &bytes).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::info!("Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }

    fn sample_entry(&self, track: &VideoTrack) -> VisualSampleEntry {
        let video = &self.config.video;
        let mut entry = VisualSampleEntry::new(track.codec.clone(), track.width, track.height)
            .with_compressor_name(video.compressor_name.clone());
        if let Some([h, v]) = video.pixel_aspect {
            entry = entry.with_pixel_aspect(h, v);
        }
        if video.bitrate_hint {
            entry = entry.with_bitrate(BitrateHint::from_samples(&track.samples, track.timescale));
        }
        entry
    }
}

/// Everything in `moov` that does not depend on chunk offsets.
struct Layout<'a> {
    config: &'a Config,
    track: &'a VideoTrack,
    language: u16,
    media_duration: u32,
    movie_duration: u32,
    edit: Option<EditEntry>,
}

impl<'a> Layout<'a> {
    fn new(config: &'a Config, track: &'a VideoTrack, tables: &SampleTables) -> Result<Self> {
        let language = builders::pack_language(&config.video.language)?;
        let media_duration = tables.total_duration();
        let movie_duration = rescale(media_duration, track.timescale, config.movie.timescale);

        let edit = if config.video.edit_list {
            let first_pts = track.samples.iter().map(|s| s.pts).min().unwrap_or(0);
            let media_time = first_pts.saturating_sub(track.samples[0].dts);
            Some(EditEntry {
                segment_duration: narrow(movie_duration, "Movie duration")?,
                media_time: narrow(media_time, "Edit media time")?,
            })
        } else {
            None
        };

        Ok(Self {
            config,
            track,
            language,
            media_duration: narrow(media_duration, "Media duration")?,
            movie_duration: narrow(movie_duration, "Movie duration")?,
            edit,
        })
    }

    fn moov(&self, entry: &VisualSampleEntry, tables: &SampleTables, offsets: &[u32]) -> Result<BoxNode> {
        let video = &self.config.video;
        let trak = VideoTrak {
            header: TrackHeader {
                track_id: video.track_id,
                duration: self.movie_duration,
                width: self.track.width,
                height: self.track.height,
                flags: TrackFlags {
                    enabled: video.track_enabled,
                    in_movie: video.track_in_movie,
                    in_preview: video.track_in_preview,
                },
            },
            media_timescale: self.track.timescale,
            media_duration: self.media_duration,
            language: self.language,
            handler_name: &video.handler_name,
            edit: self.edit,
            entry,
            tables,
            chunk_offsets: offsets,
        }
        .to_box()
        .context("Failed to build video track")?;

        let mvhd = builders::mvhd(
            self.config.movie.timescale,
            self.movie_duration,
            video.track_id.saturating_add(1),
        );
        Ok(builders::moov(mvhd, [trak]))
    }
}

/// Convert `value` ticks from one timescale to another, rounding to nearest.
fn rescale(value: u64, from: u32, to: u32) -> u64 {
    if from == to {
        return value;
    }
    let scaled = (value as u128 * to as u128 + from as u128 / 2) / from as u128;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

fn narrow(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow::anyhow!("{} {} exceeds 32 bits", what, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp4forge_media::builders::CodecConfig;

    fn track(count: usize) -> VideoTrack {
        let mut track = VideoTrack::new(CodecConfig::Avc(vec![1, 0x42, 0, 0x1e]), 64, 48, 30000);
        for i in 0..count {
            track.push_sample(&vec![i as u8; 10 + i], 1001, 0, i == 0).unwrap();
        }
        track
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale(30030, 30000, 1000), 1001);
        assert_eq!(rescale(1, 3, 1000), 333);
        assert_eq!(rescale(2, 3, 1000), 667);
        assert_eq!(rescale(42, 1000, 1000), 42);
    }

    #[test]
    fn test_mux_layout_order() {
        let bytes = Muxer::new(Config::default()).mux(&track(3)).unwrap();
        let root = mp4forge_media::open_container(&bytes).unwrap();
        let types: Vec<FourCc> = root.children().map(|c| c.box_type).collect();
        assert_eq!(types, vec![FourCc::FTYP, FourCc::MOOV, FourCc::MDAT]);
    }

    #[test]
    fn test_constant_frame_rate_enforced() {
        let mut config = Config::default();
        config.video.constant_frame_rate = true;
        let mut t = track(2);
        t.push_sample(&[0; 4], 2002, 0, false).unwrap();
        assert!(Muxer::new(config).mux(&t).is_err());
    }

    #[test]
    fn test_edit_list_media_time() {
        let mut t = VideoTrack::new(CodecConfig::Avc(vec![1]), 16, 16, 1000);
        t.push_sample(&[0; 2], 40, 80, true).unwrap();
        t.push_sample(&[0; 2], 40, 80, false).unwrap();
        let config = Config::default();
        let tables = SampleTables::derive(&t.samples, config.video.chunk_policy).unwrap();
        let layout = Layout::new(&config, &t, &tables).unwrap();
        assert_eq!(layout.edit, Some(EditEntry { segment_duration: 80, media_time: 80 }));
    }
}
