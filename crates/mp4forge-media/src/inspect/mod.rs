//! Reading the video track back out of a progressive MP4.
//!
//! Only what a single-track file written by this crate needs: the track
//! and media headers, the sample description, and the sample tables.
//! Multi-entry `stsc` tables and `co64` are accepted so files from other
//! muxers can be inspected too.

mod tables;

pub use tables::{parse_co64, parse_ctts, parse_stco, parse_stsc, parse_stss, parse_stsz, parse_stts};

use crate::boxes::FourCc;
use crate::container::{open_container, Container, LayoutRegistry};
use crate::tables::{RunLengthEntry, Sample, SampleSizes, SampleToChunk};
use crate::{Error, Result};
use tables::TableReader;

/// Decoded tables of one video track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTables {
    pub track_id: u32,
    /// Track header flags.
    pub track_flags: u32,
    pub width: u16,
    pub height: u16,
    /// Movie timescale from `mvhd`.
    pub movie_timescale: u32,
    pub media_timescale: u32,
    pub media_duration: u64,
    /// Sample entry type, e.g. `avc1`.
    pub codec: FourCc,
    /// Decoder configuration record (payload of `avcC` / `hvcC`).
    pub codec_config: Vec<u8>,
    pub durations: Vec<RunLengthEntry<u32>>,
    pub composition_offsets: Vec<RunLengthEntry<u32>>,
    pub sample_to_chunk: Vec<SampleToChunk>,
    pub sizes: SampleSizes,
    pub chunk_offsets: Vec<u64>,
    /// `None` when `stss` is absent (every sample is a sync sample).
    pub sync_samples: Option<Vec<u32>>,
}

/// A sample with its absolute file offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LocatedSample {
    pub offset: u64,
    pub sample: Sample,
}

impl TrackTables {
    pub fn sample_count(&self) -> usize {
        self.sizes.sample_count()
    }

    /// Resolve every sample's timing, size, sync flag, and file offset.
    pub fn resolve_samples(&self) -> Result<Vec<LocatedSample>> {
        let count = self.sample_count();

        let timed: usize = self.durations.iter().map(|e| e.count as usize).sum();
        if timed != count {
            return Err(Error::malformed(
                FourCc::STTS,
                format!("covers {timed} samples, stsz has {count}"),
            ));
        }
        if !self.composition_offsets.is_empty() {
            let offset: usize = self.composition_offsets.iter().map(|e| e.count as usize).sum();
            if offset != count {
                return Err(Error::malformed(
                    FourCc::CTTS,
                    format!("covers {offset} samples, stsz has {count}"),
                ));
            }
        }
        let chunk_of = self.sample_chunks(count)?;

        let durations = crate::tables::expand(&self.durations);
        // No ctts means every composition offset is zero.
        let mut offsets = crate::tables::expand(&self.composition_offsets);
        offsets.resize(count, 0);
        let sync: Option<std::collections::HashSet<u32>> =
            self.sync_samples.as_ref().map(|s| s.iter().copied().collect());

        let mut samples = Vec::with_capacity(count);
        let mut dts = 0u64;
        let mut position = 0u64;
        let mut previous_chunk = None;
        for i in 0..count {
            let (chunk, description_index) = chunk_of[i];
            if previous_chunk != Some(chunk) {
                position = self.chunk_offsets[chunk];
                previous_chunk = Some(chunk);
            }
            let size = self.sizes.get(i).unwrap_or(0);
            let duration = durations[i] as u64;
            let is_keyframe = sync
                .as_ref()
                .map_or(true, |set| set.contains(&(i as u32 + 1)));
            let sample = Sample::new(dts, duration, size)
                .with_pts(dts + offsets[i] as u64)
                .with_keyframe(is_keyframe)
                .with_description_index(description_index);
            samples.push(LocatedSample {
                offset: position,
                sample,
            });
            dts += duration;
            position += size as u64;
        }
        Ok(samples)
    }

    /// 0-based chunk index and description index for each sample.
    fn sample_chunks(&self, count: usize) -> Result<Vec<(usize, u32)>> {
        let chunk_count = self.chunk_offsets.len();
        let mut result = Vec::with_capacity(count);
        for (i, entry) in self.sample_to_chunk.iter().enumerate() {
            let last_chunk = match self.sample_to_chunk.get(i + 1) {
                Some(next) => next.first_chunk as usize,
                None => chunk_count + 1,
            };
            if entry.first_chunk == 0 || entry.first_chunk as usize >= last_chunk {
                return Err(Error::malformed(
                    FourCc::STSC,
                    format!("entry {i} has first chunk {}", entry.first_chunk),
                ));
            }
            for chunk in entry.first_chunk as usize..last_chunk {
                for _ in 0..entry.samples_per_chunk {
                    if result.len() > count {
                        break;
                    }
                    result.push((chunk - 1, entry.description_index));
                }
            }
        }
        let overruns = result.last().is_some_and(|&(chunk, _)| chunk >= chunk_count);
        if result.len() != count || overruns {
            return Err(Error::malformed(
                FourCc::STSC,
                format!(
                    "maps {} samples into {chunk_count} chunks, stsz has {count}",
                    result.len()
                ),
            ));
        }
        Ok(result)
    }
}

fn require<'a>(found: Option<Container<'a>>, path: &str) -> Result<Container<'a>> {
    found.ok_or_else(|| Error::MissingBox(path.to_string()))
}

fn leaf_payload<'a>(parent: &Container<'a>, path: &str, registry: &LayoutRegistry) -> Result<Option<&'a [u8]>> {
    Ok(parent.find(path, registry)?.map(|c| c.payload()))
}

fn table_payload<'a>(stbl: &Container<'a>, code: &str, registry: &LayoutRegistry) -> Result<&'a [u8]> {
    leaf_payload(stbl, code, registry)?
        .ok_or_else(|| Error::MissingBox(format!("moov/trak/mdia/minf/stbl/{code}")))
}

/// Read the first video track of a complete file.
pub fn read_video_track(file: &[u8]) -> Result<TrackTables> {
    let registry = LayoutRegistry::standard();
    let root = open_container(file)?;
    let moov = require(root.find_container("moov", &registry)?, "moov")?;

    let movie_timescale = {
        let payload = require(moov.find("mvhd", &registry)?, "moov/mvhd")?.payload();
        let mut reader = TableReader::new(FourCc::MVHD, payload)?;
        reader.skip(if reader.version() == 1 { 16 } else { 8 })?;
        reader.u32()?
    };

    let trak = find_video_trak(&moov, &registry)?;
    let stbl = require(trak.find_container("mdia/minf/stbl", &registry)?, "moov/trak/mdia/minf/stbl")?;

    let (track_id, track_flags, width, height) = parse_tkhd(
        require(trak.find("tkhd", &registry)?, "moov/trak/tkhd")?.payload(),
    )?;
    let (media_timescale, media_duration) = parse_mdhd(
        require(trak.find("mdia/mdhd", &registry)?, "moov/trak/mdia/mdhd")?.payload(),
    )?;
    let (codec, codec_config) = parse_stsd(&stbl, &registry)?;

    let chunk_offsets = match leaf_payload(&stbl, "stco", &registry)? {
        Some(payload) => parse_stco(payload)?,
        None => parse_co64(table_payload(&stbl, "co64", &registry)?)?,
    };
    let composition_offsets = match leaf_payload(&stbl, "ctts", &registry)? {
        Some(payload) => parse_ctts(payload)?,
        None => Vec::new(),
    };
    let sync_samples = leaf_payload(&stbl, "stss", &registry)?
        .map(parse_stss)
        .transpose()?;

    let tables = TrackTables {
        track_id,
        track_flags,
        width,
        height,
        movie_timescale,
        media_timescale,
        media_duration,
        codec,
        codec_config,
        durations: parse_stts(table_payload(&stbl, "stts", &registry)?)?,
        composition_offsets,
        sample_to_chunk: parse_stsc(table_payload(&stbl, "stsc", &registry)?)?,
        sizes: parse_stsz(table_payload(&stbl, "stsz", &registry)?)?,
        chunk_offsets,
        sync_samples,
    };
    tracing::debug!(
        track_id,
        %codec,
        samples = tables.sample_count(),
        chunks = tables.chunk_offsets.len(),
        "read video track"
    );
    Ok(tables)
}

fn find_video_trak<'a>(moov: &Container<'a>, registry: &LayoutRegistry) -> Result<Container<'a>> {
    for child in moov.children().filter(|c| c.box_type == FourCc::TRAK) {
        let trak = moov.open_child(&child, registry)?;
        let Some(hdlr) = trak.find("mdia/hdlr", registry)? else {
            continue;
        };
        let mut reader = TableReader::new(FourCc::HDLR, hdlr.payload())?;
        reader.skip(4)?;
        if reader.u32()?.to_be_bytes() == *b"vide" {
            return Ok(trak);
        }
    }
    Err(Error::MissingBox("moov/trak with a 'vide' handler".to_string()))
}

fn parse_tkhd(payload: &[u8]) -> Result<(u32, u32, u16, u16)> {
    let flags = match payload {
        [_, a, b, c, ..] => u32::from_be_bytes([0, *a, *b, *c]),
        _ => 0,
    };
    let mut reader = TableReader::new(FourCc::TKHD, payload)?;
    reader.skip(if reader.version() == 1 { 16 } else { 8 })?;
    let track_id = reader.u32()?;
    reader.skip(4)?;
    reader.versioned()?; // duration
    // reserved, layer, alternate group, volume, reserved, matrix
    reader.skip(8 + 8 + 36)?;
    let width = reader.u32()? >> 16;
    let height = reader.u32()? >> 16;
    Ok((track_id, flags, width as u16, height as u16))
}

fn parse_mdhd(payload: &[u8]) -> Result<(u32, u64)> {
    let mut reader = TableReader::new(FourCc::MDHD, payload)?;
    reader.skip(if reader.version() == 1 { 16 } else { 8 })?;
    let timescale = reader.u32()?;
    let duration = reader.versioned()?;
    Ok((timescale, duration))
}

fn parse_stsd(stbl: &Container<'_>, registry: &LayoutRegistry) -> Result<(FourCc, Vec<u8>)> {
    let stsd = require(stbl.find_container("stsd", registry)?, "moov/trak/mdia/minf/stbl/stsd")?;
    let entry = stsd
        .children()
        .next()
        .ok_or_else(|| Error::malformed(FourCc::STSD, "no sample entries"))?;
    let codec = entry.box_type;
    let config_type = match codec.as_bytes() {
        b"avc1" | b"avc3" => FourCc::AVCC,
        b"hvc1" | b"hev1" => FourCc::HVCC,
        _ => return Err(Error::unsupported(format!("sample entry '{codec}' is not a supported video codec"))),
    };
    let sample_entry = stsd.open_child(&entry, registry)?;
    let config = sample_entry
        .find_child(config_type)
        .map(|child| sample_entry.leaf(&child))
        .ok_or_else(|| Error::MissingBox(format!("stsd/{codec}/{config_type}")))?;
    Ok((codec, config.payload().to_vec()))
}
