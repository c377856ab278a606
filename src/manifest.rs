//! JSON sample manifests describing an elementary video stream on disk.
//!
//! ```json
//! {
//!   "codec": "avc",
//!   "codec_config": "stream.avcC",
//!   "width": 1920,
//!   "height": 1080,
//!   "timescale": 24000,
//!   "payload": "stream.bin",
//!   "samples": [
//!     { "duration": 1001, "size": 48213, "keyframe": true },
//!     { "duration": 1001, "size": 3120, "composition_offset": 2002 }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use crate::mux::VideoTrack;
use anyhow::{Context, Result};
use mp4forge_media::builders::CodecConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Avc,
    Hevc,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Manifest {
    pub codec: Codec,
    /// File holding the decoder configuration record
    pub codec_config: PathBuf,
    pub width: u16,
    pub height: u16,
    pub timescale: u32,
    /// Concatenated sample data in decode order
    pub payload: PathBuf,
    pub samples: Vec<ManifestSample>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestSample {
    pub duration: u64,
    pub size: u32,
    #[serde(default)]
    pub keyframe: bool,
    #[serde(default)]
    pub composition_offset: u64,
}

/// Parse a manifest without touching the files it names.
pub fn parse_manifest(json: &str) -> Result<Manifest> {
    serde_json::from_str(json).context("Failed to parse sample manifest")
}

/// Load a manifest and the files it references into a [`VideoTrack`].
pub fn load_track(path: &Path) -> Result<VideoTrack> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let manifest = parse_manifest(&content)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let config_path = base.join(&manifest.codec_config);
    let record = std::fs::read(&config_path)
        .with_context(|| format!("Failed to read codec configuration: {:?}", config_path))?;
    let payload_path = base.join(&manifest.payload);
    let payload = std::fs::read(&payload_path)
        .with_context(|| format!("Failed to read sample payload: {:?}", payload_path))?;

    manifest.into_track(record, &payload)
}

impl Manifest {
    /// Build the track from an already-loaded configuration record and payload.
    pub fn into_track(self, record: Vec<u8>, payload: &[u8]) -> Result<VideoTrack> {
        let codec = match self.codec {
            Codec::Avc => CodecConfig::Avc(record),
            Codec::Hevc => CodecConfig::Hevc(record),
        };
        let mut track = VideoTrack::new(codec, self.width, self.height, self.timescale);

        let mut offset = 0usize;
        for (i, sample) in self.samples.iter().enumerate() {
            let end = offset + sample.size as usize;
            let data = payload.get(offset..end).with_context(|| {
                format!(
                    "Sample {} ({} bytes at offset {}) runs past the {}-byte payload",
                    i,
                    sample.size,
                    offset,
                    payload.len()
                )
            })?;
            track.push_sample(data, sample.duration, sample.composition_offset, sample.keyframe)?;
            offset = end;
        }
        if offset != payload.len() {
            tracing::warn!(
                "Manifest covers {} of {} payload bytes; the rest is ignored",
                offset,
                payload.len()
            );
        }
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "codec": "hevc",
        "codec_config": "c.hvcC",
        "width": 320,
        "height": 240,
        "timescale": 25,
        "payload": "p.bin",
        "samples": [
            {"duration": 1, "size": 3, "keyframe": true},
            {"duration": 1, "size": 2, "composition_offset": 1}
        ]
    }"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = parse_manifest(MANIFEST).unwrap();
        assert_eq!(manifest.codec, Codec::Hevc);
        assert!(!manifest.samples[1].keyframe);
        assert_eq!(manifest.samples[1].composition_offset, 1);
    }

    #[test]
    fn test_into_track() {
        let track = parse_manifest(MANIFEST)
            .unwrap()
            .into_track(vec![1], &[1, 1, 1, 2, 2])
            .unwrap();
        assert!(matches!(track.codec, CodecConfig::Hevc(_)));
        assert_eq!(track.samples.len(), 2);
        assert_eq!(track.samples[1].pts, 2);
        track.validate().unwrap();
    }

    #[test]
    fn test_overflowing_composition_offset_rejected() {
        let json = MANIFEST.replace(
            r#""composition_offset": 1"#,
            r#""composition_offset": 18446744073709551615"#,
        );
        let err = parse_manifest(&json)
            .unwrap()
            .into_track(vec![1], &[1, 1, 1, 2, 2])
            .unwrap_err();
        assert!(err.to_string().contains("composition offset"));
    }

    #[test]
    fn test_overflowing_durations_rejected() {
        let json = MANIFEST
            .replace(r#""duration": 1"#, r#""duration": 18446744073709551615"#)
            .replace(r#""composition_offset": 1"#, r#""composition_offset": 0"#);
        let track = parse_manifest(&json)
            .unwrap()
            .into_track(vec![1], &[1, 1, 1, 2, 2])
            .unwrap();
        let err = track.validate().unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_short_payload_rejected() {
        let err = parse_manifest(MANIFEST)
            .unwrap()
            .into_track(vec![1], &[1, 1, 1, 2])
            .unwrap_err();
        assert!(err.to_string().contains("Sample 1"));
    }
}
