use mp4forge_media::tables::ChunkPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub file: FileConfig,

    #[serde(default)]
    pub movie: MovieConfig,

    #[serde(default)]
    pub video: VideoConfig,
}

/// File type box (`ftyp`) settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default = "default_major_brand")]
    pub major_brand: String,

    #[serde(default = "default_minor_version")]
    pub minor_version: u32,

    #[serde(default = "default_compatible_brands")]
    pub compatible_brands: Vec<String>,
}

fn default_major_brand() -> String {
    "isom".to_string()
}

fn default_minor_version() -> u32 {
    512
}

fn default_compatible_brands() -> Vec<String> {
    ["isom", "iso2", "avc1", "mp41"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            major_brand: default_major_brand(),
            minor_version: default_minor_version(),
            compatible_brands: default_compatible_brands(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MovieConfig {
    /// Ticks per second for movie-level durations (`mvhd`, `tkhd`, `elst`)
    #[serde(default = "default_movie_timescale")]
    pub timescale: u32,
}

fn default_movie_timescale() -> u32 {
    1000
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            timescale: default_movie_timescale(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VideoConfig {
    #[serde(default = "default_track_id")]
    pub track_id: u32,

    #[serde(default = "default_handler_name")]
    pub handler_name: String,

    /// ISO-639-2/T language code
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub chunk_policy: ChunkPolicy,

    #[serde(default = "default_true")]
    pub track_enabled: bool,

    #[serde(default = "default_true")]
    pub track_in_movie: bool,

    #[serde(default)]
    pub track_in_preview: bool,

    /// `[h_spacing, v_spacing]` for a `pasp` box
    #[serde(default)]
    pub pixel_aspect: Option<[u32; 2]>,

    /// Write a `btrt` box computed from the samples
    #[serde(default = "default_true")]
    pub bitrate_hint: bool,

    /// Write an `edts`/`elst` that starts presentation at the first
    /// presented sample
    #[serde(default = "default_true")]
    pub edit_list: bool,

    /// Reject tracks whose sample durations vary
    #[serde(default)]
    pub constant_frame_rate: bool,

    #[serde(default)]
    pub compressor_name: String,
}

fn default_track_id() -> u32 {
    1
}

fn default_handler_name() -> String {
    "VideoHandler".to_string()
}

fn default_language() -> String {
    "und".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            track_id: default_track_id(),
            handler_name: default_handler_name(),
            language: default_language(),
            chunk_policy: ChunkPolicy::default(),
            track_enabled: true,
            track_in_movie: true,
            track_in_preview: false,
            pixel_aspect: None,
            bitrate_hint: true,
            edit_list: true,
            constant_frame_rate: false,
            compressor_name: String::new(),
        }
    }
}
