//! Mp4forge: progressive MP4 muxing on top of `mp4forge-media`
//!
//! - `config` - TOML settings for brands, timescales, and track options
//! - `manifest` - JSON sample manifests for elementary streams on disk
//! - `mux` - Two-pass `ftyp` + `moov` + `mdat` assembly
//! - `logging` - Tracing subscriber setup

pub mod config;
pub mod logging;
pub mod manifest;
pub mod mux;

pub use config::Config;
pub use mux::{Muxer, VideoTrack};
