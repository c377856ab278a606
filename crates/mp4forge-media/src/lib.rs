//! Mp4forge-Media: ISO BMFF box serialization, traversal, and sample tables
//!
//! This crate is the core of mp4forge. It turns a strongly-typed box tree
//! into exact bytes, walks encoded boxes back, and derives the sample tables
//! a progressive (non-fragmented) MP4 needs from an ordered sample list.
//!
//! # Modules
//!
//! - `boxes` - Box schema, validator, size calculator, byte writer, JSON loader
//! - `container` - Child enumeration over encoded boxes
//! - `tables` - Run-length, chunk, size, and sync table derivation
//! - `builders` - Standard boxes for a single-video-track file
//! - `inspect` - Reading a video track's tables back out of a file
//!
//! # Pipeline
//!
//! Encoding always runs in four steps, and nothing is written unless the
//! first one succeeds:
//!
//! 1. Validate the whole tree (flags, value widths, opaque payload placement)
//! 2. Compute the exact encoded size
//! 3. Allocate one buffer of that size
//! 4. Write boxes depth-first, big-endian

pub mod boxes;
pub mod builders;
pub mod container;
pub mod error;
pub mod inspect;
pub mod tables;

pub use boxes::{compute_size, parse_box, serialize, serialize_all, BoxNode, Field, FlagSet, FourCc};
pub use container::{open_container, ChildBox, Container, LayoutRegistry};
pub use error::{Error, Result, Violation};
pub use inspect::{read_video_track, TrackTables};
pub use tables::{
    derive_chunk_offsets, derive_chunk_table, derive_chunks, derive_composition_table,
    derive_duration_table, derive_size_table, derive_sync_samples, ChunkPolicy, Sample,
    SampleTables,
};
