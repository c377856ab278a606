//! Movie, track, and media header boxes.

use crate::boxes::{BoxNode, Field, FlagSet, FourCc, Width};
use crate::{Error, Result};

/// Identity transformation matrix (16.16 / 2.30 fixed point).
const UNITY_MATRIX: [u32; 9] = [
    0x0001_0000,
    0,
    0,
    0,
    0x0001_0000,
    0,
    0,
    0,
    0x4000_0000,
];

/// Track header flag bit masks.
pub const TRACK_FLAG_BITS: [(&str, u32); 3] =
    [("enabled", 0x1), ("in_movie", 0x2), ("in_preview", 0x4)];

fn matrix() -> Field {
    Field::u32_array(UNITY_MATRIX.to_vec())
}

/// `ftyp`: major brand, minor version, compatible brands.
pub fn ftyp(major_brand: FourCc, minor_version: u32, compatible: &[FourCc]) -> BoxNode {
    BoxNode::new(FourCc::FTYP)
        .field(Field::Literal(major_brand))
        .field(Field::u32(minor_version))
        .fields(compatible.iter().map(|&brand| Field::Literal(brand)))
}

/// `mdat` holding the concatenated sample payload.
pub fn mdat(payload: &[u8]) -> BoxNode {
    BoxNode::new(FourCc::MDAT).field(Field::raw(payload))
}

/// `mvhd`, version 0.
pub fn mvhd(timescale: u32, duration: u32, next_track_id: u32) -> BoxNode {
    BoxNode::full(FourCc::MVHD, 0, 0)
        .field(Field::u32(0)) // creation time
        .field(Field::u32(0)) // modification time
        .field(Field::u32(timescale))
        .field(Field::u32(duration))
        .field(Field::fixed_16_16(1, 0)) // rate
        .field(Field::fixed_8_8(1, 0)) // volume
        .field(Field::u16(0))
        .field(Field::u32_array(vec![0, 0]))
        .field(matrix())
        .field(Field::u32_array(vec![0; 6])) // pre_defined
        .field(Field::u32(next_track_id))
}

/// Track-level flags of a `tkhd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackFlags {
    pub enabled: bool,
    pub in_movie: bool,
    pub in_preview: bool,
}

impl Default for TrackFlags {
    fn default() -> Self {
        Self {
            enabled: true,
            in_movie: true,
            in_preview: false,
        }
    }
}

impl TrackFlags {
    fn flag_set(&self) -> FlagSet {
        FlagSet::new(TRACK_FLAG_BITS)
            .set("enabled", self.enabled)
            .set("in_movie", self.in_movie)
            .set("in_preview", self.in_preview)
    }
}

/// Parameters of a video `tkhd`.
#[derive(Debug, Clone, Copy)]
pub struct TrackHeader {
    pub track_id: u32,
    /// Duration in movie timescale.
    pub duration: u32,
    pub width: u16,
    pub height: u16,
    pub flags: TrackFlags,
}

/// `tkhd`, version 0, for a visual track (volume 0).
pub fn tkhd(header: &TrackHeader) -> BoxNode {
    BoxNode::full_named(FourCc::TKHD, 0, header.flags.flag_set())
        .field(Field::u32(0)) // creation time
        .field(Field::u32(0)) // modification time
        .field(Field::u32(header.track_id))
        .field(Field::u32(0))
        .field(Field::u32(header.duration))
        .field(Field::u32_array(vec![0, 0]))
        .field(Field::u16(0)) // layer
        .field(Field::u16(0)) // alternate group
        .field(Field::u16(0)) // volume
        .field(Field::u16(0))
        .field(matrix())
        .field(Field::fixed_16_16(header.width, 0))
        .field(Field::fixed_16_16(header.height, 0))
}

/// `edts` with a single `elst` entry mapping the whole track, starting
/// `media_time` ticks into the media.
pub fn edts(segment_duration: u32, media_time: u32) -> BoxNode {
    let elst = BoxNode::full(FourCc::ELST, 0, 0)
        .field(Field::u32(1))
        .field(Field::u32(segment_duration))
        .field(Field::u32(media_time))
        .field(Field::fixed_16_16(1, 0)); // media rate
    BoxNode::new(FourCc::EDTS).child(elst)
}

/// Pack an ISO-639-2/T code like `und` into the 15-bit `mdhd` form.
pub fn pack_language(code: &str) -> Result<u16> {
    let bytes = code.as_bytes();
    if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_lowercase) {
        return Err(Error::unsupported(format!(
            "language {code:?} is not a 3-letter lowercase ISO-639-2 code"
        )));
    }
    Ok(bytes
        .iter()
        .fold(0u16, |packed, &b| (packed << 5) | (b - 0x60) as u16))
}

/// `mdhd`, version 0.
pub fn mdhd(timescale: u32, duration: u32, language: u16) -> BoxNode {
    BoxNode::full(FourCc::MDHD, 0, 0)
        .field(Field::u32(0)) // creation time
        .field(Field::u32(0)) // modification time
        .field(Field::u32(timescale))
        .field(Field::u32(duration))
        .field(Field::u16(language))
        .field(Field::u16(0)) // pre_defined
}

/// `hdlr` with a NUL-terminated name.
pub fn hdlr(handler: FourCc, name: &str) -> BoxNode {
    let mut name_bytes = name.as_bytes().to_vec();
    name_bytes.push(0);
    BoxNode::full(FourCc::HDLR, 0, 0)
        .field(Field::u32(0)) // pre_defined
        .field(Field::Literal(handler))
        .field(Field::u32_array(vec![0; 3]))
        .field(Field::bytes(&name_bytes))
}

/// `vmhd`. Flags are always 1.
pub fn vmhd() -> BoxNode {
    BoxNode::full(FourCc::VMHD, 0, 1)
        .field(Field::u16(0)) // graphics mode
        .field(Field::array(Width::U16, vec![0; 3])) // opcolor
}

/// `dinf` with a single self-contained `url ` reference.
pub fn dinf() -> BoxNode {
    let url = BoxNode::full(FourCc::URL, 0, 1);
    let dref = BoxNode::full(FourCc::DREF, 0, 0)
        .field(Field::u32(1))
        .child(url);
    BoxNode::new(FourCc::DINF).child(dref)
}
