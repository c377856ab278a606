//! Box builders for progressive (non-fragmented) MP4 files.
//!
//! Each builder returns a [`BoxNode`] tree; nothing is encoded until
//! [`serialize`](crate::boxes::serialize) runs over the result.
//!
//! ```text
//! ftyp
//! moov
//!   mvhd
//!   trak
//!     tkhd
//!     edts/elst        (optional)
//!     mdia
//!       mdhd
//!       hdlr
//!       minf
//!         vmhd
//!         dinf/dref/url
//!         stbl
//!           stsd/avc1|hvc1 (avcC|hvcC, pasp, btrt)
//!           stts, ctts?, stsc, stsz, stco, stss?
//! mdat
//! ```

mod movie;
mod sample_entry;
mod sample_table;

pub use movie::{
    dinf, edts, ftyp, hdlr, mdat, mdhd, mvhd, pack_language, tkhd, vmhd, TrackFlags,
    TrackHeader, TRACK_FLAG_BITS,
};
pub use sample_entry::{pasp, stsd, BitrateHint, CodecConfig, VisualSampleEntry};
pub use sample_table::{ctts, stbl, stco, stsc, stss, stsz, stts};

use crate::boxes::{BoxNode, FourCc};
use crate::tables::SampleTables;
use crate::Result;

/// Edit list entry: play `segment_duration` (movie timescale) starting
/// `media_time` ticks into the media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEntry {
    pub segment_duration: u32,
    pub media_time: u32,
}

/// Everything needed to build one video `trak`.
#[derive(Debug, Clone)]
pub struct VideoTrak<'a> {
    pub header: TrackHeader,
    pub media_timescale: u32,
    /// Media duration in `media_timescale` ticks.
    pub media_duration: u32,
    /// Packed ISO-639-2 code, see [`pack_language`].
    pub language: u16,
    pub handler_name: &'a str,
    pub edit: Option<EditEntry>,
    pub entry: &'a VisualSampleEntry,
    pub tables: &'a SampleTables,
    pub chunk_offsets: &'a [u32],
}

impl VideoTrak<'_> {
    pub fn to_box(&self) -> Result<BoxNode> {
        let minf = BoxNode::new(FourCc::MINF)
            .child(vmhd())
            .child(dinf())
            .child(stbl(self.entry, self.tables, self.chunk_offsets)?);
        let mdia = BoxNode::new(FourCc::MDIA)
            .child(mdhd(self.media_timescale, self.media_duration, self.language))
            .child(hdlr(FourCc::from(*b"vide"), self.handler_name))
            .child(minf);
        Ok(BoxNode::new(FourCc::TRAK)
            .child(tkhd(&self.header))
            .child_opt(self.edit.map(|e| edts(e.segment_duration, e.media_time)))
            .child(mdia))
    }
}

/// `moov` holding the movie header and its tracks.
pub fn moov(mvhd: BoxNode, traks: impl IntoIterator<Item = BoxNode>) -> BoxNode {
    traks.into_iter().fold(BoxNode::new(FourCc::MOOV).child(mvhd), BoxNode::child)
}
