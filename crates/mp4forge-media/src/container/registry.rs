//! Known child offsets for boxes the heuristic cannot resolve.

use crate::boxes::FourCc;
use std::collections::HashMap;

/// Size of the fixed `VisualSampleEntry` fields after the box header.
const VISUAL_SAMPLE_ENTRY_FIELDS: usize = 78;

/// Maps a box type to the offset (from the start of the box, assuming an
/// 8-byte header) at which its children begin.
///
/// Passed explicitly to traversal calls; there is no global instance.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    offsets: HashMap<FourCc, usize>,
}

impl LayoutRegistry {
    /// Empty registry: traversal relies on the heuristic alone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering the sample-description boxes written by this crate.
    pub fn standard() -> Self {
        Self::new()
            // version/flags + entry_count
            .register(FourCc::STSD, 16)
            .register(FourCc::DREF, 16)
            .register(FourCc::AVC1, 8 + VISUAL_SAMPLE_ENTRY_FIELDS)
            .register(FourCc::HVC1, 8 + VISUAL_SAMPLE_ENTRY_FIELDS)
            .register(*b"avc3", 8 + VISUAL_SAMPLE_ENTRY_FIELDS)
            .register(*b"hev1", 8 + VISUAL_SAMPLE_ENTRY_FIELDS)
    }

    /// Add or replace an entry.
    pub fn register(mut self, box_type: impl Into<FourCc>, children_offset: usize) -> Self {
        self.offsets.insert(box_type.into(), children_offset);
        self
    }

    pub fn children_offset(&self, box_type: FourCc) -> Option<usize> {
        self.offsets.get(&box_type).copied()
    }
}
