//! Encoded media samples as seen by the table derivation.

/// One encoded access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Decode timestamp in media timescale.
    pub dts: u64,
    /// Presentation timestamp in media timescale.
    pub pts: u64,
    /// Duration in media timescale ticks.
    pub duration: u64,
    /// Payload size in bytes.
    pub size: u32,
    /// Whether this sample is a sync sample (keyframe).
    pub is_keyframe: bool,
    /// 1-based sample description index.
    pub description_index: u32,
}

impl Sample {
    /// A non-key sample presented at its decode time, using description 1.
    pub fn new(dts: u64, duration: u64, size: u32) -> Self {
        Self {
            dts,
            pts: dts,
            duration,
            size,
            is_keyframe: false,
            description_index: 1,
        }
    }

    pub fn with_pts(mut self, pts: u64) -> Self {
        self.pts = pts;
        self
    }

    pub fn with_keyframe(mut self, is_keyframe: bool) -> Self {
        self.is_keyframe = is_keyframe;
        self
    }

    pub fn with_description_index(mut self, index: u32) -> Self {
        self.description_index = index;
        self
    }

    /// Presentation minus decode time. Negative for samples presented
    /// before they are decoded.
    pub fn composition_offset(&self) -> i64 {
        self.pts as i64 - self.dts as i64
    }
}

/// Build a sample list from consecutive durations and sizes, with decode
/// times accumulated from zero.
pub fn samples_from_durations(durations: &[u64], sizes: &[u32]) -> Vec<Sample> {
    let mut dts = 0u64;
    durations
        .iter()
        .zip(sizes)
        .map(|(&duration, &size)| {
            let sample = Sample::new(dts, duration, size);
            dts += duration;
            sample
        })
        .collect()
}
