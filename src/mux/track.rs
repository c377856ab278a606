use anyhow::Result;
use mp4forge_media::{builders::CodecConfig, Sample};

/// One encoded video track: samples in decode order plus their payload
/// bytes, concatenated in the same order.
#[derive(Debug, Clone)]
pub struct VideoTrack {
    pub codec: CodecConfig,
    pub width: u16,
    pub height: u16,
    /// Media timescale (ticks per second) of every sample timestamp
    pub timescale: u32,
    pub samples: Vec<Sample>,
    pub payload: Vec<u8>,
}

impl VideoTrack {
    pub fn new(codec: CodecConfig, width: u16, height: u16, timescale: u32) -> Self {
        Self {
            codec,
            width,
            height,
            timescale,
            samples: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Append a sample. Its decode time follows the previous sample's end;
    /// `composition_offset` is added on top for the presentation time.
    pub fn push_sample(&mut self, data: &[u8], duration: u64, composition_offset: u64, is_keyframe: bool) -> Result<()> {
        let size = u32::try_from(data.len())
            .map_err(|_| anyhow::anyhow!("Sample of {} bytes exceeds 32-bit size", data.len()))?;
        let dts = match self.samples.last() {
            Some(last) => last.dts.checked_add(last.duration).ok_or_else(|| {
                anyhow::anyhow!("Sample {} decode time overflows 64 bits", self.samples.len())
            })?,
            None => 0,
        };
        let pts = dts.checked_add(composition_offset).ok_or_else(|| {
            anyhow::anyhow!(
                "Sample {} composition offset {} overflows its presentation time",
                self.samples.len(),
                composition_offset
            )
        })?;
        self.samples.push(
            Sample::new(dts, duration, size)
                .with_pts(pts)
                .with_keyframe(is_keyframe),
        );
        self.payload.extend_from_slice(data);
        Ok(())
    }

    /// Check the track is something the muxer can lay out.
    pub fn validate(&self) -> Result<()> {
        if self.samples.is_empty() {
            anyhow::bail!("Video track has no samples");
        }
        if self.timescale == 0 {
            anyhow::bail!("Video track timescale cannot be 0");
        }
        let expected: u64 = self.samples.iter().map(|s| s.size as u64).sum();
        if expected != self.payload.len() as u64 {
            anyhow::bail!(
                "Sample sizes add up to {} bytes but the payload holds {}",
                expected,
                self.payload.len()
            );
        }
        // Only one sample entry is written to stsd.
        if let Some(i) = self.samples.iter().position(|s| s.description_index != 1) {
            anyhow::bail!(
                "Sample {} uses sample description {}; only description 1 is written",
                i,
                self.samples[i].description_index
            );
        }
        for (i, pair) in self.samples.windows(2).enumerate() {
            let expected_dts = pair[0].dts.checked_add(pair[0].duration);
            if expected_dts != Some(pair[1].dts) {
                anyhow::bail!(
                    "Sample {} decode time {} does not follow sample {} (expected {:?})",
                    i + 1,
                    pair[1].dts,
                    i,
                    expected_dts
                );
            }
        }
        let last = &self.samples[self.samples.len() - 1];
        if last.dts.checked_add(last.duration).is_none() {
            anyhow::bail!("Video track duration overflows 64 bits");
        }
        if !self.samples[0].is_keyframe {
            tracing::warn!("First video sample is not a sync sample");
        }
        Ok(())
    }

    /// Sum of sample durations in media timescale.
    pub fn duration(&self) -> u64 {
        self.samples.iter().map(|s| s.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> VideoTrack {
        VideoTrack::new(CodecConfig::Avc(vec![1]), 16, 16, 90000)
    }

    #[test]
    fn test_push_sample_accumulates_dts() {
        let mut t = track();
        t.push_sample(&[0; 10], 3000, 0, true).unwrap();
        t.push_sample(&[0; 5], 3000, 6000, false).unwrap();
        assert_eq!(t.samples[1].dts, 3000);
        assert_eq!(t.samples[1].pts, 9000);
        assert_eq!(t.payload.len(), 15);
        assert_eq!(t.duration(), 6000);
        t.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_mismatched_payload() {
        let mut t = track();
        t.push_sample(&[0; 10], 3000, 0, true).unwrap();
        t.payload.pop();
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_gaps() {
        let mut t = track();
        t.push_sample(&[0; 1], 3000, 0, true).unwrap();
        t.push_sample(&[0; 1], 3000, 0, false).unwrap();
        t.samples[1].dts += 1;
        t.samples[1].pts += 1;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_second_description() {
        let mut t = track();
        t.push_sample(&[0; 1], 3000, 0, true).unwrap();
        t.samples[0].description_index = 2;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_push_sample_rejects_presentation_overflow() {
        let mut t = track();
        t.push_sample(&[0; 1], 3000, 0, true).unwrap();
        let err = t.push_sample(&[0; 1], 3000, u64::MAX, false).unwrap_err();
        assert!(err.to_string().contains("composition offset"));
        assert_eq!(t.samples.len(), 1);
        assert_eq!(t.payload.len(), 1);
    }

    #[test]
    fn test_push_sample_rejects_decode_time_overflow() {
        let mut t = track();
        t.push_sample(&[0; 1], u64::MAX, 0, true).unwrap();
        let err = t.push_sample(&[0; 1], 1, 0, false).unwrap_err();
        assert!(err.to_string().contains("decode time overflows"));
    }

    #[test]
    fn test_validate_rejects_overflowing_timeline() {
        let mut t = track();
        t.push_sample(&[0; 1], 10, 0, true).unwrap();
        t.push_sample(&[0; 1], u64::MAX, 0, false).unwrap();
        assert!(t.validate().is_err());

        // A hand-built successor that cannot follow without wrapping.
        let mut t = track();
        t.push_sample(&[0; 1], u64::MAX, 0, true).unwrap();
        t.samples.push(Sample::new(0, 1, 1));
        t.payload.push(0);
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(track().validate().is_err());
    }
}
