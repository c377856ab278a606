//! Sample table derivation.
//!
//! Converts an ordered sample list into the tables a progressive MP4 needs:
//! - stts: decode-time deltas (run-length over durations)
//! - ctts: composition offsets (run-length over `pts - dts`)
//! - stsc: sample-to-chunk mapping
//! - stsz: sample sizes
//! - stco: chunk offsets
//! - stss: sync sample numbers (1-based)
//!
//! Anything outside the supported layout fails with
//! [`Error::UnsupportedLayout`] instead of being approximated.

mod chunks;
mod run_length;
mod sample;

pub use chunks::{
    derive_chunk_offsets, derive_chunk_table, derive_chunks, narrow_chunk_offsets, Chunk,
    ChunkPolicy, SampleToChunk,
};
pub use run_length::{expand, run_length, RunLengthEntry};
pub use sample::{samples_from_durations, Sample};

use crate::{Error, Result};

/// Decode-time table: run-length over sample durations.
pub fn derive_duration_table(samples: &[Sample]) -> Result<Vec<RunLengthEntry<u32>>> {
    let durations = samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            u32::try_from(s.duration).map_err(|_| {
                Error::unsupported(format!("sample {i} duration {} exceeds 32 bits", s.duration))
            })
        })
        .collect::<Result<Vec<u32>>>()?;
    Ok(run_length(durations))
}

/// Composition-offset table: run-length over `pts - dts`.
///
/// Only the unsigned encoding is supported, so a sample presented before it
/// is decoded is an error.
pub fn derive_composition_table(samples: &[Sample]) -> Result<Vec<RunLengthEntry<u32>>> {
    let offsets = samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let offset = s.pts.checked_sub(s.dts).ok_or_else(|| {
                Error::unsupported(format!(
                    "sample {i} presentation time {} precedes decode time {}; negative composition offsets are not supported",
                    s.pts, s.dts
                ))
            })?;
            u32::try_from(offset).map_err(|_| {
                Error::unsupported(format!("sample {i} composition offset {offset} exceeds 32 bits"))
            })
        })
        .collect::<Result<Vec<u32>>>()?;
    Ok(run_length(offsets))
}

/// 1-based numbers of every sync sample, ascending.
///
/// Whether to omit the table when every sample is a sync sample is up to
/// the caller.
pub fn derive_sync_samples(samples: &[Sample]) -> Vec<u32> {
    samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_keyframe)
        .map(|(i, _)| i as u32 + 1)
        .collect()
}

/// Fixed-duration path: the single duration shared by every sample.
pub fn derive_uniform_duration(samples: &[Sample]) -> Result<u32> {
    let table = derive_duration_table(samples)?;
    match table.as_slice() {
        [only] => Ok(only.value),
        [] => Err(Error::unsupported("no samples to take a duration from")),
        [first, second, ..] => Err(Error::unsupported(format!(
            "sample durations vary ({} then {} after {} samples); constant frame rate required",
            first.value, second.value, first.count
        ))),
    }
}

/// Sample sizes, collapsed when every sample has the same size.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleSizes {
    Uniform { size: u32, count: u32 },
    PerSample(Vec<u32>),
}

impl SampleSizes {
    pub fn sample_count(&self) -> usize {
        match self {
            Self::Uniform { count, .. } => *count as usize,
            Self::PerSample(sizes) => sizes.len(),
        }
    }

    /// Size of the sample at a 0-based index.
    pub fn get(&self, index: usize) -> Option<u32> {
        match self {
            Self::Uniform { size, count } => (index < *count as usize).then_some(*size),
            Self::PerSample(sizes) => sizes.get(index).copied(),
        }
    }
}

/// Sample size table.
pub fn derive_size_table(samples: &[Sample]) -> SampleSizes {
    match samples.split_first() {
        Some((first, rest)) if rest.iter().all(|s| s.size == first.size) => {
            SampleSizes::Uniform {
                size: first.size,
                count: samples.len() as u32,
            }
        }
        _ => SampleSizes::PerSample(samples.iter().map(|s| s.size).collect()),
    }
}

/// Every table derived from one sample list, minus chunk offsets (which
/// depend on where sample data lands in the file).
#[derive(Debug, Clone)]
pub struct SampleTables {
    pub durations: Vec<RunLengthEntry<u32>>,
    pub composition_offsets: Vec<RunLengthEntry<u32>>,
    pub sample_to_chunk: SampleToChunk,
    pub sizes: SampleSizes,
    pub sync_samples: Vec<u32>,
    pub chunks: Vec<Chunk>,
    sample_count: usize,
}

impl SampleTables {
    /// Derive every table for `samples` grouped by `policy`.
    pub fn derive(samples: &[Sample], policy: ChunkPolicy) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::unsupported("cannot derive sample tables from zero samples"));
        }
        let chunks = derive_chunks(samples, policy);
        let tables = Self {
            durations: derive_duration_table(samples)?,
            composition_offsets: derive_composition_table(samples)?,
            sample_to_chunk: derive_chunk_table(samples, &chunks)?,
            sizes: derive_size_table(samples),
            sync_samples: derive_sync_samples(samples),
            chunks,
            sample_count: samples.len(),
        };
        tracing::debug!(
            samples = tables.sample_count,
            chunks = tables.chunks.len(),
            stts_entries = tables.durations.len(),
            ctts_entries = tables.composition_offsets.len(),
            sync_samples = tables.sync_samples.len(),
            ?policy,
            "derived sample tables"
        );
        Ok(tables)
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Whether any sample has a non-zero composition offset.
    pub fn has_composition_offsets(&self) -> bool {
        self.composition_offsets.iter().any(|e| e.value != 0)
    }

    /// Whether every sample is a sync sample.
    pub fn all_sync(&self) -> bool {
        self.sync_samples.len() == self.sample_count
    }

    /// Sum of all sample durations.
    pub fn total_duration(&self) -> u64 {
        self.durations
            .iter()
            .map(|e| e.count as u64 * e.value as u64)
            .sum()
    }

    /// 32-bit chunk offsets for sample data starting at `data_start`.
    pub fn chunk_offsets(&self, data_start: u64) -> Result<Vec<u32>> {
        narrow_chunk_offsets(&derive_chunk_offsets(&self.chunks, data_start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn with_offsets(offsets: &[u64]) -> Vec<Sample> {
        let durations = vec![512; offsets.len()];
        let sizes = vec![100; offsets.len()];
        samples_from_durations(&durations, &sizes)
            .into_iter()
            .zip(offsets)
            .map(|(s, &offset)| s.with_pts(s.dts + offset))
            .collect()
    }

    #[test]
    fn test_duration_table_scenario() {
        let samples = samples_from_durations(&[512, 512, 512, 256, 256, 512], &[1; 6]);
        let table = derive_duration_table(&samples).unwrap();
        assert_eq!(
            table,
            vec![
                RunLengthEntry::new(3, 512),
                RunLengthEntry::new(2, 256),
                RunLengthEntry::new(1, 512),
            ]
        );
    }

    #[test]
    fn test_duration_table_empty() {
        assert!(derive_duration_table(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_duration_too_wide() {
        let samples = vec![Sample::new(0, 1 << 33, 1)];
        assert_matches!(derive_duration_table(&samples), Err(Error::UnsupportedLayout(_)));
    }

    #[test]
    fn test_composition_table_scenario() {
        let samples = with_offsets(&[0, 0, 512, 512, 512, 0]);
        let table = derive_composition_table(&samples).unwrap();
        assert_eq!(
            table,
            vec![
                RunLengthEntry::new(2, 0),
                RunLengthEntry::new(3, 512),
                RunLengthEntry::new(1, 0),
            ]
        );
    }

    #[test]
    fn test_negative_composition_offset_rejected() {
        let mut samples = with_offsets(&[512, 0, 0]);
        samples[2].pts = samples[2].dts - 1;
        assert_matches!(
            derive_composition_table(&samples),
            Err(Error::UnsupportedLayout(msg)) if msg.starts_with("sample 2 ")
        );
    }

    #[test]
    fn test_sync_samples_scenario() {
        let samples: Vec<Sample> = [true, false, false, true, false, true]
            .iter()
            .enumerate()
            .map(|(i, &key)| Sample::new(i as u64, 1, 1).with_keyframe(key))
            .collect();
        assert_eq!(derive_sync_samples(&samples), vec![1, 4, 6]);
    }

    #[test]
    fn test_sync_samples_empty_input() {
        assert!(derive_sync_samples(&[]).is_empty());
    }

    #[test]
    fn test_uniform_duration() {
        let samples = samples_from_durations(&[3000; 4], &[1; 4]);
        assert_eq!(derive_uniform_duration(&samples).unwrap(), 3000);

        let varying = samples_from_durations(&[3000, 3000, 3003], &[1; 3]);
        assert_matches!(
            derive_uniform_duration(&varying),
            Err(Error::UnsupportedLayout(msg)) if msg.contains("3000 then 3003 after 2")
        );
    }

    #[test]
    fn test_size_table() {
        let uniform = samples_from_durations(&[1; 3], &[42; 3]);
        assert_eq!(derive_size_table(&uniform), SampleSizes::Uniform { size: 42, count: 3 });

        let varying = samples_from_durations(&[1; 3], &[1, 2, 3]);
        let sizes = derive_size_table(&varying);
        assert_eq!(sizes, SampleSizes::PerSample(vec![1, 2, 3]));
        assert_eq!(sizes.get(2), Some(3));
        assert_eq!(sizes.get(3), None);

        let single = samples_from_durations(&[1], &[9]);
        assert_eq!(derive_size_table(&single), SampleSizes::Uniform { size: 9, count: 1 });
        assert_eq!(derive_size_table(&[]), SampleSizes::PerSample(vec![]));
    }

    #[test]
    fn test_sample_tables_bundle() {
        let mut samples = with_offsets(&[0, 1024, 512, 0]);
        samples[0].is_keyframe = true;
        let tables = SampleTables::derive(&samples, ChunkPolicy::OnePerChunk).unwrap();
        assert_eq!(tables.sample_count(), 4);
        assert!(tables.has_composition_offsets());
        assert!(!tables.all_sync());
        assert_eq!(tables.total_duration(), 4 * 512);
        assert_eq!(tables.chunk_offsets(40).unwrap(), vec![40, 140, 240, 340]);
    }

    #[test]
    fn test_sample_tables_reject_empty() {
        assert_matches!(
            SampleTables::derive(&[], ChunkPolicy::AllInOneChunk),
            Err(Error::UnsupportedLayout(_))
        );
    }
}
