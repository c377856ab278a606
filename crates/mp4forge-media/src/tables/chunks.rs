//! Chunk model: grouping samples into contiguously stored runs.

use super::Sample;
use crate::{Error, Result};

/// How samples are grouped into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "kebab-case"))]
pub enum ChunkPolicy {
    /// Every sample is its own chunk.
    #[default]
    OnePerChunk,
    /// A single chunk holds every sample.
    AllInOneChunk,
}

/// An ordered, non-empty run of samples stored back to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    first_sample: usize,
    samples: Vec<Sample>,
}

impl Chunk {
    /// 0-based index of the first sample in the original list.
    pub fn first_sample(&self) -> usize {
        self.first_sample
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sum of sample durations.
    pub fn duration(&self) -> u64 {
        self.samples.iter().map(|s| s.duration).sum()
    }

    /// Sum of sample payload sizes.
    pub fn byte_len(&self) -> u64 {
        self.samples.iter().map(|s| s.size as u64).sum()
    }
}

/// Partition samples into chunks. Concatenating the chunks' samples always
/// reproduces the input.
pub fn derive_chunks(samples: &[Sample], policy: ChunkPolicy) -> Vec<Chunk> {
    if samples.is_empty() {
        return Vec::new();
    }
    match policy {
        ChunkPolicy::OnePerChunk => samples
            .iter()
            .enumerate()
            .map(|(i, sample)| Chunk {
                first_sample: i,
                samples: vec![*sample],
            })
            .collect(),
        ChunkPolicy::AllInOneChunk => vec![Chunk {
            first_sample: 0,
            samples: samples.to_vec(),
        }],
    }
}

/// Absolute file offset of each chunk, given where sample data begins.
pub fn derive_chunk_offsets(chunks: &[Chunk], data_start: u64) -> Vec<u64> {
    let mut offset = data_start;
    chunks
        .iter()
        .map(|chunk| {
            let start = offset;
            offset += chunk.byte_len();
            start
        })
        .collect()
}

/// Narrow chunk offsets to the 32-bit `stco` encoding.
pub fn narrow_chunk_offsets(offsets: &[u64]) -> Result<Vec<u32>> {
    offsets
        .iter()
        .enumerate()
        .map(|(i, &offset)| {
            u32::try_from(offset).map_err(|_| {
                Error::unsupported(format!(
                    "chunk {i} offset {offset} needs 64-bit chunk offsets"
                ))
            })
        })
        .collect()
}

/// Single sample-to-chunk entry covering every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleToChunk {
    /// 1-based index of the first chunk the entry applies to.
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    /// 1-based sample description index.
    pub description_index: u32,
}

/// Derive the sample-to-chunk entry.
///
/// Only the uniform layout is supported: every chunk holds the same number
/// of samples and every sample uses the same description index.
pub fn derive_chunk_table(samples: &[Sample], chunks: &[Chunk]) -> Result<SampleToChunk> {
    let first = chunks
        .first()
        .ok_or_else(|| Error::unsupported("sample-to-chunk table needs at least one chunk"))?;

    let covered: usize = chunks.iter().map(Chunk::len).sum();
    if covered != samples.len() {
        return Err(Error::unsupported(format!(
            "chunks cover {covered} samples but {} were given",
            samples.len()
        )));
    }

    let samples_per_chunk = first.len();
    if let Some((i, chunk)) = chunks
        .iter()
        .enumerate()
        .find(|(_, c)| c.len() != samples_per_chunk)
    {
        return Err(Error::unsupported(format!(
            "chunk {i} holds {} samples, chunk 0 holds {samples_per_chunk}; variable chunk sizes are not supported",
            chunk.len()
        )));
    }

    let description_index = samples[0].description_index;
    if description_index == 0 {
        return Err(Error::unsupported("sample description index must be 1-based"));
    }
    if let Some((i, sample)) = samples
        .iter()
        .enumerate()
        .find(|(_, s)| s.description_index != description_index)
    {
        return Err(Error::unsupported(format!(
            "sample {i} uses description {}, sample 0 uses {description_index}; mixed descriptions are not supported",
            sample.description_index
        )));
    }

    let samples_per_chunk = u32::try_from(samples_per_chunk)
        .map_err(|_| Error::unsupported("chunk holds more than 2^32 samples"))?;

    Ok(SampleToChunk {
        first_chunk: 1,
        samples_per_chunk,
        description_index,
    })
}
