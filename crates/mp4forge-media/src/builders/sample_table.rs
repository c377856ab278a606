//! Sample table boxes (`stbl` and its tables).

use super::sample_entry::{stsd, VisualSampleEntry};
use crate::boxes::{BoxNode, Field, FourCc};
use crate::tables::{RunLengthEntry, SampleSizes, SampleTables, SampleToChunk};
use crate::Result;

fn entry_count(len: usize) -> Field {
    Field::u32(len as u32)
}

fn run_length_entries(entries: &[RunLengthEntry<u32>]) -> Field {
    Field::u32_array(entries.iter().flat_map(|e| [e.count, e.value]).collect())
}

/// `stts`: (sample_count, sample_delta) pairs.
pub fn stts(durations: &[RunLengthEntry<u32>]) -> BoxNode {
    BoxNode::full(FourCc::STTS, 0, 0)
        .field(entry_count(durations.len()))
        .field(run_length_entries(durations))
}

/// `ctts`, version 0: (sample_count, sample_offset) pairs.
pub fn ctts(offsets: &[RunLengthEntry<u32>]) -> BoxNode {
    BoxNode::full(FourCc::CTTS, 0, 0)
        .field(entry_count(offsets.len()))
        .field(run_length_entries(offsets))
}

/// `stsc` with its single entry.
pub fn stsc(entry: &SampleToChunk) -> BoxNode {
    BoxNode::full(FourCc::STSC, 0, 0)
        .field(Field::u32(1))
        .field(Field::u32(entry.first_chunk))
        .field(Field::u32(entry.samples_per_chunk))
        .field(Field::u32(entry.description_index))
}

/// `stsz`. A uniform size is written once with no per-sample entries.
pub fn stsz(sizes: &SampleSizes) -> BoxNode {
    let node = BoxNode::full(FourCc::STSZ, 0, 0);
    match sizes {
        SampleSizes::Uniform { size, count } => node.field(Field::u32(*size)).field(Field::u32(*count)),
        SampleSizes::PerSample(sizes) => node
            .field(Field::u32(0))
            .field(entry_count(sizes.len()))
            .field(Field::u32_array(sizes.clone())),
    }
}

/// `stco` with 32-bit chunk offsets.
pub fn stco(offsets: &[u32]) -> BoxNode {
    BoxNode::full(FourCc::STCO, 0, 0)
        .field(entry_count(offsets.len()))
        .field(Field::u32_array(offsets.to_vec()))
}

/// `stss` listing 1-based sync sample numbers.
pub fn stss(sync_samples: &[u32]) -> BoxNode {
    BoxNode::full(FourCc::STSS, 0, 0)
        .field(entry_count(sync_samples.len()))
        .field(Field::u32_array(sync_samples.to_vec()))
}

/// Full `stbl` for one track.
///
/// `ctts` is written only when some sample has a non-zero composition
/// offset, `stss` only when not every sample is a sync sample.
pub fn stbl(entry: &VisualSampleEntry, tables: &SampleTables, chunk_offsets: &[u32]) -> Result<BoxNode> {
    Ok(BoxNode::new(FourCc::STBL)
        .child(stsd(entry)?)
        .child(stts(&tables.durations))
        .child_opt(
            tables
                .has_composition_offsets()
                .then(|| ctts(&tables.composition_offsets)),
        )
        .child(stsc(&tables.sample_to_chunk))
        .child(stsz(&tables.sizes))
        .child(stco(chunk_offsets))
        .child_opt((!tables.all_sync()).then(|| stss(&tables.sync_samples))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::{compute_size, serialize};
    use crate::builders::CodecConfig;
    use crate::tables::{samples_from_durations, ChunkPolicy};

    #[test]
    fn test_stts_bytes() {
        let bytes = serialize(&stts(&[RunLengthEntry::new(3, 512), RunLengthEntry::new(1, 256)])).unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&32u32.to_be_bytes());
        expected.extend_from_slice(b"stts");
        for word in [0u32, 2, 3, 512, 1, 256] {
            expected.extend_from_slice(&word.to_be_bytes());
        }
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_stsz_uniform_and_per_sample() {
        let uniform = stsz(&SampleSizes::Uniform { size: 100, count: 50 });
        assert_eq!(compute_size(&uniform), 20);
        let per_sample = stsz(&SampleSizes::PerSample(vec![1, 2, 3]));
        assert_eq!(compute_size(&per_sample), 32);
        let bytes = serialize(&per_sample).unwrap();
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &3u32.to_be_bytes());
    }

    #[test]
    fn test_stbl_optional_tables() {
        let entry = VisualSampleEntry::new(CodecConfig::Avc(vec![1, 2, 3]), 16, 16);

        let all_key: Vec<_> = samples_from_durations(&[10; 3], &[5; 3])
            .into_iter()
            .map(|s| s.with_keyframe(true))
            .collect();
        let tables = SampleTables::derive(&all_key, ChunkPolicy::OnePerChunk).unwrap();
        let node = stbl(&entry, &tables, &[0, 5, 10]).unwrap();
        let types: Vec<FourCc> = node.children().iter().map(BoxNode::box_type).collect();
        assert_eq!(types, vec![FourCc::STSD, FourCc::STTS, FourCc::STSC, FourCc::STSZ, FourCc::STCO]);

        let mut reordered = all_key.clone();
        reordered[1] = reordered[1].with_keyframe(false).with_pts(reordered[1].dts + 10);
        let tables = SampleTables::derive(&reordered, ChunkPolicy::OnePerChunk).unwrap();
        let node = stbl(&entry, &tables, &[0, 5, 10]).unwrap();
        let types: Vec<FourCc> = node.children().iter().map(BoxNode::box_type).collect();
        assert_eq!(
            types,
            vec![FourCc::STSD, FourCc::STTS, FourCc::CTTS, FourCc::STSC, FourCc::STSZ, FourCc::STCO, FourCc::STSS]
        );
    }
}
