//! Run-length collapse of per-sample values.

/// `count` consecutive occurrences of `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RunLengthEntry<T> {
    pub count: u32,
    pub value: T,
}

impl<T> RunLengthEntry<T> {
    pub fn new(count: u32, value: T) -> Self {
        Self { count, value }
    }
}

/// Collapse a sequence into the minimal run list whose expansion reproduces it.
///
/// Empty input yields an empty list; no entry ever has a zero count.
///
/// Counts are 32-bit on the wire, so a run longer than `u32::MAX` is split
/// into consecutive entries with the same value. That is the only case
/// where two adjacent entries share a value.
pub fn run_length<T, I>(values: I) -> Vec<RunLengthEntry<T>>
where
    T: PartialEq + Copy,
    I: IntoIterator<Item = T>,
{
    let mut entries: Vec<RunLengthEntry<T>> = Vec::new();
    for value in values {
        match entries.last_mut() {
            Some(run) if run.value == value && run.count < u32::MAX => run.count += 1,
            _ => entries.push(RunLengthEntry::new(1, value)),
        }
    }
    entries
}

/// Expand a run list back into per-item values.
pub fn expand<T: Copy>(entries: &[RunLengthEntry<T>]) -> Vec<T> {
    let total: usize = entries.iter().map(|e| e.count as usize).sum();
    let mut values = Vec::with_capacity(total);
    for entry in entries {
        values.extend(std::iter::repeat(entry.value).take(entry.count as usize));
    }
    values
}
