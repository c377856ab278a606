//! Decoders for the sample table boxes inside `stbl`.
//!
//! Every function takes the box payload (everything after the 8-byte
//! header, version/flags included).

use bytes::Buf;

use crate::boxes::FourCc;
use crate::tables::{RunLengthEntry, SampleSizes, SampleToChunk};
use crate::{Error, Result};

/// Big-endian cursor over a FullBox payload.
pub(crate) struct TableReader<'a> {
    box_type: FourCc,
    version: u8,
    data: &'a [u8],
}

impl<'a> TableReader<'a> {
    /// Consume the version/flags word.
    pub(crate) fn new(box_type: FourCc, payload: &'a [u8]) -> Result<Self> {
        let mut data = payload;
        if data.remaining() < 4 {
            return Err(Error::malformed(box_type, "missing version and flags"));
        }
        let version = data.get_u8();
        data.advance(3);
        Ok(Self {
            box_type,
            version,
            data,
        })
    }

    pub(crate) fn version(&self) -> u8 {
        self.version
    }

    fn need(&self, len: usize) -> Result<()> {
        if self.data.remaining() < len {
            return Err(Error::malformed(
                self.box_type,
                format!("need {len} more bytes, {} remain", self.data.remaining()),
            ));
        }
        Ok(())
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<()> {
        self.need(len)?;
        self.data.advance(len);
        Ok(())
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        self.need(2)?;
        Ok(self.data.get_u16())
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.data.get_u32())
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        self.need(8)?;
        Ok(self.data.get_u64())
    }

    /// A 32-bit value in version 0, 64-bit in version 1.
    pub(crate) fn versioned(&mut self) -> Result<u64> {
        if self.version == 1 {
            self.u64()
        } else {
            self.u32().map(u64::from)
        }
    }

    /// Read an entry count and check that `entry_size`-byte entries fit.
    fn entry_count(&mut self, entry_size: usize) -> Result<usize> {
        let count = self.u32()? as usize;
        let needed = count.checked_mul(entry_size).ok_or_else(|| {
            Error::malformed(self.box_type, format!("entry count {count} overflows"))
        })?;
        if needed > self.data.remaining() {
            return Err(Error::malformed(
                self.box_type,
                format!(
                    "declares {count} entries ({needed} bytes), only {} bytes remain",
                    self.data.remaining()
                ),
            ));
        }
        Ok(count)
    }

    fn run_lengths(&mut self) -> Result<Vec<RunLengthEntry<u32>>> {
        let count = self.entry_count(8)?;
        Ok((0..count)
            .map(|_| RunLengthEntry::new(self.data.get_u32(), self.data.get_u32()))
            .collect())
    }

    fn u32_list(&mut self) -> Result<Vec<u32>> {
        let count = self.entry_count(4)?;
        Ok((0..count).map(|_| self.data.get_u32()).collect())
    }
}

/// `stts` entries.
pub fn parse_stts(payload: &[u8]) -> Result<Vec<RunLengthEntry<u32>>> {
    TableReader::new(FourCc::STTS, payload)?.run_lengths()
}

/// `ctts` entries. Version 1 offsets are signed; negative ones are rejected.
pub fn parse_ctts(payload: &[u8]) -> Result<Vec<RunLengthEntry<u32>>> {
    let mut reader = TableReader::new(FourCc::CTTS, payload)?;
    let entries = reader.run_lengths()?;
    if reader.version() == 1 {
        if let Some(entry) = entries.iter().find(|e| (e.value as i32) < 0) {
            return Err(Error::unsupported(format!(
                "negative composition offset {} is not supported",
                entry.value as i32
            )));
        }
    }
    Ok(entries)
}

/// `stsc` entries in file order.
pub fn parse_stsc(payload: &[u8]) -> Result<Vec<SampleToChunk>> {
    let mut reader = TableReader::new(FourCc::STSC, payload)?;
    let count = reader.entry_count(12)?;
    Ok((0..count)
        .map(|_| SampleToChunk {
            first_chunk: reader.data.get_u32(),
            samples_per_chunk: reader.data.get_u32(),
            description_index: reader.data.get_u32(),
        })
        .collect())
}

/// `stsz` sample sizes.
pub fn parse_stsz(payload: &[u8]) -> Result<SampleSizes> {
    let mut reader = TableReader::new(FourCc::STSZ, payload)?;
    let uniform = reader.u32()?;
    if uniform != 0 {
        let count = reader.u32()?;
        return Ok(SampleSizes::Uniform {
            size: uniform,
            count,
        });
    }
    reader.u32_list().map(SampleSizes::PerSample)
}

/// `stco` offsets, widened.
pub fn parse_stco(payload: &[u8]) -> Result<Vec<u64>> {
    let offsets = TableReader::new(FourCc::STCO, payload)?.u32_list()?;
    Ok(offsets.into_iter().map(u64::from).collect())
}

/// `co64` offsets.
pub fn parse_co64(payload: &[u8]) -> Result<Vec<u64>> {
    let mut reader = TableReader::new(FourCc::CO64, payload)?;
    let count = reader.entry_count(8)?;
    Ok((0..count).map(|_| reader.data.get_u64()).collect())
}

/// `stss` 1-based sync sample numbers.
pub fn parse_stss(payload: &[u8]) -> Result<Vec<u32>> {
    TableReader::new(FourCc::STSS, payload)?.u32_list()
}
