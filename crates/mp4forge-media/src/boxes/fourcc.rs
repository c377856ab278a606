//! Four-character box type codes.

use crate::error::{Error, Result, Violation};
use std::fmt;

/// Four-character box type code.
///
/// Codes are raw bytes. Characters up to U+00FF map to one byte each, so
/// `"©nam"` becomes `[0xA9, b'n', b'a', b'm']`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const FTYP: Self = Self(*b"ftyp");
    pub const MOOV: Self = Self(*b"moov");
    pub const MDAT: Self = Self(*b"mdat");
    pub const MVHD: Self = Self(*b"mvhd");
    pub const TRAK: Self = Self(*b"trak");
    pub const TKHD: Self = Self(*b"tkhd");
    pub const EDTS: Self = Self(*b"edts");
    pub const ELST: Self = Self(*b"elst");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MDHD: Self = Self(*b"mdhd");
    pub const HDLR: Self = Self(*b"hdlr");
    pub const MINF: Self = Self(*b"minf");
    pub const VMHD: Self = Self(*b"vmhd");
    pub const DINF: Self = Self(*b"dinf");
    pub const DREF: Self = Self(*b"dref");
    pub const URL: Self = Self(*b"url ");
    pub const STBL: Self = Self(*b"stbl");
    pub const STSD: Self = Self(*b"stsd");
    pub const AVC1: Self = Self(*b"avc1");
    pub const HVC1: Self = Self(*b"hvc1");
    pub const AVCC: Self = Self(*b"avcC");
    pub const HVCC: Self = Self(*b"hvcC");
    pub const PASP: Self = Self(*b"pasp");
    pub const BTRT: Self = Self(*b"btrt");
    pub const STTS: Self = Self(*b"stts");
    pub const CTTS: Self = Self(*b"ctts");
    pub const STSC: Self = Self(*b"stsc");
    pub const STSZ: Self = Self(*b"stsz");
    pub const STCO: Self = Self(*b"stco");
    pub const CO64: Self = Self(*b"co64");
    pub const STSS: Self = Self(*b"stss");
    pub const FREE: Self = Self(*b"free");
    pub const UDTA: Self = Self(*b"udta");

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Parse a code from text, rejecting anything that is not exactly four
    /// single-byte characters.
    pub fn parse(code: &str) -> Result<Self> {
        let mut bytes = [0u8; 4];
        let mut len = 0;
        for ch in code.chars() {
            let value = ch as u32;
            if len == 4 || value > 0xFF {
                return Err(Error::structural(code, Violation::InvalidType(code.to_string())));
            }
            bytes[len] = value as u8;
            len += 1;
        }
        if len != 4 {
            return Err(Error::structural(code, Violation::InvalidType(code.to_string())));
        }
        Ok(Self(bytes))
    }

    /// Raw bytes of the code.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Whether every byte is printable ASCII (0x20..=0x7E).
    pub fn is_printable(&self) -> bool {
        is_printable(&self.0)
    }
}

/// Whether every byte is printable ASCII (0x20..=0x7E).
pub(crate) fn is_printable(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| (0x20..=0x7E).contains(b))
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            // Latin-1 decode, so 0xA9 prints as '©'.
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({:?})", self.to_string())
    }
}

impl From<[u8; 4]> for FourCc {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl From<&[u8; 4]> for FourCc {
    fn from(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }
}
