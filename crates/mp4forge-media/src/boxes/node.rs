//! Box description schema: nodes, fields, and version/flags headers.

use super::FourCc;
use crate::error::Violation;
use std::collections::BTreeMap;

/// Width of a fixed-width scalar or array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U8,
    U16,
    U32,
}

impl Width {
    /// Encoded width in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Width for a byte count of 1, 2, or 4.
    pub fn from_bytes(bytes: u64) -> Option<Self> {
        match bytes {
            1 => Some(Self::U8),
            2 => Some(Self::U16),
            4 => Some(Self::U32),
            _ => None,
        }
    }

    /// Largest value representable in this width.
    pub fn max_value(self) -> u64 {
        match self {
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
        }
    }

    pub(crate) fn check(self, value: u64) -> Result<(), Violation> {
        if value > self.max_value() {
            return Err(Violation::ValueOutOfRange {
                width: self.bytes() as u8,
                value,
            });
        }
        Ok(())
    }
}

/// One element of a box body, emitted in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Big-endian unsigned scalar.
    FixedWidth { width: Width, value: u32 },
    /// Payload bytes copied verbatim. Only legal inside `mdat`.
    RawOpaque(Vec<u8>),
    /// Homogeneous run of big-endian scalars.
    Array { width: Width, values: Vec<u32> },
    /// Four-character code embedded in the body.
    Literal(FourCc),
    /// A complete box whose bytes sit inside the parent's body.
    InlineBox(Box<BoxNode>),
}

impl Field {
    pub fn u8(value: u8) -> Self {
        Self::FixedWidth {
            width: Width::U8,
            value: value as u32,
        }
    }

    pub fn u16(value: u16) -> Self {
        Self::FixedWidth {
            width: Width::U16,
            value: value as u32,
        }
    }

    pub fn u32(value: u32) -> Self {
        Self::FixedWidth {
            width: Width::U32,
            value,
        }
    }

    /// Scalar of an explicit width. Out-of-range values are caught by the
    /// validator.
    pub fn fixed(width: Width, value: u32) -> Self {
        Self::FixedWidth { width, value }
    }

    /// 16.16 fixed-point value, emitted as an opaque 4-byte scalar.
    pub fn fixed_16_16(integer: u16, fraction: u16) -> Self {
        Self::u32(((integer as u32) << 16) | fraction as u32)
    }

    /// 8.8 fixed-point value, emitted as an opaque 2-byte scalar.
    pub fn fixed_8_8(integer: u8, fraction: u8) -> Self {
        Self::u16(((integer as u16) << 8) | fraction as u16)
    }

    /// Byte string as a 1-byte-wide array. The bytes are copied.
    pub fn bytes(data: &[u8]) -> Self {
        Self::Array {
            width: Width::U8,
            values: data.iter().map(|&b| b as u32).collect(),
        }
    }

    /// `count` zero bytes.
    pub fn zeros(count: usize) -> Self {
        Self::Array {
            width: Width::U8,
            values: vec![0; count],
        }
    }

    pub fn array(width: Width, values: Vec<u32>) -> Self {
        Self::Array { width, values }
    }

    pub fn u32_array(values: Vec<u32>) -> Self {
        Self::Array {
            width: Width::U32,
            values,
        }
    }

    /// Opaque payload. The bytes are copied so later mutation of the
    /// caller's buffer cannot reach the encoded output.
    pub fn raw(data: &[u8]) -> Self {
        Self::RawOpaque(data.to_vec())
    }

    pub fn literal(code: impl Into<FourCc>) -> Self {
        Self::Literal(code.into())
    }

    pub fn inline(node: BoxNode) -> Self {
        Self::InlineBox(Box::new(node))
    }
}

/// Track-style named flag bits resolved against a name→mask mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    bits: BTreeMap<String, u32>,
    values: Vec<(String, bool)>,
}

impl FlagSet {
    /// Create a flag set over the given name→mask mapping.
    pub fn new<'a>(bits: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        Self {
            bits: bits
                .into_iter()
                .map(|(name, mask)| (name.to_string(), mask))
                .collect(),
            values: Vec::new(),
        }
    }

    /// Set a named flag on or off.
    pub fn set(mut self, name: impl Into<String>, on: bool) -> Self {
        self.values.push((name.into(), on));
        self
    }

    pub fn bits(&self) -> &BTreeMap<String, u32> {
        &self.bits
    }

    pub fn values(&self) -> &[(String, bool)] {
        &self.values
    }

    /// OR together the mask of every flag set to `true`.
    pub fn resolve(&self) -> Result<u32, Violation> {
        if self.bits.is_empty() && !self.values.is_empty() {
            return Err(Violation::MissingFlagBits);
        }
        let mut resolved = 0u32;
        for (name, on) in &self.values {
            let mask = self
                .bits
                .get(name)
                .ok_or_else(|| Violation::UnknownFlagBit(name.clone()))?;
            if *on {
                resolved |= mask;
            }
        }
        if resolved > 0x00FF_FFFF {
            return Err(Violation::FlagsOutOfRange(resolved));
        }
        Ok(resolved)
    }
}

/// Flags carried in a FullBox header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flags {
    /// Single-bit literal. Only 0 and 1 are accepted.
    Literal(u32),
    /// Named bits, resolved through a [`FlagSet`].
    Named(FlagSet),
}

impl Flags {
    /// Resolve to the 24-bit value written after the version byte.
    pub fn resolve(&self) -> Result<u32, Violation> {
        match self {
            Self::Literal(value @ (0 | 1)) => Ok(*value),
            Self::Literal(value) => Err(Violation::InvalidFlagValue(*value)),
            Self::Named(set) => set.resolve(),
        }
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::Literal(0)
    }
}

/// Version byte plus flags of a FullBox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullBoxHeader {
    pub version: u8,
    pub flags: Flags,
}

/// Description of one box: header, ordered body fields, ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxNode {
    box_type: FourCc,
    header: Option<FullBoxHeader>,
    body: Vec<Field>,
    children: Vec<BoxNode>,
}

impl BoxNode {
    /// Plain box without a version/flags header.
    pub fn new(box_type: impl Into<FourCc>) -> Self {
        Self {
            box_type: box_type.into(),
            header: None,
            body: Vec::new(),
            children: Vec::new(),
        }
    }

    /// FullBox with a literal (0 or 1) flag value.
    pub fn full(box_type: impl Into<FourCc>, version: u8, flags: u32) -> Self {
        Self::new(box_type).with_header(version, Flags::Literal(flags))
    }

    /// FullBox whose flags are resolved from named bits.
    pub fn full_named(box_type: impl Into<FourCc>, version: u8, flags: FlagSet) -> Self {
        Self::new(box_type).with_header(version, Flags::Named(flags))
    }

    pub fn with_header(mut self, version: u8, flags: Flags) -> Self {
        self.header = Some(FullBoxHeader { version, flags });
        self
    }

    /// Append a body field.
    pub fn field(mut self, field: Field) -> Self {
        self.body.push(field);
        self
    }

    /// Append several body fields.
    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.body.extend(fields);
        self
    }

    /// Append a child box.
    pub fn child(mut self, child: BoxNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child box if present.
    pub fn child_opt(mut self, child: Option<BoxNode>) -> Self {
        self.children.extend(child);
        self
    }

    pub fn push_field(&mut self, field: Field) {
        self.body.push(field);
    }

    pub fn push_child(&mut self, child: BoxNode) {
        self.children.push(child);
    }

    pub fn box_type(&self) -> FourCc {
        self.box_type
    }

    pub fn header(&self) -> Option<&FullBoxHeader> {
        self.header.as_ref()
    }

    pub fn body(&self) -> &[Field] {
        &self.body
    }

    pub fn children(&self) -> &[BoxNode] {
        &self.children
    }
}
