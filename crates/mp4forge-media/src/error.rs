//! Error types for mp4forge-media.

use thiserror::Error;

/// Result type for mp4forge-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for mp4forge-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A box description violates the schema. Nothing was written.
    #[error("Structural violation at {path}: {violation}")]
    Structural { path: String, violation: Violation },

    /// The input needs an encoding shape that is not implemented.
    #[error("Unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// The child-start offset of a container could not be resolved.
    #[error("Ambiguous container '{box_type}' ({size} bytes): cannot locate first child")]
    AmbiguousContainer { box_type: String, size: usize },

    /// A declared box length overruns the bytes available.
    #[error("Truncated container at offset {offset}: declared {declared} bytes, {available} available")]
    TruncatedContainer {
        offset: usize,
        declared: u64,
        available: usize,
    },

    /// A box required to read a track is absent.
    #[error("Missing box: {0}")]
    MissingBox(String),

    /// An encoded table or header is shorter than its declared contents.
    #[error("Malformed '{box_type}': {reason}")]
    MalformedBox { box_type: String, reason: String },

    /// Computed size and written length diverged. Always a bug.
    #[error("Bounds violation: need {need} bytes, have {have}")]
    BoundsViolation { need: usize, have: usize },

    /// JSON box description could not be read.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The specific schema rule a box description broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("box type {0:?} is not a 4-character code")]
    InvalidType(String),

    #[error("box-shaped field in body must be wrapped as an inline box")]
    RawBoxInBody,

    #[error("children must be plain boxes, found a wrapped inline box")]
    WrappedBoxInChildren,

    #[error("flag {0:?} is not defined in flagBits")]
    UnknownFlagBit(String),

    #[error("flag {0:?} must be a boolean")]
    NonBooleanFlag(String),

    #[error("named flags require a flagBits mapping")]
    MissingFlagBits,

    #[error("numeric flags must be 0 or 1, got {0}")]
    InvalidFlagValue(u32),

    #[error("resolved flags {0:#x} do not fit in 24 bits")]
    FlagsOutOfRange(u32),

    #[error("value {value} does not fit in {width} byte(s)")]
    ValueOutOfRange { width: u8, value: u64 },

    #[error("raw payload bytes are only allowed inside 'mdat'")]
    OpaqueOutsideMediaData,

    #[error("malformed field: {0}")]
    MalformedField(String),

    #[error("box size {0} exceeds the 32-bit length prefix")]
    BoxTooLarge(u64),
}

impl Error {
    /// Create a structural violation error at the given box path.
    pub fn structural(path: impl Into<String>, violation: Violation) -> Self {
        Self::Structural {
            path: path.into(),
            violation,
        }
    }

    /// Create an unsupported layout error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedLayout(msg.into())
    }

    /// Create a malformed box error.
    pub fn malformed(box_type: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::MalformedBox {
            box_type: box_type.to_string(),
            reason: reason.into(),
        }
    }

    /// The schema violation, if this is a structural error.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Self::Structural { violation, .. } => Some(violation),
            _ => None,
        }
    }
}
