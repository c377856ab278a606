//! Box-tree serialization engine.
//!
//! A [`BoxNode`] describes one box: an optional version/flags header, an
//! ordered body of [`Field`]s, and ordered children. Boxes that must appear
//! inside a body (sample entries in `stsd`, configuration records in a
//! sample entry) are carried as [`Field::InlineBox`]; boxes appended after
//! the body go in the children list. The two slots have different types, so
//! a box cannot end up in the wrong one.
//!
//! Encoding always runs validate → size → allocate → write.

mod describe;
mod fourcc;
mod node;
mod size;
mod validate;
mod writer;

pub use describe::{parse_box, parse_box_str};
pub use fourcc::FourCc;
pub(crate) use fourcc::is_printable;
pub use node::{BoxNode, Field, FlagSet, Flags, FullBoxHeader, Width};
pub use size::{compute_size, field_size, BOX_HEADER_SIZE, FULL_BOX_HEADER_SIZE};
pub use validate::validate;
pub use writer::write;

use crate::{Error, Result};

/// Validate, size, allocate, and write a single box.
pub fn serialize(node: &BoxNode) -> Result<Vec<u8>> {
    serialize_all(std::slice::from_ref(node))
}

/// Serialize a sequence of top-level boxes back to back, as in a file.
pub fn serialize_all(nodes: &[BoxNode]) -> Result<Vec<u8>> {
    for node in nodes {
        validate(node)?;
    }

    let total: u64 = nodes.iter().map(compute_size).sum();
    let total = usize::try_from(total)
        .map_err(|_| Error::unsupported(format!("{total} bytes exceeds addressable memory")))?;

    let mut buf = vec![0u8; total];
    let mut offset = 0;
    for node in nodes {
        offset = write(node, &mut buf, offset)?;
    }

    if offset != total {
        return Err(Error::BoundsViolation {
            need: total,
            have: offset,
        });
    }

    tracing::debug!(boxes = nodes.len(), bytes = total, "serialized box tree");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Violation;
    use assert_matches::assert_matches;

    #[test]
    fn test_serialize_matches_computed_size() {
        let node = BoxNode::new(*b"moov")
            .child(BoxNode::full(*b"mvhd", 0, 0).fields([Field::u32(0), Field::u32(1000)]))
            .child(BoxNode::new(*b"udta"));
        let bytes = serialize(&node).unwrap();
        assert_eq!(bytes.len() as u64, compute_size(&node));
        assert_eq!(&bytes[..8], &[0, 0, 0, 36, b'm', b'o', b'o', b'v']);
    }

    #[test]
    fn test_serialize_all_concatenates() {
        let a = BoxNode::new(*b"free");
        let b = BoxNode::new(*b"skip").field(Field::u8(7));
        let bytes = serialize_all(&[a, b]).unwrap();
        assert_eq!(
            bytes,
            [0, 0, 0, 8, b'f', b'r', b'e', b'e', 0, 0, 0, 9, b's', b'k', b'i', b'p', 7]
        );
    }

    #[test]
    fn test_serialize_validates_first() {
        let node = BoxNode::new(*b"moov").child(BoxNode::new(*b"avcC").field(Field::raw(&[1])));
        assert_matches!(
            serialize(&node).unwrap_err().violation(),
            Some(Violation::OpaqueOutsideMediaData)
        );
    }

    #[test]
    fn test_serialized_payload_is_independent_copy() {
        let mut payload = vec![1u8, 2, 3, 4];
        let node = BoxNode::new(*b"mdat").field(Field::raw(&payload));
        payload.fill(0);
        let bytes = serialize(&node).unwrap();
        assert_eq!(&bytes[8..], &[1, 2, 3, 4]);
    }
}
