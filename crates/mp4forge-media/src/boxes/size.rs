//! Serialized size calculation.

use super::{BoxNode, Field};

/// Length prefix plus type code.
pub const BOX_HEADER_SIZE: u64 = 8;

/// Version byte plus three flag bytes.
pub const FULL_BOX_HEADER_SIZE: u64 = 4;

/// Exact serialized length of a box, including its header and children.
pub fn compute_size(node: &BoxNode) -> u64 {
    let mut size = BOX_HEADER_SIZE;
    if node.header().is_some() {
        size += FULL_BOX_HEADER_SIZE;
    }
    size += node.body().iter().map(field_size).sum::<u64>();
    size += node.children().iter().map(compute_size).sum::<u64>();
    size
}

/// Encoded width of one body field.
pub fn field_size(field: &Field) -> u64 {
    match field {
        Field::FixedWidth { width, .. } => width.bytes() as u64,
        Field::RawOpaque(data) => data.len() as u64,
        Field::Array { width, values } => (width.bytes() * values.len()) as u64,
        Field::Literal(_) => 4,
        Field::InlineBox(inner) => compute_size(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::Width;

    #[test]
    fn test_empty_boxes() {
        assert_eq!(compute_size(&BoxNode::new(*b"moov")), 8);
        assert_eq!(compute_size(&BoxNode::full(*b"stts", 0, 0)), 12);
    }

    #[test]
    fn test_field_widths() {
        let node = BoxNode::full(*b"test", 0, 0)
            .field(Field::u8(1))
            .field(Field::u16(2))
            .field(Field::u32(3))
            .field(Field::literal(*b"isom"))
            .field(Field::array(Width::U16, vec![1, 2, 3]));
        assert_eq!(compute_size(&node), 12 + 1 + 2 + 4 + 4 + 6);
    }

    #[test]
    fn test_inline_and_children_recursive() {
        let inline = BoxNode::new(*b"avcC").field(Field::bytes(&[0; 10]));
        let node = BoxNode::full(*b"stsd", 0, 0)
            .field(Field::u32(1))
            .field(Field::inline(inline))
            .child(BoxNode::new(*b"free").field(Field::zeros(4)));
        assert_eq!(compute_size(&node), 12 + 4 + 18 + 12);
    }

    #[test]
    fn test_raw_payload_length() {
        let node = BoxNode::new(*b"mdat").field(Field::raw(&[0xAB; 1000]));
        assert_eq!(compute_size(&node), 1008);
    }
}
