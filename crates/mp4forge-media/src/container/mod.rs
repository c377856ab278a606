//! Traversal of already-encoded box containers.
//!
//! Children of a plain container start 8 bytes in; children of a FullBox
//! container start 12 bytes in; a bare file buffer has no header at all.
//! [`Container::open`] decides which case applies by probing for a plausible
//! child header, and refuses to guess when neither position fits.

mod registry;

pub use registry::LayoutRegistry;

use crate::boxes::{is_printable, FourCc};
use crate::{Error, Result};

const HEADER_SIZE: usize = 8;
const LARGE_HEADER_SIZE: usize = 16;
const VERSION_FLAGS_SIZE: usize = 4;

/// A child box discovered during enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildBox {
    /// Box type code.
    pub box_type: FourCc,
    /// Box size including header.
    pub size: u64,
    /// Offset of the box's first byte within the parent buffer.
    pub offset: usize,
    /// Size of the header (8, or 16 for a 64-bit length).
    pub header_size: u8,
}

impl ChildBox {
    /// Offset one past the box's last byte.
    pub fn end(&self) -> usize {
        self.offset + self.size as usize
    }

    /// Offset where the box's payload starts (after the header).
    pub fn data_offset(&self) -> usize {
        self.offset + self.header_size as usize
    }
}

/// A view of one encoded box, or of a bare top-level sequence of boxes.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    data: &'a [u8],
    box_type: Option<FourCc>,
    header_size: usize,
    children_offset: usize,
}

/// Open a buffer using the offset heuristic alone.
pub fn open_container(bytes: &[u8]) -> Result<Container<'_>> {
    Container::open(bytes)
}

impl<'a> Container<'a> {
    /// Open a buffer using the offset heuristic alone.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        Self::open_with(data, &LayoutRegistry::new())
    }

    /// Open a buffer, consulting `registry` before the heuristic.
    pub fn open_with(data: &'a [u8], registry: &LayoutRegistry) -> Result<Self> {
        if !looks_like_single_box(data) {
            return Ok(Self::root(data));
        }

        let box_type = FourCc::from_bytes([data[4], data[5], data[6], data[7]]);
        let (declared, header_size) = match read_header(data, 0) {
            Some(header) => header,
            None => return Ok(Self::root(data)),
        };
        let size = match declared {
            // Extends to the end of the buffer.
            0 => data.len() as u64,
            n => n,
        };
        if size > data.len() as u64 {
            return Err(Error::TruncatedContainer {
                offset: 0,
                declared: size,
                available: data.len(),
            });
        }
        let view = &data[..size as usize];

        let children_offset = if let Some(offset) = registry.children_offset(box_type) {
            offset + (header_size - HEADER_SIZE)
        } else if view.len() == header_size {
            header_size
        } else if plausible_child(view, header_size + VERSION_FLAGS_SIZE) {
            header_size + VERSION_FLAGS_SIZE
        } else if plausible_child(view, header_size) {
            header_size
        } else {
            return Err(Error::AmbiguousContainer {
                box_type: box_type.to_string(),
                size: view.len(),
            });
        };

        if children_offset > view.len() {
            return Err(Error::TruncatedContainer {
                offset: 0,
                declared: children_offset as u64,
                available: view.len(),
            });
        }

        tracing::trace!(%box_type, size = view.len(), children_offset, "opened container");
        Ok(Self {
            data: view,
            box_type: Some(box_type),
            header_size,
            children_offset,
        })
    }

    fn root(data: &'a [u8]) -> Self {
        Self {
            data,
            box_type: None,
            header_size: 0,
            children_offset: 0,
        }
    }

    /// The box type, or `None` for a bare top-level sequence.
    pub fn box_type(&self) -> Option<FourCc> {
        self.box_type
    }

    pub fn is_root(&self) -> bool {
        self.box_type.is_none()
    }

    /// Offset within [`bytes`](Self::bytes) where children begin.
    pub fn children_offset(&self) -> usize {
        self.children_offset
    }

    /// The whole box, header included.
    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Everything after the box header (version/flags included).
    pub fn payload(&self) -> &'a [u8] {
        &self.data[self.header_size..]
    }

    /// Iterate over children in order.
    pub fn children(&self) -> Children<'a> {
        Children {
            data: self.data,
            pos: self.children_offset,
        }
    }

    /// Collect every child in order.
    pub fn enumerate_children(&self) -> Vec<ChildBox> {
        self.children().collect()
    }

    /// First child of the given type.
    pub fn find_child(&self, box_type: impl Into<FourCc>) -> Option<ChildBox> {
        let box_type = box_type.into();
        self.children().find(|c| c.box_type == box_type)
    }

    /// Bytes of one child, header included.
    pub fn child_bytes(&self, child: &ChildBox) -> &'a [u8] {
        &self.data[child.offset..child.end()]
    }

    /// Open one child as a container of its own.
    pub fn open_child(&self, child: &ChildBox, registry: &LayoutRegistry) -> Result<Container<'a>> {
        Container::open_with(self.child_bytes(child), registry)
    }

    /// Open a child box without traversing into it. Suitable for leaf boxes
    /// whose payload is read directly.
    pub fn leaf(&self, child: &ChildBox) -> Container<'a> {
        Container {
            data: self.child_bytes(child),
            box_type: Some(child.box_type),
            header_size: child.header_size as usize,
            children_offset: child.size as usize,
        }
    }

    /// Resolve a slash-separated path such as `moov/trak/mdia`, taking the
    /// first match at each level. The last segment is opened as a leaf, so it
    /// may be a table box rather than a container.
    pub fn find(&self, path: &str, registry: &LayoutRegistry) -> Result<Option<Container<'a>>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut current = *self;
        for (i, segment) in segments.iter().enumerate() {
            let code = FourCc::parse(segment)?;
            let Some(child) = current.find_child(code) else {
                return Ok(None);
            };
            current = if i + 1 == segments.len() {
                current.leaf(&child)
            } else {
                current.open_child(&child, registry)?
            };
        }
        Ok(Some(current))
    }

    /// Like [`find`](Self::find), but every segment, the last included, is
    /// opened as a container.
    pub fn find_container(&self, path: &str, registry: &LayoutRegistry) -> Result<Option<Container<'a>>> {
        let mut current = *self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let code = FourCc::parse(segment)?;
            let Some(child) = current.find_child(code) else {
                return Ok(None);
            };
            current = current.open_child(&child, registry)?;
        }
        Ok(Some(current))
    }
}

/// Iterator over the children of a [`Container`].
#[derive(Debug, Clone)]
pub struct Children<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Iterator for Children<'_> {
    type Item = ChildBox;

    fn next(&mut self) -> Option<ChildBox> {
        let (declared, header_size) = read_header(self.data, self.pos)?;
        if declared == 0 {
            return None;
        }
        if declared < header_size as u64 {
            tracing::warn!(offset = self.pos, declared, "child length below header size, stopping");
            self.pos = self.data.len();
            return None;
        }
        let available = self.data.len() - self.pos;
        if declared > available as u64 {
            tracing::warn!(offset = self.pos, declared, available, "truncated trailing box, stopping");
            self.pos = self.data.len();
            return None;
        }

        let offset = self.pos;
        let box_type = FourCc::from_bytes([
            self.data[offset + 4],
            self.data[offset + 5],
            self.data[offset + 6],
            self.data[offset + 7],
        ]);
        self.pos += declared as usize;
        Some(ChildBox {
            box_type,
            size: declared,
            offset,
            header_size: header_size as u8,
        })
    }
}

/// Read a box length at `pos`, following a 64-bit largesize when present.
/// Returns `(declared_length, header_size)`.
fn read_header(data: &[u8], pos: usize) -> Option<(u64, usize)> {
    if pos + HEADER_SIZE > data.len() {
        return None;
    }
    let size = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
    if size == 1 {
        if pos + LARGE_HEADER_SIZE > data.len() {
            return None;
        }
        let mut large = [0u8; 8];
        large.copy_from_slice(&data[pos + 8..pos + 16]);
        return Some((u64::from_be_bytes(large), LARGE_HEADER_SIZE));
    }
    Some((size as u64, HEADER_SIZE))
}

fn looks_like_single_box(data: &[u8]) -> bool {
    if data.len() < HEADER_SIZE {
        return false;
    }
    let code = &data[4..8];
    // ftyp only ever appears at file level.
    is_printable(code) && code != FourCc::FTYP.as_bytes()
}

/// Whether a child box header at `at` fits inside `view`.
fn plausible_child(view: &[u8], at: usize) -> bool {
    let Some((length, header_size)) = read_header(view, at) else {
        return false;
    };
    length >= header_size as u64
        && at as u64 + length <= view.len() as u64
        && is_printable(&view[at + 4..at + 8])
}
