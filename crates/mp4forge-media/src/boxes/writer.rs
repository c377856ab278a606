//! Big-endian byte writer for box descriptions.

use super::{compute_size, BoxNode, Field, Width};
use crate::error::{Error, Result, Violation};
use bytes::BufMut;

/// Write `node` into `buf` starting at `offset`, returning the end offset.
///
/// The buffer must already be large enough; running out of room is reported
/// as [`Error::BoundsViolation`] and never truncated.
pub fn write(node: &BoxNode, buf: &mut [u8], offset: usize) -> Result<usize> {
    let mut writer = SliceWriter { buf, pos: offset };
    writer.write_box(node, &node.box_type().to_string())?;
    Ok(writer.pos)
}

struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl SliceWriter<'_> {
    fn reserve(&self, len: usize) -> Result<()> {
        let need = self.pos + len;
        if need > self.buf.len() {
            return Err(Error::BoundsViolation {
                need,
                have: self.buf.len(),
            });
        }
        Ok(())
    }

    fn put_uint(&mut self, value: u64, width: usize) -> Result<()> {
        self.reserve(width)?;
        let mut dst = &mut self.buf[self.pos..];
        dst.put_uint(value, width);
        self.pos += width;
        Ok(())
    }

    fn put_slice(&mut self, data: &[u8]) -> Result<()> {
        self.reserve(data.len())?;
        let mut dst = &mut self.buf[self.pos..];
        dst.put_slice(data);
        self.pos += data.len();
        Ok(())
    }

    fn write_box(&mut self, node: &BoxNode, path: &str) -> Result<()> {
        let start = self.pos;
        let size = compute_size(node);
        let length = u32::try_from(size)
            .map_err(|_| Error::structural(path, Violation::BoxTooLarge(size)))?;

        // Reserve the whole box up front so a short buffer fails before any byte lands.
        self.reserve(size as usize)?;

        self.put_uint(length as u64, 4)?;
        self.put_slice(node.box_type().as_bytes())?;

        if let Some(header) = node.header() {
            let flags = header
                .flags
                .resolve()
                .map_err(|violation| Error::structural(path, violation))?;
            self.put_uint(header.version as u64, 1)?;
            self.put_uint(flags as u64, 3)?;
        }

        for (i, field) in node.body().iter().enumerate() {
            self.write_field(field, &format!("{path}/body[{i}]"))?;
        }

        for (i, child) in node.children().iter().enumerate() {
            self.write_box(child, &format!("{path}/{}[{i}]", child.box_type()))?;
        }

        let written = self.pos - start;
        if written as u64 != size {
            return Err(Error::BoundsViolation {
                need: size as usize,
                have: written,
            });
        }
        tracing::trace!(path, size, "wrote box");
        Ok(())
    }

    fn write_field(&mut self, field: &Field, path: &str) -> Result<()> {
        match field {
            Field::FixedWidth { width, value } => self.put_scalar(*width, *value, path),
            Field::RawOpaque(data) => self.put_slice(data),
            Field::Array { width, values } => {
                for value in values {
                    self.put_scalar(*width, *value, path)?;
                }
                Ok(())
            }
            Field::Literal(code) => self.put_slice(code.as_bytes()),
            Field::InlineBox(inner) => self.write_box(inner, &format!("{path}/{}", inner.box_type())),
        }
    }

    fn put_scalar(&mut self, width: Width, value: u32, path: &str) -> Result<()> {
        width
            .check(value as u64)
            .map_err(|violation| Error::structural(path, violation))?;
        self.put_uint(value as u64, width.bytes())
    }
}
