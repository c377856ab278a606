//! Structural validation of box descriptions.
//!
//! Runs depth-first over inline boxes and children before any size is
//! computed, so a violation anywhere aborts the encode with nothing written.

use super::{BoxNode, Field, FourCc};
use crate::error::{Error, Result, Violation};

/// Validate a box description tree.
pub fn validate(node: &BoxNode) -> Result<()> {
    validate_at(node, &node.box_type().to_string())
}

fn validate_at(node: &BoxNode, path: &str) -> Result<()> {
    if let Some(header) = node.header() {
        header
            .flags
            .resolve()
            .map_err(|violation| Error::structural(path, violation))?;
    }

    for (i, field) in node.body().iter().enumerate() {
        let field_path = format!("{path}/body[{i}]");
        match field {
            Field::FixedWidth { width, value } => {
                width
                    .check(*value as u64)
                    .map_err(|violation| Error::structural(&field_path, violation))?;
            }
            Field::RawOpaque(_) => {
                if node.box_type() != FourCc::MDAT {
                    return Err(Error::structural(field_path, Violation::OpaqueOutsideMediaData));
                }
            }
            Field::Array { width, values } => {
                for (j, value) in values.iter().enumerate() {
                    width.check(*value as u64).map_err(|violation| {
                        Error::structural(format!("{field_path}[{j}]"), violation)
                    })?;
                }
            }
            Field::Literal(_) => {}
            Field::InlineBox(inner) => {
                validate_at(inner, &format!("{field_path}/{}", inner.box_type()))?;
            }
        }
    }

    for (i, child) in node.children().iter().enumerate() {
        validate_at(child, &format!("{path}/{}[{i}]", child.box_type()))?;
    }

    Ok(())
}
