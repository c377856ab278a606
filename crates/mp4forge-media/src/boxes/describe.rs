//! JSON box descriptions.
//!
//! Accepts the dynamic description shape and converts it into a typed
//! [`BoxNode`]. This is the one place where a box can be misplaced (a bare
//! box in a body, or a wrapped box in a children list), so those shapes are
//! rejected here rather than silently dropped.
//!
//! ```json
//! { "type": "tkhd", "version": 0,
//!   "flags": { "enabled": true }, "flagBits": { "enabled": 1 },
//!   "body": [ { "u32": 1 }, { "fourcc": "vide" }, { "box": { "type": "pasp" } } ],
//!   "children": [ { "type": "free" } ] }
//! ```

use super::{validate, BoxNode, Field, FlagSet, Flags, FourCc, Width};
use crate::error::{Error, Result, Violation};
use serde_json::{Map, Value};

const BOX_KEYS: &[&str] = &["type", "version", "flags", "flagBits", "body", "children"];

/// Parse and validate a JSON box description.
pub fn parse_box(value: &Value) -> Result<BoxNode> {
    let path = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("<root>")
        .to_string();
    let node = parse_node(value, &path)?;
    validate(&node)?;
    Ok(node)
}

/// Parse and validate a JSON box description from text.
pub fn parse_box_str(json: &str) -> Result<BoxNode> {
    let value: Value = serde_json::from_str(json)?;
    parse_box(&value)
}

fn malformed(path: &str, msg: impl Into<String>) -> Error {
    Error::structural(path, Violation::MalformedField(msg.into()))
}

fn parse_node(value: &Value, path: &str) -> Result<BoxNode> {
    let obj = value
        .as_object()
        .ok_or_else(|| malformed(path, "box description must be an object"))?;

    if let Some(key) = obj.keys().find(|k| !BOX_KEYS.contains(&k.as_str())) {
        return Err(malformed(path, format!("unknown box key {key:?}")));
    }

    let type_str = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::structural(path, Violation::InvalidType(String::new())))?;
    let box_type = FourCc::parse(type_str)
        .map_err(|_| Error::structural(path, Violation::InvalidType(type_str.to_string())))?;

    let mut node = BoxNode::new(box_type);

    match (obj.get("version"), obj.get("flags")) {
        (Some(version), flags) => {
            let version = version
                .as_u64()
                .filter(|v| *v <= u8::MAX as u64)
                .ok_or_else(|| malformed(path, "version must be an integer 0-255"))?;
            let flags = match flags {
                Some(flags) => parse_flags(flags, obj.get("flagBits"), path)?,
                None => Flags::default(),
            };
            node = node.with_header(version as u8, flags);
        }
        (None, Some(_)) => return Err(malformed(path, "flags given without version")),
        (None, None) => {}
    }

    if let Some(body) = obj.get("body") {
        let body = body
            .as_array()
            .ok_or_else(|| malformed(path, "body must be a list"))?;
        for (i, field) in body.iter().enumerate() {
            node.push_field(parse_field(field, &format!("{path}/body[{i}]"))?);
        }
    }

    if let Some(children) = obj.get("children") {
        let children = children
            .as_array()
            .ok_or_else(|| malformed(path, "children must be a list"))?;
        for (i, child) in children.iter().enumerate() {
            let child_type = child.get("type").and_then(Value::as_str).unwrap_or("?");
            let child_path = format!("{path}/{child_type}[{i}]");
            if child.get("box").is_some() {
                return Err(Error::structural(child_path, Violation::WrappedBoxInChildren));
            }
            node.push_child(parse_node(child, &child_path)?);
        }
    }

    Ok(node)
}

fn parse_flags(flags: &Value, bits: Option<&Value>, path: &str) -> Result<Flags> {
    match flags {
        Value::Number(n) => {
            let value = n
                .as_u64()
                .ok_or_else(|| malformed(path, "flags must be a non-negative integer"))?;
            let value = u32::try_from(value)
                .map_err(|_| Error::structural(path, Violation::FlagsOutOfRange(u32::MAX)))?;
            Ok(Flags::Literal(value))
        }
        Value::Object(named) => {
            let bits = match bits {
                Some(Value::Object(bits)) => parse_flag_bits(bits, path)?,
                Some(_) => return Err(malformed(path, "flagBits must be an object")),
                None => return Err(Error::structural(path, Violation::MissingFlagBits)),
            };
            let mut set = FlagSet::new(bits.iter().map(|(name, mask)| (name.as_str(), *mask)));
            for (name, on) in named {
                let on = on
                    .as_bool()
                    .ok_or_else(|| Error::structural(path, Violation::NonBooleanFlag(name.clone())))?;
                set = set.set(name.clone(), on);
            }
            Ok(Flags::Named(set))
        }
        _ => Err(malformed(path, "flags must be a number or an object of booleans")),
    }
}

fn parse_flag_bits(bits: &Map<String, Value>, path: &str) -> Result<Vec<(String, u32)>> {
    bits.iter()
        .map(|(name, mask)| {
            mask.as_u64()
                .and_then(|m| u32::try_from(m).ok())
                .map(|m| (name.clone(), m))
                .ok_or_else(|| malformed(path, format!("flagBits[{name:?}] must be a 32-bit integer")))
        })
        .collect()
}

fn parse_field(value: &Value, path: &str) -> Result<Field> {
    let obj = value
        .as_object()
        .ok_or_else(|| malformed(path, "field must be an object"))?;

    // A box description sitting directly in a body would otherwise match no
    // field shape and vanish from the size and write passes.
    if obj.contains_key("type") && (obj.contains_key("body") || obj.contains_key("children")) {
        return Err(Error::structural(path, Violation::RawBoxInBody));
    }

    if obj.len() != 1 {
        return Err(malformed(path, "field must have exactly one key"));
    }

    let (key, inner) = obj.iter().next().ok_or_else(|| malformed(path, "empty field"))?;
    match key.as_str() {
        "u8" => Ok(Field::fixed(Width::U8, scalar(inner, Width::U8, path)?)),
        "u16" => Ok(Field::fixed(Width::U16, scalar(inner, Width::U16, path)?)),
        "u32" => Ok(Field::fixed(Width::U32, scalar(inner, Width::U32, path)?)),
        "fourcc" => {
            let code = inner
                .as_str()
                .ok_or_else(|| malformed(path, "fourcc must be a string"))?;
            let code = FourCc::parse(code)
                .map_err(|_| Error::structural(path, Violation::InvalidType(code.to_string())))?;
            Ok(Field::Literal(code))
        }
        "raw" => {
            let bytes = inner
                .as_array()
                .ok_or_else(|| malformed(path, "raw must be a list of bytes"))?
                .iter()
                .map(|b| scalar(b, Width::U8, path).map(|b| b as u8))
                .collect::<Result<Vec<u8>>>()?;
            Ok(Field::RawOpaque(bytes))
        }
        "array" => {
            let width = inner
                .get("width")
                .and_then(Value::as_u64)
                .and_then(Width::from_bytes)
                .ok_or_else(|| malformed(path, "array width must be 1, 2, or 4"))?;
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .ok_or_else(|| malformed(path, "array values must be a list"))?
                .iter()
                .map(|v| scalar(v, width, path))
                .collect::<Result<Vec<u32>>>()?;
            Ok(Field::Array { width, values })
        }
        "box" => {
            let box_type = inner.get("type").and_then(Value::as_str).unwrap_or("?");
            Ok(Field::inline(parse_node(inner, &format!("{path}/{box_type}"))?))
        }
        other => Err(malformed(path, format!("unknown field kind {other:?}"))),
    }
}

fn scalar(value: &Value, width: Width, path: &str) -> Result<u32> {
    let raw = value
        .as_u64()
        .ok_or_else(|| malformed(path, "expected a non-negative integer"))?;
    width
        .check(raw)
        .map_err(|violation| Error::structural(path, violation))?;
    Ok(raw as u32)
}
