// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{Field, Kind, Object, Record, Slot, View};
use crate::error::{Error, Result};

use serde_json::{Map, Value};

fn mismatch(key: &str, kind: Kind) -> Error {
    Error::Validation {
        property: key.into(),
        expected: kind.expected(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(..) => "bool",
        Value::Number(..) => "number",
        Value::String(..) => "string",
        Value::Array(..) => "array",
        Value::Object(..) => "object",
    }
}

fn decode_field(slot: Slot<'_>, field: &str, kind: Kind, object: &Map<String, Value>) -> Result<()> {
    // Base records share the container's object.
    let slot = match slot {
        Slot::Parent(parent) => return parent.decode_from(object),
        slot => slot,
    };

    let value = match object.get(field) {
        None | Some(Value::Null) => return Ok(()),
        Some(value) => value,
    };

    match (slot, value) {
        (Slot::String(dst), Value::String(s)) => *dst = s.clone(),

        (Slot::Int64(dst), Value::Number(n)) => match n.as_i64() {
            Some(n) => *dst = n,
            None => return Err(mismatch(field, kind)),
        },

        (Slot::Bool(dst), Value::Bool(b)) => *dst = *b,

        (Slot::StringList(dst), Value::Array(items)) => {
            *dst = items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        }

        (Slot::Struct(dst), Value::Object(inner)) => dst.decode_from(inner)?,

        // Elements decoded before a failure stay in the list; the caller
        // drops the whole record on error.
        (Slot::StructList(dst), Value::Array(items)) => {
            for item in items {
                match item {
                    Value::Object(inner) => dst.push_default().decode_from(inner)?,
                    _ => return Err(mismatch(field, Kind::Struct)),
                }
            }
        }

        (Slot::StringMap(dst), Value::Object(members)) => {
            let mut map = std::collections::BTreeMap::new();
            for (key, value) in members {
                match value {
                    Value::String(s) => map.insert(key.clone(), s.clone()),
                    _ => return Err(mismatch(key, Kind::String)),
                };
            }
            *dst = map;
        }

        (Slot::StringSet(dst), Value::Object(members)) => *dst = members.keys().cloned().collect(),

        _ => return Err(mismatch(field, kind)),
    }

    Ok(())
}

pub(super) fn decode_fields<T: 'static>(
    record: &mut T,
    schema: &[Field<T>],
    object: &Map<String, Value>,
) -> Result<()> {
    for field in schema {
        decode_field((field.slot)(record), field.key, field.kind, object)?;
    }

    Ok(())
}

fn encode_object(object: &dyn Object) -> Map<String, Value> {
    let mut map = Map::new();
    object.encode_into(&mut map);
    map
}

fn encode_field(view: View<'_>) -> Option<Value> {
    Some(match view {
        View::String(s) if s.is_empty() => return None,
        View::String(s) => Value::String(s.clone()),

        View::Int64(n) => Value::from(*n),

        View::Bool(b) if !*b => return None,
        View::Bool(..) => Value::Bool(true),

        View::StringList(l) if l.is_empty() => return None,
        View::StringList(l) => l.iter().cloned().map(Value::String).collect(),

        // Flattened by the caller.
        View::Parent(..) => return None,

        View::Struct(o) => match encode_object(o) {
            map if map.is_empty() => return None,
            map => Value::Object(map),
        },

        View::StructList(l) if l.len() == 0 => return None,
        View::StructList(l) => (0..l.len())
            .map(|i| Value::Object(encode_object(l.get(i))))
            .collect(),

        View::StringMap(m) if m.is_empty() => return None,
        View::StringMap(m) => Value::Object(
            m.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ),

        View::StringSet(s) if s.is_empty() => return None,
        // Repeated entries collapse into one key.
        View::StringSet(s) => Value::Object(
            s.iter()
                .map(|k| (k.clone(), Value::Object(Map::new())))
                .collect(),
        ),
    })
}

pub(super) fn encode_fields<T: 'static>(record: &T, schema: &[Field<T>], object: &mut Map<String, Value>) {
    // Base fields first, so a derived document starts with what it inherits.
    for field in schema.iter().filter(|f| f.kind == Kind::Parent) {
        if let View::Parent(parent) = (field.view)(record) {
            parent.encode_into(object);
        }
    }

    for field in schema.iter().filter(|f| f.kind != Kind::Parent) {
        if let Some(value) = encode_field((field.view)(record)) {
            object.insert(field.key.into(), value);
        }
    }
}

/// Parses a document whose root must be a JSON object
pub fn parse(bytes: &[u8]) -> Result<Value> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::Object(..) => Ok(value),
        _ => Err(Error::NoRootObject),
    }
}

/// Decodes a record from a JSON object
///
/// On error the partially decoded record is dropped; nothing leaks and nothing
/// half-built escapes to the caller.
pub fn from_value<T: Record>(value: &Value) -> Result<T> {
    let object = match value {
        Value::Object(object) => object,
        other => return Err(Error::NotAnObject(type_name(other))),
    };

    let mut record = T::default();
    record.decode_from(object)?;
    Ok(record)
}

pub fn from_slice<T: Record>(bytes: &[u8]) -> Result<T> {
    from_value(&parse(bytes)?)
}

/// Encodes a record, leaving out every zero-valued member except integers
pub fn to_value<T: Record>(record: &T) -> Value {
    Value::Object(encode_object(record))
}

/// Encodes a record as pretty-printed JSON text
pub fn to_bytes<T: Record>(record: &T) -> Vec<u8> {
    format!("{:#}", to_value(record)).into_bytes()
}
