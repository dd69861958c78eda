// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

//! Declarative JSON mapping
//!
//! A record type describes its wire shape as a static table of [`Field`]s.
//! Each field names its JSON key, a [`Kind`] and a pair of accessors into the
//! record. The generic marshaller in [`codec`] walks that table in both
//! directions, so decoding and encoding share one description and no
//! per-type serialization code is written by hand.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::Result;

/// Declares a schema field whose accessors borrow `record.$name`
///
/// ```ignore
/// field!(String, media_type, "mediaType")
/// field!(Parent, descriptor)
/// ```
macro_rules! field {
    (Parent, $name:ident) => {
        $crate::json::Field {
            name: stringify!($name),
            key: "",
            kind: $crate::json::Kind::Parent,
            view: |x| $crate::json::View::Parent(&x.$name),
            slot: |x| $crate::json::Slot::Parent(&mut x.$name),
        }
    };

    ($kind:ident, $name:ident, $key:expr) => {
        $crate::json::Field {
            name: stringify!($name),
            key: $key,
            kind: $crate::json::Kind::$kind,
            view: |x| $crate::json::View::$kind(&x.$name),
            slot: |x| $crate::json::Slot::$kind(&mut x.$name),
        }
    };
}

mod codec;

pub use codec::{from_slice, from_value, parse, to_bytes, to_value};

/// The wire type of a schema field
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    String,
    Int64,
    Bool,

    /// An array of strings; non-string elements are skipped on decode
    StringList,

    /// A base record whose fields live in the same JSON object
    Parent,

    /// A nested record in its own JSON object
    Struct,

    /// An array of nested records
    StructList,

    /// A JSON object of string values
    StringMap,

    /// A set of strings stored as the keys of a JSON object (`{"80/tcp": {}}`)
    ///
    /// Held as a list in document order; JSON keys are already unique.
    StringSet,
}

impl Kind {
    /// The JSON kind a member must have to decode into this field
    pub fn expected(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Int64 => "int64",
            Kind::Bool => "bool",
            Kind::StringList | Kind::StructList => "array",
            Kind::Parent | Kind::Struct | Kind::StringMap | Kind::StringSet => "object",
        }
    }
}

/// Shared access to the storage behind a field
pub enum View<'a> {
    String(&'a String),
    Int64(&'a i64),
    Bool(&'a bool),
    StringList(&'a Vec<String>),
    Parent(&'a dyn Object),
    Struct(&'a dyn Object),
    StructList(&'a dyn ObjectList),
    StringMap(&'a BTreeMap<String, String>),
    StringSet(&'a Vec<String>),
}

/// Exclusive access to the storage behind a field
pub enum Slot<'a> {
    String(&'a mut String),
    Int64(&'a mut i64),
    Bool(&'a mut bool),
    StringList(&'a mut Vec<String>),
    Parent(&'a mut dyn Object),
    Struct(&'a mut dyn Object),
    StructList(&'a mut dyn ObjectList),
    StringMap(&'a mut BTreeMap<String, String>),
    StringSet(&'a mut Vec<String>),
}

/// One entry of a record's schema
///
/// Fields are plain data. Build them with the `field!` macro, which keeps the
/// kind tag and the accessors in agreement.
pub struct Field<T: 'static> {
    /// The record member this field maps
    pub name: &'static str,

    /// The JSON member name (empty for `Kind::Parent`)
    pub key: &'static str,

    pub kind: Kind,

    pub view: for<'a> fn(&'a T) -> View<'a>,

    pub slot: for<'a> fn(&'a mut T) -> Slot<'a>,
}

impl<T: 'static> std::fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A type mapped to a JSON object by a static schema
///
/// `Default` provides the zero value every field starts from: members that are
/// absent or `null` in a document are simply left at it.
pub trait Record: Default + 'static {
    const SCHEMA: &'static [Field<Self>];
}

/// Type-erased decode/encode of a record's fields into a JSON object
///
/// Implemented for every [`Record`]; nested and base records are reached
/// through this trait so one schema can point at another of a different type.
pub trait Object {
    fn decode_from(&mut self, object: &Map<String, Value>) -> Result<()>;

    fn encode_into(&self, object: &mut Map<String, Value>);
}

impl<T: Record> Object for T {
    fn decode_from(&mut self, object: &Map<String, Value>) -> Result<()> {
        codec::decode_fields(self, T::SCHEMA, object)
    }

    fn encode_into(&self, object: &mut Map<String, Value>) {
        codec::encode_fields(self, T::SCHEMA, object)
    }
}

/// An ordered, growable sequence of records
pub trait ObjectList {
    fn len(&self) -> usize;

    fn get(&self, index: usize) -> &dyn Object;

    /// Appends a zero-valued element and returns it for decoding
    fn push_default(&mut self) -> &mut dyn Object;
}

impl<T: Record> ObjectList for Vec<T> {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn get(&self, index: usize) -> &dyn Object {
        &self[index]
    }

    fn push_default(&mut self) -> &mut dyn Object {
        self.push(T::default());
        let last = <[T]>::len(self) - 1;
        &mut self[last]
    }
}
