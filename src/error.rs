// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use thiserror::Error;

/// Everything that can go wrong while mapping documents or talking to a layout
#[derive(Debug, Error)]
pub enum Error {
    /// A JSON value did not have the kind its schema field declares
    #[error("expecting {expected} for property {property}")]
    Validation {
        property: String,
        expected: &'static str,
    },

    #[error("expecting a JSON object, but the node is of type `{0}'")]
    NotAnObject(&'static str),

    #[error("invalid json, no root object")]
    NoRootObject,

    #[error("versioned object lacks mediatype")]
    MissingMediaType,

    #[error("unsupported media type {0}")]
    UnsupportedMediaType(String),

    #[error("unsupported digest type {0}")]
    UnsupportedDigest(String),

    #[error("invalid digest {digest}: {reason}")]
    InvalidDigest { digest: String, reason: String },

    #[error("invalid size {0}")]
    InvalidSize(i64),

    #[error("unsupported oci repo: oci-layout version missing")]
    MissingLayoutVersion,

    #[error("unsupported existing oci-layout version {0} (only 1.0.0 supported)")]
    UnsupportedVersion(String),

    #[error("checksum did not match ({expected} != {actual})")]
    Integrity { expected: String, actual: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} not supported for remote registries")]
    UnsupportedOperation(&'static str),

    #[error("invalid ref name {0:?}")]
    InvalidRef(String),

    #[error("invalid url {0}")]
    InvalidUri(String),

    #[error("{what} exceeds the limit of {limit} bytes")]
    TooLarge { what: String, limit: u64 },

    #[error("operation was cancelled")]
    Cancelled,

    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
