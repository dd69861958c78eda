// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

//! Reading and writing OCI image layouts
//!
//! [`json`] maps records to and from JSON through static schema tables,
//! [`formats`] holds the OCI document types built on it, and [`api`] opens a
//! layout on disk or over HTTP to load and store refs and blobs.

#[macro_use]
pub mod json;

pub mod api;
pub mod cancel;
pub mod error;
pub mod formats;

pub use api::Registry;
pub use cancel::Cancellable;
pub use error::{Error, Result};
