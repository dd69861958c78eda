// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{Command, Global};

use std::path::PathBuf;

use anyhow::{Context, Result};
use structopt::StructOpt;

/// Stores a file as a blob and prints its digest
#[derive(StructOpt, Debug)]
pub struct Put {
    /// The layout path or URI
    layout: String,

    /// The file to store
    #[structopt(parse(from_os_str))]
    file: PathBuf,
}

impl Command for Put {
    fn execute(self, global: &Global) -> Result<()> {
        let data = std::fs::read(&self.file).with_context(|| format!("reading {:?}", self.file))?;
        let registry = global.open(&self.layout, true)?;
        println!("{}", registry.store_blob(&data, None)?);
        Ok(())
    }
}
