// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{Command, Global};

use anyhow::Result;
use ocilayout::json;
use structopt::StructOpt;

/// Prints an image configuration
#[derive(StructOpt, Debug)]
pub struct Image {
    /// The layout path or URI
    layout: String,

    /// The image config digest (format: sha256:hex)
    digest: String,
}

impl Command for Image {
    fn execute(self, global: &Global) -> Result<()> {
        let registry = global.open(&self.layout, false)?;
        let image = registry.load_image(&self.digest, None)?;
        println!("{:#}", json::to_value(&image));
        Ok(())
    }
}
