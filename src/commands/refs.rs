// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{Command, Global};

use anyhow::Result;
use ocilayout::formats::{self, MEDIA_TYPE_IMAGE_MANIFEST};
use ocilayout::json;
use structopt::StructOpt;

/// Shows a ref, or points it at a digest
#[derive(StructOpt, Debug)]
pub struct Ref {
    /// The layout path or URI
    layout: String,

    /// The ref name (e.g. latest or app/v1)
    name: String,

    /// Point the ref at this digest
    #[structopt(long)]
    set: Option<String>,

    /// The media type of the referenced content
    #[structopt(long, default_value = MEDIA_TYPE_IMAGE_MANIFEST)]
    media_type: String,

    /// The size of the referenced content
    #[structopt(long, default_value = "0")]
    size: i64,
}

impl Command for Ref {
    fn execute(self, global: &Global) -> Result<()> {
        match self.set {
            Some(digest) => {
                let registry = global.open(&self.layout, true)?;
                let r = formats::Ref::new(&self.media_type, &digest, self.size);
                registry.set_ref(&self.name, &r, None)?;
            }

            None => {
                let registry = global.open(&self.layout, false)?;
                let r = registry.load_ref(&self.name, None)?;
                println!("{:#}", json::to_value(&r));
            }
        }

        Ok(())
    }
}
