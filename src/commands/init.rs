// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{Command, Global};

use anyhow::Result;
use structopt::StructOpt;

/// Creates an empty layout (or checks an existing one)
#[derive(StructOpt, Debug)]
pub struct Init {
    /// The layout path or URI
    layout: String,
}

impl Command for Init {
    fn execute(self, global: &Global) -> Result<()> {
        let registry = global.open(&self.layout, true)?;
        println!("{}", registry);
        Ok(())
    }
}
