// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{Command, Global};

use std::io::Write;

use anyhow::Result;
use structopt::StructOpt;

/// Writes a blob to stdout
#[derive(StructOpt, Debug)]
pub struct Cat {
    /// The layout path or URI
    layout: String,

    /// The blob digest (format: sha256:hex)
    digest: String,
}

impl Command for Cat {
    fn execute(self, global: &Global) -> Result<()> {
        let registry = global.open(&self.layout, false)?;
        let mut blob = registry.download_blob(&self.digest, None).wait()?;

        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let result = std::io::copy(&mut blob, &mut lock).and_then(|_| lock.flush());

        if blob.is_temporary() {
            std::fs::remove_file(blob.path())?;
        }

        result?;
        Ok(())
    }
}
