// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{deliver, Command, Global};

use std::path::PathBuf;
use std::sync::mpsc::channel;

use anyhow::Result;
use log::info;
use structopt::StructOpt;

/// Downloads and verifies a blob into a file
#[derive(StructOpt, Debug)]
pub struct Fetch {
    /// The layout path or URI
    layout: String,

    /// The blob digest (format: sha256:hex)
    digest: String,

    /// The output file (will be overwritten)
    #[structopt(parse(from_os_str))]
    output: PathBuf,
}

impl Command for Fetch {
    fn execute(self, global: &Global) -> Result<()> {
        let registry = global.open(&self.layout, false)?;

        let (tx, rx) = channel();
        let worker = registry.download_blob_with(&self.digest, None, move |result| {
            let _ = tx.send(result);
        });

        info!("waiting for {}", self.digest);
        let blob = rx.recv()?;
        let _ = worker.join();

        deliver(blob?, &self.output)
    }
}
