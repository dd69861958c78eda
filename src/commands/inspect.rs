// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::{Command, Global};

use anyhow::Result;
use ocilayout::formats::VersionedManifest;
use structopt::StructOpt;

/// Prints a manifest or manifest list
#[derive(StructOpt, Debug)]
pub struct Inspect {
    /// The layout path or URI
    layout: String,

    /// The manifest digest (format: sha256:hex)
    digest: String,
}

impl Command for Inspect {
    fn execute(self, global: &Global) -> Result<()> {
        let registry = global.open(&self.layout, false)?;

        match registry.load_versioned(&self.digest, None)? {
            VersionedManifest::Manifest(m) => {
                eprintln!("manifest with {} layer(s)", m.layers.len());
                println!("{:#}", ocilayout::json::to_value(&m));
            }

            VersionedManifest::List(l) => {
                eprintln!("manifest list with {} entries", l.manifests.len());
                for entry in &l.manifests {
                    let platform = &entry.platform;
                    eprintln!("  {} {}/{}", entry.descriptor.digest, platform.os, platform.architecture);
                }
                println!("{:#}", ocilayout::json::to_value(&l));
            }
        }

        Ok(())
    }
}
