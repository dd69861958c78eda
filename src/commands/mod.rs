// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use ocilayout::Registry;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;
use url::Url;

mod cat;
mod fetch;
mod image;
mod init;
mod inspect;
mod put;
mod refs;

/// Settings shared by every subcommand
#[derive(Debug)]
pub struct Global {
    tmp_dir: PathBuf,
}

impl Global {
    /// Opens the layout named on the command line
    pub fn open(&self, layout: &str, for_write: bool) -> Result<Registry> {
        let uri = layout_uri(layout)?;
        Ok(Registry::open(&uri, for_write, &self.tmp_dir, None)?)
    }
}

pub trait Command {
    fn execute(self, global: &Global) -> Result<()>;
}

/// Turns a URI or a bare filesystem path into a layout URI
fn layout_uri(layout: &str) -> Result<String> {
    if let Ok(url) = Url::parse(layout) {
        if matches!(url.scheme(), "file" | "http" | "https") {
            return Ok(layout.into());
        }
    }

    let path = std::env::current_dir()?.join(layout);
    Url::from_directory_path(&path)
        .map(String::from)
        .map_err(|_| anyhow!("invalid layout path: {:?}", path))
}

fn init_logging(verbose: bool) {
    let filter = match verbose {
        true => EnvFilter::new("debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(StructOpt, Debug)]
pub enum Subcommand {
    Init(init::Init),
    Put(put::Put),
    Cat(cat::Cat),
    Fetch(fetch::Fetch),
    Ref(refs::Ref),
    Inspect(inspect::Inspect),
    Image(image::Image),
}

#[derive(StructOpt, Debug)]
#[structopt(about = "inspect and populate OCI image layouts")]
pub struct Main {
    /// Log debugging output
    #[structopt(short, long)]
    verbose: bool,

    /// Directory for downloads from remote layouts
    #[structopt(long, parse(from_os_str))]
    tmp_dir: Option<PathBuf>,

    #[structopt(subcommand)]
    command: Subcommand,
}

impl Main {
    pub fn execute(self) -> Result<()> {
        init_logging(self.verbose);

        let global = Global {
            tmp_dir: self.tmp_dir.unwrap_or_else(std::env::temp_dir),
        };

        match self.command {
            Subcommand::Init(cmd) => cmd.execute(&global),
            Subcommand::Put(cmd) => cmd.execute(&global),
            Subcommand::Cat(cmd) => cmd.execute(&global),
            Subcommand::Fetch(cmd) => cmd.execute(&global),
            Subcommand::Ref(cmd) => cmd.execute(&global),
            Subcommand::Inspect(cmd) => cmd.execute(&global),
            Subcommand::Image(cmd) => cmd.execute(&global),
        }
    }
}

/// Copies a blob into `dst`, removing the blob if it was a downloaded copy
fn deliver(mut blob: ocilayout::api::Blob, dst: &Path) -> Result<()> {
    let mut out = std::fs::File::create(dst)?;
    std::io::copy(&mut blob, &mut out)?;

    if blob.is_temporary() {
        std::fs::remove_file(blob.path())?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::layout_uri;

    #[test]
    fn uris_pass_through() {
        for uri in ["file:///srv/layout/", "https://example.com/layout", "http://localhost:8080/"] {
            assert_eq!(layout_uri(uri).unwrap(), uri);
        }
    }

    #[test]
    fn paths_become_file_uris() {
        let uri = layout_uri("/srv/layout").unwrap();
        assert_eq!(uri, "file:///srv/layout/");

        let uri = layout_uri("layout").unwrap();
        assert!(uri.starts_with("file:///"));
        assert!(uri.ends_with("/layout/"));
    }
}
