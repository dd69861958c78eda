// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use crate::cancel::Cancellable;
use crate::error::{Error, Result};

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::Builder;
use ureq::{Agent, AgentBuilder};
use url::Url;

/// The capability to fetch content over the network
///
/// The registry only ever asks for two things: a small document in memory, or
/// a large blob streamed into a file in the fetcher's temporary directory.
/// Retries and connection handling, if any, live behind this trait.
pub trait Fetcher: std::fmt::Debug + Send + Sync {
    /// The directory downloaded files are written into
    fn tmp_dir(&self) -> &Path;

    /// Fetches `uri` into memory, failing if it is larger than `max_size`
    fn fetch(&self, uri: &Url, max_size: u64, cancel: Option<&Cancellable>) -> Result<Vec<u8>>;

    /// Fetches `subpath` relative to each mirror in turn into a file
    ///
    /// Returns the path of a new file inside `tmp_dir()` owned by this call
    /// alone. A transfer cut short on one mirror resumes on the next.
    fn fetch_to_file(
        &self,
        mirrors: &[Url],
        subpath: &str,
        max_size: u64,
        cancel: Option<&Cancellable>,
    ) -> Result<PathBuf>;
}

fn transport(uri: &Url, err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(404, _) => Error::NotFound(uri.to_string()),
        ureq::Error::Status(code, _) => {
            Error::Transport(format!("{}: received status: {}", uri, code).into())
        }
        ureq::Error::Transport(t) => Error::Transport(Box::new(t)),
    }
}

fn too_large(uri: &Url, limit: u64) -> Error {
    Error::TooLarge {
        what: uri.to_string(),
        limit,
    }
}

/// Copies `reader` into `writer` in chunks, polling for cancellation
fn copy(
    reader: &mut impl Read,
    writer: &mut impl Write,
    mut budget: u64,
    cancel: Option<&Cancellable>,
) -> Result<Option<u64>> {
    let mut buffer = vec![0; 65536];
    let mut total = 0;

    loop {
        Cancellable::check(cancel)?;

        let n = reader.read(&mut buffer)?;
        if n == 0 {
            return Ok(Some(total));
        }

        if n as u64 > budget {
            return Ok(None);
        }

        writer.write_all(&buffer[..n])?;
        budget -= n as u64;
        total += n as u64;
    }
}

/// A blocking HTTP fetcher
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    agent: Agent,
    tmp_dir: PathBuf,
}

impl HttpFetcher {
    pub fn new(tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            agent: AgentBuilder::new().build(),
            tmp_dir: tmp_dir.into(),
        }
    }

    /// Downloads into `path`, continuing from whatever is already there
    fn download(&self, uri: &Url, path: &Path, max_size: u64, cancel: Option<&Cancellable>) -> Result<()> {
        let have = fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        let mut req = self.agent.get(uri.as_str());
        if have > 0 {
            debug!("resuming {} at byte {}", uri, have);
            req = req.set("Range", &format!("bytes={}-", have));
        }

        let rep = match req.call() {
            Ok(rep) => rep,

            // Nothing past what we already hold.
            Err(ureq::Error::Status(416, _)) if have > 0 => {
                debug!("{} already complete at {} bytes", uri, have);
                return Ok(());
            }

            Err(e) => return Err(transport(uri, e)),
        };

        let (mut file, budget) = match rep.status() {
            206 if have > 0 => {
                let file = OpenOptions::new().append(true).open(path)?;
                (file, max_size.saturating_sub(have))
            }
            _ => (File::create(path)?, max_size),
        };

        let mut reader = rep.into_reader();
        match copy(&mut reader, &mut file, budget, cancel)? {
            Some(..) => Ok(()),
            None => Err(too_large(uri, max_size)),
        }
    }

    fn download_mirrors(
        &self,
        mirrors: &[Url],
        subpath: &str,
        path: &Path,
        max_size: u64,
        cancel: Option<&Cancellable>,
    ) -> Result<()> {
        let mut last = None;

        for mirror in mirrors {
            Cancellable::check(cancel)?;

            let uri = mirror
                .join(subpath)
                .map_err(|_| Error::InvalidUri(format!("{}{}", mirror, subpath)))?;

            debug!("downloading {} to {:?}", uri, path);
            match self.download(&uri, path, max_size, cancel) {
                Ok(()) => return Ok(()),
                Err(e @ Error::Cancelled) | Err(e @ Error::TooLarge { .. }) => return Err(e),
                Err(e) => {
                    warn!("mirror {} failed: {}", mirror, e);
                    last = Some(e);
                }
            }
        }

        Err(last.unwrap_or_else(|| Error::NotFound(subpath.into())))
    }
}

impl Fetcher for HttpFetcher {
    fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    fn fetch(&self, uri: &Url, max_size: u64, cancel: Option<&Cancellable>) -> Result<Vec<u8>> {
        Cancellable::check(cancel)?;
        debug!("fetching {}", uri);

        let rep = self.agent.get(uri.as_str()).call().map_err(|e| transport(uri, e))?;

        let mut reader = rep.into_reader();
        let mut buffer = Vec::new();
        match copy(&mut reader, &mut buffer, max_size, cancel)? {
            Some(..) => Ok(buffer),
            None => Err(too_large(uri, max_size)),
        }
    }

    fn fetch_to_file(
        &self,
        mirrors: &[Url],
        subpath: &str,
        max_size: u64,
        cancel: Option<&Cancellable>,
    ) -> Result<PathBuf> {
        let prefix = format!("{}.", subpath.replace('/', "-"));
        let (_, path) = Builder::new()
            .prefix(&prefix)
            .suffix(".partial")
            .tempfile_in(&self.tmp_dir)?
            .keep()
            .map_err(|e| e.error)?;

        match self.download_mirrors(mirrors, subpath, &path, max_size, cancel) {
            Ok(()) => Ok(path),
            Err(e) => {
                let _ = fs::remove_file(&path);
                Err(e)
            }
        }
    }
}
