// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use super::download::{Blob, Download};
use super::fetcher::{Fetcher, HttpFetcher};
use crate::cancel::Cancellable;
use crate::error::{Error, Result};
use crate::formats::{Descriptor, Digest, Hasher, Image, Ref, VersionedManifest};
use crate::json::{self, Record};

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use url::Url;

/// Largest JSON document (and remote in-memory load) accepted
pub const MAX_JSON_SIZE: u64 = 1024 * 1024;

/// The only supported `imageLayoutVersion`
pub const LAYOUT_VERSION: &str = "1.0.0";

const LAYOUT_FILE: &str = "oci-layout";

#[derive(Debug, Serialize)]
struct Layout {
    #[serde(rename = "imageLayoutVersion")]
    version: &'static str,
}

impl Layout {
    fn current() -> Self {
        Self {
            version: LAYOUT_VERSION,
        }
    }

    /// Checks an `oci-layout` marker; a non-string version counts as missing
    fn verify(bytes: &[u8]) -> Result<()> {
        let value = json::parse(bytes)?;
        let version = value.get("imageLayoutVersion").and_then(Value::as_str);

        match version {
            None => Err(Error::MissingLayoutVersion),
            Some(LAYOUT_VERSION) => Ok(()),
            Some(other) => Err(Error::UnsupportedVersion(other.into())),
        }
    }
}

#[derive(Clone, Debug)]
enum Backend {
    Local(PathBuf),
    Remote { base: Url, fetcher: Arc<dyn Fetcher> },
}

/// An OCI image layout, either a local directory or a remote HTTP endpoint
///
/// A `Registry` only exists once its layout has been validated, and nothing in
/// it changes afterwards; clones share the same fetcher and may be used from
/// several threads at once.
#[derive(Clone, Debug)]
pub struct Registry {
    uri: String,
    for_write: bool,
    backend: Backend,
}

impl Display for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

fn not_found(subpath: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound(subpath.into()),
        _ => e.into(),
    }
}

fn blob_path(digest: &Digest) -> String {
    format!("blobs/sha256/{}", digest.hex())
}

fn ref_path(name: &str) -> Result<String> {
    let valid = !name.is_empty()
        && !name.ends_with('/')
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(..)));

    if !valid {
        return Err(Error::InvalidRef(name.into()));
    }

    Ok(format!("refs/{}", name))
}

/// Atomically replaces `path` with `data`
fn replace_contents(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn hash_file(path: &Path, cancel: Option<&Cancellable>) -> Result<(File, Digest)> {
    Cancellable::check(cancel)?;

    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    std::io::copy(&mut file, &mut hasher)?;
    file.seek(SeekFrom::Start(0))?;

    Ok((file, hasher.finish()))
}

/// Verifies a downloaded file, removing it unless it matches
fn verify_download(path: PathBuf, expected: &Digest, cancel: Option<&Cancellable>) -> Result<Blob> {
    let result = hash_file(&path, cancel).and_then(|(file, actual)| {
        if actual == *expected {
            return Ok(file);
        }

        Err(Error::Integrity {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    });

    match result {
        Ok(file) => Ok(Blob::new(file, path, true)),
        Err(e) => {
            warn!("discarding download {:?}: {}", path, e);
            let _ = fs::remove_file(&path);
            Err(e)
        }
    }
}

fn ensure_local(root: &Path, for_write: bool, cancel: Option<&Cancellable>) -> Result<()> {
    Cancellable::check(cancel)?;

    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => (),
        Ok(..) => return Err(Error::InvalidUri(format!("{} is not a directory", root.display()))),
        Err(e) if e.kind() == ErrorKind::NotFound && for_write => {
            info!("creating layout at {:?}", root);
            fs::create_dir_all(root)?;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::NotFound(root.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    }

    if for_write {
        fs::create_dir_all(root.join("blobs").join("sha256"))?;
        fs::create_dir_all(root.join("refs"))?;
    }

    let path = root.join(LAYOUT_FILE);
    match fs::read(&path) {
        Ok(bytes) => Layout::verify(&bytes),
        Err(e) if e.kind() == ErrorKind::NotFound && for_write => {
            let bytes = serde_json::to_vec(&Layout::current())?;
            replace_contents(&path, &bytes)
        }
        Err(e) => Err(not_found(LAYOUT_FILE)(e)),
    }
}

impl Registry {
    /// Opens a layout, fetching remote content with an `HttpFetcher`
    ///
    /// `file:` URIs name a local directory; with `for_write` it is created
    /// along with `blobs/sha256`, `refs` and an `oci-layout` marker as needed.
    /// Any other URI is a remote, read-only layout whose downloads land in
    /// `tmp_dir`.
    pub fn open(uri: &str, for_write: bool, tmp_dir: &Path, cancel: Option<&Cancellable>) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(tmp_dir));
        Self::with_fetcher(uri, for_write, fetcher, cancel)
    }

    /// Opens a layout using the given fetcher for remote content
    pub fn with_fetcher(
        uri: &str,
        for_write: bool,
        fetcher: Arc<dyn Fetcher>,
        cancel: Option<&Cancellable>,
    ) -> Result<Self> {
        let backend = if uri.starts_with("file:") {
            let root = Url::parse(uri)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| Error::InvalidUri(uri.into()))?;

            ensure_local(&root, for_write, cancel)?;
            Backend::Local(root)
        } else {
            if for_write {
                return Err(Error::UnsupportedOperation("writes"));
            }

            // A trailing slash makes relative joins land below the base.
            let mut base = uri.to_string();
            if !base.ends_with('/') {
                base.push('/');
            }

            let base = match Url::parse(&base) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => url,
                _ => return Err(Error::InvalidUri(uri.into())),
            };

            let layout = base
                .join(LAYOUT_FILE)
                .map_err(|_| Error::InvalidUri(uri.into()))?;
            Layout::verify(&fetcher.fetch(&layout, MAX_JSON_SIZE, cancel)?)?;

            Backend::Remote { base, fetcher }
        };

        debug!("opened layout {}", uri);
        Ok(Self {
            uri: uri.into(),
            for_write,
            backend,
        })
    }

    pub fn is_local(&self) -> bool {
        matches!(self.backend, Backend::Local(..))
    }

    pub fn for_write(&self) -> bool {
        self.for_write
    }

    fn local_root(&self) -> Result<&Path> {
        match &self.backend {
            Backend::Local(root) => Ok(root),
            Backend::Remote { .. } => Err(Error::UnsupportedOperation("writes")),
        }
    }

    fn load_file(&self, subpath: &str, limit: u64, cancel: Option<&Cancellable>) -> Result<Vec<u8>> {
        Cancellable::check(cancel)?;

        match &self.backend {
            Backend::Local(root) => {
                let path = root.join(subpath);
                debug!("loading {:?}", path);

                let file = File::open(&path).map_err(not_found(subpath))?;
                if file.metadata()?.len() > limit {
                    return Err(Error::TooLarge {
                        what: subpath.into(),
                        limit,
                    });
                }

                let mut bytes = Vec::new();
                file.take(limit).read_to_end(&mut bytes)?;
                Ok(bytes)
            }

            Backend::Remote { base, fetcher } => {
                let uri = base
                    .join(subpath)
                    .map_err(|_| Error::InvalidUri(format!("{}{}", base, subpath)))?;
                fetcher.fetch(&uri, limit.min(MAX_JSON_SIZE), cancel)
            }
        }
    }

    fn load_json(&self, subpath: &str, cancel: Option<&Cancellable>) -> Result<Value> {
        json::parse(&self.load_file(subpath, MAX_JSON_SIZE, cancel)?)
    }

    /// Loads the ref stored under `refs/{name}`
    pub fn load_ref(&self, name: &str, cancel: Option<&Cancellable>) -> Result<Ref> {
        let value = self.load_json(&ref_path(name)?, cancel)?;
        let r: Ref = json::from_value(&value)?;
        r.descriptor.validate()?;
        Ok(r)
    }

    /// Atomically replaces `refs/{name}`
    pub fn set_ref(&self, name: &str, r: &Ref, cancel: Option<&Cancellable>) -> Result<()> {
        let root = self.local_root()?;
        let subpath = ref_path(name)?;
        r.descriptor.validate()?;
        Cancellable::check(cancel)?;

        let path = root.join(&subpath);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!("setting {} to {}", subpath, r.descriptor.digest);
        replace_contents(&path, &json::to_bytes(r))
    }

    /// Loads a whole blob into memory
    ///
    /// Local blobs are trusted as stored. Remote loads are capped at
    /// `MAX_JSON_SIZE`; use `download_blob` for large or untrusted content.
    pub fn load_blob(&self, digest: &str, cancel: Option<&Cancellable>) -> Result<Vec<u8>> {
        let digest = Digest::parse(digest)?;
        self.load_file(&blob_path(&digest), u64::MAX, cancel)
    }

    /// Stores a blob under the digest of its content
    pub fn store_blob(&self, data: &[u8], cancel: Option<&Cancellable>) -> Result<Digest> {
        let root = self.local_root()?;
        Cancellable::check(cancel)?;

        let digest = Digest::compute(data);
        let path = root.join(blob_path(&digest));
        debug!("storing {} ({} bytes)", digest, data.len());
        replace_contents(&path, data)?;

        Ok(digest)
    }

    /// Encodes a record and stores it as a blob of the given media type
    pub fn store_json<T: Record>(
        &self,
        record: &T,
        media_type: &str,
        cancel: Option<&Cancellable>,
    ) -> Result<Descriptor> {
        let bytes = json::to_bytes(record);
        let digest = self.store_blob(&bytes, cancel)?;
        Ok(Descriptor::new(media_type, digest, bytes.len() as i64))
    }

    fn load_json_blob(&self, digest: &str, cancel: Option<&Cancellable>) -> Result<Value> {
        let digest = Digest::parse(digest)?;
        self.load_json(&blob_path(&digest), cancel)
    }

    /// Loads a manifest or manifest list, dispatching on its media type
    pub fn load_versioned(&self, digest: &str, cancel: Option<&Cancellable>) -> Result<VersionedManifest> {
        VersionedManifest::from_value(&self.load_json_blob(digest, cancel)?)
    }

    /// Loads an image configuration blob
    pub fn load_image(&self, digest: &str, cancel: Option<&Cancellable>) -> Result<Image> {
        json::from_value(&self.load_json_blob(digest, cancel)?)
    }

    /// Opens a blob, downloading and verifying it when the layout is remote
    fn fetch_blob(&self, digest: &str, cancel: Option<&Cancellable>) -> Result<Blob> {
        let expected = Digest::parse(digest)?;
        let subpath = blob_path(&expected);

        match &self.backend {
            // Local content is trusted as stored.
            Backend::Local(root) => {
                Cancellable::check(cancel)?;
                let path = root.join(&subpath);
                let file = File::open(&path).map_err(not_found(&subpath))?;
                Ok(Blob::new(file, path, false))
            }

            Backend::Remote { base, fetcher } => {
                let mirrors = std::slice::from_ref(base);
                let path = fetcher.fetch_to_file(mirrors, &subpath, u64::MAX, cancel)?;
                verify_download(path, &expected, cancel)
            }
        }
    }

    /// Starts a blob download in the background
    ///
    /// Remote blobs are hashed after the transfer and rejected with
    /// `Error::Integrity` if they do not match `digest`.
    pub fn download_blob(&self, digest: &str, cancel: Option<Cancellable>) -> Download {
        let registry = self.clone();
        let requested = digest.to_string();

        Download::spawn(digest, move || registry.fetch_blob(&requested, cancel.as_ref()))
    }

    /// Like `download_blob`, but hands the result to `on_done` when finished
    pub fn download_blob_with<F>(&self, digest: &str, cancel: Option<Cancellable>, on_done: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Blob>) + Send + 'static,
    {
        let registry = self.clone();
        let requested = digest.to_string();

        std::thread::spawn(move || on_done(registry.fetch_blob(&requested, cancel.as_ref())))
    }
}
