// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use crate::error::Result;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::thread::{spawn, JoinHandle};

/// An open blob handed back by a download
///
/// Remote blobs live in a temporary file that has already been verified
/// against its digest; the caller owns that file and should remove it once
/// consumed. Local blobs are opened in place and must not be removed.
#[derive(Debug)]
pub struct Blob {
    file: File,
    path: PathBuf,
    temporary: bool,
}

impl Blob {
    pub(super) fn new(file: File, path: PathBuf, temporary: bool) -> Self {
        Self {
            file,
            path,
            temporary,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file is a downloaded copy owned by the caller
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

impl Read for Blob {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for Blob {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.file.seek(pos)
    }
}

/// A blob download running in the background
#[derive(Debug)]
pub struct Download {
    digest: String,
    thread: JoinHandle<Result<Blob>>,
}

impl Download {
    pub(super) fn spawn<F>(digest: &str, work: F) -> Self
    where
        F: FnOnce() -> Result<Blob> + Send + 'static,
    {
        Self {
            digest: digest.into(),
            thread: spawn(work),
        }
    }

    /// The digest as requested
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Blocks until the download completes
    pub fn wait(self) -> Result<Blob> {
        self.thread
            .join()
            .unwrap_or_else(|e| std::panic::resume_unwind(e))
    }
}
