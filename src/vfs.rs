//! Filesystem access behind the `FileOpener` trait.

use std::{
    collections::HashMap,
    fs::OpenOptions,
    future::Future,
    io::{Cursor, Error, ErrorKind},
    path::PathBuf,
    pin::Pin,
    task::{Context, Poll},
    time::SystemTime,
};

use futures_util::future::{ready, Ready};
use hyper::body::Bytes;
use tokio::{
    fs::File,
    task::{spawn_blocking, JoinHandle},
};

use crate::util::ResolvedPath;

/// Open file handle with metadata.
///
/// This struct exists because we want to abstract away tokio `File`, but need the stat results
/// alongside the handle. It is eventually converted to a `ResolvedFile`.
#[derive(Debug)]
pub struct FileWithMetadata<F = File> {
    /// Open file handle.
    pub handle: F,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: Option<SystemTime>,
}

/// Trait for a simple virtual filesystem layer.
///
/// There is only the `open` operation, hence the name `FileOpener`. In practice, `open` must also
/// collect some file metadata. (See the `FileWithMetadata` struct.)
///
/// Only regular files may be opened. Anything else (directories, sockets, pipes) must fail with
/// `ErrorKind::NotFound`, and must not be opened at all, since opening a pipe can block.
pub trait FileOpener: Send + Sync + 'static {
    /// File handle type.
    ///
    /// In order to use files with the other parts of this crate, the file handle must implement
    /// the `AsyncRead` and `AsyncSeek` traits, must be marked `Send` and `Unpin`, and have
    /// `'static` lifetime.
    type File;

    /// Future type that `open` returns.
    type Future: Future<Output = Result<FileWithMetadata<Self::File>, Error>>;

    /// Open a file and return a `FileWithMetadata`.
    ///
    /// The path has already been confined to the content root at this point.
    fn open(&self, path: &ResolvedPath) -> Self::Future;
}

fn not_a_file() -> Error {
    Error::new(ErrorKind::NotFound, "not a regular file")
}

/// Filesystem implementation that uses `tokio::fs`, opening the resolved absolute path.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioFileOpener;

impl TokioFileOpener {
    /// Create a new `TokioFileOpener`.
    pub fn new() -> Self {
        Self
    }
}

impl FileOpener for TokioFileOpener {
    type File = File;
    type Future = TokioFileFuture;

    fn open(&self, path: &ResolvedPath) -> Self::Future {
        let full_path: PathBuf = path.absolute.clone();

        // Stat, then open and stat the handle, all in one `spawn_blocking` call. The second stat
        // is what we report, so size and mtime belong to the file we actually stream.
        let inner = spawn_blocking(move || {
            if !std::fs::metadata(&full_path)?.is_file() {
                return Err(not_a_file());
            }

            let handle = OpenOptions::new().read(true).open(&full_path)?;
            let metadata = handle.metadata()?;
            if !metadata.is_file() {
                return Err(not_a_file());
            }
            Ok(FileWithMetadata {
                handle: File::from_std(handle),
                size: metadata.len(),
                modified: metadata.modified().ok(),
            })
        });

        TokioFileFuture { inner }
    }
}

/// Future type produced by `TokioFileOpener`.
///
/// This type mostly exists just to prevent a `Box<dyn Future>`.
pub struct TokioFileFuture {
    inner: JoinHandle<Result<FileWithMetadata<File>, Error>>,
}

impl Future for TokioFileFuture {
    type Output = Result<FileWithMetadata<File>, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // The `JoinHandle` wraps the task result in its own `Result`. A failed task becomes an
        // IO error so the two can be flattened.
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Ok(res)) => Poll::Ready(res),
            Poll::Ready(Err(_)) => {
                Poll::Ready(Err(Error::new(ErrorKind::Other, "background task failed")))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// An in-memory virtual filesystem.
///
/// Files are keyed by their path relative to the content root. This type implements
/// `FileOpener`, and can be used with `Static::with_opener`.
#[derive(Default)]
pub struct MemoryFs {
    files: HashMap<PathBuf, FileWithMetadata<Bytes>>,
}

impl MemoryFs {
    /// Create an empty `MemoryFs`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the `MemoryFs`, replacing any existing entry at the same path.
    pub fn add(
        &mut self,
        path: impl Into<PathBuf>,
        data: Bytes,
        modified: Option<SystemTime>,
    ) -> &mut Self {
        let size = data.len() as u64;
        self.files.insert(
            path.into(),
            FileWithMetadata {
                handle: data,
                size,
                modified,
            },
        );
        self
    }
}

impl FileOpener for MemoryFs {
    type File = Cursor<Bytes>;
    type Future = Ready<Result<FileWithMetadata<Self::File>, Error>>;

    fn open(&self, path: &ResolvedPath) -> Self::Future {
        ready(
            self.files
                .get(&path.relative)
                .map(|file| FileWithMetadata {
                    handle: Cursor::new(file.handle.clone()),
                    size: file.size,
                    modified: file.modified,
                })
                .ok_or_else(|| Error::new(ErrorKind::NotFound, "Not found")),
        )
    }
}
