//! Resource store interface.
//!
//! The handler never touches storage itself. Everything goes through a
//! [`DavStore`]: `list`, `get` and `write` are required, the rest are
//! optional capabilities. A store that does not support, say, MOVE
//! simply returns `None` from [`DavStore::as_move`] and the request
//! is treated as a no-op.
//!
//! Stores own the lifetime of the streams they are handed. If a client
//! disconnects halfway through a PUT, the handler does not cancel the
//! write; the body stream just ends with an error item.
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::SystemTime;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use http::StatusCode;

use crate::davpath::DavPath;
use crate::range::ByteRange;

#[cfg(any(docsrs, feature = "localfs"))]
pub mod localfs;
#[cfg(any(docsrs, feature = "memfs"))]
pub mod memfs;

/// Future returned by all store methods.
pub type FsFuture<'a, T> = Pin<Box<dyn Future<Output = FsResult<T>> + Send + 'a>>;

/// Stream of bytes: request bodies passed to `write`, and content
/// returned by `get`.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

pub type FsResult<T> = std::result::Result<T, FsError>;

/// Errors a store can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Path does not exist.
    NotFound,
    /// Access refused (e.g. path escapes the root).
    Forbidden,
    /// The store has decided on the HTTP status itself.
    Status(StatusCode),
    /// Anything else. Ends the request with a 500.
    GeneralFailure,
}

impl FsError {
    pub fn statuscode(&self) -> StatusCode {
        match *self {
            FsError::NotFound => StatusCode::NOT_FOUND,
            FsError::Forbidden => StatusCode::FORBIDDEN,
            FsError::Status(code) => code,
            FsError::GeneralFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for FsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FsError::NotFound => f.write_str("not found"),
            FsError::Forbidden => f.write_str("forbidden"),
            FsError::Status(code) => write!(f, "store error {code}"),
            FsError::GeneralFailure => f.write_str("store failure"),
        }
    }
}

impl std::error::Error for FsError {}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        (&e).into()
    }
}

impl From<&io::Error> for FsError {
    fn from(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => FsError::NotFound,
            io::ErrorKind::PermissionDenied => FsError::Forbidden,
            _ => FsError::GeneralFailure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Directory,
}

/// One entry as seen by the protocol layer.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// Full root-relative path, e.g. `/docs/report.txt`.
    pub name: String,
    pub kind: ResourceKind,
    /// Size in bytes. Only meaningful for files.
    pub size: u64,
    pub last_modified: SystemTime,
    /// Read-only resources advertise a read lock instead of a write lock.
    pub writable: bool,
}

impl ResourceDescriptor {
    pub fn file(name: impl Into<String>, size: u64, last_modified: SystemTime) -> Self {
        ResourceDescriptor {
            name: name.into(),
            kind: ResourceKind::File,
            size,
            last_modified,
            writable: true,
        }
    }

    pub fn directory(name: impl Into<String>, last_modified: SystemTime) -> Self {
        ResourceDescriptor {
            name: name.into(),
            kind: ResourceKind::Directory,
            size: 0,
            last_modified,
            writable: true,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == ResourceKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ResourceKind::Directory
    }

    // directories always end in a slash, files never do.
    pub(crate) fn fix_name(&mut self) {
        match self.kind {
            ResourceKind::Directory if !self.name.ends_with('/') => self.name.push('/'),
            ResourceKind::File if self.name.len() > 1 => {
                let len = self.name.trim_end_matches('/').len();
                self.name.truncate(len);
            }
            _ => {}
        }
    }
}

/// The storage backend.
///
/// `list` describes a path: the first entry is the path itself, and for
/// a directory it is followed by its immediate children. An absent path
/// yields `Err(FsError::NotFound)` or an empty vector.
pub trait DavStore: Send + Sync {
    fn list<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Vec<ResourceDescriptor>>;

    /// Read content, optionally just a part of it. `Ok(None)` means
    /// there is nothing to read.
    fn get<'a>(
        &'a self,
        path: &'a DavPath,
        range: Option<ByteRange>,
    ) -> FsFuture<'a, Option<ByteStream>>;

    /// Persist `body` at `path`. Completes when everything is written.
    fn write<'a>(&'a self, path: &'a DavPath, body: ByteStream) -> FsFuture<'a, ()>;

    fn as_move(&self) -> Option<&dyn DavMove> {
        None
    }

    fn as_collections(&self) -> Option<&dyn DavCollections> {
        None
    }

    fn as_lock_hooks(&self) -> Option<&dyn DavLockHooks> {
        None
    }

    fn as_proppatch(&self) -> Option<&dyn DavPropPatch> {
        None
    }
}

/// MOVE support.
pub trait DavMove: Send + Sync {
    /// Move `from` to `to`. A store that refuses (e.g. destination exists
    /// and `overwrite` is false) returns `FsError::Status` with the status
    /// the client should see.
    fn move_to<'a>(
        &'a self,
        from: &'a DavPath,
        to: &'a DavPath,
        overwrite: bool,
    ) -> FsFuture<'a, ()>;
}

/// MKCOL and DELETE support.
pub trait DavCollections: Send + Sync {
    fn mkdir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()>;
    fn delete<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()>;
}

/// Notification of LOCK / UNLOCK. Purely informational.
pub trait DavLockHooks: Send + Sync {
    fn lock<'a>(&'a self, path: &'a DavPath, token: &'a str) -> FsFuture<'a, ()>;
    fn unlock<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()>;
}

/// Receives the raw body of a PROPPATCH request.
pub trait DavPropPatch: Send + Sync {
    fn proppatch<'a>(&'a self, path: &'a DavPath, body: &'a str) -> FsFuture<'a, ()>;
}
