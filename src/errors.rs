use std::error::Error;
use std::io;

use http::StatusCode;

use crate::fs::FsError;

pub(crate) type DavResult<T> = Result<T, DavError>;

#[derive(Debug)]
pub(crate) enum DavError {
    /// Path absent, or the wrong kind of resource for the method.
    NotFound,
    /// Range outside of a resource of this size.
    RangeNotSatisfiable(u64),
    /// `If:` header names a token we don't know.
    LockConflict,
    /// Status decided by the handler itself.
    Status(StatusCode),
    /// Error returned by the store.
    FsError(FsError),
    /// Error reading the request body.
    IoError(io::Error),
    UnknownDavMethod,
}

impl Error for DavError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DavError::FsError(e) => Some(e),
            DavError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for DavError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DavError::NotFound => f.write_str("not found"),
            DavError::RangeNotSatisfiable(size) => {
                write!(f, "range not satisfiable (size {size})")
            }
            DavError::LockConflict => f.write_str("unknown lock token"),
            DavError::Status(code) => write!(f, "{code}"),
            DavError::FsError(e) => write!(f, "store: {e}"),
            DavError::IoError(e) => write!(f, "request body: {e}"),
            DavError::UnknownDavMethod => f.write_str("unknown method"),
        }
    }
}

impl From<FsError> for DavError {
    fn from(e: FsError) -> Self {
        DavError::FsError(e)
    }
}

impl From<io::Error> for DavError {
    fn from(e: io::Error) -> Self {
        DavError::IoError(e)
    }
}

impl From<StatusCode> for DavError {
    fn from(e: StatusCode) -> Self {
        DavError::Status(e)
    }
}

impl From<http::Error> for DavError {
    fn from(_e: http::Error) -> Self {
        DavError::Status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<http::header::InvalidHeaderValue> for DavError {
    fn from(_e: http::header::InvalidHeaderValue) -> Self {
        DavError::Status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl DavError {
    pub(crate) fn statuscode(&self) -> StatusCode {
        match *self {
            DavError::NotFound => StatusCode::NOT_FOUND,
            DavError::RangeNotSatisfiable(_) => StatusCode::RANGE_NOT_SATISFIABLE,
            DavError::LockConflict => StatusCode::LOCKED,
            DavError::Status(code) => code,
            DavError::FsError(ref e) => e.statuscode(),
            DavError::IoError(ref e) => match e.kind() {
                io::ErrorKind::UnexpectedEof => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            DavError::UnknownDavMethod => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}
