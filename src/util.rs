use std::time::SystemTime;

use bitflags::bitflags;
use headers::Header;
use http::method::InvalidMethod;

use crate::errors::DavError;
use crate::errors::DavResult;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DavMethod: u32 {
        const HEAD = 0x0001;
        const GET = 0x0002;
        const PUT = 0x0004;
        const POST = 0x0008;
        const OPTIONS = 0x0010;
        const PROPFIND = 0x0020;
        const PROPPATCH = 0x0040;
        const MKCOL = 0x0080;
        const MOVE = 0x0200;
        const DELETE = 0x0400;
        const LOCK = 0x0800;
        const UNLOCK = 0x1000;

        const HTTP_RO = Self::HEAD.bits() | Self::GET.bits() | Self::OPTIONS.bits();
        const HTTP_RW = Self::HTTP_RO.bits() | Self::PUT.bits() | Self::POST.bits();
        const WEBDAV_RO = Self::HTTP_RO.bits() | Self::PROPFIND.bits();
        // methods whose body the handler buffers up front.
        const WEBDAV_BODY = Self::PROPFIND.bits() | Self::PROPPATCH.bits() | Self::LOCK.bits();
    }
}
impl DavMethod {
    pub const WEBDAV_RW: Self = Self::all();
}

/// Value of the `Allow` and `Access-Control-Allow-Methods` headers.
///
/// COPY is listed, but not implemented (answered with 405).
pub(crate) const ALLOW_METHODS: &str =
    "OPTIONS, GET, HEAD, POST, PUT, DELETE, PROPFIND, PROPPATCH, MKCOL, COPY, MOVE, LOCK, UNLOCK";

pub(crate) const ALLOW_HEADERS: &str =
    "Content-Type, Authorization, Depth, Destination, Overwrite, Lock-Token, Timeout, If";

/// `Allow` value for a restricted method set, in `ALLOW_METHODS` order.
pub(crate) fn allowed_methods(allow: DavMethod) -> String {
    const ORDER: [(DavMethod, &str); 12] = [
        (DavMethod::OPTIONS, "OPTIONS"),
        (DavMethod::GET, "GET"),
        (DavMethod::HEAD, "HEAD"),
        (DavMethod::POST, "POST"),
        (DavMethod::PUT, "PUT"),
        (DavMethod::DELETE, "DELETE"),
        (DavMethod::PROPFIND, "PROPFIND"),
        (DavMethod::PROPPATCH, "PROPPATCH"),
        (DavMethod::MKCOL, "MKCOL"),
        (DavMethod::MOVE, "MOVE"),
        (DavMethod::LOCK, "LOCK"),
        (DavMethod::UNLOCK, "UNLOCK"),
    ];
    ORDER
        .iter()
        .filter(|(m, _)| allow.contains(*m))
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

// translate method into our own enum that has webdav methods as well.
pub(crate) fn dav_method(m: &http::Method) -> DavResult<DavMethod> {
    let m = match *m {
        http::Method::HEAD => DavMethod::HEAD,
        http::Method::GET => DavMethod::GET,
        http::Method::PUT => DavMethod::PUT,
        http::Method::POST => DavMethod::POST,
        http::Method::DELETE => DavMethod::DELETE,
        http::Method::OPTIONS => DavMethod::OPTIONS,
        _ => match m.as_str() {
            "PROPFIND" => DavMethod::PROPFIND,
            "PROPPATCH" => DavMethod::PROPPATCH,
            "MKCOL" => DavMethod::MKCOL,
            "MOVE" => DavMethod::MOVE,
            "LOCK" => DavMethod::LOCK,
            "UNLOCK" => DavMethod::UNLOCK,
            _ => {
                return Err(DavError::UnknownDavMethod);
            }
        },
    };
    Ok(m)
}

// for external use.
impl std::convert::TryFrom<&http::Method> for DavMethod {
    type Error = InvalidMethod;

    fn try_from(value: &http::Method) -> Result<Self, Self::Error> {
        dav_method(value).map_err(|_| {
            // A trick to get at the value of http::method::InvalidMethod.
            http::method::Method::from_bytes(b"").unwrap_err()
        })
    }
}

/// Format as an HTTP-date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub(crate) fn systemtime_to_httpdate(t: SystemTime) -> String {
    let d = headers::Date::from(t);
    let mut v = Vec::new();
    d.encode(&mut v);
    v.first()
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_default()
}
