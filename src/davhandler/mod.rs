//
// This module contains the main entry point of the library,
// DavHandler.
//
use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Buf;
use futures_util::stream::Stream;
use headers::HeaderMapExt;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;
#[cfg(any(docsrs, feature = "localfs"))]
use std::path::PathBuf;

use crate::body::{Body, StreamBody};
use crate::davheaders::{self, Depth};
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::fs::*;
use crate::ls::{LockManager, SWEEP_INTERVAL};
use crate::range;
use crate::util::{allowed_methods, dav_method, DavMethod, ALLOW_HEADERS, ALLOW_METHODS};
use crate::DavResult;

pub mod handle_delete;
pub mod handle_gethead;
pub mod handle_lock;
pub mod handle_mkcol;
pub mod handle_move;
pub mod handle_options;
pub mod handle_props;
pub mod handle_put;

/// Default limit for request bodies that are read into memory
/// (PROPFIND, PROPPATCH, LOCK).
pub const MAX_BODY_SIZE: usize = 65536;

/// Configuration of the handler.
#[derive(Clone)]
pub struct DavBuilder {
    /// Prefix to be stripped off when handling request.
    prefix: String,
    /// Store backend.
    fs: FileSystem,
    /// Lock table. A fresh one is created if not set.
    locks: Option<LockManager>,
    /// Set of allowed methods (Defaults to "all methods")
    allow: DavMethod,
    /// Max size of a buffered request body.
    max_body_size: usize,
    /// Period of the lock expiry sweep.
    sweep_interval: Duration,
}

/// Store backend.
#[derive(Clone)]
pub enum FileSystem {
    #[cfg(any(docsrs, feature = "memfs"))]
    Mem,
    #[cfg(any(docsrs, feature = "localfs"))]
    Local {
        /// Path to the root directory.
        base: PathBuf,
    },
    /// Any other implementation of [`DavStore`].
    Custom(Arc<dyn DavStore>),
}

impl FileSystem {
    /// Serve a local directory
    #[cfg(any(docsrs, feature = "localfs"))]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        FileSystem::Local { base: path.into() }
    }

    /// Use your own store.
    pub fn custom(store: impl DavStore + 'static) -> Self {
        FileSystem::Custom(Arc::new(store))
    }

    fn build(self) -> Arc<dyn DavStore> {
        match self {
            #[cfg(any(docsrs, feature = "memfs"))]
            FileSystem::Mem => Arc::new(crate::fs::memfs::MemStore::new()),
            #[cfg(any(docsrs, feature = "localfs"))]
            FileSystem::Local { base } => crate::fs::localfs::LocalStore::new(base),
            FileSystem::Custom(store) => store,
        }
    }
}

impl DavBuilder {
    /// Create a new configuration builder.
    pub fn new(fs: FileSystem) -> DavBuilder {
        Self {
            prefix: String::new(),
            fs,
            locks: None,
            allow: DavMethod::all(),
            max_body_size: MAX_BODY_SIZE,
            sweep_interval: SWEEP_INTERVAL,
        }
    }

    /// Use the configuration that was built to generate a DavHandler.
    pub fn build(self) -> DavHandler {
        self.into()
    }

    /// Prefix to be stripped off before translating the rest of
    /// the request path to a store path.
    pub fn strip_prefix(self, prefix: impl Into<String>) -> Self {
        let mut this = self;
        this.prefix = prefix.into();
        this
    }

    /// Use this lock table (e.g. to share it between handlers).
    pub fn locks(self, locks: LockManager) -> Self {
        let mut this = self;
        this.locks = Some(locks);
        this
    }

    /// Which methods to allow (default is all methods).
    pub fn methods(self, allow: DavMethod) -> Self {
        let mut this = self;
        this.allow = allow;
        this
    }

    /// Max size in bytes of PROPFIND/PROPPATCH/LOCK request bodies.
    pub fn max_body_size(self, size: usize) -> Self {
        let mut this = self;
        this.max_body_size = size;
        this
    }

    /// How often [`DavHandler::spawn_lock_sweeper`] sweeps the lock table.
    pub fn sweep_interval(self, every: Duration) -> Self {
        let mut this = self;
        this.sweep_interval = every;
        this
    }
}

/// The webdav handler struct.
///
/// The `builder` and `build` methods are used to instantiate a handler.
///
/// The `handle` and `handle_with` methods are the methods that do the actual work.
#[derive(Clone)]
pub struct DavHandler {
    pub(crate) prefix: Arc<String>,
    pub(crate) fs: Arc<dyn DavStore>,
    pub(crate) locks: LockManager,
    pub(crate) allow: DavMethod,
    pub(crate) max_body_size: usize,
    pub(crate) sweep_interval: Duration,
}

impl From<DavBuilder> for DavHandler {
    fn from(cfg: DavBuilder) -> Self {
        Self {
            prefix: Arc::new(cfg.prefix),
            fs: cfg.fs.build(),
            locks: cfg.locks.unwrap_or_default(),
            allow: cfg.allow,
            max_body_size: cfg.max_body_size,
            sweep_interval: cfg.sweep_interval,
        }
    }
}

impl DavHandler {
    /// Return a configuration builder.
    pub fn builder(fs: FileSystem) -> DavBuilder {
        DavBuilder::new(fs)
    }

    /// The lock table of this handler.
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Start the background task that expires old locks.
    /// Must be called from within a tokio runtime.
    pub fn spawn_lock_sweeper(&self) -> tokio::task::JoinHandle<()> {
        self.locks.spawn_sweeper(self.sweep_interval)
    }

    /// Handle a webdav request.
    pub async fn handle<ReqBody, ReqData, ReqError>(&self, req: Request<ReqBody>) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
    {
        self.handle_inner(req).await
    }

    /// Handle a webdav request, overriding the prefix.
    pub async fn handle_with<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
        prefix: Option<String>,
    ) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
    {
        let mut this = self.clone();
        if let Some(prefix) = prefix {
            this.prefix = Arc::new(format!(
                "{}/{}",
                this.prefix.strip_suffix('/').unwrap_or(&this.prefix),
                prefix.strip_prefix('/').unwrap_or(&prefix)
            ));
        }
        this.handle_inner(req).await
    }

    /// Handles a request with a `Stream` body instead of a `HttpBody`.
    /// Used with webserver frameworks that have not
    /// opted to use the `http_body` crate just yet.
    #[doc(hidden)]
    pub async fn handle_stream_with<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
        prefix: Option<String>,
    ) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: Stream<Item = Result<ReqData, ReqError>> + Send + 'static,
    {
        let req = {
            let (parts, body) = req.into_parts();
            Request::from_parts(parts, StreamBody::new(body))
        };
        let mut this = self.clone();
        if let Some(prefix) = prefix {
            this.prefix = Arc::new(prefix);
        }
        this.handle_inner(req).await
    }
}

// Response with an empty body.
pub(crate) fn empty_response(status: StatusCode) -> Response<Body> {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = status;
    res.headers_mut().typed_insert(headers::ContentLength(0));
    res
}

// Response with a (small) XML body.
pub(crate) fn xml_response(status: StatusCode, xml: String) -> Response<Body> {
    let len = xml.len() as u64;
    let mut res = Response::new(Body::from(xml));
    *res.status_mut() = status;
    let h = res.headers_mut();
    h.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/xml; charset=utf-8"),
    );
    h.typed_insert(headers::ContentLength(len));
    res
}

impl DavHandler {
    // Describe a path: the resource itself, and for a directory its
    // children. An absent path gives an empty list.
    pub(crate) async fn list_resource(
        &self,
        path: &DavPath,
        depth: Option<Depth>,
    ) -> DavResult<Vec<ResourceDescriptor>> {
        if path.is_root() && depth == Some(Depth::Zero) {
            return Ok(vec![ResourceDescriptor::directory("/", SystemTime::now())]);
        }
        let mut list = match self.fs.list(path).await {
            Ok(list) => list,
            Err(FsError::NotFound) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        for item in list.iter_mut() {
            item.fix_name();
        }
        Ok(list)
    }

    // drain request body and return it.
    pub(crate) async fn read_request<ReqBody, ReqData, ReqError>(
        &self,
        body: ReqBody,
        max_size: usize,
    ) -> DavResult<Vec<u8>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let mut data = Vec::new();
        pin_utils::pin_mut!(body);
        while let Some(res) = body.data().await {
            let mut buf = res.map_err(|_| {
                DavError::IoError(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "UnexpectedEof",
                ))
            })?;
            while buf.has_remaining() {
                if data.len() + buf.remaining() > max_size {
                    return Err(StatusCode::PAYLOAD_TOO_LARGE.into());
                }
                let b = buf.chunk();
                let l = b.len();
                data.extend_from_slice(b);
                buf.advance(l);
            }
        }
        Ok(data)
    }

    // internal dispatcher.
    async fn handle_inner<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> Response<Body>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        // Turn any DavError results into a HTTP error response.
        let mut resp = match self.handle2(req).await {
            Ok(resp) => {
                debug!("== END REQUEST result {}", resp.status());
                resp
            }
            Err(err) => {
                let status = err.statuscode();
                if status.is_server_error() {
                    error!("== END REQUEST result {status}: {err}");
                } else {
                    debug!("== END REQUEST result {err:?}");
                }
                let mut resp = empty_response(status);
                let h = resp.headers_mut();
                match err {
                    DavError::RangeNotSatisfiable(size) => {
                        if let Ok(v) = HeaderValue::from_str(&range::unsatisfied_range(size)) {
                            h.insert("Content-Range", v);
                        }
                    }
                    _ if status == StatusCode::METHOD_NOT_ALLOWED => {
                        // a restricted handler only advertises what it serves.
                        if self.allow == DavMethod::all() {
                            h.insert("Allow", HeaderValue::from_static(ALLOW_METHODS));
                        } else if let Ok(v) = HeaderValue::from_str(&allowed_methods(self.allow)) {
                            h.insert("Allow", v);
                        }
                    }
                    _ => {}
                }
                resp
            }
        };

        let h = resp.headers_mut();
        h.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
        h.insert(
            "Access-Control-Allow-Methods",
            HeaderValue::from_static(ALLOW_METHODS),
        );
        h.insert(
            "Access-Control-Allow-Headers",
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        h.typed_insert(davheaders::Dav("1,2".to_string()));
        h.typed_insert(davheaders::MsAuthorVia("DAV".to_string()));
        resp
    }

    // internal dispatcher part 2.
    async fn handle2<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let (req, body) = {
            let (parts, body) = req.into_parts();
            (Request::from_parts(parts, ()), body)
        };

        // translate HTTP method to Webdav method.
        let method = match dav_method(req.method()) {
            Ok(m) => m,
            Err(e) => {
                debug!("refusing method {} request {}", req.method(), req.uri());
                return Err(e);
            }
        };

        // see if method is allowed.
        if !self.allow.contains(method) {
            debug!(
                "method {} not allowed on request {}",
                req.method(),
                req.uri()
            );
            return Err(StatusCode::METHOD_NOT_ALLOWED.into());
        }

        // normalize the request path.
        let path = match DavPath::from_uri_and_prefix(req.uri(), &self.prefix) {
            Some(path) => path,
            None => {
                debug!("{} is outside of prefix {}", req.uri(), self.prefix);
                return Err(DavError::NotFound);
            }
        };

        debug!("== START REQUEST {:?} {}", method, path);

        // PUT and POST stream the body to the store. Some other methods
        // get it pre-read into a Vec<u8>, the rest ignore it.
        let body_data = if DavMethod::WEBDAV_BODY.contains(method) {
            self.read_request(body, self.max_body_size).await?
        } else if method == DavMethod::PUT || method == DavMethod::POST {
            let strm = crate::body::request_stream(body);
            return if method == DavMethod::PUT {
                self.handle_put(&req, &path, strm).await
            } else {
                self.handle_post(&req, &path, strm).await
            };
        } else {
            drop(body);
            Vec::new()
        };

        if method == DavMethod::OPTIONS {
            self.handle_options().await
        } else if method == DavMethod::PROPFIND {
            self.handle_propfind(&req, &path).await
        } else if method == DavMethod::PROPPATCH {
            self.handle_proppatch(&path, &body_data).await
        } else if method == DavMethod::MKCOL {
            self.handle_mkcol(&path).await
        } else if method == DavMethod::DELETE {
            self.handle_delete(&path).await
        } else if method == DavMethod::LOCK {
            self.handle_lock(&req, &path).await
        } else if method == DavMethod::UNLOCK {
            self.handle_unlock(&req, &path).await
        } else if method == DavMethod::GET || method == DavMethod::HEAD {
            self.handle_get(&req, &path, method == DavMethod::HEAD).await
        } else if method == DavMethod::MOVE {
            self.handle_move(&req, &path).await
        } else {
            Err(DavError::UnknownDavMethod)
        }
    }
}
