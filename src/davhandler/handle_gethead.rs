use headers::HeaderMapExt;
use http::header::{HeaderValue, CONTENT_RANGE, CONTENT_TYPE};
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davheaders::Depth;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::range::{self, RangeOutcome};
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_get(
        &self,
        req: &Request<()>,
        path: &DavPath,
        head: bool,
    ) -> DavResult<Response<Body>> {
        let depth = req.headers().typed_get::<Depth>();
        let item = self
            .list_resource(path, depth)
            .await?
            .into_iter()
            .next()
            .ok_or(DavError::NotFound)?;

        if head {
            let mut res = Response::new(Body::empty());
            let h = res.headers_mut();
            if item.is_dir() {
                h.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
                h.typed_insert(headers::ContentLength(0));
            } else {
                h.typed_insert(headers::ContentType::octet_stream());
                h.typed_insert(headers::ContentLength(item.size));
                h.typed_insert(headers::LastModified::from(item.last_modified));
                h.typed_insert(headers::AcceptRanges::bytes());
            }
            return Ok(res);
        }

        if !item.is_file() {
            debug!("get {path}: not a file");
            return Err(DavError::NotFound);
        }

        let range_hdr = req.headers().get("range").and_then(|v| v.to_str().ok());
        let range = match range::resolve(range_hdr, item.size) {
            RangeOutcome::Full => None,
            RangeOutcome::Partial(r) => Some(r),
            RangeOutcome::NotSatisfiable => {
                debug!("get {path}: range {range_hdr:?} not satisfiable");
                return Err(DavError::RangeNotSatisfiable(item.size));
            }
        };

        let content = match self.fs.get(path, range).await? {
            Some(content) => content,
            None => return Err(DavError::NotFound),
        };

        let mut res = Response::new(Body::from(content));
        let h = res.headers_mut();
        h.typed_insert(headers::ContentType::octet_stream());
        h.typed_insert(headers::AcceptRanges::bytes());
        match range {
            Some(r) => {
                h.typed_insert(headers::ContentLength(r.content_length()));
                h.insert(CONTENT_RANGE, HeaderValue::from_str(&r.content_range(item.size))?);
                *res.status_mut() = StatusCode::PARTIAL_CONTENT;
            }
            None => h.typed_insert(headers::ContentLength(item.size)),
        }
        Ok(res)
    }
}
