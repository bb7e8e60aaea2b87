use headers::HeaderMapExt;
use http::header::HeaderValue;
use http::Response;

use crate::body::Body;
use crate::davheaders;
use crate::util::ALLOW_METHODS;
use crate::DavResult;

impl crate::DavHandler {
    // Same answer for every path, without asking the store.
    pub(crate) async fn handle_options(&self) -> DavResult<Response<Body>> {
        let mut res = Response::new(Body::empty());

        let h = res.headers_mut();
        h.insert("Allow", HeaderValue::from_static(ALLOW_METHODS));
        h.typed_insert(davheaders::Dav("1,2".to_string()));
        h.typed_insert(davheaders::MsAuthorVia("DAV".to_string()));
        h.typed_insert(headers::ContentLength(0));

        Ok(res)
    }
}
