use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davhandler::xml_response;
use crate::davheaders::Depth;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::multistatus;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_propfind(
        &self,
        req: &Request<()>,
        path: &DavPath,
    ) -> DavResult<Response<Body>> {
        let depth = req.headers().typed_get::<Depth>();
        let list = self.list_resource(path, depth).await?;
        if list.is_empty() {
            return Err(DavError::NotFound);
        }
        debug!("propfind {} depth {:?}: {} entries", path, depth, list.len());
        Ok(xml_response(
            StatusCode::MULTI_STATUS,
            multistatus::propfind(&list),
        ))
    }

    // The properties are not parsed. The store gets the raw body, if it
    // wants it, and the client always hears that all went well.
    pub(crate) async fn handle_proppatch(
        &self,
        path: &DavPath,
        body: &[u8],
    ) -> DavResult<Response<Body>> {
        if let Some(pp) = self.fs.as_proppatch() {
            let body = String::from_utf8_lossy(body);
            if let Err(e) = pp.proppatch(path, &body).await {
                warn!("proppatch hook failed on {path}: {e}");
            }
        }
        Ok(xml_response(
            StatusCode::MULTI_STATUS,
            multistatus::proppatch(path.as_str()),
        ))
    }
}
