use http::{Response, StatusCode};

use crate::body::Body;
use crate::davhandler::empty_response;
use crate::davpath::DavPath;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_mkcol(&self, path: &DavPath) -> DavResult<Response<Body>> {
        if let Some(fs) = self.fs.as_collections() {
            fs.mkdir(path).await?;
        }
        Ok(empty_response(StatusCode::CREATED))
    }
}
