use http::{Response, StatusCode};

use crate::body::Body;
use crate::davhandler::empty_response;
use crate::davpath::DavPath;
use crate::fs::FsError;
use crate::DavResult;

impl crate::DavHandler {
    // Deleting something that isn't there is fine too.
    pub(crate) async fn handle_delete(&self, path: &DavPath) -> DavResult<Response<Body>> {
        if let Some(fs) = self.fs.as_collections() {
            match fs.delete(path).await {
                Ok(()) => {}
                Err(FsError::NotFound) => debug!("delete {path}: was not there"),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(empty_response(StatusCode::NO_CONTENT))
    }
}
