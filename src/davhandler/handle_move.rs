use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davhandler::empty_response;
use crate::davheaders::{Depth, Destination, Overwrite};
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::fs::FsError;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_move(
        &self,
        req: &Request<()>,
        path: &DavPath,
    ) -> DavResult<Response<Body>> {
        let depth = req.headers().typed_get::<Depth>();
        let existed = !self.list_resource(path, depth).await?.is_empty();

        let dest = match req.headers().typed_get::<Destination>() {
            Some(Destination(dest)) => dest,
            None => return Err(StatusCode::BAD_REQUEST.into()),
        };
        // a destination outside of our prefix is on "another server".
        let dest = match DavPath::from_str_and_prefix(&dest, &self.prefix) {
            Some(dest) => dest,
            None => return Err(StatusCode::BAD_GATEWAY.into()),
        };
        let overwrite = req
            .headers()
            .typed_get::<Overwrite>()
            .unwrap_or_default()
            .0;

        if let Some(fs) = self.fs.as_move() {
            debug!("move {path} -> {dest} (overwrite: {overwrite})");
            match fs.move_to(path, &dest, overwrite).await {
                Ok(()) => {}
                Err(FsError::Status(code)) => {
                    debug!("move {path} -> {dest}: store says {code}");
                    return Ok(empty_response(code));
                }
                Err(e) => return Err(DavError::FsError(e)),
            }
        }

        Ok(empty_response(if existed {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::CREATED
        }))
    }
}
