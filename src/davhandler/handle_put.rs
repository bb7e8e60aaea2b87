use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davhandler::empty_response;
use crate::davheaders::{self, Depth};
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::fs::ByteStream;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_put(
        &self,
        req: &Request<()>,
        path: &DavPath,
        body: ByteStream,
    ) -> DavResult<Response<Body>> {
        let depth = req.headers().typed_get::<Depth>();
        let existed = !self.list_resource(path, depth).await?.is_empty();

        // A token in the If: header must be one we handed out. It is
        // good for one write only.
        let token = req
            .headers()
            .typed_get::<davheaders::If>()
            .and_then(|i| i.0);
        if let Some(token) = &token {
            if !self.locks.contains(token) {
                debug!("put {path}: unknown lock token {token}");
                return Err(DavError::LockConflict);
            }
        }

        self.fs.write(path, body).await?;

        if let Some(token) = &token {
            self.locks.remove(token);
        }
        Ok(empty_response(if existed {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::CREATED
        }))
    }

    // Like PUT without the lock check; the listing is only a hint.
    pub(crate) async fn handle_post(
        &self,
        req: &Request<()>,
        path: &DavPath,
        body: ByteStream,
    ) -> DavResult<Response<Body>> {
        let depth = req.headers().typed_get::<Depth>();
        let list = match self.list_resource(path, depth).await {
            Ok(list) => list,
            Err(e) => {
                debug!("post {path}: listing failed ({e}), assuming new");
                Vec::new()
            }
        };
        let target = path.without_slash();
        let existed = list.iter().any(|item| {
            let name = match item.name.trim_end_matches('/') {
                "" => "/",
                name => name,
            };
            name == target
        });

        self.fs.write(path, body).await?;

        Ok(empty_response(if existed {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::CREATED
        }))
    }
}
