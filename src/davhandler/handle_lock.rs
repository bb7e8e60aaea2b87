use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davhandler::{empty_response, xml_response};
use crate::davheaders::{LockToken, Timeout};
use crate::davpath::DavPath;
use crate::multistatus;
use crate::DavResult;

impl crate::DavHandler {
    // Every LOCK succeeds with a new token. The lockinfo body, if any,
    // is not looked at.
    pub(crate) async fn handle_lock(
        &self,
        req: &Request<()>,
        path: &DavPath,
    ) -> DavResult<Response<Body>> {
        let lock = self.locks.create(path);

        if let Some(hooks) = self.fs.as_lock_hooks() {
            if let Err(e) = hooks.lock(path, &lock.token).await {
                warn!("lock hook failed on {path}: {e}");
            }
        }

        let timeout = req
            .headers()
            .typed_get::<Timeout>()
            .map(|t| t.0)
            .unwrap_or_else(|| "Infinite".to_string());
        let xml = multistatus::lockdiscovery(&lock.token, &timeout, path.as_str());

        let mut res = xml_response(StatusCode::OK, xml);
        res.headers_mut().typed_insert(LockToken(lock.token));
        Ok(res)
    }

    // Any known token is removed, whatever path it was created for.
    pub(crate) async fn handle_unlock(
        &self,
        req: &Request<()>,
        path: &DavPath,
    ) -> DavResult<Response<Body>> {
        if let Some(LockToken(token)) = req.headers().typed_get::<LockToken>() {
            if self.locks.remove(&token).is_none() {
                debug!("unlock {path}: token {token} not found");
            }
        }

        if let Some(hooks) = self.fs.as_lock_hooks() {
            if let Err(e) = hooks.unlock(path).await {
                warn!("unlock hook failed on {path}: {e}");
            }
        }

        Ok(empty_response(StatusCode::NO_CONTENT))
    }
}
