//! `warp` filters that serve a [`DavHandler`].
//!
//! Both filters reply to every request they see. Errors from the store
//! come back as WebDAV status codes, so nothing is turned into a warp
//! rejection.
use std::convert::Infallible;
use std::path::Path;

use crate::{DavHandler, FileSystem};
use warp::{filters::BoxedFilter, Filter, Reply};

/// Filter that hands each request to `handler`.
///
/// The part of the path that was matched before this filter is stripped
/// as the prefix, so mount it with `warp::path("dav").and(dav_handler(h))`.
pub fn dav_handler(handler: DavHandler) -> BoxedFilter<(impl Reply,)> {
    use http::header::HeaderMap;
    use http::Response;
    use warp::path::{FullPath, Tail};

    warp::method()
        .and(warp::path::full())
        .and(warp::path::tail())
        .and(warp::header::headers_cloned())
        .and(warp::body::stream())
        .and_then(
            move |method, path_full: FullPath, path_tail: Tail, headers: HeaderMap, body| {
                let handler = handler.clone();

                async move {
                    // warp hands us the parts, the handler wants a Request.
                    let path_str = path_full.as_str();
                    let mut builder = http::Request::builder().method(method).uri(path_str);
                    for (k, v) in headers.iter() {
                        builder = builder.header(k, v);
                    }
                    let response = match builder.body(body) {
                        Ok(request) => {
                            // everything in front of the unmatched tail.
                            let prefix = path_str
                                .strip_suffix(path_tail.as_str())
                                .unwrap_or(path_str)
                                .to_string();
                            handler.handle_stream_with(request, Some(prefix)).await
                        }
                        Err(e) => {
                            debug!("warp: cannot rebuild request for {path_str}: {e}");
                            let mut res = Response::new(crate::body::Body::empty());
                            *res.status_mut() = http::StatusCode::BAD_REQUEST;
                            res
                        }
                    };

                    // hyper wants its own body type.
                    let (parts, body) = response.into_parts();
                    let response = Response::from_parts(parts, hyper::Body::wrap_stream(body));
                    Ok::<_, Infallible>(response)
                }
            },
        )
        .boxed()
}

/// Filter that serves the directory `base` read-write.
///
/// It also starts the lock sweeper, which needs a running tokio runtime.
pub fn dav_dir(base: impl AsRef<Path>) -> BoxedFilter<(impl Reply,)> {
    let handler = DavHandler::builder(FileSystem::local(base.as_ref())).build();
    handler.spawn_lock_sweeper();
    dav_handler(handler)
}
