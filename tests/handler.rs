use futures_util::StreamExt;
use http::{Request, Response, StatusCode};

use dav_lite::body::Body;
use dav_lite::{DavHandler, DavMethod, FileSystem, MemStore};

fn setup() -> (MemStore, DavHandler) {
    let store = MemStore::new();
    let dh = DavHandler::builder(FileSystem::custom(store.clone())).build();
    (store, dh)
}

fn req(method: &str, uri: &str) -> http::request::Builder {
    Request::builder().method(method).uri(uri)
}

fn header<'a>(res: &'a Response<Body>, name: &str) -> &'a str {
    res.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_else(|| panic!("missing header {name}"))
}

async fn body_bytes(res: Response<Body>) -> Vec<u8> {
    let mut body = res.into_body();
    let mut data = Vec::new();
    while let Some(chunk) = body.next().await {
        data.extend_from_slice(&chunk.unwrap());
    }
    data
}

async fn body_string(res: Response<Body>) -> String {
    String::from_utf8(body_bytes(res).await).unwrap()
}

async fn send(dh: &DavHandler, builder: http::request::Builder, body: &str) -> Response<Body> {
    dh.handle(builder.body(body.to_string()).unwrap()).await
}

#[tokio::test]
async fn put_then_get() {
    let (store, dh) = setup();

    let res = send(&dh, req("PUT", "/a.txt"), "hello world").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(header(&res, "content-length"), "0");
    assert_eq!(store.contents("/a.txt").unwrap(), "hello world");

    let res = send(&dh, req("PUT", "/a.txt"), "hello again").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = send(&dh, req("GET", "/a.txt"), "").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "content-type"), "application/octet-stream");
    assert_eq!(header(&res, "content-length"), "11");
    assert_eq!(header(&res, "accept-ranges"), "bytes");
    assert_eq!(body_bytes(res).await, b"hello again");
}

#[tokio::test]
async fn put_into_missing_collection() {
    let (_store, dh) = setup();
    let res = send(&dh, req("PUT", "/nope/a.txt"), "x").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn preamble_on_every_response() {
    let (_store, dh) = setup();
    for (method, path, status) in [
        ("GET", "/missing", StatusCode::NOT_FOUND),
        ("OPTIONS", "/", StatusCode::OK),
        ("PROPFIND", "/", StatusCode::MULTI_STATUS),
    ] {
        let res = send(&dh, req(method, path).header("Depth", "0"), "").await;
        assert_eq!(res.status(), status, "{method}");
        assert_eq!(header(&res, "access-control-allow-origin"), "*");
        assert!(header(&res, "access-control-allow-methods").contains("PROPFIND"));
        assert!(header(&res, "access-control-allow-headers").contains("Lock-Token"));
        assert_eq!(header(&res, "dav"), "1,2");
        assert_eq!(header(&res, "ms-author-via"), "DAV");
    }
}

#[tokio::test]
async fn not_found_has_empty_body() {
    let (_store, dh) = setup();
    for method in ["GET", "HEAD", "PROPFIND"] {
        let res = send(&dh, req(method, "/missing"), "").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{method}");
        assert_eq!(header(&res, "content-length"), "0");
        assert!(body_bytes(res).await.is_empty());
    }
}

#[tokio::test]
async fn options() {
    let (_store, dh) = setup();
    let res = send(&dh, req("OPTIONS", "/whatever/it/is"), "").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        header(&res, "allow"),
        "OPTIONS, GET, HEAD, POST, PUT, DELETE, PROPFIND, PROPPATCH, MKCOL, COPY, MOVE, LOCK, UNLOCK"
    );
    assert_eq!(header(&res, "content-length"), "0");
    assert!(body_bytes(res).await.is_empty());
}

#[tokio::test]
async fn propfind_root_depth_zero() {
    let (_store, dh) = setup();
    let res = send(&dh, req("PROPFIND", "/").header("Depth", "0"), "").await;
    assert_eq!(res.status(), StatusCode::MULTI_STATUS);
    assert_eq!(header(&res, "content-type"), "text/xml; charset=utf-8");
    let len: usize = header(&res, "content-length").parse().unwrap();
    let xml = body_string(res).await;
    assert_eq!(xml.len(), len);
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?><D:multistatus xmlns:D="DAV:">"#));
    assert_eq!(xml.matches("<D:response>").count(), 1);
    assert!(xml.contains("<D:href>/</D:href>"));
    assert!(xml.contains("<D:resourcetype><D:collection/></D:resourcetype>"));
}

#[tokio::test]
async fn propfind_collection_children() {
    let (store, dh) = setup();
    store.insert_file("/docs/a.txt", "abc");
    store.insert_read_only("/docs/ro.txt", "r");

    let res = send(&dh, req("PROPFIND", "/docs").header("Depth", "1"), "").await;
    assert_eq!(res.status(), StatusCode::MULTI_STATUS);
    let xml = body_string(res).await;
    assert_eq!(xml.matches("<D:response>").count(), 3);
    assert!(xml.contains("<D:href>/docs/</D:href>"));
    assert!(xml.contains("<D:href>/docs/a.txt</D:href>"));
    assert!(xml.contains("<D:displayname>a.txt</D:displayname>"));
    assert!(xml.contains("<D:getcontentlength>3</D:getcontentlength>"));
    assert!(xml.contains("<D:locktype><D:read/></D:locktype>"));
    assert!(!xml.contains('\n'));
}

#[tokio::test]
async fn propfind_escapes_names() {
    let (store, dh) = setup();
    store.insert_file("/a&b c.txt", "x");
    let res = send(&dh, req("PROPFIND", "/a%26b%20c.txt").header("Depth", "0"), "").await;
    assert_eq!(res.status(), StatusCode::MULTI_STATUS);
    let xml = body_string(res).await;
    assert!(xml.contains("<D:displayname>a&amp;b c.txt</D:displayname>"));
}

#[tokio::test]
async fn propfind_body_too_large() {
    let store = MemStore::new();
    let dh = DavHandler::builder(FileSystem::custom(store))
        .max_body_size(16)
        .build();
    let body = "<propfind xmlns=\"DAV:\"><allprop/></propfind>";
    let res = send(&dh, req("PROPFIND", "/").header("Depth", "0"), body).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn get_range() {
    let (store, dh) = setup();
    store.insert_file("/ten", "0123456789");

    let res = send(&dh, req("GET", "/ten").header("Range", "bytes=0-4"), "").await;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&res, "content-range"), "bytes 0-4/10");
    assert_eq!(header(&res, "content-length"), "5");
    assert_eq!(body_bytes(res).await, b"01234");

    let res = send(&dh, req("GET", "/ten").header("Range", "bytes=7-"), "").await;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&res, "content-range"), "bytes 7-9/10");
    assert_eq!(body_bytes(res).await, b"789");

    let res = send(&dh, req("GET", "/ten").header("Range", "bytes=20-30"), "").await;
    assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&res, "content-range"), "bytes */10");
    assert_eq!(header(&res, "content-length"), "0");
}

#[tokio::test]
async fn get_directory_is_not_found() {
    let (store, dh) = setup();
    store.insert_file("/docs/a.txt", "abc");
    let res = send(&dh, req("GET", "/docs/"), "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn head_file_and_directory() {
    let (store, dh) = setup();
    store.insert_file("/docs/a.txt", "0123456789");

    let res = send(&dh, req("HEAD", "/docs/a.txt"), "").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "content-type"), "application/octet-stream");
    assert_eq!(header(&res, "content-length"), "10");
    assert_eq!(header(&res, "accept-ranges"), "bytes");
    assert!(header(&res, "last-modified").ends_with("GMT"));
    assert!(body_bytes(res).await.is_empty());

    let res = send(&dh, req("HEAD", "/docs"), "").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "content-type"), "text/html");
    assert_eq!(header(&res, "content-length"), "0");
}

#[tokio::test]
async fn post_creates_then_updates() {
    let (store, dh) = setup();
    let res = send(&dh, req("POST", "/p.txt"), "one").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = send(&dh, req("POST", "/p.txt"), "two").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.contents("/p.txt").unwrap(), "two");
}

#[tokio::test]
async fn proppatch_is_acknowledged() {
    let (store, dh) = setup();
    store.insert_file("/a.txt", "x");
    let body = r#"<D:propertyupdate xmlns:D="DAV:"><D:set><D:prop><x/></D:prop></D:set></D:propertyupdate>"#;
    let res = send(&dh, req("PROPPATCH", "/a.txt"), body).await;
    assert_eq!(res.status(), StatusCode::MULTI_STATUS);
    let xml = body_string(res).await;
    assert!(xml.contains("<D:href>/a.txt</D:href>"));
    assert!(xml.contains("<D:prop/><D:status>HTTP/1.1 200 OK</D:status>"));
}

#[tokio::test]
async fn mkcol_and_delete() {
    let (store, dh) = setup();

    let res = send(&dh, req("MKCOL", "/new"), "").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = send(&dh, req("MKCOL", "/new"), "").await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let res = send(&dh, req("MKCOL", "/a/b/c"), "").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = send(&dh, req("PUT", "/new/f.txt"), "data").await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = send(&dh, req("DELETE", "/new"), "").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(store.contents("/new/f.txt").is_none());

    // gone already, still fine.
    let res = send(&dh, req("DELETE", "/new"), "").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(header(&res, "content-length"), "0");
}

#[tokio::test]
async fn move_overwrite() {
    let (store, dh) = setup();
    store.insert_file("/a", "a");
    store.insert_file("/b", "b");

    let res = send(
        &dh,
        req("MOVE", "/a")
            .header("Destination", "http://localhost:4918/b")
            .header("Overwrite", "F"),
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(header(&res, "content-length"), "0");
    assert_eq!(store.contents("/b").unwrap(), "b");
    assert_eq!(store.contents("/a").unwrap(), "a");

    let res = send(
        &dh,
        req("MOVE", "/a").header("Destination", "http://localhost:4918/b"),
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.contents("/b").unwrap(), "a");
    assert!(store.contents("/a").is_none());
}

#[tokio::test]
async fn move_destination() {
    let (store, dh) = setup();
    store.insert_file("/dir/x y.txt", "x");

    // an absolute path works, and it is percent-decoded.
    let res = send(
        &dh,
        req("MOVE", "/dir/x%20y.txt").header("Destination", "/dir/z%20w.txt"),
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.contents("/dir/z w.txt").unwrap(), "x");

    let res = send(&dh, req("MOVE", "/dir/z%20w.txt"), "").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = send(
        &dh,
        req("MOVE", "/dir/z%20w.txt").header("Destination", "not a url"),
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = send(
        &dh,
        req("MOVE", "/missing").header("Destination", "/elsewhere"),
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn move_onto_own_ancestor() {
    let (store, dh) = setup();
    store.insert_file("/d/a", "precious");

    let res = send(&dh, req("MOVE", "/d/a").header("Destination", "/d"), "").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.contents("/d/a").unwrap(), "precious");

    let res = send(&dh, req("MOVE", "/d").header("Destination", "/d/a/b"), "").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.contents("/d/a").unwrap(), "precious");
}

#[tokio::test]
async fn unknown_method() {
    let (_store, dh) = setup();
    for method in ["COPY", "BREW"] {
        let res = send(&dh, req(method, "/a"), "").await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert!(header(&res, "allow").starts_with("OPTIONS, GET"));
        assert_eq!(header(&res, "dav"), "1,2");
    }
}

#[tokio::test]
async fn restricted_methods() {
    let store = MemStore::new();
    store.insert_file("/a.txt", "x");
    let dh = DavHandler::builder(FileSystem::custom(store.clone()))
        .methods(DavMethod::WEBDAV_RO)
        .build();

    let res = send(&dh, req("PUT", "/a.txt"), "y").await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(header(&res, "allow"), "OPTIONS, GET, HEAD, PROPFIND");
    assert_eq!(header(&res, "dav"), "1,2");
    assert_eq!(store.contents("/a.txt").unwrap(), "x");

    // verbs no handler serves get the same list.
    let res = send(&dh, req("COPY", "/a.txt"), "").await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(header(&res, "allow"), "OPTIONS, GET, HEAD, PROPFIND");

    let res = send(&dh, req("GET", "/a.txt"), "").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn strip_prefix() {
    let store = MemStore::new();
    let dh = DavHandler::builder(FileSystem::custom(store.clone()))
        .strip_prefix("/dav")
        .build();

    let res = send(&dh, req("PUT", "/dav/x.txt"), "x").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(store.contents("/x.txt").unwrap(), "x");

    let res = send(&dh, req("GET", "/other/x.txt"), "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = send(&dh, req("GET", "/davx.txt"), "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = send(&dh, req("PROPFIND", "/dav/").header("Depth", "1"), "").await;
    assert_eq!(res.status(), StatusCode::MULTI_STATUS);
    let xml = body_string(res).await;
    assert!(xml.contains("<D:href>/x.txt</D:href>"));

    // a destination outside of the prefix is on another server.
    let res = send(
        &dh,
        req("MOVE", "/dav/x.txt").header("Destination", "http://localhost/elsewhere/y.txt"),
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(store.contents("/x.txt").is_some());
}

#[tokio::test]
async fn path_normalization() {
    let (store, dh) = setup();
    let res = send(&dh, req("PUT", "/a%20b%3Fc.txt"), "x").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(store.contents("/a b_c.txt").unwrap(), "x");
}

#[tokio::test]
async fn local_store() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let dh = DavHandler::builder(FileSystem::local(dir)).build();

    let res = send(&dh, req("MKCOL", "/sub"), "").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = send(&dh, req("PUT", "/sub/f.txt"), "0123456789").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(std::fs::read(dir.join("sub/f.txt")).unwrap(), b"0123456789");

    let res = send(&dh, req("GET", "/sub/f.txt").header("Range", "bytes=2-3"), "").await;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(res).await, b"23");

    let res = send(&dh, req("PROPFIND", "/sub").header("Depth", "1"), "").await;
    assert_eq!(res.status(), StatusCode::MULTI_STATUS);
    let xml = body_string(res).await;
    assert!(xml.contains("<D:href>/sub/</D:href>"));
    assert!(xml.contains("<D:href>/sub/f.txt</D:href>"));

    let res = send(&dh, req("MOVE", "/sub/f.txt").header("Destination", "/sub"), "").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(std::fs::read(dir.join("sub/f.txt")).unwrap(), b"0123456789");

    let res = send(&dh, req("DELETE", "/sub"), "").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(!dir.join("sub").exists());
}

mod hooks {
    use std::sync::{Arc, Mutex};

    use dav_lite::{
        ByteRange, ByteStream, DavLockHooks, DavPath, DavPropPatch, DavStore, FsError, FsFuture,
        ResourceDescriptor,
    };

    use super::*;

    // MemStore plus a log of the hook calls. No MOVE/MKCOL/DELETE.
    #[derive(Clone, Default)]
    struct Recording {
        inner: MemStore,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Recording {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl DavStore for Recording {
        fn list<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Vec<ResourceDescriptor>> {
            self.inner.list(path)
        }

        fn get<'a>(
            &'a self,
            path: &'a DavPath,
            range: Option<ByteRange>,
        ) -> FsFuture<'a, Option<ByteStream>> {
            self.inner.get(path, range)
        }

        fn write<'a>(&'a self, path: &'a DavPath, body: ByteStream) -> FsFuture<'a, ()> {
            self.inner.write(path, body)
        }

        fn as_lock_hooks(&self) -> Option<&dyn DavLockHooks> {
            Some(self)
        }

        fn as_proppatch(&self) -> Option<&dyn DavPropPatch> {
            Some(self)
        }
    }

    impl DavLockHooks for Recording {
        fn lock<'a>(&'a self, path: &'a DavPath, token: &'a str) -> FsFuture<'a, ()> {
            Box::pin(async move {
                self.record(format!("lock {path} {token}"));
                Ok::<_, FsError>(())
            })
        }

        fn unlock<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
            Box::pin(async move {
                self.record(format!("unlock {path}"));
                // a failing hook does not change the answer.
                Err::<(), _>(FsError::GeneralFailure)
            })
        }
    }

    impl DavPropPatch for Recording {
        fn proppatch<'a>(&'a self, path: &'a DavPath, body: &'a str) -> FsFuture<'a, ()> {
            Box::pin(async move {
                self.record(format!("proppatch {path} {body}"));
                Ok::<_, FsError>(())
            })
        }
    }

    #[tokio::test]
    async fn optional_capabilities() {
        let store = Recording::default();
        let dh = DavHandler::builder(FileSystem::custom(store.clone())).build();

        let res = send(&dh, req("LOCK", "/f"), "").await;
        assert_eq!(res.status(), StatusCode::OK);
        let token = header(&res, "lock-token").trim_matches(|c| c == '<' || c == '>').to_string();

        let res = send(&dh, req("UNLOCK", "/f").header("Lock-Token", format!("<{token}>")), "").await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = send(&dh, req("PROPPATCH", "/f"), "<x/>").await;
        assert_eq!(res.status(), StatusCode::MULTI_STATUS);

        assert_eq!(
            *store.calls.lock().unwrap(),
            vec![
                format!("lock /f {token}"),
                "unlock /f".to_string(),
                "proppatch /f <x/>".to_string(),
            ]
        );

        // without the capabilities these are no-ops that still succeed.
        store.inner.insert_file("/a", "a");
        let res = send(&dh, req("MKCOL", "/dir"), "").await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let res = send(&dh, req("DELETE", "/a"), "").await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(store.inner.contents("/a").is_some());
        let res = send(&dh, req("MOVE", "/a").header("Destination", "/b"), "").await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(store.inner.contents("/b").is_none());
    }
}
