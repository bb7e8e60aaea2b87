//! ## Lightweight async WebDAV handler
//!
//! [`Webdav`] (RFC4918) is defined as HTTP (GET/HEAD/PUT/DELETE) plus a
//! bunch of extension methods (PROPFIND, etc). This crate implements the
//! subset that the operating system clients (the Windows mini-redirector,
//! macOS Finder, davfs2) and most sync clients actually need to mount a
//! share and read and write files:
//!
//! - discovery: PROPFIND (depth 0 and 1), PROPPATCH (acknowledged only)
//! - content: GET with single byte ranges, HEAD, PUT, POST
//! - collections: MKCOL, DELETE, MOVE
//! - advisory locking: LOCK / UNLOCK
//!
//! A `handler` is a piece of code that takes a `http::Request`, processes it in some
//! way, and then generates a `http::Response`. [`DavHandler`] maps the
//! protocol onto a [store][DavStore]: a small trait with `list`, `get` and
//! `write`, plus optional capabilities for the rest.
//!
//! Locks are advisory. A LOCK always succeeds and hands out a token; a PUT
//! that presents an unknown token in its `If:` header is refused with 423,
//! and tokens expire after two hours if nobody unlocks them. Nothing stops
//! a client that doesn't lock at all.
//!
//! ## Backends.
//!
//! Included are two stores:
//!
//! - [`LocalStore`]: serves a directory on the local filesystem
//! - [`MemStore`]: ephemeral in-memory store.
//!
//! ## Example.
//!
//! Example server using [hyper] that serves the /tmp directory in r/w mode.
//!
//! ```no_run
//! use std::convert::Infallible;
//! use dav_lite::{DavHandler, FileSystem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let dir = "/tmp";
//!     let addr = ([127, 0, 0, 1], 4918).into();
//!
//!     let dav_server = DavHandler::builder(FileSystem::local(dir)).build();
//!     dav_server.spawn_lock_sweeper();
//!
//!     let make_service = hyper::service::make_service_fn(move |_| {
//!         let dav_server = dav_server.clone();
//!         async move {
//!             let func = move |req| {
//!                 let dav_server = dav_server.clone();
//!                 async move {
//!                     Ok::<_, Infallible>(dav_server.handle(req).await)
//!                 }
//!             };
//!             Ok::<_, Infallible>(hyper::service::service_fn(func))
//!         }
//!     });
//!
//!     println!("Serving {} on {}", dir, addr);
//!     let _ = hyper::Server::bind(&addr)
//!         .serve(make_service)
//!         .await
//!         .map_err(|e| eprintln!("server error: {}", e));
//! }
//! ```
//!
//! [`Webdav`]: https://tools.ietf.org/html/rfc4918
//! [hyper]: https://hyper.rs/

#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod davhandler;
mod davheaders;
mod errors;
mod multistatus;
mod util;

pub mod body;
pub mod davpath;
pub mod fs;
pub mod ls;
pub mod range;

#[cfg(any(docsrs, feature = "warp-compat"))]
#[cfg_attr(docsrs, doc(cfg(feature = "warp-compat")))]
pub mod warp;

use crate::errors::DavResult;

pub use crate::davhandler::{DavBuilder, DavHandler, FileSystem, MAX_BODY_SIZE};
pub use crate::davpath::DavPath;
#[cfg(any(docsrs, feature = "localfs"))]
pub use crate::fs::localfs::LocalStore;
#[cfg(any(docsrs, feature = "memfs"))]
pub use crate::fs::memfs::MemStore;
pub use crate::fs::{
    ByteStream, DavCollections, DavLockHooks, DavMove, DavPropPatch, DavStore, FsError, FsFuture,
    FsResult, ResourceDescriptor, ResourceKind,
};
pub use crate::ls::{DavLock, LockManager, LOCK_TTL, MIN_SWEEP_INTERVAL, SWEEP_INTERVAL};
pub use crate::range::ByteRange;
pub use crate::util::DavMethod;
