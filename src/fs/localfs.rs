//! Local filesystem access.
//!
//! This implementation is stateless. So the easiest way to use it
//! is to create a new instance in your handler every time
//! you need one.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_stream::stream;
use bytes::BytesMut;
use futures_util::{FutureExt, StreamExt};
use http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::davpath::DavPath;
use crate::fs::*;
use crate::range::ByteRange;

const READ_BUF_SIZE: usize = 16384;

/// Local Filesystem implementation.
#[derive(Debug, Clone)]
pub struct LocalStore {
    basedir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore, serving "base".
    pub fn new(base: impl Into<PathBuf>) -> Arc<LocalStore> {
        Arc::new(LocalStore {
            basedir: base.into(),
        })
    }

    // Map a request path onto the base directory. Anything that would
    // end up outside of it is refused with a 403.
    fn abs_path(&self, path: &DavPath) -> FsResult<PathBuf> {
        let rel = Path::new(path.as_rel_path());
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            debug!("localfs: refusing {path:?}");
            return Err(FsError::Forbidden);
        }
        let mut pathbuf = self.basedir.clone();
        pathbuf.push(rel);
        Ok(pathbuf)
    }

    fn descriptor(name: String, meta: &std::fs::Metadata) -> ResourceDescriptor {
        let modified = meta.modified().unwrap_or_else(|_| SystemTime::now());
        let mut d = if meta.is_dir() {
            ResourceDescriptor::directory(name, modified)
        } else {
            ResourceDescriptor::file(name, meta.len(), modified)
        };
        d.writable = !meta.permissions().readonly();
        d.fix_name();
        d
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

impl DavStore for LocalStore {
    fn list<'a>(&'a self, davpath: &'a DavPath) -> FsFuture<'a, Vec<ResourceDescriptor>> {
        async move {
            trace!("FS: list {davpath:?}");
            let path = self.abs_path(davpath)?;
            let meta = tokio::fs::metadata(&path).await?;
            let mut list = vec![LocalStore::descriptor(davpath.as_str().to_string(), &meta)];
            if !meta.is_dir() {
                return Ok(list);
            }
            let mut read_dir = tokio::fs::read_dir(&path).await?;
            loop {
                match read_dir.next_entry().await {
                    Ok(Some(entry)) => {
                        let name = entry.file_name().to_string_lossy().into_owned();
                        match entry.metadata().await {
                            Ok(meta) => {
                                let name = join(davpath.as_str(), &name);
                                list.push(LocalStore::descriptor(name, &meta));
                            }
                            Err(e) => debug!("list: metadata of {name} failed: {e}"),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!("read_dir failed {e}");
                        break;
                    }
                }
            }
            Ok(list)
        }
        .boxed()
    }

    fn get<'a>(
        &'a self,
        path: &'a DavPath,
        range: Option<ByteRange>,
    ) -> FsFuture<'a, Option<ByteStream>> {
        async move {
            trace!("FS: get {path:?} {range:?}");
            let path = self.abs_path(path)?;
            let mut file = match tokio::fs::File::open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let mut remaining = match range {
                Some(r) => {
                    file.seek(io::SeekFrom::Start(r.start)).await?;
                    r.content_length()
                }
                None => file.metadata().await?.len(),
            };
            let strm: ByteStream = Box::pin(stream! {
                while remaining > 0 {
                    let count = remaining.min(READ_BUF_SIZE as u64) as usize;
                    let mut buf = BytesMut::with_capacity(count);
                    match (&mut file).take(count as u64).read_buf(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            remaining -= n as u64;
                            yield Ok(buf.freeze());
                        }
                        Err(e) => {
                            yield Err(e);
                            break;
                        }
                    }
                }
            });
            Ok(Some(strm))
        }
        .boxed()
    }

    fn write<'a>(&'a self, path: &'a DavPath, mut body: ByteStream) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: write {path:?}");
            let path = self.abs_path(path)?;
            if let Ok(meta) = tokio::fs::metadata(&path).await {
                if meta.is_dir() {
                    return Err(FsError::Status(StatusCode::METHOD_NOT_ALLOWED));
                }
            }
            let mut file = match tokio::fs::File::create(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(FsError::Status(StatusCode::CONFLICT))
                }
                Err(e) => return Err(e.into()),
            };
            while let Some(chunk) = body.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            Ok(file.sync_all().await?)
        }
        .boxed()
    }

    fn as_move(&self) -> Option<&dyn DavMove> {
        Some(self)
    }

    fn as_collections(&self) -> Option<&dyn DavCollections> {
        Some(self)
    }
}

impl DavMove for LocalStore {
    fn move_to<'a>(
        &'a self,
        from: &'a DavPath,
        to: &'a DavPath,
        overwrite: bool,
    ) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: move {from:?} {to:?} overwrite={overwrite}");
            let p_from = self.abs_path(from)?;
            let p_to = self.abs_path(to)?;
            if p_from == self.basedir
                || p_to == self.basedir
                || p_to.starts_with(&p_from)
                || p_from.starts_with(&p_to)
            {
                return Err(FsError::Forbidden);
            }
            tokio::fs::symlink_metadata(&p_from).await?;
            if let Ok(meta) = tokio::fs::symlink_metadata(&p_to).await {
                if !overwrite {
                    return Err(FsError::Status(StatusCode::PRECONDITION_FAILED));
                }
                if meta.is_dir() {
                    tokio::fs::remove_dir_all(&p_to).await?;
                } else {
                    tokio::fs::remove_file(&p_to).await?;
                }
            }
            Ok(tokio::fs::rename(p_from, p_to).await?)
        }
        .boxed()
    }
}

impl DavCollections for LocalStore {
    fn mkdir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: mkdir {path:?}");
            let path = self.abs_path(path)?;
            match tokio::fs::create_dir(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    Err(FsError::Status(StatusCode::METHOD_NOT_ALLOWED))
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(FsError::Status(StatusCode::CONFLICT))
                }
                Err(e) => Err(e.into()),
            }
        }
        .boxed()
    }

    fn delete<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: delete {path:?}");
            let path = self.abs_path(path)?;
            if path == self.basedir {
                return Err(FsError::Forbidden);
            }
            let meta = tokio::fs::symlink_metadata(&path).await?;
            if meta.is_dir() {
                Ok(tokio::fs::remove_dir_all(path).await?)
            } else {
                Ok(tokio::fs::remove_file(path).await?)
            }
        }
        .boxed()
    }
}
