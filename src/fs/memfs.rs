//! Simple in-memory store.
//!
//! Everything is kept in one map from path to node, behind a mutex.
//! Useful for tests and for a scratch share that disappears when the
//! process exits.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::{Bytes, BytesMut};
use futures_util::{FutureExt, StreamExt};
use http::StatusCode;
use parking_lot::Mutex;

use crate::davpath::DavPath;
use crate::fs::*;
use crate::range::ByteRange;

#[derive(Debug, Clone)]
enum Node {
    Dir { modified: SystemTime },
    File { data: Bytes, modified: SystemTime, writable: bool },
}

impl Node {
    fn descriptor(&self, name: &str) -> ResourceDescriptor {
        let mut d = match self {
            Node::Dir { modified } => ResourceDescriptor::directory(name, *modified),
            Node::File {
                data,
                modified,
                writable,
            } => {
                let d = ResourceDescriptor::file(name, data.len() as u64, *modified);
                if *writable {
                    d
                } else {
                    d.read_only()
                }
            }
        };
        d.fix_name();
        d
    }
}

/// Ephemeral in-memory store.
#[derive(Debug, Clone)]
pub struct MemStore {
    // keys never end in a slash, except for the root "/".
    tree: Arc<Mutex<BTreeMap<String, Node>>>,
}

impl Default for MemStore {
    fn default() -> Self {
        MemStore::new()
    }
}

fn key(path: &DavPath) -> String {
    path.without_slash().to_string()
}

fn parent_key(key: &str) -> String {
    match key.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => key[..idx].to_string(),
    }
}

// is `key` `dir` itself or somewhere below it.
fn is_below(key: &str, dir: &str) -> bool {
    key == dir || dir == "/" || key.strip_prefix(dir).map_or(false, |r| r.starts_with('/'))
}

impl MemStore {
    /// Create a new, empty store.
    pub fn new() -> MemStore {
        let mut tree = BTreeMap::new();
        tree.insert(
            "/".to_string(),
            Node::Dir {
                modified: SystemTime::now(),
            },
        );
        MemStore {
            tree: Arc::new(Mutex::new(tree)),
        }
    }

    /// Add a file directly, creating missing parent directories.
    pub fn insert_file(&self, path: &str, data: impl Into<Bytes>) {
        self.insert_node(path, data.into(), true);
    }

    /// Add a read-only file directly.
    pub fn insert_read_only(&self, path: &str, data: impl Into<Bytes>) {
        self.insert_node(path, data.into(), false);
    }

    fn insert_node(&self, path: &str, data: Bytes, writable: bool) {
        let key = key(&DavPath::normalize(path));
        let now = SystemTime::now();
        let mut tree = self.tree.lock();
        let mut parent = parent_key(&key);
        while !tree.contains_key(&parent) {
            tree.insert(parent.clone(), Node::Dir { modified: now });
            parent = parent_key(&parent);
        }
        tree.insert(
            key,
            Node::File {
                data,
                modified: now,
                writable,
            },
        );
    }

    /// Contents of a file, if there is one at `path`.
    pub fn contents(&self, path: &str) -> Option<Bytes> {
        let key = key(&DavPath::normalize(path));
        match self.tree.lock().get(&key) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    fn check_parent(tree: &BTreeMap<String, Node>, key: &str) -> FsResult<()> {
        match tree.get(&parent_key(key)) {
            Some(Node::Dir { .. }) => Ok(()),
            _ => Err(FsError::Status(StatusCode::CONFLICT)),
        }
    }
}

impl DavStore for MemStore {
    fn list<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Vec<ResourceDescriptor>> {
        async move {
            trace!("memfs: list {path:?}");
            let key = key(path);
            let tree = self.tree.lock();
            let node = tree.get(&key).ok_or(FsError::NotFound)?;
            let mut list = vec![node.descriptor(&key)];
            if let Node::Dir { .. } = node {
                for (k, child) in tree.iter() {
                    if k != &key && parent_key(k) == key {
                        list.push(child.descriptor(k));
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
            trace!("memfs: get {path:?} {range:?}");
            let data = match self.tree.lock().get(&key(path)) {
                Some(Node::File { data, .. }) => data.clone(),
                _ => return Ok(None),
            };
            let data = match range {
                Some(r) => {
                    let end = (r.end as usize + 1).min(data.len());
                    let start = (r.start as usize).min(end);
                    data.slice(start..end)
                }
                None => data,
            };
            let stream: ByteStream = futures_util::stream::once(async move { Ok(data) }).boxed();
            Ok(Some(stream))
        }
        .boxed()
    }

    fn write<'a>(&'a self, path: &'a DavPath, mut body: ByteStream) -> FsFuture<'a, ()> {
        async move {
            trace!("memfs: write {path:?}");
            let key = key(path);
            {
                let tree = self.tree.lock();
                MemStore::check_parent(&tree, &key)?;
                match tree.get(&key) {
                    Some(Node::Dir { .. }) => {
                        return Err(FsError::Status(StatusCode::METHOD_NOT_ALLOWED))
                    }
                    Some(Node::File { writable: false, .. }) => return Err(FsError::Forbidden),
                    _ => {}
                }
            }

            let mut buf = BytesMut::new();
            while let Some(chunk) = body.next().await {
                buf.extend_from_slice(&chunk?);
            }

            let mut tree = self.tree.lock();
            // parent might have been deleted while we were reading.
            MemStore::check_parent(&tree, &key)?;
            tree.insert(
                key,
                Node::File {
                    data: buf.freeze(),
                    modified: SystemTime::now(),
                    writable: true,
                },
            );
            Ok(())
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

impl DavMove for MemStore {
    fn move_to<'a>(
        &'a self,
        from: &'a DavPath,
        to: &'a DavPath,
        overwrite: bool,
    ) -> FsFuture<'a, ()> {
        async move {
            trace!("memfs: move {from:?} {to:?} overwrite={overwrite}");
            let (src, dst) = (key(from), key(to));
            let mut tree = self.tree.lock();
            if !tree.contains_key(&src) {
                return Err(FsError::NotFound);
            }
            // onto or into itself, or onto one of its own ancestors.
            if src == "/" || dst == "/" || is_below(&dst, &src) || is_below(&src, &dst) {
                return Err(FsError::Forbidden);
            }
            MemStore::check_parent(&tree, &dst)?;
            let existed = tree.contains_key(&dst);
            if existed && !overwrite {
                return Err(FsError::Status(StatusCode::PRECONDITION_FAILED));
            }
            tree.retain(|k, _| !is_below(k, &dst));

            let moved: Vec<String> = tree.keys().filter(|k| is_below(k, &src)).cloned().collect();
            for k in moved {
                if let Some(node) = tree.remove(&k) {
                    let newkey = format!("{}{}", dst, &k[src.len()..]);
                    tree.insert(newkey, node);
                }
            }
            Ok(())
        }
        .boxed()
    }
}

impl DavCollections for MemStore {
    fn mkdir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("memfs: mkdir {path:?}");
            let key = key(path);
            let mut tree = self.tree.lock();
            if tree.contains_key(&key) {
                return Err(FsError::Status(StatusCode::METHOD_NOT_ALLOWED));
            }
            MemStore::check_parent(&tree, &key)?;
            tree.insert(
                key,
                Node::Dir {
                    modified: SystemTime::now(),
                },
            );
            Ok(())
        }
        .boxed()
    }

    fn delete<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("memfs: delete {path:?}");
            let key = key(path);
            if key == "/" {
                return Err(FsError::Forbidden);
            }
            let mut tree = self.tree.lock();
            if !tree.contains_key(&key) {
                return Err(FsError::NotFound);
            }
            tree.retain(|k, _| !is_below(k, &key));
            Ok(())
        }
        .boxed()
    }
}
