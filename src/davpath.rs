//! Request path normalization.
//!
//! A [`DavPath`] is the decoded, sanitized, root-relative form of the
//! path component of a request URI. Building one never fails: clients
//! like the Windows mini-redirector send all kinds of odd paths, and
//! they expect the server to mangle them into something usable rather
//! than reject the request.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// Characters that are not allowed in a filename on at least one
// common filesystem.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

// Same set that javascript's encodeURI() leaves alone, plus the space,
// which clients expect to see literally in a href.
const URL_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Normalized, root-relative request path.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DavPath {
    path: String,
}

impl DavPath {
    /// Normalize a raw (percent-encoded) URI path.
    ///
    /// The path is percent-decoded, forbidden characters are replaced
    /// by `_`, every `..` is stripped, and the result starts with `/`.
    pub fn normalize(raw: &str) -> DavPath {
        let decoded = percent_decode_str(raw).decode_utf8_lossy();
        let sanitized: String = decoded
            .chars()
            .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
            .collect();
        // a run of n dots leaves n % 2 dots, so one pass is enough.
        let mut path = sanitized.replace("..", "");
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        DavPath { path }
    }

    /// Build a path from a request URI, stripping `prefix` first.
    ///
    /// Returns `None` if the path is not below the prefix.
    pub fn from_uri_and_prefix(uri: &http::Uri, prefix: &str) -> Option<DavPath> {
        DavPath::from_str_and_prefix(uri.path(), prefix)
    }

    /// Like `from_uri_and_prefix`, for a bare path string (for example
    /// the path of a `Destination` URL).
    pub fn from_str_and_prefix(path: &str, prefix: &str) -> Option<DavPath> {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return Some(DavPath::normalize(path));
        }
        let rest = path.strip_prefix(prefix)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        Some(DavPath::normalize(rest))
    }

    /// The normalized path, decoded.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// URL-encoded form, used in `href` elements.
    pub fn as_url_string(&self) -> String {
        encode_url(&self.path)
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Does the path end in a slash.
    pub fn is_collection(&self) -> bool {
        self.path.ends_with('/')
    }

    /// The path without a trailing slash (except for the root itself).
    pub fn without_slash(&self) -> &str {
        match self.path.trim_end_matches('/') {
            "" => "/",
            p => p,
        }
    }

    /// The parent collection, with a trailing slash.
    pub fn parent(&self) -> DavPath {
        let p = self.without_slash();
        let path = match p.rfind('/') {
            Some(idx) => p[..=idx].to_string(),
            None => "/".to_string(),
        };
        DavPath { path }
    }

    /// Path relative to the root, without leading slash. Used to map
    /// onto a base directory.
    pub fn as_rel_path(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}

/// URL-encode a root-relative path the way `href` elements expect.
pub(crate) fn encode_url(path: &str) -> String {
    utf8_percent_encode(path, URL_ENCODE).to_string()
}

/// Display name of a path: its last non-empty segment, or `/`.
pub(crate) fn display_name(path: &str) -> &str {
    path.split('/').filter(|s| !s.is_empty()).last().unwrap_or("/")
}

impl fmt::Display for DavPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Debug for DavPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.path)
    }
}
