//! Response bodies for PROPFIND, PROPPATCH and LOCK.
//!
//! There are only three fixed shapes, so they're written out as
//! templates. Whitespace between tags is removed before sending; some
//! clients choke on the extra text nodes.
use std::fmt::Write;

use regex::Regex;

use crate::davpath::{display_name, encode_url};
use crate::fs::ResourceDescriptor;
use crate::util::systemtime_to_httpdate;

lazy_static! {
    static ref BETWEEN_TAGS: Regex = Regex::new(r">\s+<").unwrap();
    static ref NEWLINE_INDENT: Regex = Regex::new(r"\n\s*").unwrap();
}

const XML_DECL: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Collapse whitespace between tags.
pub(crate) fn collapse(xml: &str) -> String {
    let xml = BETWEEN_TAGS.replace_all(xml, "><");
    NEWLINE_INDENT.replace_all(&xml, "").trim().to_string()
}

fn escape(s: &str) -> String {
    htmlescape::encode_minimal(s)
}

// href for a root-relative path.
fn href(path: &str) -> String {
    escape(&encode_url(path))
}

/// PROPFIND: one `<D:response>` per resource.
pub(crate) fn propfind(items: &[ResourceDescriptor]) -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECL);
    xml.push_str("\n<D:multistatus xmlns:D=\"DAV:\">");
    for item in items {
        let resourcetype = if item.is_dir() { "<D:collection/>" } else { "" };
        let contentlength = if item.is_file() {
            format!("<D:getcontentlength>{}</D:getcontentlength>", item.size)
        } else {
            String::new()
        };
        let locktype = if item.writable { "<D:write/>" } else { "<D:read/>" };
        let _ = write!(
            xml,
            r#"
    <D:response>
        <D:href>{href}</D:href>
        <D:propstat>
            <D:prop>
                <D:displayname>{name}</D:displayname>
                <D:resourcetype>{resourcetype}</D:resourcetype>
                <D:getlastmodified>{modified}</D:getlastmodified>
                {contentlength}
                <D:supportedlock>
                    <D:lockentry>
                        <D:lockscope><D:exclusive/></D:lockscope>
                        <D:locktype>{locktype}</D:locktype>
                    </D:lockentry>
                </D:supportedlock>
            </D:prop>
            <D:status>HTTP/1.1 200 OK</D:status>
        </D:propstat>
    </D:response>"#,
            href = href(&item.name),
            name = escape(display_name(&item.name)),
            modified = systemtime_to_httpdate(item.last_modified),
        );
    }
    xml.push_str("\n</D:multistatus>");
    collapse(&xml)
}

/// PROPPATCH: acknowledge, without looking at what was asked.
pub(crate) fn proppatch(path: &str) -> String {
    let xml = format!(
        r#"{XML_DECL}
<D:multistatus xmlns:D="DAV:">
    <D:response>
        <D:href>{href}</D:href>
        <D:propstat>
            <D:prop/>
            <D:status>HTTP/1.1 200 OK</D:status>
        </D:propstat>
    </D:response>
</D:multistatus>"#,
        href = href(path),
    );
    collapse(&xml)
}

/// LOCK: the lock discovery for a freshly created lock.
pub(crate) fn lockdiscovery(token: &str, timeout: &str, root: &str) -> String {
    let xml = format!(
        r#"{XML_DECL}
<D:prop xmlns:D="DAV:">
    <D:lockdiscovery>
        <D:activelock>
            <D:locktype><D:write/></D:locktype>
            <D:lockscope><D:exclusive/></D:lockscope>
            <D:depth>0</D:depth>
            <D:timeout>{timeout}</D:timeout>
            <D:locktoken><D:href>{token}</D:href></D:locktoken>
            <D:lockroot><D:href>{root}</D:href></D:lockroot>
        </D:activelock>
    </D:lockdiscovery>
</D:prop>"#,
        timeout = escape(timeout),
        token = escape(token),
        root = href(root),
    );
    collapse(&xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn t() -> std::time::SystemTime {
        UNIX_EPOCH + Duration::from_secs(784111777)
    }

    #[test]
    fn test_collapse() {
        assert_eq!(collapse("  <a>\n   <b> x </b>\n</a>  "), "<a><b> x </b></a>");
    }

    #[test]
    fn test_propfind_file_and_dir() {
        let items = vec![
            ResourceDescriptor::directory("/my docs/", t()),
            ResourceDescriptor::file("/my docs/a b.txt", 10, t()),
        ];
        let xml = propfind(&items);
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?><D:multistatus xmlns:D="DAV:"><D:response>"#));
        assert!(xml.ends_with("</D:response></D:multistatus>"));
        assert_eq!(xml.matches("<D:response>").count(), 2);
        assert!(xml.contains("<D:href>/my docs/</D:href>"));
        assert!(xml.contains("<D:displayname>my docs</D:displayname>"));
        assert!(xml.contains("<D:resourcetype><D:collection/></D:resourcetype>"));
        assert!(xml.contains("<D:href>/my docs/a b.txt</D:href>"));
        assert!(xml.contains("<D:resourcetype></D:resourcetype>"));
        assert!(xml.contains("<D:getcontentlength>10</D:getcontentlength>"));
        assert_eq!(xml.matches("<D:getcontentlength>").count(), 1);
        assert!(xml.contains("<D:getlastmodified>Sun, 06 Nov 1994 08:49:37 GMT</D:getlastmodified>"));
        assert!(xml.contains("<D:locktype><D:write/></D:locktype>"));
        assert!(!xml.contains('\n'));
    }

    #[test]
    fn test_propfind_read_only_and_escaping() {
        let items = vec![ResourceDescriptor::file("/r&d/<é>.txt", 1, t()).read_only()];
        let xml = propfind(&items);
        assert!(xml.contains("<D:locktype><D:read/></D:locktype>"));
        assert!(xml.contains("<D:href>/r&amp;d/%3C%C3%A9%3E.txt</D:href>"));
        assert!(xml.contains("<D:displayname>&lt;é&gt;.txt</D:displayname>"));
    }

    #[test]
    fn test_propfind_root() {
        let xml = propfind(&[ResourceDescriptor::directory("/", t())]);
        assert!(xml.contains("<D:href>/</D:href>"));
        assert!(xml.contains("<D:displayname>/</D:displayname>"));
    }

    #[test]
    fn test_proppatch() {
        assert_eq!(
            proppatch("/a.txt"),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><D:multistatus xmlns:D=\"DAV:\">\
             <D:response><D:href>/a.txt</D:href><D:propstat><D:prop/>\
             <D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response></D:multistatus>"
        );
    }

    #[test]
    fn test_lockdiscovery() {
        let xml = lockdiscovery("abc123", "Second-600", "/f.txt");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?><D:prop xmlns:D=\"DAV:\"><D:lockdiscovery><D:activelock>"));
        assert!(xml.contains("<D:locktype><D:write/></D:locktype><D:lockscope><D:exclusive/></D:lockscope><D:depth>0</D:depth>"));
        assert!(xml.contains("<D:timeout>Second-600</D:timeout>"));
        assert!(xml.contains("<D:locktoken><D:href>abc123</D:href></D:locktoken>"));
        assert!(xml.contains("<D:lockroot><D:href>/f.txt</D:href></D:lockroot>"));
    }
}
