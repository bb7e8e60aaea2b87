//! Typed versions of the WebDAV request headers we look at.
use std::fmt::Display;

use headers::Header;
use http::header::{HeaderName, HeaderValue};
use regex::Regex;

lazy_static! {
    static ref DEPTH: HeaderName = HeaderName::from_static("depth");
    static ref TIMEOUT: HeaderName = HeaderName::from_static("timeout");
    static ref OVERWRITE: HeaderName = HeaderName::from_static("overwrite");
    static ref DESTINATION: HeaderName = HeaderName::from_static("destination");
    static ref LOCK_TOKEN: HeaderName = HeaderName::from_static("lock-token");
    static ref IF: HeaderName = HeaderName::from_static("if");
    static ref TOKEN_RE: Regex = Regex::new(r"<([^>]+)>").unwrap();
}

// helper.
fn one<'i, I>(values: &mut I) -> Result<&'i str, headers::Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let v = values.next().ok_or_else(invalid)?;
    if values.next().is_some() {
        return Err(invalid());
    }
    v.to_str().map(str::trim).map_err(|_| invalid())
}

// helper
fn invalid() -> headers::Error {
    headers::Error::invalid()
}

// helper
fn map_invalid(_e: impl std::error::Error) -> headers::Error {
    headers::Error::invalid()
}

fn encode_str<E: Extend<HeaderValue>>(values: &mut E, s: impl Display) {
    if let Ok(v) = HeaderValue::from_str(&s.to_string()) {
        values.extend(std::iter::once(v));
    }
}

macro_rules! header {
    ($tname:ident, $hname:ident, $sname:expr) => {
        lazy_static! {
            pub static ref $hname: HeaderName = HeaderName::from_static($sname);
        }

        #[derive(Debug, Clone, PartialEq)]
        pub struct $tname(pub String);

        impl Header for $tname {
            fn name() -> &'static HeaderName {
                &$hname
            }

            fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
            where
                I: Iterator<Item = &'i HeaderValue>,
            {
                one(values).map(|x| $tname(x.to_owned()))
            }

            fn encode<E>(&self, values: &mut E)
            where
                E: Extend<HeaderValue>,
            {
                encode_str(values, &self.0)
            }
        }
    };
}

header!(MsAuthorVia, MS_AUTHOR_VIA, "ms-author-via");
header!(Dav, DAV, "dav");

/// Depth: header.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Header for Depth {
    fn name() -> &'static HeaderName {
        &DEPTH
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        match one(values)?.to_ascii_lowercase().as_str() {
            "0" => Ok(Depth::Zero),
            "1" => Ok(Depth::One),
            "infinity" => Ok(Depth::Infinity),
            _ => Err(invalid()),
        }
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let value = match *self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "Infinity",
        };
        values.extend(std::iter::once(HeaderValue::from_static(value)));
    }
}

/// Timeout: header. Kept as sent, it is echoed back in the lock discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeout(pub String);

impl Header for Timeout {
    fn name() -> &'static HeaderName {
        &TIMEOUT
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let v = one(values)?;
        if v.is_empty() {
            return Err(invalid());
        }
        Ok(Timeout(v.to_owned()))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        encode_str(values, &self.0)
    }
}

/// Overwrite: header. Anything but `F` means "yes".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overwrite(pub bool);

impl Default for Overwrite {
    fn default() -> Self {
        Overwrite(true)
    }
}

impl Header for Overwrite {
    fn name() -> &'static HeaderName {
        &OVERWRITE
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let v = one(values)?;
        Ok(Overwrite(!v.eq_ignore_ascii_case("F")))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let value = if self.0 { "T" } else { "F" };
        values.extend(std::iter::once(HeaderValue::from_static(value)));
    }
}

/// Destination: header, reduced to its (still encoded) path.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination(pub String);

impl Header for Destination {
    fn name() -> &'static HeaderName {
        &DESTINATION
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let s = one(values)?;
        if s.starts_with('/') {
            return Ok(Destination(s.to_string()));
        }
        let url = url::Url::parse(s).map_err(map_invalid)?;
        if url.cannot_be_a_base() {
            return Err(invalid());
        }
        Ok(Destination(url.path().to_string()))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        encode_str(values, &self.0)
    }
}

/// Lock-Token: header, without the angle brackets.
#[derive(Debug, Clone, PartialEq)]
pub struct LockToken(pub String);

impl Header for LockToken {
    fn name() -> &'static HeaderName {
        &LOCK_TOKEN
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let s = one(values)?;
        let token: String = s.chars().filter(|&c| c != '<' && c != '>').collect();
        Ok(LockToken(token.trim().to_string()))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        encode_str(values, format!("<{}>", self.0))
    }
}

/// If: header. We only care about the first `<token>` in it.
#[derive(Debug, Clone, PartialEq)]
pub struct If(pub Option<String>);

impl Header for If {
    fn name() -> &'static HeaderName {
        &IF
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let s = one(values)?;
        let token = TOKEN_RE
            .captures(s)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        Ok(If(token))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        if let Some(token) = &self.0 {
            encode_str(values, format!("(<{token}>)"))
        }
    }
}
