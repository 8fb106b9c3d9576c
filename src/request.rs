//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::OnceLock;

use bytes::Bytes;
use url::Url;

use crate::cookie::Cookie;
use crate::grammar;
use crate::headers::Headers;
use crate::method::Method;
use crate::session::Session;

/// An incoming HTTP request, parsed from the raw TCP stream.
///
/// Path and query are derived on first use by resolving the request
/// target against `http://<host header>`.
pub struct Request {
    pub(crate) peer_addr: SocketAddr,
    pub(crate) method: Method,
    pub(crate) target: String,
    pub(crate) version: String,
    pub(crate) headers: Headers,
    pub(crate) body: Bytes,
    pub(crate) session: Option<Session>,
    url: OnceLock<Option<Url>>,
}

impl Request {
    pub(crate) fn new(
        peer_addr: SocketAddr,
        method: Method,
        target: String,
        version: String,
        headers: Headers,
        body: Bytes,
    ) -> Self {
        Self { peer_addr, method, target, version, headers, body, session: None, url: OnceLock::new() }
    }

    pub fn peer_addr(&self) -> SocketAddr { self.peer_addr }
    pub fn method(&self) -> Method { self.method }
    /// The raw path and query as sent in the request line.
    pub fn target(&self) -> &str { &self.target }
    pub fn version(&self) -> &str { &self.version }
    pub fn headers(&self) -> &Headers { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive lookup of a text header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.text(name)
    }

    /// The target resolved to an absolute URL, or `None` if it does not parse.
    pub fn url(&self) -> Option<&Url> {
        self.url
            .get_or_init(|| {
                let host = self.headers.text("host").unwrap_or("localhost");
                let base = Url::parse(&format!("http://{host}"))
                    .or_else(|_| Url::parse("http://localhost"))
                    .ok()?;
                base.join(&self.target).ok()
            })
            .as_ref()
    }

    /// The decoded path, always starting with `/`.
    pub fn path(&self) -> String {
        match self.url() {
            Some(url) => grammar::unescape(url.path()).into_owned(),
            None => self.target.split('?').next().unwrap_or_default().to_owned(),
        }
    }

    /// Decoded, non-empty path segments: `/foo//bar/` yields `["foo", "bar"]`.
    pub fn path_segments(&self) -> Vec<String> {
        let Some(segments) = self.url().and_then(Url::path_segments) else {
            return Vec::new();
        };
        segments
            .filter(|s| !s.is_empty())
            .map(|s| grammar::unescape(s).into_owned())
            .collect()
    }

    /// Decoded query parameters in order of appearance.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url()
            .map(|url| url.query_pairs().into_owned().collect())
            .unwrap_or_default()
    }

    /// The first value of query parameter `name`.
    pub fn query(&self, name: &str) -> Option<String> {
        self.url()?
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Cookies sent with the request, by name.
    pub fn cookies(&self) -> HashMap<String, Cookie> {
        self.headers.cookies()
    }

    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        self.headers.cookies().remove(name)
    }

    /// The session matched by the request's `session_key` cookie.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub(crate) fn set_session(&mut self, session: Option<Session>) {
        self.session = session;
    }
}
