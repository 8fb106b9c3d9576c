//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it. The server adds
//! `content-length` and `connection: close` when it writes the response,
//! and a renewed `session_key` cookie when the request carried a session.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::cookie::Cookie;
use crate::grammar;
use crate::headers::{Headers, Value};
use crate::status::{status_reason, Status};

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::new`].
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Icon,         // image/x-icon
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Icon        => "image/x-icon",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str { self.as_str() }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use sewes::{ContentType, Cookie, Response, Status};
///
/// Response::html("<h1>Hello, world!</h1>");
/// Response::new(vec![0u8; 16], Status::Ok, ContentType::OctetStream);
/// Response::error(Status::Forbidden, "Not logged in");
///
/// let mut response = Response::text("hi");
/// response.set_cookie(Cookie::new("greeting", "hello").unwrap());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) status: u16,
    pub(crate) headers: Headers,
    pub(crate) body: Vec<u8>,
}

impl Response {
    /// A response with the given body, status and `content-type`.
    ///
    /// A content type that cannot appear on a header line (empty, or with
    /// line breaks or other control characters) is replaced by
    /// `application/octet-stream`.
    pub fn new(body: impl Into<Vec<u8>>, status: impl Into<u16>, content_type: impl AsRef<str>) -> Self {
        let content_type = match content_type.as_ref() {
            valid if grammar::is_field_value(valid) => valid,
            _ => ContentType::OctetStream.as_str(),
        };
        let mut headers = Headers::new();
        headers.replace("content-type", Value::Text(content_type.to_owned()));
        Self { status: status.into(), headers, body: body.into() }
    }

    /// `200 OK` with `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(body.into(), Status::Ok, ContentType::Html)
    }

    /// `200 OK` with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(body.into(), Status::Ok, ContentType::Text)
    }

    /// An error response whose plain-text body is `message`.
    pub fn error(status: impl Into<u16>, message: impl Into<String>) -> Self {
        Self::new(message.into(), status, ContentType::Text)
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        Self::new(Vec::new(), code, ContentType::Text)
    }

    pub fn code(&self) -> u16 { self.status }
    pub fn headers(&self) -> &Headers { &self.headers }
    pub fn headers_mut(&mut self) -> &mut Headers { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn set_status(&mut self, code: impl Into<u16>) {
        self.status = code.into();
    }

    /// Appends a `set-cookie` field.
    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.headers.set_cookie(cookie);
    }

    /// Serialises the status line, headers and body.
    pub(crate) fn into_bytes(mut self) -> Vec<u8> {
        self.headers.replace("content-length", Value::Number(self.body.len() as u64));
        self.headers.replace("connection", Value::Text("close".to_owned()));

        let head = format!(
            "HTTP/1.1 {} {}\r\n{}",
            self.status,
            status_reason(self.status),
            self.headers,
        );
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }

    pub(crate) async fn write_to<W: AsyncWrite + Unpin>(
        self,
        writer: &mut W,
    ) -> std::io::Result<()> {
        writer.write_all(&self.into_bytes()).await?;
        writer.flush().await
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a [`Status`] directly from a handler: `return Status::NotFound`
impl IntoResponse for Status {
    fn into_response(self) -> Response { Response::status(self) }
}
