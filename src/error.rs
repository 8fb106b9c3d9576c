//! Unified error type.

use thiserror::Error as ThisError;

/// The error type returned by sewes' fallible operations.
///
/// Client mistakes (unknown method, oversized body, missing route) are
/// answered with a 4xx [`Response`](crate::Response) and never show up
/// here. This type covers programming errors at the call site (a malformed
/// cookie, header name or route) and infrastructure failures such as
/// binding the listening socket.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cookie name `{0}` may only contain ASCII letters, digits and `_`")]
    InvalidCookieName(String),

    #[error("cookie value `{0}` contains characters outside the cookie-octet set")]
    InvalidCookieValue(String),

    #[error("Max-age `{0}` must be a positive number")]
    InvalidMaxAge(String),

    #[error("Expires `{0}` is not a valid HTTP date")]
    InvalidExpires(String),

    #[error("SameSite must be Strict, Lax or None, not `{0}`")]
    InvalidSameSite(String),

    #[error("unknown cookie attribute `{0}`")]
    UnknownCookieAttribute(String),

    #[error("illegal header field name `{0}`")]
    InvalidHeaderName(String),

    #[error("value for header field `{0}` is empty or contains characters that cannot appear in a field line")]
    InvalidHeaderValue(String),

    #[error("unsupported request method `{0}`, only GET and POST can be routed")]
    InvalidMethod(String),

    #[error("invalid route path segment `{0}`")]
    InvalidPathSegment(String),

    #[error("server is already running")]
    AlreadyRunning,

    #[error("server is not running")]
    NotRunning,
}
