//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted: `Response::new()`,
//! `Response::error()`, or as a bare handler return value. Responses store
//! the numeric code, so codes without a variant can still be sent; they go
//! out with an empty reason phrase.
//!
//! ```rust
//! use sewes::{Response, Status};
//!
//! Response::error(Status::Forbidden, "Not logged in");
//!
//! async fn teapot(_req: sewes::Request) -> Status {
//!     Status::NotAcceptable
//! }
//! ```

/// The status codes the server itself produces.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                            // 200

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,                    // 400
    Forbidden,                     // 403
    NotFound,                      // 404
    MethodNotAllowed,              // 405
    NotAcceptable,                 // 406
    RequestTimeout,                // 408
    RequestEntityTooLarge,         // 413

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError,           // 500
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                    => 200,
            Status::BadRequest            => 400,
            Status::Forbidden             => 403,
            Status::NotFound              => 404,
            Status::MethodNotAllowed      => 405,
            Status::NotAcceptable         => 406,
            Status::RequestTimeout        => 408,
            Status::RequestEntityTooLarge => 413,
            Status::InternalServerError   => 500,
        }
    }
}

// ── Status reason phrases ─────────────────────────────────────────────────────

pub(crate) fn status_reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        413 => "Request Entity Too Large",
        500 => "Internal Server Error",
        _   => "",
    }
}
