//! # sewes
//!
//! A simple embedded web server: HTTP/1.1 for applications that want to
//! answer a handful of routes from inside their own process.
//!
//! ## What it does
//!
//! - One connection at a time, one request per connection, then close
//! - GET and POST only; everything else is answered with `405`
//! - Exact-match routing on path segments to async closures or bound
//!   object methods, plus an optional not-found handler
//! - Cookies after RFC 6265 with the `SameSite` extension
//! - Server-side sessions carried in a `session_key` cookie, renewed with a
//!   fresh key on every request
//! - Per-method request counts and per-status error counts
//!
//! TLS, keep-alive, chunked bodies and compression are left to a proxy in
//! front of the server.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sewes::{Config, Cookie, Request, Response, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sewes::Error> {
//!     let mut server = Server::new(Config::new("localhost", 8080));
//!     server.get(&["hello"], hello)?;
//!     server.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await
//! }
//!
//! async fn hello(req: Request) -> Response {
//!     let mut response = Response::html("<h1>Hello</h1>");
//!     if req.cookie("greeting").is_none() {
//!         response.set_cookie(Cookie::new("greeting", "hello world").unwrap());
//!     }
//!     response
//! }
//! ```
//!
//! ## Logging
//!
//! Diagnostics go through [`tracing`]. [`Server::new`] captures the
//! dispatcher that is current when it is called; [`Server::with_log_sink`]
//! takes one explicitly, which is how tests capture a server's output.

mod config;
mod cookie;
mod error;
mod grammar;
mod handler;
mod headers;
mod method;
mod reader;
mod request;
mod response;
mod router;
mod server;
mod session;
mod statistics;
mod status;

pub use config::Config;
pub use cookie::{AttributeMode, Cookie, SameSite};
pub use error::Error;
pub use handler::{bind, Bound, Handler};
pub use headers::{Field, Headers, Value};
pub use method::Method;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response};
pub use server::Server;
pub use session::{Session, SessionManager, PRUNE_INTERVAL, SESSION_COOKIE};
pub use statistics::Statistics;
pub use status::Status;
