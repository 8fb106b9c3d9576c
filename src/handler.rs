//! Route handlers.
//!
//! A handler turns a [`Request`] into a [`Response`]. Two forms can be
//! registered:
//!
//! - an async function or closure, `Fn(Request) -> impl Future`, whose
//!   output is anything [`IntoResponse`];
//! - a method on an application object, bound with [`bind`]:
//!   `bind(app, App::hello)` for `fn hello(&self, req: Request) -> Response`.
//!
//! Both end up in the route table as an [`Endpoint`] trait object. The
//! server calls [`Endpoint::respond`] and polls the returned future on a
//! task of its own, so no handler code may run before that future is polled.
//!
//! ```rust
//! use std::sync::Arc;
//! use sewes::{bind, Config, Request, Response, Server};
//!
//! struct Pages { title: String }
//!
//! impl Pages {
//!     fn home(&self, _req: Request) -> Response {
//!         Response::html(format!("<h1>{}</h1>", self.title))
//!     }
//! }
//!
//! # fn main() -> Result<(), sewes::Error> {
//! let server = Server::new(Config::default());
//! let pages = Arc::new(Pages { title: "Home".into() });
//! server.get(&[], bind(pages, Pages::home))?;
//! server.get(&["ping"], |_req: Request| async { "pong" })?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The response of a stored handler, still to be polled.
#[doc(hidden)]
pub type PendingResponse = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A handler as the route table stores it.
#[doc(hidden)]
pub trait Endpoint: Send + Sync + 'static {
    /// Runs nothing until the returned future is polled.
    fn respond(&self, req: Request) -> PendingResponse;
}

#[doc(hidden)]
pub type SharedEndpoint = Arc<dyn Endpoint>;

/// Anything [`Server::get`](crate::Server::get) and friends accept.
///
/// Implemented for async closures and functions taking a [`Request`], and
/// for [`Bound`] methods. Sealed: no other implementations exist.
pub trait Handler: sealed::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_endpoint(self) -> SharedEndpoint;
}

mod sealed {
    pub trait Sealed {}
}

// ── Async functions and closures ──────────────────────────────────────────────

struct AsyncFn<F>(F);

impl<F, Fut> sealed::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
    fn into_endpoint(self) -> SharedEndpoint {
        Arc::new(AsyncFn(self))
    }
}

impl<F, Fut> Endpoint for AsyncFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
    fn respond(&self, req: Request) -> PendingResponse {
        // Calling an async fn only builds its future.
        let pending = (self.0)(req);
        Box::pin(async move { pending.await.into_response() })
    }
}

// ── Object + method ───────────────────────────────────────────────────────────

/// A method bound to the object it is called on. Created by [`bind`].
pub struct Bound<T, R> {
    target: Arc<T>,
    method: fn(&T, Request) -> R,
}

/// Binds `method` to `target`, making the pair a route handler.
///
/// The method runs synchronously on the handler task; it should not block
/// for long, since the server serves one connection at a time.
pub fn bind<T, R>(target: Arc<T>, method: fn(&T, Request) -> R) -> Bound<T, R>
where
    T: Send + Sync + 'static,
    R: IntoResponse + 'static,
{
    Bound { target, method }
}

impl<T, R> sealed::Sealed for Bound<T, R> {}

impl<T, R> Handler for Bound<T, R>
where
    T: Send + Sync + 'static,
    R: IntoResponse + 'static,
{
    fn into_endpoint(self) -> SharedEndpoint {
        Arc::new(self)
    }
}

impl<T, R> Endpoint for Bound<T, R>
where
    T: Send + Sync + 'static,
    R: IntoResponse + 'static,
{
    fn respond(&self, req: Request) -> PendingResponse {
        let (target, method) = (Arc::clone(&self.target), self.method);
        Box::pin(async move { method(&target, req).into_response() })
    }
}
