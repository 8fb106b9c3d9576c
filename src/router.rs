//! Route table.
//!
//! Routes are keyed by `"METHOD:segment/segment"`. Registration and lookup
//! take the same lock, so routes may be added while the server is running.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Error;
use crate::handler::{Handler, SharedEndpoint};
use crate::method::Method;

struct Route {
    method: Method,
    path: String,
    handler: SharedEndpoint,
}

#[derive(Default)]
struct Routes {
    by_key: HashMap<String, Route>,
    not_found: Option<SharedEndpoint>,
}

/// Result of a lookup.
pub(crate) enum Lookup {
    /// A registered route matched.
    Route(SharedEndpoint),
    /// No route matched; the application's not-found handler takes over.
    NotFound(SharedEndpoint),
    /// No route and no not-found handler.
    Missing,
}

/// The server's route table.
#[derive(Default)]
pub(crate) struct Router {
    routes: Mutex<Routes>,
}

fn route_key(method: Method, path: &str) -> String {
    format!("{method}:{path}")
}

impl Router {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Routes> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `handler` for `method` and the path made of `segments`.
    /// A later registration for the same method and path replaces the
    /// earlier one. An empty `segments` slice is the root path `/`.
    pub(crate) fn register(&self, method: Method, segments: &[&str], handler: impl Handler) -> Result<(), Error> {
        if let Some(bad) = segments.iter().find(|s| s.is_empty() || s.contains('/')) {
            return Err(Error::InvalidPathSegment((*bad).to_owned()));
        }
        let path = segments.join("/");
        let route = Route { method, path: path.clone(), handler: handler.into_endpoint() };
        self.lock().by_key.insert(route_key(method, &path), route);
        Ok(())
    }

    pub(crate) fn set_not_found(&self, handler: impl Handler) {
        self.lock().not_found = Some(handler.into_endpoint());
    }

    pub(crate) fn lookup(&self, method: Method, segments: &[String]) -> Lookup {
        let routes = self.lock();
        if let Some(route) = routes.by_key.get(&route_key(method, &segments.join("/"))) {
            return Lookup::Route(Arc::clone(&route.handler));
        }
        match &routes.not_found {
            Some(handler) => Lookup::NotFound(Arc::clone(handler)),
            None => Lookup::Missing,
        }
    }

    /// Registered paths for `method`, sorted.
    pub(crate) fn paths(&self, method: Method) -> Vec<String> {
        let mut paths: Vec<_> = self
            .lock()
            .by_key
            .values()
            .filter(|r| r.method == method)
            .map(|r| format!("/{}", r.path))
            .collect();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::response::Response;

    async fn ok(_req: Request) -> Response {
        Response::text("ok")
    }

    fn segments(path: &str) -> Vec<String> {
        path.split('/').filter(|s| !s.is_empty()).map(str::to_owned).collect()
    }

    #[test]
    fn rejects_segments_with_slashes() {
        let router = Router::new();
        assert!(matches!(
            router.register(Method::Get, &["api/users"], ok),
            Err(Error::InvalidPathSegment(s)) if s == "api/users"
        ));
        assert!(matches!(router.register(Method::Get, &["a", ""], ok), Err(Error::InvalidPathSegment(_))));
        assert!(router.paths(Method::Get).is_empty());
    }

    #[test]
    fn lookup_is_keyed_by_method_and_path() {
        let router = Router::new();
        router.register(Method::Get, &["api", "users"], ok).unwrap();
        router.register(Method::Post, &[], ok).unwrap();

        assert!(matches!(router.lookup(Method::Get, &segments("/api/users")), Lookup::Route(_)));
        assert!(matches!(router.lookup(Method::Post, &segments("/api/users")), Lookup::Missing));
        assert!(matches!(router.lookup(Method::Post, &segments("/")), Lookup::Route(_)));
        assert!(matches!(router.lookup(Method::Get, &segments("/api")), Lookup::Missing));
        assert_eq!(router.paths(Method::Get), vec!["/api/users"]);
        assert_eq!(router.paths(Method::Post), vec!["/"]);
    }

    #[test]
    fn not_found_handler_gets_unmatched_requests() {
        let router = Router::new();
        router.set_not_found(ok);
        assert!(matches!(router.lookup(Method::Get, &segments("/nowhere")), Lookup::NotFound(_)));
    }

    #[test]
    fn registration_from_many_threads() {
        let router = Arc::new(Router::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let router = Arc::clone(&router);
                std::thread::spawn(move || {
                    let name = format!("page{i}");
                    router.register(Method::Get, &[name.as_str()], ok).unwrap();
                    assert!(matches!(router.lookup(Method::Get, &[name]), Lookup::Route(_)));
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(router.paths(Method::Get).len(), 8);
    }
}
