//! Request and error counters.
//!
//! The server only increments; reading and reporting is up to the
//! embedding application.

use dashmap::DashMap;

use crate::method::Method;

/// Per-method request counts and per-status error counts.
///
/// Counters that were never touched read as zero.
#[derive(Debug, Default)]
pub struct Statistics {
    requests: DashMap<Method, u64>,
    errors: DashMap<u16, u64>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn count_request(&self, method: Method) {
        *self.requests.entry(method).or_insert(0) += 1;
    }

    pub(crate) fn count_error(&self, status: u16) {
        *self.errors.entry(status).or_insert(0) += 1;
    }

    /// Requests received for `method` that made it past framing checks.
    pub fn requests(&self, method: Method) -> u64 {
        self.requests.get(&method).map_or(0, |n| *n)
    }

    /// Error responses (status 400 and up) sent with status `code`.
    pub fn errors(&self, code: u16) -> u64 {
        self.errors.get(&code).map_or(0, |n| *n)
    }

    pub fn request_counts(&self) -> Vec<(Method, u64)> {
        self.requests.iter().map(|e| (*e.key(), *e.value())).collect()
    }

    pub fn error_counts(&self) -> Vec<(u16, u64)> {
        let mut counts: Vec<_> = self.errors.iter().map(|e| (*e.key(), *e.value())).collect();
        counts.sort_unstable();
        counts
    }
}
