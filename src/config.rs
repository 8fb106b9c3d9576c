//! Server configuration.

use std::time::Duration;

/// Where the server listens and how much it is willing to read.
///
/// ```rust
/// use std::time::Duration;
/// use sewes::Config;
///
/// let config = Config {
///     body_timeout: Duration::from_secs(2),
///     ..Config::new("0.0.0.0", 8080)
/// };
/// assert_eq!(config.max_content_length, 65_536);
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Host name or address to bind.
    pub hostname: String,
    /// Port to bind; `0` picks a free port.
    pub port: u16,
    /// Bytes read for the request line and headers.
    pub head_limit: usize,
    /// Deadline for the request line and headers.
    pub head_timeout: Duration,
    /// Deadline for the rest of the body once the headers are in.
    pub body_timeout: Duration,
    /// Larger declared bodies are answered with `413`.
    pub max_content_length: usize,
    pub session_lifetime: Duration,
}

impl Config {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self { hostname: hostname.into(), port, ..Self::default() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_owned(),
            port: 0,
            head_limit: 8 * 1024,
            head_timeout: Duration::from_millis(100),
            body_timeout: Duration::from_secs(5),
            max_content_length: 1 << 16,
            session_lifetime: Duration::from_secs(60 * 60 * 24),
        }
    }
}
