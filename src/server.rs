//! HTTP server: listening socket, accept loop and request pipeline.
//!
//! # Lifecycle
//!
//! A [`Server`] is idle until [`start`](Server::start) binds the socket and
//! spawns the accept loop. The loop handles one connection at a time:
//!
//! 1. read the request line and headers under a short deadline,
//! 2. reject empty requests and non-numeric `content-length` values
//!    (`400`), other methods than GET/POST (`405`), bodies over the size
//!    limit (`413`),
//! 3. read the rest of the body under a longer deadline; a short body is
//!    answered with `408`,
//! 4. match the `session_key` cookie to a live session,
//! 5. run the route handler (or the not-found handler, or answer `404`),
//! 6. hand a renewed session cookie to the client,
//! 7. write the response and close the connection.
//!
//! [`stop`](Server::stop) raises the termination flag. The flag is a
//! `watch` channel, so raising it also wakes the pending `accept`. The
//! connection in progress is finished first; `stop` returns once the loop
//! has exited.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, warn, Dispatch};

use crate::config::Config;
use crate::error::Error;
use crate::handler::{Handler, SharedEndpoint};
use crate::headers::{Field, Headers, Value};
use crate::method::Method;
use crate::reader::read_with_timeout;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Lookup, Router};
use crate::session::{SessionManager, SESSION_COOKIE};
use crate::statistics::Statistics;
use crate::status::Status;

/// The embedded HTTP server.
///
/// ```rust,no_run
/// use sewes::{Config, Request, Response, Server};
///
/// # async fn run() -> Result<(), sewes::Error> {
/// let mut server = Server::new(Config::new("localhost", 8080));
/// server.get(&["hello"], |_req: Request| async { Response::html("<h1>Hello</h1>") })?;
/// server.start().await?;
/// // ...
/// server.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    config: Config,
    router: Arc<Router>,
    sessions: Arc<SessionManager>,
    statistics: Arc<Statistics>,
    log: Dispatch,
    running: Option<Running>,
}

struct Running {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Server {
    /// Creates an idle server that logs to the `tracing` dispatcher that is
    /// current at this point.
    pub fn new(config: Config) -> Self {
        let log = tracing::dispatcher::get_default(Dispatch::clone);
        Self::with_log_sink(config, log)
    }

    /// Creates an idle server whose diagnostics go to `log`.
    pub fn with_log_sink(config: Config, log: impl Into<Dispatch>) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(config.session_lifetime)),
            config,
            router: Arc::new(Router::new()),
            statistics: Arc::new(Statistics::new()),
            log: log.into(),
            running: None,
        }
    }

    /// Registers a GET handler. `path` lists the path segments, so
    /// `&["api", "users"]` serves `/api/users` and `&[]` serves `/`.
    pub fn get(&self, path: &[&str], handler: impl Handler) -> Result<(), Error> {
        self.router.register(Method::Get, path, handler)
    }

    /// Registers a POST handler. See [`get`](Server::get).
    pub fn post(&self, path: &[&str], handler: impl Handler) -> Result<(), Error> {
        self.router.register(Method::Post, path, handler)
    }

    /// Registers a handler for a method given by name. Fails with
    /// [`Error::InvalidMethod`] for anything but `GET` and `POST`.
    pub fn route(&self, method: &str, path: &[&str], handler: impl Handler) -> Result<(), Error> {
        self.router.register(method.parse()?, path, handler)
    }

    /// Handles requests that match no route, instead of the built-in `404`.
    pub fn not_found(&self, handler: impl Handler) {
        self.router.set_not_found(handler);
    }

    /// Binds the listening socket and spawns the accept loop.
    ///
    /// Returns the bound address; with port `0` it carries the port the OS
    /// picked. Must be called from within a tokio runtime.
    pub async fn start(&mut self) -> Result<SocketAddr, Error> {
        if self.running.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let listener = TcpListener::bind((self.config.hostname.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let (shutdown, shutdown_rx) = watch::channel(false);

        let worker = Worker {
            config: self.config.clone(),
            router: Arc::clone(&self.router),
            sessions: Arc::clone(&self.sessions),
            statistics: Arc::clone(&self.statistics),
        };
        let task = tokio::spawn(worker.accept_loop(listener, shutdown_rx).with_subscriber(self.log.clone()));

        self.running = Some(Running { addr, shutdown, task });
        Ok(addr)
    }

    /// Stops accepting connections and waits for the accept loop to finish
    /// the connection it is working on.
    pub async fn stop(&mut self) -> Result<(), Error> {
        let running = self.running.take().ok_or(Error::NotRunning)?;
        running.shutdown.send_replace(true);
        running.task.await.map_err(io::Error::other)?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    /// The bound port while running, the configured port otherwise.
    pub fn port(&self) -> u16 {
        self.local_addr().map_or(self.config.port, |addr| addr.port())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn statistics(&self) -> &Arc<Statistics> {
        &self.statistics
    }

    pub fn session_manager(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// A response with the given body, status code and content type.
    pub fn response(&self, body: impl Into<Vec<u8>>, code: impl Into<u16>, content_type: &str) -> Response {
        Response::new(body, code, content_type)
    }

    /// An error response with `message` as its body. The message is also
    /// logged.
    pub fn error(&self, code: impl Into<u16>, message: impl Into<String>) -> Response {
        let (code, message) = (code.into(), message.into());
        tracing::dispatcher::with_default(&self.log, || warn!(status = code, "{message}"));
        Response::error(code, message)
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// What the accept loop shares with the [`Server`] it was started from.
struct Worker {
    config: Config,
    router: Arc<Router>,
    sessions: Arc<SessionManager>,
    statistics: Arc<Statistics>,
}

enum Incoming {
    Request(Request),
    /// The request was rejected before routing.
    Rejected(Response),
}

impl Worker {
    async fn accept_loop(self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
        let addr = listener.local_addr().ok();
        info!(
            addr = ?addr,
            get = ?self.router.paths(Method::Get),
            post = ?self.router.paths(Method::Post),
            "sewes listening"
        );

        while !*shutdown.borrow() {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    // The server was dropped without being stopped.
                    if changed.is_err() {
                        break;
                    }
                }

                res = listener.accept() => match res {
                    Ok((stream, peer)) => self.serve_connection(stream, peer).await,
                    Err(e) => error!("accept error: {e}"),
                },
            }
        }

        info!(addr = ?addr, "sewes stopped");
    }

    async fn serve_connection(&self, mut stream: TcpStream, peer: SocketAddr) {
        let response = match self.read_request(&stream, peer).await {
            Ok(Incoming::Request(request)) => self.dispatch(request).await,
            Ok(Incoming::Rejected(response)) => response,
            Err(e) => {
                error!(%peer, "read error: {e}");
                return;
            }
        };

        let status = response.code();
        if status >= 400 {
            self.statistics.count_error(status);
        }
        debug!(%peer, status, "response");

        if let Err(e) = response.write_to(&mut stream).await {
            error!(%peer, "write error: {e}");
            return;
        }
        if let Err(e) = stream.shutdown().await {
            debug!(%peer, "shutdown error: {e}");
        }
    }

    fn error(&self, code: Status, message: String) -> Response {
        warn!(status = u16::from(code), "{message}");
        Response::error(code, message)
    }

    async fn read_request(&self, stream: &TcpStream, peer: SocketAddr) -> io::Result<Incoming> {
        let mut buf = read_with_timeout(stream, self.config.head_limit, self.config.head_timeout).await?;

        let (method, target, version, headers, head_len) = {
            let lines: Vec<&[u8]> = buf.split_inclusive(|&b| b == b'\n').collect();
            if lines.len() < 3 {
                return Ok(Incoming::Rejected(self.error(Status::BadRequest, "Request is empty".to_owned())));
            }

            let request_line = String::from_utf8_lossy(lines[0]);
            let mut parts = request_line.split_whitespace();
            let method = parts.next().and_then(|m| m.parse::<Method>().ok());
            let Some(method) = method else {
                let allowed = Method::ALL.map(Method::as_str).join(" ");
                return Ok(Incoming::Rejected(self.error(
                    Status::MethodNotAllowed,
                    format!("Only the following request methods are allowed: {allowed}"),
                )));
            };
            let Some(target) = parts.next() else {
                return Ok(Incoming::Rejected(self.error(Status::BadRequest, "Request has no path".to_owned())));
            };
            let version = parts.next().unwrap_or("HTTP/1.0");

            let header_lines: Vec<_> = lines[1..].iter().map(|l| String::from_utf8_lossy(l)).collect();
            let mut headers = Headers::new();
            let consumed = headers.parse(header_lines.iter().map(AsRef::as_ref));
            let head_len: usize = lines[..=consumed].iter().map(|l| l.len()).sum();

            (method, target.to_owned(), version.to_owned(), headers, head_len)
        };

        let content_length = match headers.get("content-length").map(Field::first) {
            None => 0,
            Some(Value::Number(length)) => *length,
            Some(other) => {
                return Ok(Incoming::Rejected(
                    self.error(Status::BadRequest, format!("Invalid content length: {other}")),
                ));
            }
        };
        let max = self.config.max_content_length;
        if content_length > max as u64 {
            return Ok(Incoming::Rejected(self.error(
                Status::RequestEntityTooLarge,
                format!("Content length must be smaller than {max}"),
            )));
        }
        let content_length = content_length as usize;

        let mut body: BytesMut = buf.split_off(head_len);
        if body.len() < content_length {
            let rest = read_with_timeout(stream, content_length - body.len(), self.config.body_timeout).await?;
            body.unsplit(rest);
        }
        // Anything past the declared length is not part of this request.
        body.truncate(content_length);
        if body.len() != content_length {
            return Ok(Incoming::Rejected(self.error(
                Status::RequestTimeout,
                format!(
                    "Request timeout. Body length ({}) does not match specified content length ({content_length})",
                    body.len()
                ),
            )));
        }

        self.statistics.count_request(method);
        Ok(Incoming::Request(Request::new(peer, method, target, version, headers, body.freeze())))
    }

    async fn dispatch(&self, mut request: Request) -> Response {
        let session = request
            .cookie(SESSION_COOKIE)
            .and_then(|cookie| self.sessions.session(cookie.value()));
        request.set_session(session.clone());

        let segments = request.path_segments();
        debug!(
            peer = %request.peer_addr(),
            method = %request.method(),
            target = request.target(),
            user = session.as_ref().map(|s| s.user_id()),
            "request"
        );

        let mut response = match self.router.lookup(request.method(), &segments) {
            Lookup::Route(handler) | Lookup::NotFound(handler) => run_handler(handler, request).await,
            Lookup::Missing => self.error(Status::NotFound, format!("Path not found: /{}", segments.join("/"))),
        };

        if let Some(renewed) = session.and_then(|s| self.sessions.renew(&s)) {
            response.set_cookie(self.sessions.session_cookie(&renewed));
        }
        response
    }
}

/// Runs a handler on its own task so a panic only costs this request.
async fn run_handler(handler: SharedEndpoint, request: Request) -> Response {
    match tokio::spawn(handler.respond(request).with_current_subscriber()).await {
        Ok(response) => response,
        Err(e) => {
            error!("handler failed: {e}");
            Response::error(Status::InternalServerError, "Internal Server Error")
        }
    }
}
