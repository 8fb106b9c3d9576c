//! Small sewes application: a greeting page that remembers visitors with a
//! cookie, a login route that starts a session, and a custom 404 page.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example simple_app
//!
//! Try:
//!   curl -v http://localhost:8080/hello
//!   curl -v -b 'greeting=hello' http://localhost:8080/hello
//!   curl -v -X POST 'http://localhost:8080/login?user=alice'
//!   curl -v -b 'session_key=<key from login>' http://localhost:8080/private
//!   curl -v http://localhost:8080/nowhere

use std::sync::Arc;

use sewes::{bind, Config, Cookie, Request, Response, Server, SessionManager, Status};
use tokio::io::{AsyncBufReadExt, BufReader};

const HOSTNAME: &str = "localhost";

#[tokio::main]
async fn main() -> Result<(), sewes::Error> {
    tracing_subscriber::fmt::init();

    let mut server = Server::new(Config::new(HOSTNAME, 8080));

    server.get(&["hello"], hello)?;
    server.get(&["private"], private)?;

    let accounts = Arc::new(Accounts { sessions: Arc::clone(server.session_manager()) });
    server.post(&["login"], bind(accounts, Accounts::login))?;

    server.not_found(show_404);

    server.start().await?;
    println!(
        "Server is listening on port {} on {HOSTNAME}.\nPress <Enter> to stop the server!",
        server.port()
    );

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

    server.stop().await?;

    let stats = server.statistics();
    println!("requests: {:?}", stats.request_counts());
    println!("errors:   {:?}", stats.error_counts());
    Ok(())
}

// GET /hello
//
// The first visit sets a greeting cookie that lives for five minutes; the
// browser sends it back on the next visit.
async fn hello(req: Request) -> Response {
    let again = if req.cookie("greeting").is_some() { "again " } else { "" };
    let mut response = Response::html(html_page("Hello", &format!("<h1>Hello, {again}world!</h1>")));

    if let Ok(mut cookie) = Cookie::new("greeting", "hello") {
        cookie.set_domain(HOSTNAME);
        if cookie.set_max_age(300).is_ok() {
            response.set_cookie(cookie);
        }
    }
    response
}

struct Accounts {
    sessions: Arc<SessionManager>,
}

impl Accounts {
    // POST /login?user=<name>
    fn login(&self, req: Request) -> Response {
        let Some(user) = req.query("user").filter(|u| !u.is_empty()) else {
            return Response::error(Status::BadRequest, "Missing user");
        };

        let session = self.sessions.new_session(&user);
        let mut response = Response::html(html_page("Welcome", &format!("<h1>Welcome, {user}!</h1>")));
        response.set_cookie(self.sessions.session_cookie(&session));
        response
    }
}

// GET /private
//
// The server has already matched the session cookie; the response it sends
// carries a renewed key.
async fn private(req: Request) -> Response {
    match req.session() {
        Some(session) => Response::html(html_page("Private", &format!("<p>Signed in as {}</p>", session.user_id()))),
        None => Response::error(Status::Forbidden, "Not logged in"),
    }
}

async fn show_404(req: Request) -> Response {
    let body = html_page("Error 404", &format!("Page not found: {}", req.path()));
    Response::new(body, Status::NotFound, "text/html; charset=utf-8")
}

fn html_page(title: &str, body: &str) -> String {
    format!(
        "<html>\n  <head>\n    <title>{title}</title>\n  </head>\n  <body>\n    {body}\n  </body>\n</html>\n"
    )
}
