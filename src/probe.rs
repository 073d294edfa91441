//! Captive portal detection
//!
//! Walks a fixed list of well-known OS connectivity-check URLs and watches
//! for the two captive-portal signals: a redirect (the canonical signal the
//! OS detectors rely on) or a login form served in place of the expected
//! body. Redirect evidence wins over content sniffing, and the first signal
//! stops the walk.

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::scanner;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

/// Connectivity-check URLs used by major platforms, in priority order.
pub const PROBE_ENDPOINTS: [&str; 10] = [
    "http://detectportal.firefox.com/success.txt",
    "http://www.msftconnecttest.com/connecttest.txt",
    "http://captive.apple.com/hotspot-detect.html",
    "http://connectivitycheck.gstatic.com/generate_204",
    "http://clients3.google.com/generate_204",
    "http://www.google.com/gen_204",
    "http://play.googleapis.com/generate_204",
    "http://nmcheck.gnome.org/check_network_status.txt",
    "http://network-test.debian.org/nm",
    "http://www.android.com/generate_204",
];

/// Outcome of one probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// None of the known signals fired. Not a guarantee that no portal
    /// exists; false negatives are expected.
    NoPortal,
    /// An endpoint answered with a 3xx pointing at the portal.
    RedirectPortal { location: String },
    /// An endpoint answered with a login page instead of its expected body.
    ContentPortal { html: String, source_url: String },
}

pub struct DetectionProbe {
    client: Client,
}

impl DetectionProbe {
    pub fn new(cfg: &ProbeConfig) -> Result<Self, ProbeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0"),
        );

        // Redirects are the detection signal; never follow them here.
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(cfg.timeout))
            .connect_timeout(Duration::from_secs(cfg.timeout))
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Probe the currently joined network for a captive portal. Requires an
    /// established association and IP; aborts without touching any endpoint
    /// when there is none.
    pub async fn detect(&self) -> Result<Detection, ProbeError> {
        match scanner::current_connection() {
            Ok(Some(ssid)) => {
                tracing::info!("Probing for captive portal on '{}'", ssid);
            }
            Ok(None) => return Err(ProbeError::NotConnected),
            Err(e) => {
                tracing::warn!("Connectivity check failed: {}", e);
                return Err(ProbeError::NotConnected);
            }
        }

        Ok(self.detect_with_endpoints(&PROBE_ENDPOINTS).await)
    }

    /// Walk the given endpoints in order, stopping at the first signal.
    /// Assumes the caller has already verified connectivity.
    pub async fn detect_with_endpoints(&self, endpoints: &[&str]) -> Detection {
        for endpoint in endpoints {
            tracing::debug!("Trying detection endpoint: {}", endpoint);

            let resp = match self.client.get(*endpoint).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::debug!("Endpoint unreachable: {}", e);
                    continue;
                }
            };

            if resp.status().is_redirection() {
                if let Some(location) = resp
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                {
                    tracing::info!("Captive portal redirect -> {}", location);
                    return Detection::RedirectPortal {
                        location: location.to_string(),
                    };
                }
                continue;
            }

            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!("Failed to read body: {}", e);
                    continue;
                }
            };

            if looks_like_login_page(&body) {
                tracing::info!("Captive portal login page served by {}", endpoint);
                return Detection::ContentPortal {
                    html: body,
                    source_url: endpoint.to_string(),
                };
            }
        }

        tracing::info!("No captive portal detected; network may be open");
        Detection::NoPortal
    }
}

/// A body standing in for a connectivity-check response that carries a form
/// with login-ish fields is a portal intercept.
fn looks_like_login_page(body: &str) -> bool {
    body.contains("<form")
        && (body.contains("password") || body.contains("login") || body.contains("username"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a fixed HTTP response on an ephemeral port, counting hits.
    async fn fixture(response: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });

        (url, hits)
    }

    fn probe() -> DetectionProbe {
        DetectionProbe::new(&ProbeConfig {
            timeout: 2,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_redirect_short_circuits() {
        let (plain_url, plain_hits) =
            fixture("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
        let (redirect_url, redirect_hits) =
            fixture("HTTP/1.1 302 Found\r\nLocation: http://portal.test/auth\r\nContent-Length: 0\r\n\r\n")
                .await;
        let (never_url, never_hits) =
            fixture("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;

        let endpoints = [plain_url.as_str(), redirect_url.as_str(), never_url.as_str()];
        let result = probe().detect_with_endpoints(&endpoints).await;

        assert_eq!(
            result,
            Detection::RedirectPortal {
                location: "http://portal.test/auth".to_string()
            }
        );
        assert_eq!(plain_hits.load(Ordering::SeqCst), 1);
        assert_eq!(redirect_hits.load(Ordering::SeqCst), 1);
        // Short-circuit: the endpoint after the signal is never contacted.
        assert_eq!(never_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_content_portal_detected() {
        let body = r#"<html><form action="auth.php"><input name="password"></form></html>"#;
        let response: &'static str = Box::leak(
            format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            )
            .into_boxed_str(),
        );
        let (url, _) = fixture(response).await;

        let result = probe().detect_with_endpoints(&[url.as_str()]).await;
        match result {
            Detection::ContentPortal { html, source_url } => {
                assert!(html.contains("<form"));
                assert_eq!(source_url, url);
            }
            other => panic!("expected ContentPortal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exhaustion_reports_no_portal() {
        let (url, _) = fixture("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
        // One live endpoint without a signal, one dead one.
        let endpoints = [url.as_str(), "http://127.0.0.1:9/"];
        let result = probe().detect_with_endpoints(&endpoints).await;
        assert_eq!(result, Detection::NoPortal);
    }

    #[test]
    fn test_login_page_heuristic() {
        assert!(looks_like_login_page("<form><input name=\"username\">"));
        assert!(!looks_like_login_page("success password login"));
        assert!(!looks_like_login_page("<form><input name=\"q\">"));
    }

    #[test]
    fn test_registry_order() {
        assert_eq!(PROBE_ENDPOINTS[0], "http://detectportal.firefox.com/success.txt");
        assert_eq!(PROBE_ENDPOINTS.len(), 10);
    }
}
