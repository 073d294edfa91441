//! Portal cloning
//!
//! Glue between detection, download, and the HTML sanitizer. A clone either
//! completes and lands in the store whole, or fails and leaves the store
//! untouched; there is no partial state.

use crate::config::ProbeConfig;
use crate::error::{CloneError, ProbeError};
use crate::probe::{Detection, DetectionProbe};
use crate::scanner;
use crate::transform;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use std::fmt::Write as _;
use std::time::Duration;

/// A completed clone. All fields are set together; a missing clone is the
/// store holding `None`, never a half-filled record.
#[derive(Debug, Clone)]
pub struct ClonedPortal {
    pub source_ssid: String,
    pub source_url: String,
    pub html: String,
    pub size_bytes: usize,
}

/// Holds at most one clone at a time. A new clone replaces the old one.
#[derive(Debug, Default)]
pub struct ClonedPortalStore {
    slot: Option<ClonedPortal>,
}

impl ClonedPortalStore {
    pub fn set(&mut self, portal: ClonedPortal) {
        self.slot = Some(portal);
    }

    pub fn get(&self) -> Option<&ClonedPortal> {
        self.slot.as_ref()
    }

    pub fn has_clone(&self) -> bool {
        self.slot.is_some()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn info(&self) -> String {
        let mut out = String::new();
        out.push_str("\n===================== CLONED PORTAL INFO =====================\n\n");

        match &self.slot {
            None => out.push_str("[*] No portal has been cloned yet.\n"),
            Some(p) => {
                let _ = writeln!(out, "  Source Network:  {}", p.source_ssid);
                let _ = writeln!(out, "  Portal URL:      {}", p.source_url);
                let _ = writeln!(out, "  HTML Size:       {} bytes", p.size_bytes);
                out.push_str("  Status:          CLONED & READY\n");
                out.push_str("\n[+] Serve it with the 'cloned' portal variant.\n");
            }
        }

        out
    }
}

/// Runs the detect -> download -> transform pipeline.
pub struct PortalCloner {
    probe: DetectionProbe,
    fetcher: Client,
    cfg: ProbeConfig,
}

impl PortalCloner {
    pub fn new(cfg: &ProbeConfig) -> Result<Self, CloneError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            ),
        );

        // Unlike the detection client, the download client follows redirects
        // all the way to the actual portal page.
        let fetcher = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(cfg.fetch_timeout))
            .connect_timeout(Duration::from_secs(cfg.timeout))
            .default_headers(headers)
            .build()
            .map_err(ProbeError::Request)?;

        Ok(Self {
            probe: DetectionProbe::new(cfg)?,
            fetcher,
            cfg: cfg.clone(),
        })
    }

    /// Detect the portal on the currently joined network and clone it.
    pub async fn clone_portal(&self) -> Result<ClonedPortal, CloneError> {
        let ssid = match scanner::current_connection() {
            Ok(Some(ssid)) => ssid,
            _ => return Err(ProbeError::NotConnected.into()),
        };

        let detection = self.probe.detect().await?;
        self.clone_from_detection(&ssid, detection).await
    }

    /// Turn a detection outcome into a stored-ready clone.
    pub async fn clone_from_detection(
        &self,
        ssid: &str,
        detection: Detection,
    ) -> Result<ClonedPortal, CloneError> {
        let (raw, source_url) = match detection {
            Detection::NoPortal => return Err(CloneError::NoPortalDetected),
            Detection::ContentPortal { html, source_url } => (html, source_url),
            Detection::RedirectPortal { location } => {
                tracing::info!("Downloading portal page from {}", location);
                let html = self.fetch(&location).await?;
                (html, location)
            }
        };

        if raw.len() > self.cfg.max_html_size {
            return Err(CloneError::TooLarge {
                size: raw.len(),
                limit: self.cfg.max_html_size,
            });
        }

        tracing::info!("Downloaded {} bytes, sanitizing...", raw.len());
        let html = transform::transform(&raw, self.cfg.strip_external_resources);
        tracing::info!("Sanitized portal is {} bytes", html.len());

        Ok(ClonedPortal {
            source_ssid: ssid.to_string(),
            source_url,
            size_bytes: html.len(),
            html,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, CloneError> {
        let resp = self.fetcher.get(url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(CloneError::Fetch {
                status: status.as_u16(),
            });
        }

        Ok(resp.text().await?)
    }
}
