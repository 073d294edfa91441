//! WiFi survey via NetworkManager
//!
//! Shells out to `nmcli` in terse mode, both to list nearby networks (with a
//! heuristic for which ones likely sit behind a captive portal) and to find
//! the SSID the host is currently associated with. BSSIDs are copied into
//! owned fixed-size arrays at parse time.

use anyhow::{Context, Result};
use regex::Regex;
use std::process::Command;
use std::sync::LazyLock;

static BSSID_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}):([0-9A-Fa-f]{2}):([0-9A-Fa-f]{2}):([0-9A-Fa-f]{2}):([0-9A-Fa-f]{2}):([0-9A-Fa-f]{2})$").ok()
});

/// Cap on stored scan results; weaker networks past this are dropped.
pub const MAX_NETWORKS: usize = 20;

/// One network seen in a scan.
#[derive(Debug, Clone)]
pub struct WifiNetwork {
    pub ssid: String,
    pub bssid: [u8; 6],
    pub channel: u16,
    /// Signal quality as reported by nmcli, 0-100.
    pub signal: u8,
    pub security: String,
}

impl WifiNetwork {
    pub fn bssid_string(&self) -> String {
        let b = &self.bssid;
        format!(
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }

    pub fn is_open(&self) -> bool {
        self.security.is_empty() || self.security == "--"
    }

    pub fn signal_grade(&self) -> &'static str {
        match self.signal {
            80..=100 => "Excellent",
            60..=79 => "Good",
            40..=59 => "Fair",
            20..=39 => "Weak",
            _ => "Poor",
        }
    }

    /// Open networks usually gate access behind a portal, and some SSID
    /// words are a strong hint even on secured ones.
    pub fn likely_captive(&self) -> bool {
        if self.is_open() {
            return true;
        }

        let ssid = self.ssid.to_lowercase();
        ["guest", "public", "free", "wifi", "hotel", "airport"]
            .iter()
            .any(|kw| ssid.contains(kw))
    }
}

/// Bounded scan result set, strongest first.
#[derive(Debug, Default)]
pub struct ScanResults {
    networks: Vec<WifiNetwork>,
}

impl ScanResults {
    /// Add a network; returns false (unchanged) once at capacity.
    pub fn push(&mut self, network: WifiNetwork) -> bool {
        if self.networks.len() >= MAX_NETWORKS {
            return false;
        }
        self.networks.push(network);
        true
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn networks(&self) -> &[WifiNetwork] {
        &self.networks
    }

    pub fn format_table(&self) -> String {
        let mut out = String::new();
        out.push_str("\n #   SSID                  BSSID              Ch   Sig   Security   Signal     Portal?\n");
        out.push_str("--------------------------------------------------------------------------------------\n");

        for (i, net) in self.networks.iter().enumerate() {
            let mut ssid = net.ssid.clone();
            if ssid.len() > 20 {
                ssid.truncate(17);
                ssid.push_str("...");
            }
            let security = if net.is_open() { "Open" } else { net.security.as_str() };
            out.push_str(&format!(
                " {:<3} {:<21} {:<18} {:<4} {:<5} {:<10} {:<10} {}\n",
                i + 1,
                ssid,
                net.bssid_string(),
                net.channel,
                net.signal,
                security,
                net.signal_grade(),
                if net.likely_captive() { "likely" } else { "" }
            ));
        }

        out
    }
}

/// Scan for nearby networks, strongest first.
pub fn scan() -> Result<ScanResults> {
    let output = Command::new("nmcli")
        .args([
            "-t",
            "-f",
            "SSID,BSSID,CHAN,SIGNAL,SECURITY",
            "dev",
            "wifi",
            "list",
            "--rescan",
            "yes",
        ])
        .output()
        .context("failed to run nmcli (is NetworkManager installed?)")?;

    if !output.status.success() {
        anyhow::bail!(
            "nmcli scan failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut networks = Vec::new();

    for line in stdout.lines() {
        match parse_scan_line(line) {
            Some(net) => networks.push(net),
            None => tracing::debug!("Skipping unparseable scan line: {}", line),
        }
    }

    networks.sort_by(|a, b| b.signal.cmp(&a.signal));

    let mut results = ScanResults::default();
    for net in networks {
        if !results.push(net) {
            tracing::debug!("Scan result cap reached, dropping weakest");
            break;
        }
    }

    Ok(results)
}

/// SSID of the active WiFi connection, if any.
pub fn current_connection() -> Result<Option<String>> {
    let output = Command::new("nmcli")
        .args(["-t", "-f", "active,ssid", "dev", "wifi"])
        .output()
        .context("failed to run nmcli")?;

    let stdout = String::from_utf8_lossy(&output.stdout);

    for line in stdout.lines() {
        if let Some(ssid) = line.strip_prefix("yes:") {
            if !ssid.is_empty() {
                return Ok(Some(unescape_terse(ssid)));
            }
        }
    }

    Ok(None)
}

/// Parse one `nmcli -t` line: fields are colon-separated, with literal
/// colons (as in BSSIDs) backslash-escaped.
fn parse_scan_line(line: &str) -> Option<WifiNetwork> {
    let fields = split_terse(line);
    if fields.len() < 5 {
        return None;
    }

    let ssid = fields[0].clone();
    if ssid.is_empty() {
        // Hidden network; nothing to impersonate.
        return None;
    }

    Some(WifiNetwork {
        ssid,
        bssid: parse_bssid(&fields[1])?,
        channel: fields[2].parse().ok()?,
        signal: fields[3].parse().ok()?,
        security: fields[4].clone(),
    })
}

/// Split a terse nmcli line on unescaped colons and unescape the fields.
fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}

fn unescape_terse(field: &str) -> String {
    split_terse(field).join(":")
}

/// Copy a textual BSSID into an owned byte array.
fn parse_bssid(text: &str) -> Option<[u8; 6]> {
    let caps = BSSID_RE.as_ref()?.captures(text)?;

    let mut bssid = [0u8; 6];
    for (i, byte) in bssid.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&caps[i + 1], 16).ok()?;
    }
    Some(bssid)
}
