//! Configuration management
//!
//! This module handles loading and validating configuration from TOML files.
//! Every knob has a sane default so the tool runs without any config file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Detection probe and portal download settings
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Portal server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Credential capture settings
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Detection probe and clone-download settings
#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    /// Per-endpoint detection request timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub timeout: u64,

    /// Portal page download timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// Maximum portal page size to accept, in bytes
    #[serde(default = "default_max_html_size")]
    pub max_html_size: usize,

    /// Remove externally hosted CSS/JS/images from the clone
    #[serde(default = "default_strip_external")]
    pub strip_external_resources: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: default_probe_timeout(),
            fetch_timeout: default_fetch_timeout(),
            max_html_size: default_max_html_size(),
            strip_external_resources: default_strip_external(),
        }
    }
}

/// Portal server bind addresses and lifecycle settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the DNS responder binds to
    #[serde(default = "default_dns_bind")]
    pub dns_bind: String,

    /// Address the HTTP responder binds to
    #[serde(default = "default_http_bind")]
    pub http_bind: String,

    /// The AP's own address; every DNS answer points here
    #[serde(default = "default_ap_address")]
    pub ap_address: Ipv4Addr,

    /// Stop the portal after this many seconds with no client activity
    /// (0 disables auto-stop)
    #[serde(default = "default_idle_stop")]
    pub idle_stop_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dns_bind: default_dns_bind(),
            http_bind: default_http_bind(),
            ap_address: default_ap_address(),
            idle_stop_secs: default_idle_stop(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    /// Maximum credentials held in memory; further captures are rejected
    #[serde(default = "default_credential_capacity")]
    pub credential_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            credential_capacity: default_credential_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional report file; captures and scan tables are mirrored here
    #[serde(default)]
    pub report_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            report_file: String::new(),
        }
    }
}

// Default value functions
fn default_probe_timeout() -> u64 {
    5
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_max_html_size() -> usize {
    50_000
}

fn default_strip_external() -> bool {
    true
}

fn default_dns_bind() -> String {
    "0.0.0.0:53".to_string()
}

fn default_http_bind() -> String {
    "0.0.0.0:80".to_string()
}

fn default_ap_address() -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 4, 1)
}

fn default_idle_stop() -> u64 {
    0
}

fn default_credential_capacity() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from an explicit path, the search path, or defaults
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        if let Some(path) = explicit {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {path}"))?;
            return toml::from_str(&contents).context("Failed to parse config file");
        }

        let config_paths = vec![
            PathBuf::from("config.toml"),
            PathBuf::from("/etc/twintrap/config.toml"),
            dirs::home_dir()
                .map(|h| h.join(".config/twintrap/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::debug!("Loading config from: {}", path.display());
                let contents = std::fs::read_to_string(path)
                    .context("Failed to read config file")?;

                let config: Config = toml::from_str(&contents)
                    .context("Failed to parse config file")?;

                return Ok(config);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe: ProbeConfig::default(),
            server: ServerConfig::default(),
            capture: CaptureConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.probe.timeout, 5);
        assert_eq!(cfg.probe.max_html_size, 50_000);
        assert_eq!(cfg.capture.credential_capacity, 50);
        assert_eq!(cfg.server.ap_address, Ipv4Addr::new(192, 168, 4, 1));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [probe]
            timeout = 3

            [server]
            ap_address = "10.0.0.1"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.probe.timeout, 3);
        assert_eq!(cfg.probe.fetch_timeout, 10);
        assert_eq!(cfg.server.ap_address, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(cfg.server.dns_bind, "0.0.0.0:53");
    }
}
