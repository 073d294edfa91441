//! Failure taxonomy for the capture subsystem
//!
//! Nothing in here is fatal to the process: every error is a value the menu
//! layer reports to the operator, who decides whether to retry or move on.

use thiserror::Error;

/// Errors from the captive-portal detection probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No network-layer connectivity; no endpoints were tried.
    #[error("not connected to any network")]
    NotConnected,

    #[error("probe request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Errors from the clone pipeline (detect -> download -> transform -> store).
#[derive(Debug, Error)]
pub enum CloneError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// All detection endpoints exhausted without a portal signal.
    #[error("no captive portal detected on this network")]
    NoPortalDetected,

    #[error("portal download failed with HTTP {status}")]
    Fetch { status: u16 },

    #[error("portal download failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("portal page is {size} bytes, exceeds limit of {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// The credential log is at capacity; the capture was rejected, not stored.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("credential log is full ({capacity} entries); capture dropped")]
pub struct LogFull {
    pub capacity: usize,
}
