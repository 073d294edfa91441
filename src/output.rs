//! Fan-out report output
//!
//! Operator-facing reports (scan tables, capture dumps, clone info) go to a
//! `Reporter` holding an injected list of sinks, so mirroring output to a
//! file next to the console is a configuration choice, not wiring.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

pub trait Sink {
    fn emit(&mut self, text: &str) -> std::io::Result<()>;
}

/// Plain stdout.
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn emit(&mut self, text: &str) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{text}")
    }
}

/// Appends to a report file.
pub struct FileSink {
    file: File,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .with_context(|| format!("failed to open report file {}", path.as_ref().display()))?;
        Ok(Self { file })
    }
}

impl Sink for FileSink {
    fn emit(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.file, "{text}")
    }
}

/// Fans each report out to every sink. A failing sink is logged and skipped;
/// it never blocks the others.
pub struct Reporter {
    sinks: Vec<Box<dyn Sink>>,
}

impl Reporter {
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn emit(&mut self, text: &str) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.emit(text) {
                tracing::warn!("Report sink failed: {}", e);
            }
        }
    }
}
