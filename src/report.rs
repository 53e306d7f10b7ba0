// src/report.rs
//! Report sinks for completed runs.
//!
//! A sink receives each [`RunResult`] as soon as its run finishes. Results
//! missing a direction are rejected by every sink, never written.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::result::{RunResult, COLUMNS};

/// Index of the read/write mix column within [`COLUMNS`]
const MIX_COLUMN: usize = 8;

pub trait ReportSink {
    fn report(&mut self, result: &RunResult) -> Result<()>;
}

/// Fan out to several sinks in order. The first failure stops the fan-out.
impl ReportSink for Vec<Box<dyn ReportSink>> {
    fn report(&mut self, result: &RunResult) -> Result<()> {
        for sink in self.iter_mut() {
            sink.report(result)?;
        }
        Ok(())
    }
}

/// Pretty JSON per result, followed by a one line summary.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn report(&mut self, result: &RunResult) -> Result<()> {
        let row = result.row()?;
        writeln!(self.out, "{}", serde_json::to_string_pretty(result)?)?;
        writeln!(
            self.out,
            "{} {} {}: write {} Gb/s, read {} Gb/s",
            result.job_id, result.protocol, result.backend, row[9], row[16]
        )?;
        self.out.flush()?;
        Ok(())
    }
}

/// Appends one tab separated row per result. The header is written when the
/// file is new or empty, so several sessions can share one file.
pub struct TsvSink {
    path: PathBuf,
}

impl TsvSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<(File, bool)> {
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok((file, needs_header))
    }
}

impl ReportSink for TsvSink {
    fn report(&mut self, result: &RunResult) -> Result<()> {
        let mut row = result.row()?;
        // "70:30" would be read as a time by spreadsheets
        row[MIX_COLUMN] = format!("\"{}\"", row[MIX_COLUMN]);

        let (mut f, needs_header) = self.open()?;
        if needs_header {
            writeln!(f, "{}", COLUMNS.join("\t"))?;
        }
        writeln!(f, "{}", row.join("\t"))?;

        info!("Appended result {} to {}", result.job_id, self.path.display());
        Ok(())
    }
}
