// src/config.rs
//! Tool configuration: where the external backends live and how results are
//! collected. Loaded from an optional YAML file; every field has a default so
//! an empty file (or no file) is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::error::Result;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ToolConfig {
    /// Cosbench installation directory (contains `cli.sh`)
    pub cosbench_dir: PathBuf,

    /// Archive directory relative to `cosbench_dir`, unless absolute
    pub cosbench_archive: PathBuf,

    /// Sibench binary path or name on PATH
    pub sibench_binary: PathBuf,

    /// JSON report file sibench writes and we read back
    pub sibench_report: PathBuf,

    /// Interval between checks for a finished Cosbench job (e.g. "2s")
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Give up waiting for a job after this many polls. Unbounded when unset.
    pub max_polls: Option<u32>,

    /// Append every result as a row to this TSV file
    pub results_tsv: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            cosbench_dir: PathBuf::from(constants::DEFAULT_COSBENCH_DIR),
            cosbench_archive: PathBuf::from(constants::DEFAULT_COSBENCH_ARCHIVE_SUBDIR),
            sibench_binary: PathBuf::from(constants::DEFAULT_SIBENCH_BINARY),
            sibench_report: PathBuf::from(constants::DEFAULT_SIBENCH_REPORT),
            poll_interval: constants::DEFAULT_POLL_INTERVAL,
            max_polls: None,
            results_tsv: None,
        }
    }
}

impl ToolConfig {
    /// Load a YAML config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let buf = std::fs::read(path)?;
        if buf.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_slice(&buf)?)
    }

    /// `cli.sh` inside the Cosbench installation
    pub fn cosbench_cli(&self) -> PathBuf {
        self.cosbench_dir.join("cli.sh")
    }

    /// Resolved archive directory
    pub fn archive_dir(&self) -> PathBuf {
        if self.cosbench_archive.is_absolute() {
            self.cosbench_archive.clone()
        } else {
            self.cosbench_dir.join(&self.cosbench_archive)
        }
    }
}
