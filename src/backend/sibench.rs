// src/backend/sibench.rs
//! Sibench backend.
//!
//! Sibench is a single command: we build its command line from the run
//! specification, run it to completion and read back the JSON report it was
//! told to write.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::backend::{BackendAdapter, BackendContext};
use crate::config::ToolConfig;
use crate::error::{BenchError, Result};
use crate::normalize::{build_result, nanos_to_millis, DirectionMetrics};
use crate::process::ExternalCommand;
use crate::protocol::ProtocolAdapter;
use crate::result::RunResult;
use crate::spec::{RunSpecification, RunType};
use crate::sweep::Axis;

/// Sibench results have no job id of their own
pub const SIBENCH_JOB_ID: &str = "-";

const TOTAL_READ: &str = "Total Read";
const TOTAL_WRITE: &str = "Total Write";

static BANDWIDTH_LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+[KMG]?$").expect("bandwidth limit pattern is valid")
});

/// Sibench backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SibenchSpec {
    /// Port the sibench servers listen on
    pub port: u16,
    /// Load-generating servers; one worker each as far as reports go
    pub servers: Vec<String>,
    /// Bandwidth limit in bits/s with K, M or G suffix, 0 for none (sweepable)
    pub bandwidth_limit: Axis,
    /// Workers per server as a multiple of its core count (sweepable)
    pub worker_factor: Axis,
    pub skip_read_verification: bool,
}

impl SibenchSpec {
    pub fn flatten(&self) -> Vec<SibenchSpec> {
        let mut out = Vec::new();
        for bandwidth_limit in self.bandwidth_limit.values() {
            for worker_factor in self.worker_factor.values() {
                out.push(SibenchSpec {
                    bandwidth_limit: bandwidth_limit.clone(),
                    worker_factor,
                    ..self.clone()
                });
            }
        }
        out
    }

    pub fn workers(&self) -> u64 {
        self.servers.len() as u64
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(BenchError::config("sibench needs at least one server"));
        }
        let factor: f64 = self.worker_factor.parse("sibench worker factor")?;
        if !(factor.is_finite() && factor > 0.0) {
            return Err(BenchError::config(format!(
                "invalid sibench worker factor '{}': must be greater than 0",
                self.worker_factor
            )));
        }
        if self.bandwidth_limit.is_sweep()
            || !BANDWIDTH_LIMIT_RE.is_match(self.bandwidth_limit.as_str().trim())
        {
            return Err(BenchError::config(format!(
                "invalid sibench bandwidth limit '{}': use 0 or digits with K, M or G",
                self.bandwidth_limit
            )));
        }
        Ok(())
    }

    /// Build the sibench invocation for `spec`. Checks protocol and run type
    /// support, so nothing is spawned for a run sibench cannot do.
    pub fn command(&self, spec: &RunSpecification, config: &ToolConfig) -> Result<ExternalCommand> {
        let (runtime, ramp_up, ramp_down) = match &spec.runtype {
            RunType::Time {
                runtime,
                ramp_up,
                ramp_down,
            } => (runtime, ramp_up, ramp_down),
            other => {
                return Err(BenchError::config(format!(
                    "sibench only supports time based runs, not '{}'",
                    other.name()
                )))
            }
        };

        let mut cmd = ExternalCommand::new(config.sibench_binary.clone())
            .arg(spec.protocol.name())
            .arg("run")
            .arg(format!("-s{}", spec.object_size))
            .arg(format!("-c{}", spec.object_count))
            .arg(format!("-x{}", spec.read_write_mix))
            .arg(format!("-r{}", runtime))
            .arg(format!("-u{}", ramp_up))
            .arg(format!("-d{}", ramp_down))
            .arg(format!("-w{}", self.worker_factor))
            .arg(format!("-b{}", self.bandwidth_limit))
            .arg(format!("-o{}", config.sibench_report.display()))
            .arg("--servers")
            .arg(self.servers.join(","))
            .arg("-p")
            .arg(self.port.to_string());

        cmd = match &spec.protocol {
            ProtocolAdapter::S3 {
                access_key,
                secret_key,
                port,
                bucket,
                targets,
            } => cmd
                .args(["--s3-port".to_string(), port.to_string()])
                .args(["--s3-bucket", bucket.as_str()])
                .args(["--s3-access-key", access_key.as_str()])
                .args(["--s3-secret-key", secret_key.as_str()])
                .args(targets.iter().cloned()),
            ProtocolAdapter::Rados {
                user,
                key,
                pool,
                targets,
            } => cmd
                .args(["--ceph-pool", pool.as_str()])
                .args(["--ceph-user", user.as_str()])
                .args(["--ceph-key", key.as_str()])
                .args(targets.iter().cloned()),
            ProtocolAdapter::Rbd {
                user,
                key,
                pool,
                datapool,
                targets,
            } => {
                let mut cmd = cmd.args(["--ceph-pool", pool.as_str()]);
                if let Some(datapool) = datapool {
                    cmd = cmd.args(["--ceph-datapool", datapool.as_str()]);
                }
                cmd.args(["--ceph-user", user.as_str()])
                    .args(["--ceph-key", key.as_str()])
                    .args(targets.iter().cloned())
            }
            ProtocolAdapter::CephFs {
                user,
                key,
                subdir,
                targets,
            } => cmd
                .args(["--ceph-dir", subdir.as_str()])
                .args(["--ceph-user", user.as_str()])
                .args(["--ceph-key", key.as_str()])
                .args(targets.iter().cloned()),
            ProtocolAdapter::Block { device } => cmd.args(["--block-device", device.as_str()]),
            ProtocolAdapter::File { directory } => cmd.args(["--file-dir", directory.as_str()]),
        };

        if self.skip_read_verification {
            cmd = cmd.arg("--skip-read-verification");
        }
        Ok(cmd.arg("--use-bytes"))
    }

    pub fn run(&self, spec: &RunSpecification, ctx: &BackendContext<'_>) -> Result<RunResult> {
        if !matches!(spec.backend, BackendAdapter::Sibench(_)) {
            return Err(BenchError::config(format!(
                "cannot run a {} specification on sibench",
                spec.backend.name()
            )));
        }
        let cmd = self.command(spec, ctx.config)?;
        info!(
            "Running sibench {} against {} target(s)",
            spec.protocol.name(),
            spec.protocol.targets().len()
        );
        debug!("Sibench command: {}", cmd);

        let stdout = ctx.runner.run(&cmd)?;
        for line in stdout.lines() {
            debug!("sibench: {}", line);
        }

        let report = std::fs::read_to_string(&ctx.config.sibench_report)?;
        let (read, write) = parse_report(&report)?;
        build_result(spec, SIBENCH_JOB_ID, read, write)
    }
}

/// One entry of the report's `Analyses` array. Response times are in
/// nanoseconds. With `--use-bytes` bandwidth comes as `BandwidthBytes`
/// (bytes/s); older sibench builds only write `Bandwidth` in bits/s and no
/// average response time.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Analysis {
    bandwidth_bytes: Option<f64>,
    bandwidth: Option<f64>,
    res_time_min: f64,
    res_time_max: f64,
    #[serde(rename = "ResTime95")]
    res_time95: f64,
    #[serde(default)]
    res_time_avg: f64,
    successes: u64,
    failures: u64,
}

impl TryFrom<Analysis> for DirectionMetrics {
    type Error = BenchError;

    fn try_from(a: Analysis) -> Result<Self> {
        let bandwidth_bytes_per_sec = match (a.bandwidth_bytes, a.bandwidth) {
            (Some(bytes), _) => bytes,
            (None, Some(bits)) => bits / 8.0,
            (None, None) => {
                return Err(BenchError::ResultDiscovery {
                    job_id: SIBENCH_JOB_ID.to_string(),
                    reason: "report analysis has no bandwidth".into(),
                })
            }
        };
        Ok(DirectionMetrics {
            bandwidth_bytes_per_sec,
            res_time_min_ms: Some(nanos_to_millis(a.res_time_min)),
            res_time_max_ms: nanos_to_millis(a.res_time_max),
            res_time_95_ms: nanos_to_millis(a.res_time95),
            res_time_avg_ms: nanos_to_millis(a.res_time_avg),
            successes: a.successes,
            failures: a.failures,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(rename = "Analyses", default)]
    analyses: Vec<serde_json::Value>,
}

/// Extract `(read, write)` totals from a sibench JSON report. Only the
/// `Total Read` and `Total Write` analyses are used; either may be missing.
pub fn parse_report(json: &str) -> Result<(Option<DirectionMetrics>, Option<DirectionMetrics>)> {
    let report: Report = serde_json::from_str(json)?;

    let mut read = None;
    let mut write = None;
    for analysis in report.analyses {
        let slot = match analysis.get("Name").and_then(|n| n.as_str()) {
            Some(TOTAL_READ) => &mut read,
            Some(TOTAL_WRITE) => &mut write,
            _ => continue,
        };
        let parsed: Analysis = serde_json::from_value(analysis)?;
        *slot = Some(DirectionMetrics::try_from(parsed)?);
    }

    if read.is_none() || write.is_none() {
        warn!("Sibench report is missing a total read or write analysis");
    }
    Ok((read, write))
}
