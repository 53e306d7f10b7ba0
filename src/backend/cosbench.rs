// src/backend/cosbench.rs
//! Cosbench backend.
//!
//! Cosbench is driven by an XML workload file: we generate one from the run
//! specification, submit it with `cli.sh submit`, wait for the job to show up
//! in the archive directory and then aggregate the per-stage rows of its
//! workload CSV.
//!
//! Cosbench thinks in S3 terms (containers and objects), so every protocol has
//! to be mapped onto that model. Only S3 and rados map cleanly.

use chrono::{DateTime, Local};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{BackendAdapter, BackendContext};
use crate::constants::{
    COSBENCH_CONTAINER_COUNT, COSBENCH_ID_SEPARATOR, COSBENCH_MIN_OBJECTS_PER_WORKER,
};
use crate::error::{BenchError, Result};
use crate::normalize::{build_result, split_successes, DirectionMetrics};
use crate::process::ExternalCommand;
use crate::protocol::ProtocolAdapter;
use crate::result::RunResult;
use crate::spec::{split_object_size, RunSpecification, RunType};
use crate::sweep::Axis;

/// Cosbench backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CosbenchSpec {
    /// Total workers, split evenly across the protocol targets (sweepable)
    pub worker_count: Axis,
    /// Where the generated workload XML is written
    pub job_file: PathBuf,
    /// Delete the S3 bucket at the end of the job
    pub dispose_bucket: bool,
}

impl CosbenchSpec {
    pub fn new(worker_count: impl Into<Axis>, job_file: impl Into<PathBuf>) -> Self {
        Self {
            worker_count: worker_count.into(),
            job_file: job_file.into(),
            dispose_bucket: false,
        }
    }

    pub fn flatten(&self) -> Vec<CosbenchSpec> {
        self.worker_count
            .values()
            .into_iter()
            .map(|worker_count| CosbenchSpec {
                worker_count,
                ..self.clone()
            })
            .collect()
    }

    pub fn workers(&self) -> Result<u64> {
        self.worker_count.parse("cosbench workers")
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.workers()? == 0 {
            return Err(BenchError::config("cosbench needs at least one worker"));
        }
        Ok(())
    }

    pub fn run(&self, spec: &RunSpecification, ctx: &BackendContext<'_>) -> Result<RunResult> {
        let job = CosbenchJob::from_spec(spec)?;

        std::fs::write(&self.job_file, job.render(&Local::now()))?;
        info!("Generated cosbench job file: {}", self.job_file.display());

        let job_id = submit(ctx, &self.job_file)?;
        info!("Submitted cosbench job {}", job_id);

        let csv_path = wait_for_results(ctx, &job_id)?;
        info!("Reading cosbench results from {}", csv_path.display());

        let metrics = parse_workload_csv(&csv_path)?;
        build_result(spec, &job_id, metrics.read, metrics.write)
    }
}

/// How long each work element runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSchedule {
    Time {
        runtime: u64,
        ramp_up: u64,
        ramp_down: u64,
    },
    Ops {
        total_ops: u64,
    },
}

/// A target endpoint as Cosbench sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTarget {
    pub name: String,
    pub endpoint: String,
}

/// Everything needed to render a Cosbench workload file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosbenchJob {
    pub storage_type: &'static str,
    pub access_key: String,
    pub secret_key: String,
    pub targets: Vec<JobTarget>,
    pub container_prefix: String,
    pub workers: u64,
    pub workers_per_target: u64,
    pub size_value: String,
    pub size_unit: char,
    pub object_count: u64,
    pub schedule: JobSchedule,
    pub create_container: bool,
    pub dispose_container: bool,
}

impl CosbenchJob {
    /// Check a single-valued specification against Cosbench's constraints
    /// and translate it. Nothing is written or spawned.
    pub fn from_spec(spec: &RunSpecification) -> Result<Self> {
        let backend = match &spec.backend {
            BackendAdapter::Cosbench(c) => c,
            other => {
                return Err(BenchError::config(format!(
                    "cannot build a cosbench job for the {} backend",
                    other.name()
                )))
            }
        };

        let (size_value, size_unit) = split_object_size(spec.object_size.as_str())?;
        let workers = backend.workers()?;
        let object_count = spec.object_count()?;

        if object_count < workers.saturating_mul(COSBENCH_MIN_OBJECTS_PER_WORKER) {
            return Err(BenchError::config(format!(
                "object count {} is less than {} x workers ({}): workers are likely to contend for the same objects",
                object_count, COSBENCH_MIN_OBJECTS_PER_WORKER, workers
            )));
        }

        if spec.read_write_mix()? != 0 {
            return Err(BenchError::config(
                "cosbench only supports separate write and read passes (read/write mix 0)",
            ));
        }

        let schedule = match &spec.runtype {
            RunType::Time {
                runtime,
                ramp_up,
                ramp_down,
            } => JobSchedule::Time {
                runtime: runtime.parse("run time")?,
                ramp_up: ramp_up.parse("ramp up")?,
                ramp_down: ramp_down.parse("ramp down")?,
            },
            RunType::Ops { op_count } => JobSchedule::Ops {
                total_ops: op_count.parse("op count")?,
            },
        };

        let (storage_type, access_key, secret_key, container_prefix, create, targets) =
            match &spec.protocol {
                ProtocolAdapter::S3 {
                    access_key,
                    secret_key,
                    port,
                    bucket,
                    targets,
                } => (
                    "s3",
                    access_key.clone(),
                    secret_key.clone(),
                    bucket.clone(),
                    true,
                    targets
                        .iter()
                        .map(|t| JobTarget {
                            name: t.clone(),
                            endpoint: build_url(Some("http"), t, Some(*port)),
                        })
                        .collect::<Vec<_>>(),
                ),
                ProtocolAdapter::Rados {
                    user,
                    key,
                    pool,
                    targets,
                } => (
                    "librados",
                    user.clone(),
                    key.clone(),
                    container_prefix_from_pool(pool)?.to_string(),
                    false,
                    targets
                        .iter()
                        .map(|t| JobTarget {
                            name: t.clone(),
                            endpoint: build_url(None, t, None),
                        })
                        .collect::<Vec<_>>(),
                ),
                other => {
                    return Err(BenchError::config(format!(
                        "cosbench does not support the {} protocol",
                        other.name()
                    )))
                }
            };

        if targets.is_empty() {
            return Err(BenchError::config("cosbench needs at least one target"));
        }

        // Integer division: remainder workers are dropped, not redistributed.
        let workers_per_target = workers / targets.len() as u64;
        if workers_per_target == 0 {
            return Err(BenchError::config(format!(
                "{} workers cannot be spread over {} targets",
                workers,
                targets.len()
            )));
        }

        let dispose = backend.dispose_bucket && storage_type == "s3";
        if backend.dispose_bucket && !dispose {
            warn!("Ignoring bucket disposal for {} protocol", spec.protocol.name());
        }

        Ok(Self {
            storage_type,
            access_key,
            secret_key,
            targets,
            container_prefix,
            workers,
            workers_per_target,
            size_value: size_value.to_string(),
            size_unit,
            object_count,
            schedule,
            create_container: create,
            dispose_container: dispose,
        })
    }

    /// Stage names in the order they appear in the workflow
    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut stages = Vec::new();
        if self.create_container {
            stages.push("bucket-create");
        }
        if matches!(self.schedule, JobSchedule::Time { .. }) {
            stages.push("prepare");
        }
        stages.extend(["write", "read", "cleanup"]);
        if self.dispose_container {
            stages.push("dispose");
        }
        stages
    }

    /// Render the workload XML.
    pub fn render(&self, generated: &DateTime<Local>) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<workload name=\"benchmaster\" description=\"benchmaster job generated {}\" config=\"\">\n",
            generated.format("%Y-%m-%d %H:%M:%S")
        ));
        xml.push_str(&format!("  {}\n", self.storage(&self.targets[0])));
        xml.push_str("  <workflow>\n\n");

        for stage in self.stage_names() {
            match stage {
                "bucket-create" => self.render_container_creation(&mut xml),
                "prepare" => self.render_prepare(&mut xml),
                "write" | "read" => self.render_work(&mut xml, stage),
                "cleanup" => self.render_cleanup(&mut xml),
                "dispose" => self.render_dispose(&mut xml),
                _ => {}
            }
        }

        xml.push_str("  </workflow>\n</workload>\n");
        xml
    }

    fn storage(&self, target: &JobTarget) -> String {
        format!(
            "<storage type=\"{}\" config=\"path_style_access=true;accesskey={};secretkey={};endpoint={}\"/>",
            self.storage_type,
            escape_attr(&self.access_key),
            escape_attr(&self.secret_key),
            escape_attr(&target.endpoint)
        )
    }

    fn sizes(&self) -> String {
        format!("sizes=c({}){}B", self.size_value, self.size_unit)
    }

    fn render_container_creation(&self, xml: &mut String) {
        xml.push_str(&format!(
            "    <!-- Container creation: {} container(s) -->\n",
            COSBENCH_CONTAINER_COUNT
        ));
        xml.push_str("    <workstage name=\"bucket-create\">\n");
        xml.push_str(&format!(
            "      <work type=\"init\" workers=\"1\" config=\"cprefix={};containers=r(1,{})\" />\n",
            escape_attr(&self.container_prefix),
            COSBENCH_CONTAINER_COUNT
        ));
        xml.push_str("    </workstage>\n\n");
    }

    fn render_prepare(&self, xml: &mut String) {
        xml.push_str("    <workstage name=\"prepare\">\n");
        xml.push_str(&format!(
            "      <work type=\"prepare\" workers=\"{}\" config=\"cprefix={};containers=r(1,{});oprefix=CB-;objects=r(1,{});{}\">\n",
            self.workers,
            escape_attr(&self.container_prefix),
            COSBENCH_CONTAINER_COUNT,
            self.object_count,
            self.sizes()
        ));
        xml.push_str(&format!("        {}\n", self.storage(&self.targets[0])));
        xml.push_str("      </work>\n");
        xml.push_str("    </workstage>\n\n");
    }

    fn render_work(&self, xml: &mut String, op: &str) {
        xml.push_str(&format!("    <!-- {} workstage -->\n", op));
        xml.push_str(&format!("    <workstage name=\"{}\">\n", op));

        for target in &self.targets {
            let bounds = match self.schedule {
                JobSchedule::Time {
                    runtime,
                    ramp_up,
                    ramp_down,
                } => format!(
                    "runtime=\"{}\" rampup=\"{}\" rampdown=\"{}\"",
                    runtime, ramp_up, ramp_down
                ),
                JobSchedule::Ops { total_ops } => format!("totalOps=\"{}\"", total_ops),
            };
            xml.push_str(&format!(
                "      <work name=\"{}-{}\" workers=\"{}\" division=\"container\" {}>\n",
                op,
                escape_attr(&target.name),
                self.workers_per_target,
                bounds
            ));
            xml.push_str(&format!("        {}\n", self.storage(target)));
            xml.push_str(&format!(
                "        <operation type=\"{}\" ratio=\"100\" config=\"cprefix={};containers=c({});oprefix=CB-;objects=r(1,{});{};content=zero\"/>\n",
                op,
                escape_attr(&self.container_prefix),
                COSBENCH_CONTAINER_COUNT,
                self.object_count,
                self.sizes()
            ));
            xml.push_str("      </work>\n");
        }

        xml.push_str("    </workstage>\n\n");
    }

    fn render_cleanup(&self, xml: &mut String) {
        xml.push_str("    <workstage name=\"cleanup\">\n");
        xml.push_str(&format!(
            "      <work type=\"cleanup\" workers=\"{}\" config=\"cprefix={};containers=r(1,{});oprefix=CB-;objects=r(1,{});\" />\n",
            self.workers,
            escape_attr(&self.container_prefix),
            COSBENCH_CONTAINER_COUNT,
            self.object_count
        ));
        xml.push_str("    </workstage>\n\n");
    }

    fn render_dispose(&self, xml: &mut String) {
        xml.push_str("    <workstage name=\"dispose\">\n");
        xml.push_str(&format!(
            "      <work type=\"dispose\" workers=\"1\" config=\"cprefix={};containers=r(1,{})\" />\n",
            escape_attr(&self.container_prefix),
            COSBENCH_CONTAINER_COUNT
        ));
        xml.push_str("    </workstage>\n\n");
    }
}

/// Cosbench always names containers `<prefix><n>`, and with a single
/// container that is `<prefix>1`. A rados pool therefore has to end in `1`,
/// and the prefix is the pool name without it.
pub fn container_prefix_from_pool(pool: &str) -> Result<&str> {
    match pool.strip_suffix('1') {
        Some(prefix) if !prefix.is_empty() => Ok(prefix),
        _ => Err(BenchError::config(format!(
            "pool '{}' cannot be used with cosbench: the pool name must end in '1'",
            pool
        ))),
    }
}

/// Scheme and port are optional
pub fn build_url(scheme: Option<&str>, host: &str, port: Option<u16>) -> String {
    let mut url = String::new();
    if let Some(scheme) = scheme {
        url.push_str(scheme);
        url.push_str("://");
    }
    url.push_str(host);
    if let Some(port) = port {
        url.push_str(&format!(":{}", port));
    }
    url
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// -----------------------------------------------------------------------------
// Submission and result collection
// -----------------------------------------------------------------------------

fn submit(ctx: &BackendContext<'_>, job_file: &Path) -> Result<String> {
    let cmd = ExternalCommand::new(ctx.config.cosbench_cli())
        .arg("submit")
        .arg(job_file.display().to_string());
    let stdout = ctx.runner.run(&cmd)?;
    parse_job_id(&stdout).ok_or_else(|| BenchError::ExternalProcess {
        program: cmd.program.display().to_string(),
        status: "exit status: 0".to_string(),
        stderr: format!("no job id in submit output: {}", stdout.trim()),
    })
}

/// `cli.sh submit` prints e.g. `Accepted with ID: w42`.
pub fn parse_job_id(stdout: &str) -> Option<String> {
    stdout
        .split(COSBENCH_ID_SEPARATOR)
        .nth(1)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Block until the job's archive directory exists, then locate its workload
/// CSV.
pub fn wait_for_results(ctx: &BackendContext<'_>, job_id: &str) -> Result<PathBuf> {
    let archive = ctx.config.archive_dir();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("waiting for cosbench job {}", job_id));
    spinner.enable_steady_tick(Duration::from_millis(200));

    let waited = ctx.poller().poll(ctx.sleeper, |attempt| {
        debug!("Checking archive for job {} (attempt {})", job_id, attempt);
        Ok(job_archived(&archive, job_id)?.then_some(()))
    });
    spinner.finish_and_clear();
    waited?;

    find_result_csv(&archive, job_id)
}

/// Has Cosbench archived the job yet?
pub fn job_archived(archive: &Path, job_id: &str) -> Result<bool> {
    let pattern = format!(
        "{}/{}-*",
        Pattern::escape(&archive.to_string_lossy()),
        Pattern::escape(job_id)
    );
    Ok(glob_paths(&pattern)?.next().is_some())
}

/// The single non-histogram CSV for `job_id`. None or several is an error:
/// there is no safe way to pick one.
pub fn find_result_csv(archive: &Path, job_id: &str) -> Result<PathBuf> {
    let id = Pattern::escape(job_id);
    let pattern = format!(
        "{}/{}-*/*{}*.csv",
        Pattern::escape(&archive.to_string_lossy()),
        id,
        id
    );

    let mut candidates: Vec<PathBuf> = glob_paths(&pattern)?
        .filter(|p| !p.to_string_lossy().contains("histogram"))
        .collect();
    candidates.sort();

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(BenchError::ResultDiscovery {
            job_id: job_id.to_string(),
            reason: format!("no result CSV found in {}", archive.display()),
        }),
        n => Err(BenchError::ResultDiscovery {
            job_id: job_id.to_string(),
            reason: format!(
                "{} candidate result files: {}",
                n,
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}

fn glob_paths(pattern: &str) -> Result<impl Iterator<Item = PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| BenchError::config(format!("invalid glob pattern '{}': {}", pattern, e)))?;
    Ok(paths.filter_map(|entry| entry.ok()))
}

// -----------------------------------------------------------------------------
// Workload CSV aggregation
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    Bandwidth,
    ResTime95,
    ResTime100,
    AvgResTime,
    OpCount,
    SuccRatio,
}

struct FieldSpec {
    column: &'static str,
    metric: Metric,
    should_average: bool,
}

/// Indexed by `Metric as usize`
const FIELDS: [FieldSpec; 6] = [
    FieldSpec {
        column: "Bandwidth",
        metric: Metric::Bandwidth,
        should_average: false,
    },
    FieldSpec {
        column: "95%-ResTime",
        metric: Metric::ResTime95,
        should_average: true,
    },
    FieldSpec {
        column: "100%-ResTime",
        metric: Metric::ResTime100,
        should_average: true,
    },
    FieldSpec {
        column: "Avg-ResTime",
        metric: Metric::AvgResTime,
        should_average: true,
    },
    FieldSpec {
        column: "Op-Count",
        metric: Metric::OpCount,
        should_average: false,
    },
    FieldSpec {
        column: "Succ-Ratio",
        metric: Metric::SuccRatio,
        should_average: true,
    },
];

#[derive(Debug, Default, Clone)]
struct StageTotals {
    totals: [f64; 6],
    counts: [u32; 6],
}

impl StageTotals {
    fn add(&mut self, metric: Metric, value: f64) {
        self.totals[metric as usize] += value;
        self.counts[metric as usize] += 1;
    }

    fn merge(&mut self, other: &StageTotals) {
        for i in 0..FIELDS.len() {
            self.totals[i] += other.totals[i];
            self.counts[i] += other.counts[i];
        }
    }

    fn value(&self, metric: Metric) -> Option<f64> {
        let i = metric as usize;
        match self.counts[i] {
            0 => None,
            n if FIELDS[i].should_average => Some(self.totals[i] / f64::from(n)),
            _ => Some(self.totals[i]),
        }
    }

    fn metrics(&self) -> DirectionMetrics {
        let op_count = self.value(Metric::OpCount).unwrap_or(0.0);
        let ratio = self.value(Metric::SuccRatio).unwrap_or(0.0);
        let (successes, failures) = split_successes(op_count, ratio);
        DirectionMetrics {
            bandwidth_bytes_per_sec: self.value(Metric::Bandwidth).unwrap_or(0.0),
            res_time_min_ms: None,
            res_time_max_ms: self.value(Metric::ResTime100).unwrap_or(0.0),
            res_time_95_ms: self.value(Metric::ResTime95).unwrap_or(0.0),
            res_time_avg_ms: self.value(Metric::AvgResTime).unwrap_or(0.0),
            successes,
            failures,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

fn direction_of(stage: &str) -> Option<Direction> {
    let stage = stage.to_lowercase();
    if stage.contains("write") {
        Some(Direction::Write)
    } else if stage.contains("read") {
        Some(Direction::Read)
    } else {
        None
    }
}

fn parse_metric(metric: Metric, raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value = match (metric, raw.strip_suffix('%')) {
        (Metric::SuccRatio, Some(pct)) => pct.trim().parse::<f64>().ok()? / 100.0,
        _ => raw.parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

/// Read and write statistics extracted from a workload CSV.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CosbenchMetrics {
    pub read: Option<DirectionMetrics>,
    pub write: Option<DirectionMetrics>,
}

pub fn parse_workload_csv(path: &Path) -> Result<CosbenchMetrics> {
    parse_workload(File::open(path)?)
}

/// Aggregate the rows of a workload CSV by stage.
///
/// Only stages whose name contains "read" or "write" count. Bandwidth and
/// op counts are summed, response times and success ratios averaged. A value
/// that does not parse is left out of its column without affecting the rest
/// of the row.
pub fn parse_workload<R: Read>(reader: R) -> Result<CosbenchMetrics> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let Some(stage_idx) = headers.iter().position(|h| h == "Stage") else {
        warn!("Cosbench result has no Stage column");
        return Ok(CosbenchMetrics::default());
    };
    let columns: Vec<Option<usize>> = FIELDS
        .iter()
        .map(|f| headers.iter().position(|h| h == f.column))
        .collect();

    let mut stages: BTreeMap<String, StageTotals> = BTreeMap::new();
    for record in rdr.records() {
        let record = record?;
        let Some(stage) = record.get(stage_idx) else {
            continue;
        };
        if direction_of(stage).is_none() {
            continue;
        }

        let totals = stages.entry(stage.to_string()).or_default();
        for (field, column) in FIELDS.iter().zip(&columns) {
            let Some(raw) = column.and_then(|c| record.get(c)) else {
                continue;
            };
            match parse_metric(field.metric, raw) {
                Some(value) => totals.add(field.metric, value),
                None => debug!(
                    "Skipping unparseable {} value '{}' in stage {}",
                    field.column, raw, stage
                ),
            }
        }
    }

    let mut read: Option<StageTotals> = None;
    let mut write: Option<StageTotals> = None;
    for (stage, totals) in &stages {
        let slot = match direction_of(stage) {
            Some(Direction::Read) => &mut read,
            Some(Direction::Write) => &mut write,
            None => continue,
        };
        slot.get_or_insert_with(StageTotals::default).merge(totals);
    }

    Ok(CosbenchMetrics {
        read: read.map(|t| t.metrics()),
        write: write.map(|t| t.metrics()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::Axis;

    fn s3_spec(workers: &str, count: &str, runtype: RunType) -> RunSpecification {
        RunSpecification {
            runtype,
            backend: BackendAdapter::Cosbench(CosbenchSpec::new(workers, "cosbench.xml")),
            protocol: ProtocolAdapter::S3 {
                access_key: "AK".into(),
                secret_key: "S&K".into(),
                port: 7480,
                bucket: "benchmark".into(),
                targets: vec!["gw1".into(), "gw2".into(), "gw3".into()],
            },
            object_size: Axis::new("4M"),
            object_count: Axis::new(count),
            read_write_mix: Axis::new("0"),
            description: "test".into(),
        }
    }

    fn rados_spec(pool: &str) -> RunSpecification {
        RunSpecification {
            protocol: ProtocolAdapter::Rados {
                user: "admin".into(),
                key: "KEY".into(),
                pool: pool.into(),
                targets: vec!["mon1".into()],
            },
            ..s3_spec("10", "1000", RunType::ops("100"))
        }
    }

    #[test]
    fn test_contention_guardrail() {
        let job = |count| CosbenchJob::from_spec(&s3_spec("100", count, RunType::ops("10")));
        let err = job("500").unwrap_err();
        assert!(err.to_string().contains("contend"));
        assert!(job("5000").is_ok());
        // Exactly 10 per worker is enough
        assert!(job("1000").is_ok());
    }

    #[test]
    fn test_workers_per_target_floors() {
        let job = CosbenchJob::from_spec(&s3_spec("100", "5000", RunType::ops("10"))).unwrap();
        assert_eq!(job.workers, 100);
        assert_eq!(job.workers_per_target, 33);
    }

    #[test]
    fn test_pool_prefix() {
        assert_eq!(container_prefix_from_pool("bench1").unwrap(), "bench");
        assert!(container_prefix_from_pool("bench").is_err());
        assert!(container_prefix_from_pool("1").is_err());

        let job = CosbenchJob::from_spec(&rados_spec("bench1")).unwrap();
        assert_eq!(job.container_prefix, "bench");
        assert_eq!(job.storage_type, "librados");
        assert_eq!(job.targets[0].endpoint, "mon1");
        assert!(!job.create_container);

        let err = CosbenchJob::from_spec(&rados_spec("bench")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_unsupported_protocol() {
        let spec = RunSpecification {
            protocol: ProtocolAdapter::File {
                directory: "/mnt".into(),
            },
            ..s3_spec("10", "1000", RunType::ops("10"))
        };
        let err = CosbenchJob::from_spec(&spec).unwrap_err();
        assert!(err.to_string().contains("file"));
    }

    #[test]
    fn test_mixed_runs_rejected() {
        let spec = RunSpecification {
            read_write_mix: Axis::new("70"),
            ..s3_spec("10", "1000", RunType::ops("10"))
        };
        assert!(CosbenchJob::from_spec(&spec).is_err());
    }

    #[test]
    fn test_stage_order() {
        let time_spec = s3_spec("30", "5000", RunType::time("60", "10", "5"));
        let time = CosbenchJob::from_spec(&time_spec).unwrap();
        assert_eq!(
            time.stage_names(),
            vec!["bucket-create", "prepare", "write", "read", "cleanup"]
        );

        let ops = CosbenchJob::from_spec(&rados_spec("pool1")).unwrap();
        assert_eq!(ops.stage_names(), vec!["write", "read", "cleanup"]);
    }

    #[test]
    fn test_render_time_job() {
        let job_spec = s3_spec("30", "5000", RunType::time("60", "10", "5"));
        let job = CosbenchJob::from_spec(&job_spec).unwrap();
        let xml = job.render(&Local::now());

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.ends_with("  </workflow>\n</workload>\n"));
        assert!(xml.contains("endpoint=http://gw1:7480"));
        assert!(xml.contains("secretkey=S&amp;K"));
        assert!(xml.contains(
            "<work name=\"write-gw2\" workers=\"10\" division=\"container\" \
             runtime=\"60\" rampup=\"10\" rampdown=\"5\">"
        ));
        assert!(xml.contains("objects=r(1,5000);sizes=c(4)MB;content=zero"));
        assert!(xml.contains("<work type=\"prepare\" workers=\"30\""));
        assert_eq!(xml.matches("<work name=\"read-").count(), 3);

        let stages = ["bucket-create", "prepare", "\"write\"", "\"read\"", "cleanup"];
        let positions: Vec<usize> = stages
            .iter()
            .map(|s| xml.find(s).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(!xml.contains("dispose"));
    }

    #[test]
    fn test_render_ops_job_with_dispose() {
        let mut spec = s3_spec("30", "5000", RunType::ops("250"));
        if let BackendAdapter::Cosbench(c) = &mut spec.backend {
            c.dispose_bucket = true;
        }
        let job = CosbenchJob::from_spec(&spec).unwrap();
        let xml = job.render(&Local::now());
        assert!(xml.contains("totalOps=\"250\""));
        assert!(!xml.contains("prepare"));
        assert!(xml.contains("<workstage name=\"dispose\">"));
    }

    #[test]
    fn test_parse_job_id() {
        assert_eq!(parse_job_id("Accepted with ID: w42\n").as_deref(), Some("w42"));
        assert_eq!(parse_job_id("no id here"), None);
        assert_eq!(parse_job_id("Accepted with ID: \n"), None);
    }

    #[test]
    fn test_build_url() {
        assert_eq!(build_url(Some("http"), "gw", Some(80)), "http://gw:80");
        assert_eq!(build_url(None, "mon", None), "mon");
    }

    const CSV: &str = "\
Stage,Op-Name,Op-Type,Op-Count,Byte-Count,Avg-ResTime,Avg-ProcTime,Throughput,Bandwidth,Succ-Ratio,95%-ResTime,100%-ResTime
w1-prepare,prepare,write,5000,20971520000,30.0,29.0,100.0,419430400,100.00%,50,90
w1-write,write,write,1000,4194304000,20.0,19.0,50.0,134217728,99.95%,40,80
w1-write,write,write,1000,4194304000,10.0,9.0,50.0,134217728,100.00%,20,N/A
w1-read,read,read,3000,12582912000,5.0,4.0,150.0,268435456,1.0,8,12
w1-cleanup,cleanup,delete,5000,0,1.0,1.0,0.0,0,100.00%,2,3
";

    #[test]
    fn test_parse_workload_aggregates() {
        let m = parse_workload(CSV.as_bytes()).unwrap();

        let write = m.write.unwrap();
        assert_eq!(write.bandwidth_bytes_per_sec, 268_435_456.0);
        assert_eq!(write.res_time_avg_ms, 15.0);
        assert_eq!(write.res_time_95_ms, 30.0);
        // N/A is skipped, so only the first row counts
        assert_eq!(write.res_time_max_ms, 80.0);
        assert_eq!(write.res_time_min_ms, None);
        // 2000 ops at an average ratio of 0.99975 -> 1999.5 -> 1999
        assert_eq!((write.successes, write.failures), (1999, 1));

        let read = m.read.unwrap();
        assert_eq!(read.bandwidth_bytes_per_sec, 268_435_456.0);
        assert_eq!((read.successes, read.failures), (3000, 0));
    }

    #[test]
    fn test_parse_workload_ignores_other_stages() {
        let csv = "Stage,Bandwidth\nw1-prepare,100\nw1-cleanup,5\n";
        let m = parse_workload(csv.as_bytes()).unwrap();
        assert_eq!(m, CosbenchMetrics::default());
    }

    #[test]
    fn test_stage_match_is_case_insensitive() {
        let csv = "Stage,Bandwidth,Op-Count,Succ-Ratio\nMain-WRITE,10,4,1\nMain-Read,20,4,0.5\n";
        let m = parse_workload(csv.as_bytes()).unwrap();
        assert_eq!(m.write.unwrap().bandwidth_bytes_per_sec, 10.0);
        assert_eq!(m.read.unwrap().successes, 2);
    }

    #[test]
    fn test_find_result_csv() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path();
        assert!(!job_archived(archive, "w7").unwrap());

        let job_dir = archive.join("w7-benchmaster");
        std::fs::create_dir_all(&job_dir).unwrap();
        assert!(job_archived(archive, "w7").unwrap());

        let err = find_result_csv(archive, "w7").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ResultDiscovery);

        std::fs::write(job_dir.join("w7-benchmaster.csv"), CSV).unwrap();
        std::fs::write(job_dir.join("w7-benchmaster-histogram.csv"), "").unwrap();
        assert_eq!(
            find_result_csv(archive, "w7").unwrap(),
            job_dir.join("w7-benchmaster.csv")
        );

        std::fs::write(job_dir.join("w7-other.csv"), "").unwrap();
        let err = find_result_csv(archive, "w7").unwrap_err();
        assert!(err.to_string().contains("2 candidate"));
    }
}
