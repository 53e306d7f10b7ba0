// src/normalize.rs
//! Mapping of backend metrics into the shared result schema.
//!
//! Backends extract their raw numbers (Cosbench CSV columns, sibench JSON
//! analyses) into [`DirectionMetrics`]; everything from there on is the same
//! for every backend, so reporting never needs to know which tool ran.

use crate::error::Result;
use crate::result::{mix_label, DirectionResult, RunResult};
use crate::spec::RunSpecification;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Per-direction numbers as extracted from a backend, bandwidth still in
/// bytes per second.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectionMetrics {
    pub bandwidth_bytes_per_sec: f64,
    pub res_time_min_ms: Option<f64>,
    pub res_time_max_ms: f64,
    pub res_time_95_ms: f64,
    pub res_time_avg_ms: f64,
    pub successes: u64,
    pub failures: u64,
}

/// bytes/s → Gb/s (binary giga)
pub fn bytes_per_sec_to_gbits(bytes_per_sec: f64) -> f64 {
    bytes_per_sec * 8.0 / BYTES_PER_GIB
}

/// Gb/s → bytes/s
pub fn gbits_to_bytes_per_sec(gbits: f64) -> f64 {
    gbits * BYTES_PER_GIB / 8.0
}

pub fn nanos_to_millis(nanos: f64) -> f64 {
    nanos / NANOS_PER_MILLI
}

/// Split an operation count by success ratio. Fractional successes are
/// truncated, and failures are whatever is left.
pub fn split_successes(op_count: f64, success_ratio: f64) -> (u64, u64) {
    let total = op_count.max(0.0).trunc() as u64;
    let successes = ((op_count * success_ratio).max(0.0).trunc() as u64).min(total);
    (successes, total - successes)
}

pub fn direction_result(metrics: DirectionMetrics) -> DirectionResult {
    DirectionResult {
        bandwidth: bytes_per_sec_to_gbits(metrics.bandwidth_bytes_per_sec),
        res_time_min: metrics.res_time_min_ms,
        res_time_max: metrics.res_time_max_ms,
        res_time_95: metrics.res_time_95_ms,
        res_time_avg: metrics.res_time_avg_ms,
        successes: metrics.successes,
        failures: metrics.failures,
    }
}

/// Build the result record for a finished single-valued run. Directions the
/// backend did not report stay `None`; consumers must reject such results.
pub fn build_result(
    spec: &RunSpecification,
    job_id: &str,
    read: Option<DirectionMetrics>,
    write: Option<DirectionMetrics>,
) -> Result<RunResult> {
    Ok(RunResult {
        job_id: job_id.to_string(),
        protocol: spec.protocol.name().to_string(),
        backend: spec.backend.name().to_string(),
        object_size: spec.object_size.to_string(),
        object_count: spec.object_count()?,
        workers: spec.backend.workers()?,
        schedule: spec.runtype.schedule(),
        target_count: spec.protocol.targets().len(),
        read_write_mix: mix_label(spec.read_write_mix()?),
        description: spec.description.clone(),
        start_time: None,
        end_time: None,
        write: write.map(direction_result),
        read: read.map(direction_result),
    })
}
