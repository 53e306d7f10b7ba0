// src/result.rs
//! The common result record every backend produces.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::{BenchError, Result};

/// Report columns, in order. Bandwidth is in Gb/s, response times in ms.
pub const COLUMNS: [&str; 26] = [
    "ID",
    "Protocol",
    "Backend",
    "Size",
    "Object Pool",
    "Workers",
    "Schedule",
    "Targets",
    "Read/Write Mix",
    "Wr Bandwidth Gb/s",
    "Wr ResTime Min ms",
    "Wr ResTime Max ms",
    "Wr ResTime95 ms",
    "Wr ResTimeAvg ms",
    "Wr Successes",
    "Wr Failures",
    "Rd Bandwidth Gb/s",
    "Rd ResTime Min ms",
    "Rd ResTime Max ms",
    "Rd ResTime95 ms",
    "Rd ResTimeAvg ms",
    "Rd Successes",
    "Rd Failures",
    "Description",
    "Start",
    "End",
];

/// Aggregate statistics for one direction (read or write) of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionResult {
    /// Gigabits per second
    pub bandwidth: f64,
    /// Not every backend reports a minimum
    pub res_time_min: Option<f64>,
    pub res_time_max: f64,
    pub res_time_95: f64,
    pub res_time_avg: f64,
    pub successes: u64,
    pub failures: u64,
}

impl DirectionResult {
    fn cells(&self) -> [String; 7] {
        [
            format!("{:.3}", self.bandwidth),
            self.res_time_min
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string()),
            format!("{:.2}", self.res_time_max),
            format!("{:.2}", self.res_time_95),
            format!("{:.2}", self.res_time_avg),
            self.successes.to_string(),
            self.failures.to_string(),
        ]
    }
}

/// One completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub job_id: String,
    pub protocol: String,
    pub backend: String,
    pub object_size: String,
    pub object_count: u64,
    pub workers: u64,
    pub schedule: String,
    pub target_count: usize,
    pub read_write_mix: String,
    pub description: String,
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
    pub write: Option<DirectionResult>,
    pub read: Option<DirectionResult>,
}

impl RunResult {
    pub fn is_complete(&self) -> bool {
        self.read.is_some() && self.write.is_some()
    }

    /// Fail unless both directions are present.
    pub fn ensure_complete(&self) -> Result<()> {
        self.directions().map(|_| ())
    }

    /// `(write, read)`, or the first missing direction as an error
    fn directions(&self) -> Result<(&DirectionResult, &DirectionResult)> {
        let missing = |direction: &'static str| BenchError::IncompleteResult {
            job_id: self.job_id.clone(),
            direction,
        };
        let write = self.write.as_ref().ok_or_else(|| missing("write"))?;
        let read = self.read.as_ref().ok_or_else(|| missing("read"))?;
        Ok((write, read))
    }

    pub fn with_times(mut self, start: DateTime<Local>, end: DateTime<Local>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Values for one report row, matching [`COLUMNS`].
    pub fn row(&self) -> Result<Vec<String>> {
        let (write, read) = self.directions()?;

        let mut row = Vec::with_capacity(COLUMNS.len());
        row.extend([
            self.job_id.clone(),
            self.protocol.clone(),
            self.backend.clone(),
            self.object_size.clone(),
            self.object_count.to_string(),
            self.workers.to_string(),
            self.schedule.clone(),
            self.target_count.to_string(),
            self.read_write_mix.clone(),
        ]);
        row.extend(write.cells());
        row.extend(read.cells());
        row.extend([
            self.description.clone(),
            format_time(self.start_time),
            format_time(self.end_time),
        ]);
        Ok(row)
    }
}

fn format_time(t: Option<DateTime<Local>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// `0` means separate write and read passes; otherwise `reads:writes`.
pub fn mix_label(read_percent: u8) -> String {
    if read_percent == 0 {
        "Separate passes".to_string()
    } else {
        format!("{}:{}", read_percent, 100 - read_percent.min(100))
    }
}
