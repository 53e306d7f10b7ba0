// src/spec.rs
//! The benchmark run specification.
//!
//! A [`RunSpecification`] is made of three sub-specs:
//!   1. [`RunType`]: whether a run is bounded by time or by operation count
//!   2. [`BackendAdapter`]: which load generator produces the I/O
//!   3. [`ProtocolAdapter`]: what storage is exercised, and where
//!
//! plus the object parameters. Before expansion a specification may describe
//! a whole sweep; see [`crate::sweep`]. Specifications are plain values: they
//! are never mutated once built, and expansion always produces new instances.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::backend::BackendAdapter;
use crate::error::{BenchError, Result};
use crate::protocol::ProtocolAdapter;
use crate::sweep::{self, Axis};

static OBJECT_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)([KMG])$").expect("object size pattern is valid")
});

/// Check an object size literal: digits followed by exactly one of K, M or G.
pub fn validate_object_size(size: &str) -> Result<()> {
    split_object_size(size).map(|_| ())
}

/// Split `"4M"` into `("4", 'M')`.
pub fn split_object_size(size: &str) -> Result<(&str, char)> {
    let caps = OBJECT_SIZE_RE.captures(size).ok_or_else(|| {
        BenchError::config(format!(
            "invalid object size '{}': sizes are digits followed by K, M or G",
            size
        ))
    })?;
    let digits = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let unit = caps
        .get(2)
        .and_then(|m| m.as_str().chars().next())
        .unwrap_or('M');
    Ok((digits, unit))
}

/// How long a run lasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RunType {
    /// Run for `runtime` seconds. Ramp-up and ramp-down seconds are not
    /// recorded in the statistics but do add to the wall time.
    Time {
        runtime: Axis,
        ramp_up: Axis,
        ramp_down: Axis,
    },
    /// Run until `op_count` operations per stage have completed.
    Ops { op_count: Axis },
}

impl RunType {
    pub fn time(
        runtime: impl Into<Axis>,
        ramp_up: impl Into<Axis>,
        ramp_down: impl Into<Axis>,
    ) -> Self {
        RunType::Time {
            runtime: runtime.into(),
            ramp_up: ramp_up.into(),
            ramp_down: ramp_down.into(),
        }
    }

    pub fn ops(op_count: impl Into<Axis>) -> Self {
        RunType::Ops {
            op_count: op_count.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunType::Time { .. } => "time",
            RunType::Ops { .. } => "ops",
        }
    }

    /// Human readable schedule for reports
    pub fn schedule(&self) -> String {
        match self {
            RunType::Time {
                runtime,
                ramp_up,
                ramp_down,
            } => format!("Time: {}, Up: {}, Down: {}", runtime, ramp_up, ramp_down),
            RunType::Ops { op_count } => format!("Count {}", op_count),
        }
    }

    /// Every scalar run type this one describes, runtime varying slowest.
    pub fn flatten(&self) -> Vec<RunType> {
        match self {
            RunType::Time {
                runtime,
                ramp_up,
                ramp_down,
            } => {
                let mut out = Vec::new();
                for r in runtime.values() {
                    for u in ramp_up.values() {
                        for d in ramp_down.values() {
                            out.push(RunType::Time {
                                runtime: r.clone(),
                                ramp_up: u.clone(),
                                ramp_down: d,
                            });
                        }
                    }
                }
                out
            }
            RunType::Ops { op_count } => op_count
                .values()
                .into_iter()
                .map(|op_count| RunType::Ops { op_count })
                .collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            RunType::Time {
                runtime,
                ramp_up,
                ramp_down,
            } => {
                runtime.parse::<u64>("run time")?;
                ramp_up.parse::<u64>("ramp up")?;
                ramp_down.parse::<u64>("ramp down")?;
            }
            RunType::Ops { op_count } => {
                op_count.parse::<u64>("op count")?;
            }
        }
        Ok(())
    }
}

/// Everything needed to run one benchmark, or one family of benchmarks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSpecification {
    pub runtype: RunType,
    pub backend: BackendAdapter,
    pub protocol: ProtocolAdapter,
    pub object_size: Axis,
    pub object_count: Axis,
    /// Percentage of reads, or 0 for separate write and read passes
    pub read_write_mix: Axis,
    pub description: String,
}

impl RunSpecification {
    /// Expand into concrete, single-valued specifications.
    pub fn expand(&self) -> Result<Vec<RunSpecification>> {
        sweep::expand(self)
    }

    /// Validate a single-valued specification, including whether its backend
    /// supports the protocol and run type.
    pub fn validate(&self) -> Result<()> {
        validate_object_size(self.object_size.as_str())?;
        self.object_count()?;
        self.read_write_mix()?;
        self.runtype.validate()?;
        self.backend.validate()?;
        self.backend.check_supported(self)
    }

    pub fn object_count(&self) -> Result<u64> {
        self.object_count.parse("object count")
    }

    pub fn read_write_mix(&self) -> Result<u8> {
        let mix: u8 = self.read_write_mix.parse("read/write mix")?;
        if mix > 100 {
            return Err(BenchError::config(format!(
                "invalid read/write mix '{}': must be between 0 and 100",
                mix
            )));
        }
        Ok(mix)
    }

    /// Run this (single-valued) specification on its backend.
    pub fn run(
        &self,
        ctx: &crate::backend::BackendContext<'_>,
    ) -> Result<crate::result::RunResult> {
        self.backend.run(self, ctx)
    }
}
