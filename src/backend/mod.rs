// src/backend/mod.rs
//! Load-generation backends.
//!
//! A backend turns a single-valued [`RunSpecification`] into an external job,
//! waits for it and extracts the numbers the report needs. Each backend has
//! its own units and result format; both end up in [`RunResult`] through
//! [`crate::normalize`].

pub mod cosbench;
pub mod sibench;

use serde::Serialize;

use crate::config::ToolConfig;
use crate::error::Result;
use crate::poll::{Poller, Sleeper};
use crate::process::CommandRunner;
use crate::result::RunResult;
use crate::spec::RunSpecification;

pub use cosbench::CosbenchSpec;
pub use sibench::SibenchSpec;

/// What a backend needs from the outside world to run a job.
#[derive(Clone, Copy)]
pub struct BackendContext<'a> {
    pub config: &'a ToolConfig,
    pub runner: &'a dyn CommandRunner,
    pub sleeper: &'a dyn Sleeper,
}

impl<'a> BackendContext<'a> {
    pub fn new(
        config: &'a ToolConfig,
        runner: &'a dyn CommandRunner,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            config,
            runner,
            sleeper,
        }
    }

    pub fn poller(&self) -> Poller {
        Poller::new(self.config.poll_interval).with_max_attempts(self.config.max_polls)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendAdapter {
    Cosbench(CosbenchSpec),
    Sibench(SibenchSpec),
}

impl BackendAdapter {
    pub fn name(&self) -> &'static str {
        match self {
            BackendAdapter::Cosbench(_) => "cosbench",
            BackendAdapter::Sibench(_) => "sibench",
        }
    }

    /// Worker count as reported in results
    pub fn workers(&self) -> Result<u64> {
        match self {
            BackendAdapter::Cosbench(c) => c.workers(),
            BackendAdapter::Sibench(s) => Ok(s.workers()),
        }
    }

    /// Sweep expansion of the backend's own axes
    pub fn flatten(&self) -> Vec<BackendAdapter> {
        match self {
            BackendAdapter::Cosbench(c) => {
                c.flatten().into_iter().map(BackendAdapter::Cosbench).collect()
            }
            BackendAdapter::Sibench(s) => {
                s.flatten().into_iter().map(BackendAdapter::Sibench).collect()
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            BackendAdapter::Cosbench(c) => c.validate(),
            BackendAdapter::Sibench(s) => s.validate(),
        }
    }

    /// Check that this backend can run the single-valued `spec` at all. Pure:
    /// nothing is written or spawned.
    pub(crate) fn check_supported(&self, spec: &RunSpecification) -> Result<()> {
        match self {
            BackendAdapter::Cosbench(_) => cosbench::CosbenchJob::from_spec(spec).map(|_| ()),
            BackendAdapter::Sibench(s) => s.command(spec, &ToolConfig::default()).map(|_| ()),
        }
    }

    /// Run `spec` to completion. Blocks until the external job has finished.
    pub fn run(&self, spec: &RunSpecification, ctx: &BackendContext<'_>) -> Result<RunResult> {
        match self {
            BackendAdapter::Cosbench(c) => c.run(spec, ctx),
            BackendAdapter::Sibench(s) => s.run(spec, ctx),
        }
    }
}
