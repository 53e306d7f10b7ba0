// src/executor.rs
//! Runs benchmark sweeps one specification at a time.

use chrono::Local;
use tracing::info;

use crate::backend::BackendContext;
use crate::error::Result;
use crate::report::ReportSink;
use crate::result::RunResult;
use crate::spec::RunSpecification;

pub struct Executor<'a> {
    ctx: BackendContext<'a>,
}

impl<'a> Executor<'a> {
    pub fn new(ctx: BackendContext<'a>) -> Self {
        Self { ctx }
    }

    /// Run a single-valued specification and stamp it with wall-clock times.
    /// A result missing either direction is an error.
    pub fn run_one(&self, spec: &RunSpecification) -> Result<RunResult> {
        let start = Local::now();
        let result = spec.run(&self.ctx)?;
        let end = Local::now();

        let result = result.with_times(start, end);
        result.ensure_complete()?;
        Ok(result)
    }

    /// Expand `spec` and run every leaf in order, reporting each result as it
    /// completes. Expansion and validation of the whole sweep happen before
    /// the first run starts. Stops at the first failure.
    pub fn run_sweep(&self, spec: &RunSpecification, sink: &mut dyn ReportSink) -> Result<usize> {
        let runs = spec.expand()?;
        info!("Sweep expands to {} run(s)", runs.len());

        for (i, run) in runs.iter().enumerate() {
            info!(
                "Run {}/{}: {} via {}, size {}, count {}",
                i + 1,
                runs.len(),
                run.protocol.name(),
                run.backend.name(),
                run.object_size,
                run.object_count
            );
            let result = self.run_one(run)?;
            sink.report(&result)?;
        }
        Ok(runs.len())
    }
}
