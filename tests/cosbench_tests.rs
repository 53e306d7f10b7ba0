// tests/cosbench_tests.rs
//
// End-to-end Cosbench runs against a fake cli.sh and a temporary archive.
// The sleeper "finishes" the job after a few polls by writing the archive
// directory, so no real time passes.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::time::Duration;

use benchmaster::error::{BenchError, Result};
use benchmaster::poll::Sleeper;
use benchmaster::process::{CommandRunner, ExternalCommand};
use benchmaster::{
    Axis, BackendAdapter, BackendContext, CosbenchSpec, ErrorKind, Executor, ProtocolAdapter,
    ReportSink, RunResult, RunSpecification, RunType, ToolConfig,
};
use tempfile::TempDir;

const WORKLOAD_CSV: &str = "\
Stage,Op-Name,Op-Type,Op-Count,Byte-Count,Avg-ResTime,Avg-ProcTime,Throughput,Bandwidth,Succ-Ratio,95%-ResTime,100%-ResTime
w1-prepare,prepare,write,5000,5242880000,12.0,11.0,400.0,419430400,100%,20,40
w1-write,write,write,2000,2097152000,8.0,7.0,100.0,134217728,100%,15,30
w1-read,read,read,4000,4194304000,4.0,3.0,200.0,268435456,99.5%,6,10
w1-cleanup,cleanup,delete,5000,0,1.0,1.0,0.0,0,100%,2,3
";

struct FakeCli {
    outputs: RefCell<Vec<String>>,
    commands: RefCell<Vec<ExternalCommand>>,
}

impl FakeCli {
    fn new(outputs: &[&str]) -> Self {
        Self {
            outputs: RefCell::new(outputs.iter().rev().map(|s| s.to_string()).collect()),
            commands: RefCell::new(Vec::new()),
        }
    }
}

impl CommandRunner for FakeCli {
    fn run(&self, cmd: &ExternalCommand) -> Result<String> {
        self.commands.borrow_mut().push(cmd.clone());
        self.outputs
            .borrow_mut()
            .pop()
            .ok_or_else(|| BenchError::ExternalProcess {
                program: cmd.program.display().to_string(),
                status: "exit status: 1".into(),
                stderr: "unexpected invocation".into(),
            })
    }
}

/// Completes job `w<n>` after `delay` sleeps by creating its archive entry.
struct CompletingSleeper {
    archive: PathBuf,
    delay: usize,
    sleeps: Cell<usize>,
    job: RefCell<u32>,
    files: Vec<&'static str>,
}

impl CompletingSleeper {
    fn new(archive: &Path, delay: usize, files: Vec<&'static str>) -> Self {
        Self {
            archive: archive.to_path_buf(),
            delay,
            sleeps: Cell::new(0),
            job: RefCell::new(1),
            files,
        }
    }
}

impl Sleeper for CompletingSleeper {
    fn sleep(&self, duration: Duration) {
        assert_eq!(duration, Duration::from_secs(2));
        self.sleeps.set(self.sleeps.get() + 1);
        if self.sleeps.get() % self.delay == 0 {
            let mut job = self.job.borrow_mut();
            let dir = self.archive.join(format!("w{}-benchmaster", job));
            std::fs::create_dir_all(&dir).unwrap();
            for name in &self.files {
                let file = name.replace("{id}", &format!("w{}", job));
                std::fs::write(dir.join(file), WORKLOAD_CSV).unwrap();
            }
            *job += 1;
        }
    }
}

#[derive(Default)]
struct Collect(Vec<RunResult>);

impl ReportSink for Collect {
    fn report(&mut self, result: &RunResult) -> Result<()> {
        self.0.push(result.clone());
        Ok(())
    }
}

fn setup() -> (TempDir, ToolConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = ToolConfig {
        cosbench_dir: dir.path().join("cosbench"),
        max_polls: Some(20),
        ..Default::default()
    };
    std::fs::create_dir_all(config.archive_dir()).unwrap();
    (dir, config)
}

fn s3_spec(job_file: &Path, sizes: &str) -> RunSpecification {
    RunSpecification {
        runtype: RunType::time("60", "10", "5"),
        backend: BackendAdapter::Cosbench(CosbenchSpec::new("100", job_file)),
        protocol: ProtocolAdapter::S3 {
            access_key: "AK".into(),
            secret_key: "SK".into(),
            port: 7480,
            bucket: "benchmark".into(),
            targets: vec!["gw1".into(), "gw2".into()],
        },
        object_size: Axis::new(sizes),
        object_count: Axis::new("5000"),
        read_write_mix: Axis::new("0"),
        description: "cosbench e2e".into(),
    }
}

#[test]
fn test_sweep_runs_and_reports_each_job() {
    let (dir, config) = setup();
    let job_file = dir.path().join("cosbench.xml");
    let runner = FakeCli::new(&["Accepted with ID: w1\n", "Accepted with ID: w2\n"]);
    let sleeper = CompletingSleeper::new(&config.archive_dir(), 3, vec!["{id}-benchmaster.csv"]);
    let executor = Executor::new(BackendContext::new(&config, &runner, &sleeper));

    let mut sink = Collect::default();
    let count = executor
        .run_sweep(&s3_spec(&job_file, "1M,4M"), &mut sink)
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(sleeper.sleeps.get(), 6);

    let commands = runner.commands.borrow();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].program, config.cosbench_dir.join("cli.sh"));
    assert_eq!(
        commands[0].args,
        vec!["submit".to_string(), job_file.display().to_string()]
    );

    // The job file left behind is the second run's
    let xml = std::fs::read_to_string(&job_file).unwrap();
    assert!(xml.contains("sizes=c(4)MB"));
    assert!(xml.contains("<work name=\"read-gw2\" workers=\"50\""));

    let results = sink.0;
    assert_eq!(results[0].job_id, "w1");
    assert_eq!(results[1].job_id, "w2");
    assert_eq!(results[0].object_size, "1M");

    let r = &results[0];
    assert!(r.is_complete());
    assert!(r.start_time.is_some() && r.end_time.is_some());
    assert_eq!(r.workers, 100);
    assert_eq!(r.target_count, 2);
    assert_eq!(r.schedule, "Time: 60, Up: 10, Down: 5");
    assert_eq!(r.read_write_mix, "Separate passes");

    let write = r.write.as_ref().unwrap();
    assert_eq!(write.bandwidth, 1.0);
    assert_eq!(write.res_time_avg, 8.0);
    assert_eq!((write.successes, write.failures), (2000, 0));

    let read = r.read.as_ref().unwrap();
    assert_eq!(read.bandwidth, 2.0);
    assert_eq!(read.res_time_max, 10.0);
    assert_eq!((read.successes, read.failures), (3980, 20));
    assert_eq!(read.res_time_min, None);
}

#[test]
fn test_histogram_csv_is_ignored() {
    let (dir, config) = setup();
    let runner = FakeCli::new(&["Accepted with ID: w1"]);
    let sleeper = CompletingSleeper::new(
        &config.archive_dir(),
        1,
        vec!["{id}-benchmaster.csv", "{id}-benchmaster-histogram.csv"],
    );
    let executor = Executor::new(BackendContext::new(&config, &runner, &sleeper));
    let result = executor
        .run_one(&s3_spec(&dir.path().join("job.xml"), "1M"))
        .unwrap();
    assert_eq!(result.job_id, "w1");
}

#[test]
fn test_ambiguous_results_are_fatal() {
    let (dir, config) = setup();
    let runner = FakeCli::new(&["Accepted with ID: w1"]);
    let sleeper = CompletingSleeper::new(
        &config.archive_dir(),
        1,
        vec!["{id}-benchmaster.csv", "{id}-copy.csv"],
    );
    let executor = Executor::new(BackendContext::new(&config, &runner, &sleeper));
    let err = executor
        .run_one(&s3_spec(&dir.path().join("job.xml"), "1M"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResultDiscovery);
}

#[test]
fn test_missing_results_are_fatal() {
    let (dir, config) = setup();
    let runner = FakeCli::new(&["Accepted with ID: w1"]);
    let sleeper = CompletingSleeper::new(&config.archive_dir(), 1, vec![]);
    let executor = Executor::new(BackendContext::new(&config, &runner, &sleeper));
    let err = executor
        .run_one(&s3_spec(&dir.path().join("job.xml"), "1M"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResultDiscovery);
}

#[test]
fn test_job_that_never_finishes() {
    let (dir, config) = setup();
    let runner = FakeCli::new(&["Accepted with ID: w9"]);
    // Only ever archives w1.., never w9
    let sleeper = CompletingSleeper::new(&config.archive_dir(), 100, vec![]);
    let executor = Executor::new(BackendContext::new(&config, &runner, &sleeper));
    let err = executor
        .run_one(&s3_spec(&dir.path().join("job.xml"), "1M"))
        .unwrap_err();
    assert!(matches!(err, BenchError::PollExhausted(20)));
    assert_eq!(sleeper.sleeps.get(), 19);
}

#[test]
fn test_submit_failure_is_surfaced() {
    let (dir, config) = setup();
    let runner = FakeCli::new(&[]);
    let sleeper = CompletingSleeper::new(&config.archive_dir(), 1, vec![]);
    let executor = Executor::new(BackendContext::new(&config, &runner, &sleeper));
    let err = executor
        .run_one(&s3_spec(&dir.path().join("job.xml"), "1M"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalProcess);
    assert!(err.to_string().contains("unexpected invocation"));
    assert_eq!(sleeper.sleeps.get(), 0);
}

#[test]
fn test_submit_without_job_id() {
    let (dir, config) = setup();
    let runner = FakeCli::new(&["nothing useful"]);
    let sleeper = CompletingSleeper::new(&config.archive_dir(), 1, vec![]);
    let executor = Executor::new(BackendContext::new(&config, &runner, &sleeper));
    let err = executor
        .run_one(&s3_spec(&dir.path().join("job.xml"), "1M"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalProcess);
    assert_eq!(sleeper.sleeps.get(), 0);
}
