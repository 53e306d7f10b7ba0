// src/main.rs
// -----------------------------------------------------------------------------
// benchmaster - drive Cosbench and sibench benchmark sweeps against Ceph, S3,
// block devices and file systems, and collect the results in one format.
// -----------------------------------------------------------------------------

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use benchmaster::constants::*;
use benchmaster::credentials::{self, S3Keys};
use benchmaster::poll::ThreadSleeper;
use benchmaster::process::SystemRunner;
use benchmaster::ssh::RemoteShell;
use benchmaster::{
    Axis, BackendAdapter, BackendContext, ConsoleSink, CosbenchSpec, Executor, ProtocolAdapter,
    ReportSink, RunSpecification, RunType, SibenchSpec, ToolConfig, TsvSink, COLUMNS,
};

// -----------------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------------
#[derive(Parser)]
#[command(
    name = "benchmaster",
    version,
    about = "Storage benchmark sweeps over Cosbench and sibench"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Tool configuration file (YAML)
    #[arg(long, env = "BENCHMASTER_CONFIG", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a benchmark, or a sweep of benchmarks
    ///
    /// Fields marked sweepable take a comma-separated list; every combination
    /// is run in turn.
    ///
    /// Examples:
    ///   benchmaster run --protocol s3 --backend cosbench --runtype time -s 1M,4M "baseline" gw1 gw2
    ///   benchmaster run --protocol rbd --backend sibench --runtype time --sibench-servers n1,n2 "rbd" mon1
    Run(RunArgs),
    /// Create a rados gateway user and store its S3 keys
    S3AddUser {
        name: String,
        gateway: String,
        #[arg(long, default_value = DEFAULT_S3_CREDENTIALS)]
        s3_credentials: PathBuf,
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Print the Ceph admin key of a monitor
    FetchKey {
        monitor: String,
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Print the report column names
    Columns,
}

#[derive(Args)]
struct RemoteArgs {
    /// Root password of the cluster nodes
    #[arg(long, env = "BENCHMASTER_ROOT_PASSWORD", default_value = DEFAULT_CEPH_ROOT_PASSWORD)]
    ceph_root_password: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProtocolKind {
    S3,
    Rados,
    Rbd,
    Cephfs,
    Block,
    File,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendKind {
    Cosbench,
    Sibench,
}

#[derive(Clone, Copy, ValueEnum)]
enum RunKind {
    Time,
    Ops,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, value_enum)]
    protocol: ProtocolKind,
    #[arg(long, value_enum)]
    backend: BackendKind,
    #[arg(long, value_enum)]
    runtype: RunKind,

    /// Free text stored with every result
    description: String,
    /// Gateways, monitors, a block device or a directory, depending on protocol
    #[arg(required = true)]
    targets: Vec<String>,

    /// Object size, e.g. 4M (sweepable)
    #[arg(short = 's', long = "size", default_value = DEFAULT_OBJECT_SIZE)]
    size: String,
    /// Number of objects (sweepable)
    #[arg(short = 'c', long = "count", default_value = DEFAULT_OBJECT_COUNT)]
    count: String,
    /// Seconds of measured run time (sweepable)
    #[arg(short = 'r', long = "run-time", default_value = DEFAULT_RUN_TIME)]
    run_time: String,
    /// Seconds of ramp up (sweepable)
    #[arg(short = 'u', long = "ramp-up", default_value = DEFAULT_RAMP_UP)]
    ramp_up: String,
    /// Seconds of ramp down (sweepable)
    #[arg(short = 'd', long = "ramp-down", default_value = DEFAULT_RAMP_DOWN)]
    ramp_down: String,
    /// Read percentage, 0 for separate write and read passes (sweepable)
    #[arg(short = 'x', long = "mix", default_value = DEFAULT_READ_WRITE_MIX)]
    mix: String,
    /// Operations per stage for ops runs (sweepable)
    #[arg(long, default_value = DEFAULT_COSBENCH_OP_COUNT)]
    op_count: String,

    /// Total cosbench workers (sweepable)
    #[arg(long, default_value = DEFAULT_COSBENCH_WORKERS)]
    cosbench_workers: String,
    #[arg(long, default_value = DEFAULT_COSBENCH_JOB_FILE)]
    cosbench_job_file: PathBuf,
    /// Delete the S3 bucket once the job is done
    #[arg(long)]
    cosbench_dispose_bucket: bool,

    #[arg(long, value_delimiter = ',', default_value = DEFAULT_SIBENCH_SERVERS)]
    sibench_servers: Vec<String>,
    #[arg(long, default_value_t = DEFAULT_SIBENCH_PORT)]
    sibench_port: u16,
    /// Bandwidth limit in bits/s with K, M or G suffix, 0 for none (sweepable)
    #[arg(long, default_value = DEFAULT_SIBENCH_BANDWIDTH)]
    sibench_bandwidth: String,
    /// Workers per server as a multiple of its cores (sweepable)
    #[arg(long, default_value = DEFAULT_SIBENCH_WORKER_FACTOR)]
    sibench_workers: String,
    #[arg(long)]
    sibench_skip_read_verification: bool,

    #[arg(long, default_value = DEFAULT_S3_CREDENTIALS)]
    s3_credentials: PathBuf,
    #[arg(long, default_value_t = DEFAULT_S3_PORT)]
    s3_port: u16,
    #[arg(long, default_value = DEFAULT_S3_BUCKET)]
    s3_bucket: String,

    #[arg(long, default_value = DEFAULT_CEPH_POOL)]
    ceph_pool: String,
    /// Separate data pool for rbd images
    #[arg(long)]
    ceph_datapool: Option<String>,
    #[arg(long, default_value = DEFAULT_CEPH_USER)]
    ceph_user: String,
    /// Ceph key; fetched from the first monitor when not given
    #[arg(long, env = "BENCHMASTER_CEPH_KEY", hide_env_values = true)]
    ceph_key: Option<String>,
    #[arg(long, default_value = DEFAULT_CEPH_DIR)]
    ceph_dir: String,
    #[command(flatten)]
    remote: RemoteArgs,

    /// Print the expanded runs as JSON and exit
    #[arg(long)]
    dry_run: bool,
    /// Append results to this TSV file
    #[arg(long)]
    results_tsv: Option<PathBuf>,
}

fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("benchmaster={}", level)));
    fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => ToolConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ToolConfig::default(),
    };

    match cli.command {
        Commands::Run(args) => run_cmd(&config, args),
        Commands::S3AddUser {
            name,
            gateway,
            s3_credentials,
            remote,
        } => s3_add_user_cmd(&name, &gateway, &s3_credentials, &remote),
        Commands::FetchKey { monitor, remote } => {
            println!("{}", fetch_key(&monitor, &remote)?);
            Ok(())
        }
        Commands::Columns => {
            for column in COLUMNS {
                println!("{}", column);
            }
            Ok(())
        }
    }
}

fn run_cmd(config: &ToolConfig, args: RunArgs) -> Result<()> {
    let spec = build_spec(&args)?;

    if args.dry_run {
        let runs = spec.expand().context("Invalid run specification")?;
        println!("{}", serde_json::to_string_pretty(&runs)?);
        eprintln!("{} run(s)", runs.len());
        return Ok(());
    }

    let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(ConsoleSink::stdout())];
    if let Some(path) = args.results_tsv.as_ref().or(config.results_tsv.as_ref()) {
        info!("Appending results to {}", path.display());
        sinks.push(Box::new(TsvSink::new(path)));
    }

    let runner = SystemRunner;
    let sleeper = ThreadSleeper;
    let executor = Executor::new(BackendContext::new(config, &runner, &sleeper));
    let count = executor
        .run_sweep(&spec, &mut sinks)
        .context("Benchmark failed")?;

    info!("Completed {} run(s)", count);
    Ok(())
}

fn build_spec(args: &RunArgs) -> Result<RunSpecification> {
    let runtype = match args.runtype {
        RunKind::Time => RunType::time(
            args.run_time.as_str(),
            args.ramp_up.as_str(),
            args.ramp_down.as_str(),
        ),
        RunKind::Ops => RunType::ops(args.op_count.as_str()),
    };

    let backend = match args.backend {
        BackendKind::Cosbench => {
            let mut cosbench =
                CosbenchSpec::new(args.cosbench_workers.as_str(), &args.cosbench_job_file);
            cosbench.dispose_bucket = args.cosbench_dispose_bucket;
            BackendAdapter::Cosbench(cosbench)
        }
        BackendKind::Sibench => BackendAdapter::Sibench(SibenchSpec {
            port: args.sibench_port,
            servers: args.sibench_servers.clone(),
            bandwidth_limit: Axis::new(args.sibench_bandwidth.as_str()),
            worker_factor: Axis::new(args.sibench_workers.as_str()),
            skip_read_verification: args.sibench_skip_read_verification,
        }),
    };

    Ok(RunSpecification {
        runtype,
        backend,
        protocol: build_protocol(args)?,
        object_size: Axis::new(args.size.as_str()),
        object_count: Axis::new(args.count.as_str()),
        read_write_mix: Axis::new(args.mix.as_str()),
        description: args.description.clone(),
    })
}

fn build_protocol(args: &RunArgs) -> Result<ProtocolAdapter> {
    let targets = args.targets.clone();

    let protocol = match args.protocol {
        ProtocolKind::S3 => {
            let keys = s3_keys(args)?;
            ProtocolAdapter::S3 {
                access_key: keys.access_key,
                secret_key: keys.secret_key,
                port: args.s3_port,
                bucket: args.s3_bucket.clone(),
                targets,
            }
        }
        ProtocolKind::Rados => {
            let (user, key) = ceph_credentials(args)?;
            ProtocolAdapter::Rados {
                user,
                key,
                pool: args.ceph_pool.clone(),
                targets,
            }
        }
        ProtocolKind::Rbd => {
            let (user, key) = ceph_credentials(args)?;
            ProtocolAdapter::Rbd {
                user,
                key,
                pool: args.ceph_pool.clone(),
                datapool: args.ceph_datapool.clone(),
                targets,
            }
        }
        ProtocolKind::Cephfs => {
            let (user, key) = ceph_credentials(args)?;
            ProtocolAdapter::CephFs {
                user,
                key,
                subdir: args.ceph_dir.clone(),
                targets,
            }
        }
        ProtocolKind::Block => ProtocolAdapter::Block {
            device: single_target(args)?,
        },
        ProtocolKind::File => ProtocolAdapter::File {
            directory: single_target(args)?,
        },
    };
    Ok(protocol)
}

fn single_target(args: &RunArgs) -> Result<String> {
    match args.targets.as_slice() {
        [target] => Ok(target.clone()),
        [first, ..] => {
            warn!("Only the first target ({}) is used for local protocols", first);
            Ok(first.clone())
        }
        [] => bail!("No target given"),
    }
}

fn s3_keys(args: &RunArgs) -> Result<S3Keys> {
    match S3Keys::load(&args.s3_credentials) {
        Ok(keys) => Ok(keys),
        // Secrets are never printed, so a dry run can go without them
        Err(e) if args.dry_run => {
            warn!("Unable to read S3 keys ({}); continuing dry run without them", e);
            Ok(S3Keys {
                access_key: String::new(),
                secret_key: String::new(),
            })
        }
        Err(e) => Err(e).with_context(|| {
            format!("Unable to read keys from {}", args.s3_credentials.display())
        }),
    }
}

/// `(user, key)` for the ceph protocols. A key fetched from a monitor is
/// always the admin keyring's, so `--ceph-user` only applies with `--ceph-key`.
fn ceph_credentials(args: &RunArgs) -> Result<(String, String)> {
    if let Some(key) = &args.ceph_key {
        return Ok((args.ceph_user.clone(), key.clone()));
    }
    if args.ceph_user != DEFAULT_CEPH_USER {
        warn!(
            "Ignoring --ceph-user {}: the fetched key belongs to {}",
            args.ceph_user, DEFAULT_CEPH_USER
        );
    }
    let key = if args.dry_run {
        String::new()
    } else {
        let monitor = args
            .targets
            .first()
            .context("No monitor to fetch the ceph key from")?;
        fetch_key(monitor, &args.remote)?
    };
    Ok((DEFAULT_CEPH_USER.to_string(), key))
}

fn fetch_key(monitor: &str, remote: &RemoteArgs) -> Result<String> {
    let shell = RemoteShell::connect(monitor, "root", &remote.ceph_root_password, SSH_TIMEOUT)
        .with_context(|| format!("Failed to connect to {}", monitor))?;
    let key = credentials::fetch_ceph_key(&shell)?;
    info!("Found ceph key on {}", monitor);
    Ok(key)
}

fn s3_add_user_cmd(name: &str, gateway: &str, keyfile: &Path, remote: &RemoteArgs) -> Result<()> {
    println!(
        "Adding user {} on rados gateway {} and storing keys in {}",
        name,
        gateway,
        keyfile.display()
    );
    let shell = RemoteShell::connect(gateway, "root", &remote.ceph_root_password, SSH_TIMEOUT)
        .with_context(|| format!("Failed to connect to {}", gateway))?;
    let keys = credentials::add_s3_user(&shell, name)?;
    keys.save(keyfile)
        .with_context(|| format!("Unable to write keys to {}", keyfile.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec![
            "benchmaster",
            "run",
            "--protocol",
            "rados",
            "--backend",
            "sibench",
            "--runtype",
            "time",
            "--dry-run",
            "--ceph-user",
            "bench",
        ];
        argv.extend_from_slice(extra);
        argv.extend_from_slice(&["rados test", "mon1"]);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            _ => panic!("expected the run command"),
        }
    }

    #[test]
    fn test_explicit_key_keeps_ceph_user() {
        let args = run_args(&["--ceph-key", "AQD=="]);
        let (user, key) = ceph_credentials(&args).unwrap();
        assert_eq!((user.as_str(), key.as_str()), ("bench", "AQD=="));
    }

    #[test]
    fn test_fetched_key_is_admin() {
        let mut args = run_args(&[]);
        args.ceph_key = None;
        let (user, _) = ceph_credentials(&args).unwrap();
        assert_eq!(user, "admin");

        match build_protocol(&args).unwrap() {
            ProtocolAdapter::Rados { user, .. } => assert_eq!(user, "admin"),
            other => panic!("unexpected protocol {:?}", other),
        }
    }
}
