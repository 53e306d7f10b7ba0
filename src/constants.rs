// src/constants.rs
//
// Central location for the defaults used throughout benchmaster.
// CLI defaults and tool locations live here so the config layer, the CLI and
// the tests all agree on them.

use std::time::Duration;

// =============================================================================
// External tool locations
// =============================================================================

/// Installation directory of Cosbench (contains `cli.sh` and `archive/`)
pub const DEFAULT_COSBENCH_DIR: &str = "/usr/share/cosbench";

/// Sub-directory of the Cosbench installation holding per-job results
pub const DEFAULT_COSBENCH_ARCHIVE_SUBDIR: &str = "archive";

/// Sibench binary, resolved through PATH unless configured
pub const DEFAULT_SIBENCH_BINARY: &str = "sibench";

/// JSON report sibench is asked to write
pub const DEFAULT_SIBENCH_REPORT: &str = "sibench.json";

// =============================================================================
// Job completion polling
// =============================================================================

/// Interval between checks of the Cosbench archive for a finished job
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Separator after which `cli.sh submit` prints the job id
pub const COSBENCH_ID_SEPARATOR: &str = ": ";

// =============================================================================
// Run specification defaults (CLI)
// =============================================================================

pub const DEFAULT_OBJECT_SIZE: &str = "1M";
pub const DEFAULT_OBJECT_COUNT: &str = "5000";
pub const DEFAULT_RUN_TIME: &str = "120";
pub const DEFAULT_RAMP_UP: &str = "20";
pub const DEFAULT_RAMP_DOWN: &str = "10";
pub const DEFAULT_READ_WRITE_MIX: &str = "0";

// =============================================================================
// Backend defaults
// =============================================================================

pub const DEFAULT_COSBENCH_OP_COUNT: &str = "1000";
pub const DEFAULT_COSBENCH_WORKERS: &str = "500";
pub const DEFAULT_COSBENCH_JOB_FILE: &str = "cosbench.xml";

/// Minimum objects per worker before Cosbench workers start contending for locks
pub const COSBENCH_MIN_OBJECTS_PER_WORKER: u64 = 10;

/// Cosbench containers are always created as `<prefix>1`
pub const COSBENCH_CONTAINER_COUNT: u32 = 1;

pub const DEFAULT_SIBENCH_SERVERS: &str = "localhost";
pub const DEFAULT_SIBENCH_PORT: u16 = 5150;
pub const DEFAULT_SIBENCH_BANDWIDTH: &str = "0";
pub const DEFAULT_SIBENCH_WORKER_FACTOR: &str = "1.0";

// =============================================================================
// Protocol defaults
// =============================================================================

pub const DEFAULT_S3_CREDENTIALS: &str = "s3creds.json";
pub const DEFAULT_S3_PORT: u16 = 7480;
pub const DEFAULT_S3_BUCKET: &str = "benchmark";
pub const DEFAULT_CEPH_POOL: &str = "benchmark";
pub const DEFAULT_CEPH_USER: &str = "admin";
pub const DEFAULT_CEPH_DIR: &str = "benchmark";
pub const DEFAULT_CEPH_ROOT_PASSWORD: &str = "linux";

// =============================================================================
// Remote access
// =============================================================================

pub const SSH_PORT: u16 = 22;
pub const SSH_TIMEOUT: Duration = Duration::from_secs(30);
pub const CEPH_ADMIN_KEYRING: &str = "/etc/ceph/ceph.client.admin.keyring";
