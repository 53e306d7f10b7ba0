// src/lib.rs

pub mod backend;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod poll;
pub mod process;
pub mod protocol;
pub mod report;
pub mod result;
pub mod spec;
pub mod ssh;
pub mod sweep;

pub use backend::{BackendAdapter, BackendContext, CosbenchSpec, SibenchSpec};
pub use config::ToolConfig;
pub use error::{BenchError, ErrorKind, Result};
pub use executor::Executor;
pub use protocol::ProtocolAdapter;
pub use report::{ConsoleSink, ReportSink, TsvSink};
pub use result::{DirectionResult, RunResult, COLUMNS};
pub use spec::{RunSpecification, RunType};
pub use sweep::Axis;
