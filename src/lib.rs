//! # exec_gather - metrics from command output
//!
//! Runs a configured list of external commands concurrently on every
//! collection cycle, parses what they print to standard output and records
//! the resulting metrics in a shared sink.
//!
//! ## Features
//!
//! - **Concurrent collection**: one task per command, every task runs to completion
//! - **Pluggable formats**: `json`, `influx` line-protocol and `graphite`, selected by name
//! - **Extensible registry**: register additional data formats without touching the collector
//! - **Web API**: latest cycle exposed over HTTP
//! - **Library + Binary**: use as a crate or standalone application
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exec_gather::{Accumulator, ExecCollector, ExecConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExecConfig::new(["/usr/bin/mycollector --foo=bar"]).with_data_format("influx");
//!     let collector = ExecCollector::new(config);
//!
//!     let acc = Arc::new(Accumulator::new());
//!     collector.gather(acc.clone()).await?;
//!     for metric in acc.metrics() {
//!         println!("{}", metric);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod parsers;
pub mod runner;
pub mod web;

// Re-export public API
pub use config::{ExecConfig, SAMPLE_CONFIG};
pub use error::{ExecError, ExecutionCause, Result};
pub use metrics::{
    collector::ExecCollector,
    data::{CycleReport, FieldValue, Fields, Metric, Tags},
    sink::{Accumulator, MetricSink},
    traits::Input,
};
pub use parsers::{new_parser, Parser, ParserConfig, ParserRegistry};
pub use runner::{CommandRunner, ShellRunner};

pub use web::{start_web_server, WebConfig};

/// The default collection interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;

/// Data format used when none is configured
pub const DEFAULT_DATA_FORMAT: &str = "json";

/// Measurement name given to JSON output
pub const DEFAULT_METRIC_NAME: &str = "exec";
