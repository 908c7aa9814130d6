//! Metric data, sinks and the exec collector.
//!
//! This module holds the metric record produced by parsers, the sink trait
//! gathered metrics are written into, and the collector that fans the
//! configured commands out across concurrent tasks.

pub mod collector;
pub mod data;
pub mod sink;
pub mod traits;

// Re-export commonly used items
pub use collector::ExecCollector;
pub use data::{CycleReport, FieldValue, Fields, Metric, Tags};
pub use sink::{Accumulator, MetricSink};
pub use traits::Input;
