//! Traits for metric inputs.

use crate::error::Result;
use crate::metrics::sink::MetricSink;
use std::sync::Arc;

/// A source of metrics the agent polls once per collection cycle.
///
/// This mirrors the shape of an agent input plugin: a human description, an
/// example configuration, and a `gather` call that writes into a sink.
pub trait Input {
    /// One-line description of the input.
    fn description(&self) -> &'static str;

    /// Example configuration for the input.
    fn sample_config(&self) -> &'static str;

    /// Run one collection cycle, writing metrics into `sink`.
    fn gather(
        &self,
        sink: Arc<dyn MetricSink>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
