//! The exec collector: runs every configured command concurrently and feeds
//! the output through the configured parser into a sink.

use crate::config::{ExecConfig, SAMPLE_CONFIG};
use crate::error::{ExecError, Result};
use crate::metrics::{
    data::CycleReport,
    sink::{Accumulator, MetricSink},
    traits::Input,
};
use crate::parsers::{Parser, ParserRegistry};
use crate::runner::{CommandRunner, ShellRunner};
use futures_util::stream::{self, BoxStream};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, error, warn};

const DESCRIPTION: &str = "Read metrics from one or more commands that can output to stdout";

/// Collects metrics from the standard output of external commands.
///
/// The parser is built on first use and then shared by every cycle; each
/// cycle spawns one task per command and waits for all of them.
pub struct ExecCollector {
    config: ExecConfig,
    runner: Arc<dyn CommandRunner>,
    registry: Arc<ParserRegistry>,
    parser: OnceCell<Arc<dyn Parser>>,
}

impl ExecCollector {
    /// Create a collector that runs real processes and uses the built-in
    /// parser registry. The configuration is normalized here, once.
    pub fn new(config: ExecConfig) -> Self {
        Self {
            config: config.normalized(),
            runner: Arc::new(ShellRunner::new()),
            registry: ParserRegistry::builtin(),
            parser: OnceCell::new(),
        }
    }

    /// Replace the command runner.
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the parser registry.
    pub fn with_registry(mut self, registry: Arc<ParserRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// The normalized configuration.
    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    pub fn commands(&self) -> &[String] {
        &self.config.commands
    }

    /// The parser, building it on first call.
    ///
    /// A failed build leaves the cell empty, so the next cycle tries again.
    pub async fn parser(&self) -> Result<Arc<dyn Parser>> {
        self.parser
            .get_or_try_init(|| async {
                let parser = self.registry.build(&self.config.parser_config())?;
                debug!("Built {} parser", self.config.data_format);
                Ok::<_, ExecError>(parser)
            })
            .await
            .map(Arc::clone)
    }

    /// Run one collection cycle.
    ///
    /// Every command runs to completion even when others fail, and metrics
    /// from successful commands stay in `sink`. When one or more commands
    /// fail, the first failure to complete is returned and the rest are
    /// logged.
    pub async fn gather(&self, sink: Arc<dyn MetricSink>) -> Result<()> {
        let parser = self.parser().await?;

        let mut tasks = JoinSet::new();
        for command in &self.config.commands {
            tasks.spawn(process_command(
                command.clone(),
                Arc::clone(&self.runner),
                Arc::clone(&parser),
                Arc::clone(&sink),
                self.config.name_suffix.clone(),
            ));
        }

        let mut first_error = None;
        let mut suppressed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| Err(ExecError::task_error(e.to_string())));
            if let Err(err) = outcome {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    warn!("Additional command failure in cycle: {}", err);
                    suppressed += 1;
                }
            }
        }

        match first_error {
            Some(err) => {
                if suppressed > 0 {
                    warn!("{} further command errors suppressed this cycle", suppressed);
                }
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Run one cycle into a fresh accumulator and summarize it.
    pub async fn collect_report(&self) -> CycleReport {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let started = Instant::now();
        let acc = Arc::new(Accumulator::new());

        let outcome = self.gather(acc.clone()).await;
        if let Err(err) = &outcome {
            error!("Exec collection cycle failed: {}", err);
        }

        CycleReport {
            timestamp,
            duration_ms: started.elapsed().as_millis() as u64,
            commands: self.config.commands.len(),
            metrics: acc.drain(),
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Collect on a fixed interval, yielding one report per cycle.
    ///
    /// A failed cycle is reported and collection continues.
    pub fn start_stream(self: Arc<Self>, interval_ms: u64) -> BoxStream<'static, CycleReport> {
        let interval = time::interval(Duration::from_millis(interval_ms.max(1)));

        let stream = stream::unfold(
            (self, interval),
            |(collector, mut interval)| async move {
                interval.tick().await;
                let report = collector.collect_report().await;
                Some((report, (collector, interval)))
            },
        );

        Box::pin(stream)
    }
}

impl std::fmt::Debug for ExecCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCollector")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("parser_built", &self.parser.initialized())
            .finish()
    }
}

impl Input for ExecCollector {
    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn sample_config(&self) -> &'static str {
        SAMPLE_CONFIG
    }

    async fn gather(&self, sink: Arc<dyn MetricSink>) -> Result<()> {
        ExecCollector::gather(self, sink).await
    }
}

/// Body of one command task: run, parse, write.
async fn process_command(
    command: String,
    runner: Arc<dyn CommandRunner>,
    parser: Arc<dyn Parser>,
    sink: Arc<dyn MetricSink>,
    name_suffix: String,
) -> Result<()> {
    let out = runner.run(&command).await?;
    let metrics = parser.parse(&out)?;
    debug!("Command '{}' produced {} metrics", command, metrics.len());

    for metric in metrics {
        let name = format!("{}{}", metric.name(), name_suffix);
        sink.add_metric(
            &name,
            metric.fields().clone(),
            metric.tags().clone(),
            metric.timestamp(),
        );
    }
    Ok(())
}
