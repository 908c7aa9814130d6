//! exec_gather - command output metrics collector binary
//!
//! Runs the configured commands once and prints the metrics, or collects on
//! an interval and serves the latest cycle over HTTP.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use exec_gather::{
    start_web_server, Accumulator, ExecCollector, ExecConfig, Input, WebConfig,
    DEFAULT_WEB_PORT, SAMPLE_CONFIG,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "exec_gather")]
#[command(about = "Collect metrics from the output of external commands")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Runs commands concurrently, parses their standard output as json, influx or graphite data and reports metrics")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Command to run (repeatable); replaces the configured commands
    #[arg(short = 'c', long = "command", global = true)]
    commands: Vec<String>,

    /// Data format of the command output: json, influx or graphite
    #[arg(long, global = true)]
    data_format: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one collection cycle and print the metrics (default)
    Once(OnceArgs),

    /// Collect on an interval and serve the latest cycle over HTTP
    Serve(ServeArgs),

    /// Print an example configuration file
    SampleConfig,
}

#[derive(Args)]
struct OnceArgs {
    /// Output format: influx or json
    #[arg(short, long, default_value = "influx")]
    output: String,
}

#[derive(Args)]
struct ServeArgs {
    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Collection interval in milliseconds (defaults to the configured interval)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::SampleConfig) => {
            println!("{}", SAMPLE_CONFIG.trim());
        }
        Some(Commands::Serve(args)) => {
            serve_command(&cli, args).await?;
        }
        Some(Commands::Once(args)) => {
            once_command(&cli, args).await?;
        }
        None => {
            let args = OnceArgs {
                output: "influx".to_string(),
            };
            once_command(&cli, &args).await?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing::subscriber::set_global_default(build_subscriber(cli, &directives))?;

    Ok(())
}

/// `--debug`/`--verbose` pick the default level; `RUST_LOG` directives
/// refine it.
fn build_subscriber(cli: &Cli, directives: &str) -> impl Subscriber + Send + Sync + 'static {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives);

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish()
}

/// Merge the configuration file with command line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<ExecConfig> {
    let mut config = match &cli.config {
        Some(path) => ExecConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => ExecConfig::default(),
    };

    if !cli.commands.is_empty() {
        config = config.with_commands(cli.commands.iter().cloned());
    }
    if let Some(format) = &cli.data_format {
        config = config.with_data_format(format.clone());
    }

    Ok(config)
}

async fn once_command(cli: &Cli, args: &OnceArgs) -> anyhow::Result<()> {
    let collector = ExecCollector::new(load_config(cli)?);
    info!("{}", collector.description());
    info!("Running {} commands", collector.commands().len());

    let acc = Arc::new(Accumulator::new());
    // Metrics from successful commands are printed even when the cycle fails.
    let outcome = Input::gather(&collector, acc.clone()).await;
    let metrics = acc.drain();

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&metrics)?),
        "influx" => {
            for metric in &metrics {
                println!("{}", metric);
            }
        }
        other => anyhow::bail!("Unsupported output format: {}. Use 'influx' or 'json'", other),
    }

    outcome.context("collection cycle failed")
}

async fn serve_command(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let interval = args.interval.unwrap_or(config.interval_ms);

    let collector = Arc::new(ExecCollector::new(config));
    info!(
        "Collecting from {} commands every {}ms as {}",
        collector.commands().len(),
        interval,
        collector.config().data_format
    );

    let web_config = WebConfig::new(&args.host, args.port).with_cors(!args.no_cors);
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);

    let stream = collector.start_stream(interval);
    start_web_server(web_config, stream).await?;

    Ok(())
}
