use anyhow::Context as _;
use chainprobe_domain::{CliOverrides, Config};
use chainprobe_infrastructure::ChainValidator;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

mod runner;

#[derive(Parser)]
#[command(name = "chainprobe")]
#[command(version)]
#[command(about = "Probes DNSSEC chains of trust from the root anchor down, in bulk")]
struct Cli {
    /// Domain list to probe: one domain per line, `rank,domain` rows accepted
    input: Option<PathBuf>,

    /// Validate the given domains and print reports instead of reading a list
    #[arg(long, value_name = "DOMAIN", num_args = 1..)]
    test: Option<Vec<String>>,

    /// Output path for the JSON-Lines results
    #[arg(short, long, default_value = "out.jsonl")]
    output: PathBuf,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Concurrent chain validations
    #[arg(short, long)]
    workers: Option<usize>,

    /// Recursive resolver IP
    #[arg(long)]
    resolver: Option<String>,

    /// Root server IP used for the trust-anchor bootstrap
    #[arg(long)]
    root_server: Option<String>,

    /// Per-query timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        resolver: cli.resolver.clone(),
        root_server: cli.root_server.clone(),
        timeout_secs: cli.timeout,
        workers: cli.workers,
        log_level: cli.log_level.clone(),
    };
    let config = Config::load(cli.config.as_deref(), overrides)?;
    config.validate()?;

    let log_level = config.logging.level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_max_level(log_level)
        .init();

    info!(
        resolver = %config.probe.resolver,
        root_server = %config.probe.root_server,
        timeout_secs = config.probe.timeout_secs,
        workers = config.probe.workers,
        "configuration loaded"
    );

    let validator = Arc::new(ChainValidator::new(&config.probe)?);

    // Nothing can validate without the root: bootstrap failure is fatal.
    if let Err(e) = validator.validate_root_zone().await {
        error!(error = %e, "root zone bootstrap failed");
        return Err(e.into());
    }

    if let Some(domains) = cli.test {
        for domain in domains {
            info!(domain = %domain, "checking");
            let report = validator.validate_chain(&domain).await;
            println!("{}", report);
        }
        return Ok(());
    }

    let input = cli
        .input
        .context("either an input list or --test domains are required")?;
    runner::run(validator, &input, &cli.output, config.probe.workers).await
}
