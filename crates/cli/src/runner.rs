//! The batch runner: feeds the input list through a fixed-size pool of
//! concurrent chain validations and appends one JSON line per finished
//! domain. Results are written in completion order and flushed per line, so
//! an interrupted run keeps everything finished so far.

use anyhow::Context as _;
use chainprobe_infrastructure::ChainValidator;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn run(
    validator: Arc<ChainValidator>,
    input: &Path,
    output: &Path,
    workers: usize,
) -> anyhow::Result<()> {
    let domains = read_domains(input)?;
    info!(domains = domains.len(), workers, "starting probe run");

    let out_file = File::create(output)
        .with_context(|| format!("cannot create output file {}", output.display()))?;
    let mut writer = BufWriter::new(out_file);

    let progress = ProgressBar::new(domains.len() as u64);
    let mut state_counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut completed: u64 = 0;

    let mut results = stream::iter(domains.into_iter().map(|domain| {
        let validator = validator.clone();
        async move { validator.validate_chain(&domain).await }
    }))
    .buffer_unordered(workers);

    while let Some(report) = results.next().await {
        *state_counts
            .entry(report.validation_state.as_str())
            .or_insert(0) += 1;

        let line = serde_json::to_string(&report)?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;

        completed += 1;
        progress.inc(1);
        if completed % 1000 == 0 {
            info!(completed, states = ?state_counts, "progress");
        }
    }
    progress.finish();

    let stats = validator.context().stats();
    info!(
        existing_zones = stats.existing_zones,
        nonexisting_zones = stats.nonexisting_zones,
        validated_zones = stats.validated_zones,
        insecure_delegations = stats.insecure_delegations,
        "cache state at end of run"
    );
    info!(states = ?state_counts, completed, "probe run finished");

    Ok(())
}

/// One domain per line. Tranco-style `rank,domain` rows are accepted; the
/// last comma-separated field wins. Blank lines and `#` comments skipped.
fn read_domains(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("cannot open input list {}", path.display()))?;

    let mut domains = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let domain = trimmed.rsplit(',').next().unwrap_or(trimmed).trim();
        if !domain.is_empty() {
            domains.push(domain.to_string());
        }
    }
    Ok(domains)
}
