//! `gasp sync`.

use anyhow::{Context, Result};
use gasp_admanager::{HttpAdManagerClient, Pipeline, SyncReport, SyncSettings};
use gasp_config::secrets::resolve_secrets;
use gasp_rows::CsvRowSource;
use tracing::info;

use super::{load_config, resolve_rows_dir};

pub async fn run_sync(
    config_paths: Vec<String>,
    rows: Option<String>,
    report_path: Option<String>,
) -> Result<()> {
    let loaded = load_config(&config_paths)?;
    let settings = SyncSettings::from_config(&loaded)?;
    let secrets = resolve_secrets(&loaded.config_json, true)?;
    let client = HttpAdManagerClient::from_config(&loaded, &secrets)?;

    let rows_dir = resolve_rows_dir(rows, &loaded)?;
    let source = CsvRowSource::new(&rows_dir);

    info!(
        config_hash = %loaded.config_hash,
        rows = %rows_dir,
        base_url = client.base_url(),
        chunk_size = settings.chunk_size(),
        "sync starting"
    );

    let mut pipeline = Pipeline::new(client, settings);
    let report = pipeline.run(&source).await?;

    print_report(&loaded.config_hash, &report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report).context("serialize sync report")?;
        std::fs::write(&path, json).with_context(|| format!("write report: {path}"))?;
        println!("report_written=true path={}", path);
    }
    Ok(())
}

fn print_report(config_hash: &str, report: &SyncReport) {
    println!("run_id={}", report.run_id);
    println!("config_hash={}", config_hash);
    println!("started_at_utc={}", report.started_at_utc.to_rfc3339());
    for s in &report.stages {
        println!(
            "stage={} chunks={} desired={} existing={} created={}",
            s.stage, s.chunks, s.desired, s.existing, s.created
        );
    }
    println!(
        "remote_queries={} remote_creates={} cache_hits={}",
        report.remote.queries, report.remote.creates, report.remote.cache_hits
    );
}
