//! Export zone results as analytics batches.

use std::path::PathBuf;

use citypulse_common::config::AppConfig;
use citypulse_results_store::export::export_results;
use citypulse_results_store::{ResultsStore, ZoneIdMap};

pub fn run(
    config: &AppConfig,
    results: PathBuf,
    out_dir: PathBuf,
    batch_size: Option<usize>,
    zone_ids: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = ResultsStore::load(&results)
        .map_err(|e| anyhow::anyhow!("Failed to load results: {e}"))?;

    let fallback = config.pipeline.fallback_zone.as_str();
    let ids = match zone_ids {
        Some(path) => ZoneIdMap::load(&path, fallback)
            .map_err(|e| anyhow::anyhow!("Failed to load zone ids: {e}"))?,
        None => ZoneIdMap::sequential(
            config.pipeline.zones.iter().map(|z| z.name.as_str()),
            fallback,
        ),
    };

    let batch_size = batch_size.unwrap_or(config.export.batch_size);
    let report = export_results(store.results(), &ids, &out_dir, batch_size)
        .map_err(|e| anyhow::anyhow!("Export failed: {e}"))?;

    println!("Exported {} rows in {} batch(es) to {}", report.rows, report.batches.len(), out_dir.display());
    if report.skipped > 0 {
        println!("  {} result(s) skipped: no zone id", report.skipped);
    }
    if store.skipped() > 0 {
        println!("  {} unreadable result line(s) ignored", store.skipped());
    }
    Ok(())
}
