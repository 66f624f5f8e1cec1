//! Run the whole pipeline over one input file.

use std::io::Write;
use std::path::PathBuf;

use citypulse_common::config::AppConfig;
use citypulse_processing_core::pipeline::{partition_sorted, sort_by_key, Pipeline};
use citypulse_processing_core::{PipelineOutput, PipelineReport, StageStats};
use citypulse_telemetry_model::stats::serialize_results;

use super::io::{open_output, InputLines};

pub async fn run(
    config: &AppConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    workers: Option<usize>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let mut lines = InputLines::open(Some(input.as_path()))?;
    let raw: Vec<String> = lines.by_ref().collect();
    let mut undecodable = StageStats::default();
    lines.count_invalid(&mut undecodable);
    lines.finish()?;

    let pipeline = Pipeline::from_config(&config.pipeline).with_seed(seed);
    let workers = workers.unwrap_or(config.pipeline.workers).max(1);
    tracing::info!(records = raw.len(), workers, "starting pipeline run");

    let mut output_data = if workers == 1 {
        pipeline.run(raw)
    } else {
        run_partitioned(&pipeline, raw, workers).await?
    };
    output_data.report.validation.merge(&undecodable);
    output_data.report.log_summary();

    let jsonl = serialize_results(&output_data.results)
        .map_err(|e| anyhow::anyhow!("Failed to serialize results: {e}"))?;
    let mut out = open_output(output.as_deref())?;
    out.write_all(jsonl.as_bytes())?;
    out.flush()?;

    let report = serde_json::to_string_pretty(&output_data.report)?;
    eprintln!("{report}");
    Ok(())
}

/// Validation and mapping run inline; fusion and reduction run one
/// blocking task per key-disjoint partition.
async fn run_partitioned(
    pipeline: &Pipeline,
    raw: Vec<String>,
    workers: usize,
) -> anyhow::Result<PipelineOutput> {
    let mut report = PipelineReport::default();

    let (mut validated, stats) = pipeline.validate_all(raw);
    report.validation = stats;
    sort_by_key(&mut validated);

    let (fused, stats) =
        run_partitions(partition_sorted(validated, workers), Pipeline::fuse_partition).await?;
    report.fusion = stats;

    let (mut mapped, stats) = pipeline.map_all(fused);
    report.mapping = stats;
    sort_by_key(&mut mapped);

    let (results, stats) =
        run_partitions(partition_sorted(mapped, workers), Pipeline::reduce_partition).await?;
    report.reduction = stats;

    Ok(PipelineOutput { results, report })
}

/// Run `stage` on every partition and concatenate outputs in partition order.
async fn run_partitions<T, F>(
    partitions: Vec<Vec<String>>,
    stage: F,
) -> anyhow::Result<(Vec<T>, StageStats)>
where
    T: Send + 'static,
    F: Fn(Vec<String>) -> (Vec<T>, StageStats) + Copy + Send + 'static,
{
    let handles: Vec<_> = partitions
        .into_iter()
        .map(|part| tokio::task::spawn_blocking(move || stage(part)))
        .collect();

    let mut outputs = Vec::new();
    let mut stats = StageStats::default();
    for (index, handle) in handles.into_iter().enumerate() {
        let (part_output, part_stats) = handle
            .await
            .map_err(|e| anyhow::anyhow!("Partition worker {index} failed: {e}"))?;
        tracing::debug!(partition = index, records_out = part_stats.records_out, "partition done");
        outputs.extend(part_output);
        stats.merge(&part_stats);
    }
    Ok((outputs, stats))
}
