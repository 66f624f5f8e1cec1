//! Local pipeline runner.
//!
//! Plays the host role for in-memory runs: sorts each stage's output by
//! key before a grouping stage and cuts sorted input into partitions that
//! can be reduced independently.
//!
//! ```text
//! raw ─▶ validate ─▶ sort ─▶ fuse ─▶ map ─▶ sort ─▶ reduce ─▶ results
//! ```

use citypulse_common::config::PipelineDefaults;
use citypulse_telemetry_model::stats::ZoneStatsResult;
use citypulse_telemetry_model::wire::line_key;
use citypulse_telemetry_model::zone::ZoneTable;
use serde::Serialize;

use crate::fusion::StreamFusion;
use crate::noise::{AmbientNoiseSource, RngNoise};
use crate::stage_stats::StageStats;
use crate::validator::RecordValidator;
use crate::zone_mapper::ZoneMapper;
use crate::zone_reducer::ZoneReducer;

/// Stable sort by the text before the first tab.
pub fn sort_by_key(lines: &mut [String]) {
    lines.sort_by(|a, b| line_key(a).cmp(line_key(b)));
}

/// Split sorted lines into at most `workers` contiguous partitions.
///
/// Partitions aim at `ceil(len / workers)` lines; a cut moves forward until
/// the key changes, so every key lands in exactly one partition.
pub fn partition_sorted(lines: Vec<String>, workers: usize) -> Vec<Vec<String>> {
    let workers = workers.max(1);
    let target = lines.len().div_ceil(workers).max(1);

    let mut partitions = Vec::with_capacity(workers);
    let mut current: Vec<String> = Vec::with_capacity(target);
    for line in lines {
        let cut = current.len() >= target
            && partitions.len() + 1 < workers
            && current
                .last()
                .is_some_and(|prev| line_key(prev) != line_key(&line));
        if cut {
            partitions.push(std::mem::take(&mut current));
        }
        current.push(line);
    }
    if !current.is_empty() {
        partitions.push(current);
    }
    partitions
}

/// Counters of every stage of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub validation: StageStats,
    pub fusion: StageStats,
    pub mapping: StageStats,
    pub reduction: StageStats,
}

impl PipelineReport {
    pub fn log_summary(&self) {
        self.validation.log_summary("validate");
        self.fusion.log_summary("fuse");
        self.mapping.log_summary("map");
        self.reduction.log_summary("reduce");
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub results: Vec<ZoneStatsResult>,
    pub report: PipelineReport,
}

/// Stage settings for a local run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    zones: ZoneTable,
    noise_seed: Option<u64>,
}

impl Pipeline {
    pub fn new(zones: ZoneTable, noise_seed: Option<u64>) -> Self {
        Self { zones, noise_seed }
    }

    pub fn from_config(config: &PipelineDefaults) -> Self {
        Self::new(config.zone_table(), config.noise_seed)
    }

    /// Override the configured seed (e.g. from a command-line flag).
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if seed.is_some() {
            self.noise_seed = seed;
        }
        self
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    pub fn noise_source(&self) -> RngNoise<rand::rngs::StdRng> {
        RngNoise::from_seed_option(self.noise_seed)
    }

    /// Validate raw lines with this pipeline's noise source.
    pub fn validate_all(&self, lines: impl IntoIterator<Item = String>) -> (Vec<String>, StageStats) {
        validate_with(lines, self.noise_source())
    }

    /// Fuse one key-sorted partition.
    pub fn fuse_partition(lines: Vec<String>) -> (Vec<String>, StageStats) {
        let mut fusion = StreamFusion::new(lines.into_iter());
        let out: Vec<String> = fusion.by_ref().collect();
        (out, fusion.stats().clone())
    }

    /// Map fused lines to zone samples.
    pub fn map_all(&self, lines: impl IntoIterator<Item = String>) -> (Vec<String>, StageStats) {
        let mut mapper = ZoneMapper::new(lines.into_iter(), &self.zones);
        let out: Vec<String> = mapper.by_ref().collect();
        (out, mapper.stats().clone())
    }

    /// Reduce one key-sorted partition.
    pub fn reduce_partition(lines: Vec<String>) -> (Vec<ZoneStatsResult>, StageStats) {
        let mut reducer = ZoneReducer::new(lines.into_iter());
        let out: Vec<ZoneStatsResult> = reducer.by_ref().collect();
        (out, reducer.stats().clone())
    }

    /// Run every stage in order on a single thread.
    pub fn run(&self, raw: Vec<String>) -> PipelineOutput {
        let mut report = PipelineReport::default();

        let (mut validated, stats) = self.validate_all(raw);
        report.validation = stats;
        sort_by_key(&mut validated);

        let (fused, stats) = Self::fuse_partition(validated);
        report.fusion = stats;

        let (mut mapped, stats) = self.map_all(fused);
        report.mapping = stats;
        sort_by_key(&mut mapped);

        let (results, stats) = Self::reduce_partition(mapped);
        report.reduction = stats;

        tracing::debug!(results = results.len(), "pipeline run complete");
        PipelineOutput { results, report }
    }
}

/// Validate raw lines with an explicit noise source.
pub fn validate_with<N: AmbientNoiseSource>(
    lines: impl IntoIterator<Item = String>,
    noise: N,
) -> (Vec<String>, StageStats) {
    let mut validator = RecordValidator::new(lines.into_iter(), noise);
    let out: Vec<String> = validator.by_ref().collect();
    (out, validator.stats().clone())
}
