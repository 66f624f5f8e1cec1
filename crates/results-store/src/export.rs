//! Analytics export: flat rows written as numbered JSON batches.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use citypulse_common::error::{CitypulseError, CitypulseResult};
use citypulse_telemetry_model::record::Timestamp;
use citypulse_telemetry_model::stats::{
    CongestionLevel, NoiseLevel, PollutionLevel, ZoneStatsResult,
};
use serde::{Deserialize, Serialize};

/// Zone name → analytics id, with a fallback zone for unknown names.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneIdMap {
    ids: BTreeMap<String, i64>,
    fallback: String,
}

impl ZoneIdMap {
    pub fn new(ids: BTreeMap<String, i64>, fallback: impl Into<String>) -> Self {
        Self {
            ids,
            fallback: fallback.into(),
        }
    }

    /// Number zones from 1 in the given order, fallback zone last.
    pub fn sequential<'a>(names: impl IntoIterator<Item = &'a str>, fallback: &'a str) -> Self {
        let mut ids = BTreeMap::new();
        for name in names.into_iter().chain(std::iter::once(fallback)) {
            let next = ids.len() as i64 + 1;
            ids.entry(name.to_string()).or_insert(next);
        }
        Self::new(ids, fallback)
    }

    /// Read a JSON object of `{"zone name": id}`.
    pub fn load(path: &Path, fallback: &str) -> CitypulseResult<Self> {
        if !path.exists() {
            return Err(CitypulseError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let ids: BTreeMap<String, i64> = serde_json::from_str(&content).map_err(|e| {
            CitypulseError::export(format!("zone id map {}: {e}", path.display()))
        })?;
        Ok(Self::new(ids, fallback))
    }

    /// Id for `zone`, else the fallback zone's id.
    pub fn resolve(&self, zone: &str) -> Option<i64> {
        self.ids
            .get(zone)
            .or_else(|| self.ids.get(&self.fallback))
            .copied()
    }
}

/// One row of the analytics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRow {
    pub zone_id: i64,
    pub timestamp: Timestamp,
    pub avg_speed: f64,
    pub avg_co2: f64,
    pub avg_noise: f64,
    pub congestion_level: CongestionLevel,
    pub pollution_level: PollutionLevel,
    pub noise_level: NoiseLevel,
    pub vehicle_count: u64,
    pub avg_co: f64,
    pub avg_nox: f64,
    pub avg_pmx: f64,
}

impl AnalyticsRow {
    pub fn from_result(result: &ZoneStatsResult, zone_id: i64) -> Self {
        let s = &result.stats;
        Self {
            zone_id,
            timestamp: result.timestamp,
            avg_speed: s.avg_speed_kmh,
            avg_co2: s.avg_co2,
            avg_noise: s.avg_noise_db,
            congestion_level: s.congestion_level,
            pollution_level: s.pollution_level,
            noise_level: s.noise_level,
            vehicle_count: s.vehicle_count,
            avg_co: s.avg_co,
            avg_nox: s.avg_nox,
            avg_pmx: s.avg_pmx,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportReport {
    pub rows: usize,
    /// Results whose zone and fallback both had no id.
    pub skipped: usize,
    pub batches: Vec<PathBuf>,
}

/// Flatten results into rows. Returns the rows and the number skipped.
pub fn build_rows(results: &[ZoneStatsResult], ids: &ZoneIdMap) -> (Vec<AnalyticsRow>, usize) {
    let mut rows = Vec::with_capacity(results.len());
    let mut skipped = 0;
    for result in results {
        match ids.resolve(&result.zone) {
            Some(id) => rows.push(AnalyticsRow::from_result(result, id)),
            None => {
                tracing::debug!(zone = %result.zone, "no zone id; row skipped");
                skipped += 1;
            }
        }
    }
    (rows, skipped)
}

pub fn batch_file_name(index: usize) -> String {
    format!("batch-{:04}.json", index + 1)
}

fn is_batch_file(name: &str) -> bool {
    name.starts_with("batch-") && name.ends_with(".json")
}

/// Delete batch files left in `out_dir` by an earlier export.
fn remove_stale_batches(out_dir: &Path) -> CitypulseResult<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(out_dir)? {
        let entry = entry?;
        let is_stale = entry.file_type()?.is_file()
            && entry.file_name().to_str().is_some_and(is_batch_file);
        if is_stale {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Write rows as JSON arrays of at most `batch_size` rows each.
pub fn write_batches(
    rows: &[AnalyticsRow],
    out_dir: &Path,
    batch_size: usize,
) -> CitypulseResult<Vec<PathBuf>> {
    if batch_size == 0 {
        return Err(CitypulseError::export("batch size must be at least 1"));
    }
    std::fs::create_dir_all(out_dir)?;
    let removed = remove_stale_batches(out_dir)?;
    if removed > 0 {
        tracing::debug!(removed, out_dir = %out_dir.display(), "stale batches removed");
    }

    let total = rows.len().div_ceil(batch_size);
    let mut written = Vec::with_capacity(total);
    for (index, batch) in rows.chunks(batch_size).enumerate() {
        let path = out_dir.join(batch_file_name(index));
        let json = serde_json::to_string_pretty(batch)?;
        std::fs::write(&path, json)?;
        tracing::debug!(batch = index + 1, total, rows = batch.len(), "batch written");
        written.push(path);
    }
    Ok(written)
}

/// Build rows and write them in batches under `out_dir`.
pub fn export_results(
    results: &[ZoneStatsResult],
    ids: &ZoneIdMap,
    out_dir: &Path,
    batch_size: usize,
) -> CitypulseResult<ExportReport> {
    let (rows, skipped) = build_rows(results, ids);
    let batches = write_batches(&rows, out_dir, batch_size)?;
    tracing::info!(
        rows = rows.len(),
        skipped,
        batches = batches.len(),
        out_dir = %out_dir.display(),
        "analytics export complete"
    );
    Ok(ExportReport {
        rows: rows.len(),
        skipped,
        batches,
    })
}
