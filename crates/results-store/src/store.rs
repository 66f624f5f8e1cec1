//! Zone results loaded from reducer output.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::Utc;
use citypulse_common::config::AlertThresholds;
use citypulse_common::error::{CitypulseError, CitypulseResult};
use citypulse_telemetry_model::record::Timestamp;
use citypulse_telemetry_model::stats::ZoneStatsResult;

use crate::alerts::{evaluate, Alert};
use crate::summary::DashboardSummary;

/// Results ordered by `(timestamp, zone)`.
#[derive(Debug, Clone, Default)]
pub struct ResultsStore {
    results: Vec<ZoneStatsResult>,
    skipped: usize,
}

impl ResultsStore {
    pub fn new(mut results: Vec<ZoneStatsResult>) -> Self {
        results.sort_by(|a, b| (a.timestamp, &a.zone).cmp(&(b.timestamp, &b.zone)));
        Self {
            results,
            skipped: 0,
        }
    }

    /// Parse JSON lines, skipping (and counting) lines that do not parse.
    pub fn from_jsonl(content: &str) -> Self {
        let mut results = Vec::new();
        let mut skipped = 0;
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ZoneStatsResult>(line) {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::debug!(line = index + 1, error = %e, "skipping result line");
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, "some result lines could not be parsed");
        }

        let mut store = Self::new(results);
        store.skipped = skipped;
        store
    }

    pub fn load(path: &Path) -> CitypulseResult<Self> {
        if !path.exists() {
            return Err(CitypulseError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let store = Self::from_jsonl(&content);
        tracing::info!(
            path = %path.display(),
            results = store.len(),
            skipped = store.skipped,
            "results loaded"
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Lines that failed to parse on load.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn results(&self) -> &[ZoneStatsResult] {
        &self.results
    }

    /// Distinct zone names, sorted.
    pub fn zones(&self) -> Vec<&str> {
        self.results
            .iter()
            .map(|r| r.zone.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Most recent result per zone, sorted by zone name.
    pub fn latest_by_zone(&self) -> Vec<&ZoneStatsResult> {
        let mut latest: BTreeMap<&str, &ZoneStatsResult> = BTreeMap::new();
        // Results are time-ordered, so later entries replace earlier ones.
        for result in &self.results {
            latest.insert(result.zone.as_str(), result);
        }
        latest.into_values().collect()
    }

    pub fn history(&self, zone: &str) -> Vec<&ZoneStatsResult> {
        self.results.iter().filter(|r| r.zone == zone).collect()
    }

    /// Results with `from <= timestamp <= to`.
    pub fn range(&self, from: Timestamp, to: Timestamp) -> CitypulseResult<Vec<&ZoneStatsResult>> {
        if from > to {
            return Err(CitypulseError::query(format!(
                "empty range: {from} is after {to}"
            )));
        }
        Ok(self
            .results
            .iter()
            .filter(|r| (from..=to).contains(&r.timestamp))
            .collect())
    }

    /// Summary of the latest snapshot per zone, stamped with the current time.
    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary::from_latest(&self.latest_by_zone(), Utc::now())
    }

    /// Alerts raised by every stored result, in store order.
    pub fn alerts(&self, thresholds: &AlertThresholds) -> Vec<Alert> {
        self.results
            .iter()
            .flat_map(|r| evaluate(r, thresholds))
            .collect()
    }
}
