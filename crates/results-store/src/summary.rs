//! Dashboard summary over the latest snapshot of each zone.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use citypulse_telemetry_model::record::Timestamp;
use citypulse_telemetry_model::stats::{round2, ZoneStatsResult};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// Wall-clock time the summary was built (RFC 3339).
    pub generated_at: String,
    pub latest_timestamp: Option<Timestamp>,
    pub zone_count: usize,
    pub total_vehicles: u64,
    /// Weighted by vehicle count.
    pub avg_speed_kmh: f64,
    pub avg_co2: f64,
    pub avg_noise_db: f64,
    pub congestion: BTreeMap<&'static str, usize>,
    pub pollution: BTreeMap<&'static str, usize>,
    pub noise: BTreeMap<&'static str, usize>,
}

impl DashboardSummary {
    pub fn from_latest(latest: &[&ZoneStatsResult], generated_at: DateTime<Utc>) -> Self {
        let total_vehicles: u64 = latest.iter().map(|r| r.stats.vehicle_count).sum();
        let weighted_speed: f64 = latest
            .iter()
            .map(|r| r.stats.avg_speed_kmh * r.stats.vehicle_count as f64)
            .sum();
        let mean = |f: fn(&ZoneStatsResult) -> f64| {
            if latest.is_empty() {
                0.0
            } else {
                latest.iter().map(|&r| f(r)).sum::<f64>() / latest.len() as f64
            }
        };

        let mut congestion = BTreeMap::new();
        let mut pollution = BTreeMap::new();
        let mut noise = BTreeMap::new();
        for result in latest {
            *congestion.entry(result.stats.congestion_level.label()).or_insert(0) += 1;
            *pollution.entry(result.stats.pollution_level.label()).or_insert(0) += 1;
            *noise.entry(result.stats.noise_level.label()).or_insert(0) += 1;
        }

        Self {
            generated_at: generated_at.to_rfc3339(),
            latest_timestamp: latest.iter().map(|r| r.timestamp).max(),
            zone_count: latest.len(),
            total_vehicles,
            avg_speed_kmh: if total_vehicles == 0 {
                0.0
            } else {
                round2(weighted_speed / total_vehicles as f64)
            },
            avg_co2: round2(mean(|r| r.stats.avg_co2)),
            avg_noise_db: round2(mean(|r| r.stats.avg_noise_db)),
            congestion,
            pollution,
            noise,
        }
    }
}
