//! Per-zone, per-timestamp aggregate results.
//!
//! These are the final output of the pipeline, written as one JSON object
//! per line. Label strings are part of the format consumed by dashboards
//! and stay in French.

use serde::{Deserialize, Serialize};

use crate::record::Timestamp;

/// Traffic congestion derived from average speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CongestionLevel {
    #[serde(rename = "très dense")]
    VeryDense,
    #[serde(rename = "dense")]
    Dense,
    #[serde(rename = "modéré")]
    Moderate,
    #[serde(rename = "fluide")]
    Fluid,
}

/// Air quality derived from the worst pollutant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PollutionLevel {
    #[serde(rename = "Toxique")]
    Toxic,
    #[serde(rename = "Dangereux")]
    Dangerous,
    #[serde(rename = "Très Mauvais")]
    VeryBad,
    #[serde(rename = "Mauvais")]
    Bad,
    #[serde(rename = "Médiocre")]
    Poor,
    #[serde(rename = "Bon")]
    Good,
}

/// Ambient noise derived from average decibels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NoiseLevel {
    #[serde(rename = "Très Élevé")]
    VeryHigh,
    #[serde(rename = "Élevé")]
    High,
    #[serde(rename = "Modéré")]
    Moderate,
    #[serde(rename = "Faible")]
    Low,
}

impl CongestionLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::VeryDense => "très dense",
            Self::Dense => "dense",
            Self::Moderate => "modéré",
            Self::Fluid => "fluide",
        }
    }
}

impl PollutionLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Toxic => "Toxique",
            Self::Dangerous => "Dangereux",
            Self::VeryBad => "Très Mauvais",
            Self::Bad => "Mauvais",
            Self::Poor => "Médiocre",
            Self::Good => "Bon",
        }
    }
}

impl NoiseLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::VeryHigh => "Très Élevé",
            Self::High => "Élevé",
            Self::Moderate => "Modéré",
            Self::Low => "Faible",
        }
    }
}

/// One aggregated zone/timestamp group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneStatsResult {
    pub zone: String,
    pub timestamp: Timestamp,
    pub stats: ZoneStats,
}

/// Averages (rounded to two decimals), vehicle count and labels.
///
/// Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneStats {
    pub avg_speed_kmh: f64,
    pub vehicle_count: u64,
    pub congestion_level: CongestionLevel,
    pub avg_co2: f64,
    pub pollution_level: PollutionLevel,
    pub avg_noise_db: f64,
    pub noise_level: NoiseLevel,
    pub avg_co: f64,
    pub avg_nox: f64,
    pub avg_pmx: f64,
}

impl ZoneStatsResult {
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Round to two decimals. Values too large to scale are returned unchanged.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        value
    }
}

/// Parse results from JSONL content (one JSON object per line).
pub fn parse_results(jsonl: &str) -> Result<Vec<ZoneStatsResult>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str)
        .collect()
}

/// Serialize results to JSONL format.
pub fn serialize_results(results: &[ZoneStatsResult]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for result in results {
        output.push_str(&result.to_json_line()?);
        output.push('\n');
    }
    Ok(output)
}
