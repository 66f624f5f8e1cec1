//! Threshold alerts over zone results.
//!
//! Each domain raises at most one alert per result: the first rule that
//! trips, checked from most to least severe.

use citypulse_common::config::AlertThresholds;
use citypulse_telemetry_model::record::Timestamp;
use citypulse_telemetry_model::stats::ZoneStatsResult;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Traffic,
    Pollution,
    Noise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    /// `{kind}-{zone}-{timestamp}`, unique per result and domain.
    pub id: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub zone: String,
    pub timestamp: Timestamp,
    pub metric: &'static str,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}

impl AlertKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Traffic => "traffic",
            Self::Pollution => "pollution",
            Self::Noise => "noise",
        }
    }
}

/// One candidate rule: fires when `value` crosses `threshold`.
struct Check {
    metric: &'static str,
    value: f64,
    threshold: f64,
    below: bool,
    severity: Severity,
}

impl Check {
    fn trips(&self) -> bool {
        if self.below {
            self.value < self.threshold
        } else {
            self.value > self.threshold
        }
    }
}

fn first_alert(kind: AlertKind, result: &ZoneStatsResult, checks: &[Check]) -> Option<Alert> {
    let check = checks.iter().find(|c| c.trips())?;
    let direction = if check.below { "below" } else { "above" };
    Some(Alert {
        id: format!("{}-{}-{}", kind.as_str(), result.zone, result.timestamp),
        kind,
        severity: check.severity,
        zone: result.zone.clone(),
        timestamp: result.timestamp,
        metric: check.metric,
        value: check.value,
        threshold: check.threshold,
        message: format!(
            "{} in {}: {} {:.2} {} {:.2}",
            kind.as_str(),
            result.zone,
            check.metric,
            check.value,
            direction,
            check.threshold
        ),
    })
}

/// Alerts raised by one result, in traffic, pollution, noise order.
pub fn evaluate(result: &ZoneStatsResult, thresholds: &AlertThresholds) -> Vec<Alert> {
    let stats = &result.stats;
    let traffic = &thresholds.traffic;
    let pollution = &thresholds.pollution;
    let noise = &thresholds.noise;

    let rule = |metric, value, threshold, below, severity| Check {
        metric,
        value,
        threshold,
        below,
        severity,
    };

    let traffic_checks = [
        rule("avg_speed_kmh", stats.avg_speed_kmh, traffic.speed_low, true, Severity::High),
        rule("avg_speed_kmh", stats.avg_speed_kmh, traffic.speed_medium, true, Severity::Medium),
    ];
    let pollution_checks = [
        rule("avg_pmx", stats.avg_pmx, pollution.pmx_high, false, Severity::Critical),
        rule("avg_co2", stats.avg_co2, pollution.co2_high, false, Severity::High),
        rule("avg_co", stats.avg_co, pollution.co_high, false, Severity::Medium),
        rule("avg_nox", stats.avg_nox, pollution.nox_high, false, Severity::Medium),
    ];
    let noise_checks = [
        rule("avg_noise_db", stats.avg_noise_db, noise.high, false, Severity::High),
        rule("avg_noise_db", stats.avg_noise_db, noise.medium, false, Severity::Medium),
        rule("avg_noise_db", stats.avg_noise_db, noise.low, false, Severity::Low),
    ];

    [
        first_alert(AlertKind::Traffic, result, &traffic_checks),
        first_alert(AlertKind::Pollution, result, &pollution_checks),
        first_alert(AlertKind::Noise, result, &noise_checks),
    ]
    .into_iter()
    .flatten()
    .collect()
}
