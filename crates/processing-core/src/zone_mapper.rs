//! Zone mapping: fused records re-keyed by `zone|timestamp`.
//!
//! Speed is estimated from fuel consumption, `min(fuel * 0.1, 100)`, because
//! no positional history is kept per vehicle at this point. The congestion
//! thresholds downstream were tuned against this estimate, so it stays as is.

use citypulse_telemetry_model::record::{FusedRecord, ZoneSample};
use citypulse_telemetry_model::wire::is_poi_line;
use citypulse_telemetry_model::zone::{ZoneTable, ZoneTimestampKey};

use crate::stage_stats::{DropReason, StageStats};

/// Fuel-to-speed factor of the speed estimate.
pub const FUEL_SPEED_FACTOR: f64 = 0.1;
/// Upper bound of the speed estimate (km/h).
pub const MAX_ESTIMATED_SPEED: f64 = 100.0;

/// Approximate speed from fuel consumption.
pub fn estimate_speed(fuel: f64) -> f64 {
    if fuel > 0.0 {
        (fuel * FUEL_SPEED_FACTOR).min(MAX_ESTIMATED_SPEED)
    } else {
        0.0
    }
}

/// Map one fused record to its zone contribution.
pub fn map_record(record: &FusedRecord, zones: &ZoneTable) -> ZoneSample {
    let pollutants = record.emission.pollutants.unwrap_or_default();
    ZoneSample {
        key: ZoneTimestampKey::new(zones.locate(record.x, record.y), record.timestamp),
        speed: estimate_speed(record.emission.fuel),
        co2: record.emission.co2,
        noise: record.emission.noise,
        co: pollutants.co,
        nox: pollutants.nox,
        pmx: pollutants.pmx,
        count: 1,
    }
}

/// Lazy zone mapper over fusion output lines.
pub struct ZoneMapper<'a, I> {
    lines: I,
    zones: &'a ZoneTable,
    stats: StageStats,
}

impl<'a, I: Iterator<Item = String>> ZoneMapper<'a, I> {
    pub fn new(lines: I, zones: &'a ZoneTable) -> Self {
        Self {
            lines,
            zones,
            stats: StageStats::default(),
        }
    }

    pub fn stats(&self) -> &StageStats {
        &self.stats
    }
}

impl<I: Iterator<Item = String>> Iterator for ZoneMapper<'_, I> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for line in self.lines.by_ref() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.stats.records_in += 1;

            if is_poi_line(line) {
                self.stats.passthrough += 1;
                continue;
            }
            match FusedRecord::parse_line(line) {
                Ok(record) => {
                    self.stats.records_out += 1;
                    return Some(map_record(&record, self.zones).to_line());
                }
                Err(e) => {
                    tracing::trace!(error = %e, "unparseable fused line");
                    self.stats.record_drop(DropReason::Malformed);
                }
            }
        }
        None
    }
}
