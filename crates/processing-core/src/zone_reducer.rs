//! Zone reduction: per `zone|timestamp` averages and labels.
//!
//! Consumes zone mapper output sorted by key and keeps one open
//! [`ZoneAggregate`]. Labels are computed on unrounded means; the stored
//! averages are rounded to two decimals afterwards.
//!
//! Groups are keyed by the raw key text, the order the host sorts in, so a
//! timestamp like `1000` sorting before `200` is not a regression.

use std::convert::Infallible;

use citypulse_telemetry_model::record::ZoneSample;
use citypulse_telemetry_model::stats::{round2, ZoneStats, ZoneStatsResult};
use citypulse_telemetry_model::zone::ZoneTimestampKey;

use crate::classify::{classify, ZoneAverages};
use crate::grouping::{KeyedStage, Routed, SortedGroups};
use crate::stage_stats::{DropReason, StageStats};

/// Sum plus observation count of one metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    sum: f64,
    observations: u64,
}

impl RunningMean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.observations += 1;
    }

    pub fn mean(&self) -> f64 {
        if self.observations == 0 {
            0.0
        } else {
            self.sum / self.observations as f64
        }
    }
}

/// Running state of one zone/timestamp group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneAggregate {
    speed: RunningMean,
    co2: RunningMean,
    noise: RunningMean,
    co: RunningMean,
    nox: RunningMean,
    pmx: RunningMean,
    vehicle_count: u64,
}

impl ZoneAggregate {
    /// Fold one sample in. A count that would overflow the group total is
    /// rejected and leaves the aggregate untouched.
    pub fn add(&mut self, sample: &ZoneSample) -> Result<(), DropReason> {
        let vehicle_count = self
            .vehicle_count
            .checked_add(sample.count)
            .ok_or(DropReason::OutOfRange)?;
        self.speed.push(sample.speed);
        self.co2.push(sample.co2);
        self.noise.push(sample.noise);
        self.co.push(sample.co);
        self.nox.push(sample.nox);
        self.pmx.push(sample.pmx);
        self.vehicle_count = vehicle_count;
        Ok(())
    }

    pub fn averages(&self) -> ZoneAverages {
        ZoneAverages {
            speed: self.speed.mean(),
            co2: self.co2.mean(),
            noise: self.noise.mean(),
            co: self.co.mean(),
            nox: self.nox.mean(),
            pmx: self.pmx.mean(),
        }
    }

    /// Close the group. Groups with no vehicles produce nothing; groups whose
    /// sums overflowed to a non-finite mean are rejected.
    pub fn into_result(self, key: ZoneTimestampKey) -> Result<Option<ZoneStatsResult>, DropReason> {
        if self.vehicle_count == 0 {
            return Ok(None);
        }
        let avg = self.averages();
        let means = [avg.speed, avg.co2, avg.noise, avg.co, avg.nox, avg.pmx];
        if !means.iter().all(|m| m.is_finite()) {
            return Err(DropReason::OutOfRange);
        }
        let (congestion_level, pollution_level, noise_level) = classify(&avg);

        Ok(Some(ZoneStatsResult {
            zone: key.zone,
            timestamp: key.timestamp,
            stats: ZoneStats {
                avg_speed_kmh: round2(avg.speed),
                vehicle_count: self.vehicle_count,
                congestion_level,
                avg_co2: round2(avg.co2),
                pollution_level,
                avg_noise_db: round2(avg.noise),
                noise_level,
                avg_co: round2(avg.co),
                avg_nox: round2(avg.nox),
                avg_pmx: round2(avg.pmx),
            },
        }))
    }
}

/// The reduction stage. Wrap with [`ZoneReducer::new`] to run it.
#[derive(Debug, Default)]
pub struct ZoneReducerStage {
    stats: StageStats,
}

impl ZoneReducerStage {
    pub fn stats(&self) -> &StageStats {
        &self.stats
    }
}

impl KeyedStage for ZoneReducerStage {
    type Input = String;
    type Key = String;
    type Value = ZoneSample;
    type Passthrough = Infallible;
    type Acc = ZoneAggregate;
    type Output = ZoneStatsResult;

    fn route(&mut self, line: String) -> Option<Routed<String, ZoneSample, Infallible>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.stats.records_in += 1;

        match ZoneSample::parse_line(line) {
            Ok(sample) => {
                let key = citypulse_telemetry_model::wire::line_key(line).to_string();
                Some(Routed::Entry(key, sample))
            }
            Err(e) => {
                tracing::trace!(error = %e, "unparseable zone sample");
                self.stats.record_drop(DropReason::Malformed);
                None
            }
        }
    }

    fn absorb(&mut self, acc: &mut ZoneAggregate, sample: ZoneSample) {
        if let Err(reason) = acc.add(&sample) {
            tracing::debug!(count = sample.count, "vehicle count overflow");
            self.stats.record_drop(reason);
        }
    }

    fn finish(&mut self, key: String, acc: ZoneAggregate) -> Option<ZoneStatsResult> {
        // Already validated in `route`.
        let parsed = ZoneTimestampKey::parse(&key).ok()?;
        match acc.into_result(parsed) {
            Ok(Some(result)) => {
                self.stats.records_out += 1;
                Some(result)
            }
            Ok(None) => None,
            Err(reason) => {
                tracing::debug!(key = %key, "non-finite zone averages");
                self.stats.record_drop(reason);
                None
            }
        }
    }

    fn forward(&mut self, never: Infallible) -> ZoneStatsResult {
        match never {}
    }

    fn stats_mut(&mut self) -> &mut StageStats {
        &mut self.stats
    }
}

/// Lazy reducer over key-sorted zone mapper lines.
pub struct ZoneReducer<I> {
    groups: SortedGroups<I, ZoneReducerStage>,
}

impl<I: Iterator<Item = String>> ZoneReducer<I> {
    pub fn new(lines: I) -> Self {
        Self {
            groups: SortedGroups::new(lines, ZoneReducerStage::default()),
        }
    }

    pub fn stats(&self) -> &StageStats {
        self.groups.stage().stats()
    }
}

impl<I: Iterator<Item = String>> Iterator for ZoneReducer<I> {
    type Item = ZoneStatsResult;

    fn next(&mut self) -> Option<ZoneStatsResult> {
        self.groups.next()
    }
}
