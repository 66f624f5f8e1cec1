//! GPS/emission fusion over validator output sorted by join key.
//!
//! Each `{vehicle}_{timestamp}` key is an inner join of its GPS and
//! emission sides: a key with both sides produces one fused line, a key
//! with one side produces nothing. Duplicate values for a side overwrite
//! earlier ones. Point-of-interest lines are forwarded as they arrive.

use citypulse_telemetry_model::record::fused_line;
use citypulse_telemetry_model::wire::{
    split_key_value, EMISSION_TAG, FIELD_SEPARATOR, GPS_TAG, POI_SENTINEL,
};

use crate::grouping::{KeyedStage, Routed, SortedGroups};
use crate::stage_stats::{DropReason, StageStats};

/// Both sides of one join key, as payload text.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FusionSlots {
    pub gps: Option<String>,
    pub emission: Option<String>,
}

/// The fusion stage. Wrap with [`StreamFusion::new`] to run it.
#[derive(Debug, Default)]
pub struct FusionStage {
    stats: StageStats,
}

impl FusionStage {
    pub fn stats(&self) -> &StageStats {
        &self.stats
    }
}

fn strip_tag<'a>(value: &'a str, tag: &str) -> Option<&'a str> {
    value.strip_prefix(tag)?.strip_prefix(FIELD_SEPARATOR)
}

impl KeyedStage for FusionStage {
    type Input = String;
    type Key = String;
    type Value = String;
    type Passthrough = String;
    type Acc = FusionSlots;
    type Output = String;

    fn route(&mut self, line: String) -> Option<Routed<String, String, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.stats.records_in += 1;

        let Ok((key, value)) = split_key_value(line) else {
            self.stats.record_drop(DropReason::Malformed);
            return None;
        };
        if key == POI_SENTINEL {
            self.stats.passthrough += 1;
            return Some(Routed::Passthrough(line.to_string()));
        }
        Some(Routed::Entry(key.to_string(), value.to_string()))
    }

    fn absorb(&mut self, slots: &mut FusionSlots, value: String) {
        if let Some(gps) = strip_tag(&value, GPS_TAG) {
            slots.gps = Some(gps.to_string());
        } else if let Some(emission) = strip_tag(&value, EMISSION_TAG) {
            slots.emission = Some(emission.to_string());
        } else {
            self.stats.record_drop(DropReason::Malformed);
        }
    }

    fn finish(&mut self, key: String, slots: FusionSlots) -> Option<String> {
        let (Some(gps), Some(emission)) = (slots.gps, slots.emission) else {
            self.stats.record_drop(DropReason::Unmatched);
            return None;
        };
        let Some((vehicle_id, timestamp)) = key.rsplit_once('_') else {
            self.stats.record_drop(DropReason::Malformed);
            return None;
        };
        self.stats.records_out += 1;
        Some(fused_line(vehicle_id, timestamp, &gps, &emission))
    }

    fn forward(&mut self, line: String) -> String {
        line
    }

    fn stats_mut(&mut self) -> &mut StageStats {
        &mut self.stats
    }
}

/// Lazy fusion over key-sorted validator lines.
pub struct StreamFusion<I> {
    groups: SortedGroups<I, FusionStage>,
}

impl<I: Iterator<Item = String>> StreamFusion<I> {
    pub fn new(lines: I) -> Self {
        Self {
            groups: SortedGroups::new(lines, FusionStage::default()),
        }
    }

    pub fn stats(&self) -> &StageStats {
        self.groups.stage().stats()
    }
}

impl<I: Iterator<Item = String>> Iterator for StreamFusion<I> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.groups.next()
    }
}
