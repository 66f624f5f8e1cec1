//! Per-stage record counters.
//!
//! Stages never fail on bad input; they drop the line and count it here.
//! The counters are the only window into how much of a stream was lost.

use serde::Serialize;

/// Why a stage dropped an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Could not be parsed, or had the wrong number of fields.
    Malformed,
    /// Parsed, but a value fell outside its accepted domain.
    OutOfRange,
    /// Parsed, but the record kind could not be determined.
    Unrecognized,
    /// A join key closed with only one side present.
    Unmatched,
}

/// Counters for one stage run (or the merge of several partition runs).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    /// Non-blank input lines seen.
    pub records_in: u64,
    /// Records emitted (groups for grouping stages).
    pub records_out: u64,
    /// Lines forwarded or skipped without processing (point-of-interest lines).
    pub passthrough: u64,
    pub malformed: u64,
    pub out_of_range: u64,
    pub unrecognized: u64,
    pub unmatched: u64,
    /// Keys that arrived lower than the previous key in a grouping stage.
    pub order_violations: u64,
}

impl StageStats {
    pub fn record_drop(&mut self, reason: DropReason) {
        tracing::trace!(?reason, "record dropped");
        match reason {
            DropReason::Malformed => self.malformed += 1,
            DropReason::OutOfRange => self.out_of_range += 1,
            DropReason::Unrecognized => self.unrecognized += 1,
            DropReason::Unmatched => self.unmatched += 1,
        }
    }

    /// Total records dropped, all reasons combined.
    pub fn dropped(&self) -> u64 {
        self.malformed + self.out_of_range + self.unrecognized + self.unmatched
    }

    /// Fold the counters of another run (e.g. a partition) into this one.
    pub fn merge(&mut self, other: &StageStats) {
        self.records_in += other.records_in;
        self.records_out += other.records_out;
        self.passthrough += other.passthrough;
        self.malformed += other.malformed;
        self.out_of_range += other.out_of_range;
        self.unrecognized += other.unrecognized;
        self.unmatched += other.unmatched;
        self.order_violations += other.order_violations;
    }

    pub fn log_summary(&self, stage: &str) {
        tracing::info!(
            stage,
            records_in = self.records_in,
            records_out = self.records_out,
            passthrough = self.passthrough,
            dropped = self.dropped(),
            malformed = self.malformed,
            out_of_range = self.out_of_range,
            unrecognized = self.unrecognized,
            unmatched = self.unmatched,
            "stage finished"
        );
        if self.order_violations > 0 {
            tracing::warn!(
                stage,
                order_violations = self.order_violations,
                "input was not sorted by key; groups may be split"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_counters() {
        let mut stats = StageStats::default();
        stats.record_drop(DropReason::Malformed);
        stats.record_drop(DropReason::OutOfRange);
        stats.record_drop(DropReason::OutOfRange);
        stats.record_drop(DropReason::Unmatched);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.out_of_range, 2);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.dropped(), 4);
    }

    #[test]
    fn test_merge_adds_every_counter() {
        let mut total = StageStats {
            records_in: 10,
            records_out: 4,
            malformed: 1,
            ..Default::default()
        };
        let partition = StageStats {
            records_in: 5,
            records_out: 2,
            passthrough: 1,
            unmatched: 2,
            order_violations: 1,
            ..Default::default()
        };
        total.merge(&partition);
        assert_eq!(total.records_in, 15);
        assert_eq!(total.records_out, 6);
        assert_eq!(total.passthrough, 1);
        assert_eq!(total.dropped(), 3);
        assert_eq!(total.order_violations, 1);
    }
}
