//! Classification ladders for zone averages.
//!
//! Each ladder is an ordered list of `(predicate, label)` rules; the first
//! rule whose predicate holds gives the label, and the fallback applies when
//! none do. The pollution ladder reads three pollutants jointly: pmx rules
//! sit above nox rules, which sit above the co2 rule.

use citypulse_telemetry_model::stats::{CongestionLevel, NoiseLevel, PollutionLevel};

/// Unrounded per-group means.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZoneAverages {
    pub speed: f64,
    pub co2: f64,
    pub noise: f64,
    pub co: f64,
    pub nox: f64,
    pub pmx: f64,
}

/// One rung of a ladder.
pub struct Rule<L: 'static> {
    pub when: fn(&ZoneAverages) -> bool,
    pub label: L,
}

/// Ordered rules plus fallback.
pub struct Ladder<L: 'static> {
    pub rules: &'static [Rule<L>],
    pub otherwise: L,
}

impl<L: Copy + 'static> Ladder<L> {
    pub fn classify(&self, averages: &ZoneAverages) -> L {
        self.rules
            .iter()
            .find(|rule| (rule.when)(averages))
            .map_or(self.otherwise, |rule| rule.label)
    }
}

pub static CONGESTION: Ladder<CongestionLevel> = Ladder {
    rules: &[
        Rule {
            when: |a| a.speed < 15.0,
            label: CongestionLevel::VeryDense,
        },
        Rule {
            when: |a| a.speed < 30.0,
            label: CongestionLevel::Dense,
        },
        Rule {
            when: |a| a.speed < 50.0,
            label: CongestionLevel::Moderate,
        },
    ],
    otherwise: CongestionLevel::Fluid,
};

pub static POLLUTION: Ladder<PollutionLevel> = Ladder {
    rules: &[
        Rule {
            when: |a| a.pmx > 50.0,
            label: PollutionLevel::Toxic,
        },
        Rule {
            when: |a| a.pmx > 25.0,
            label: PollutionLevel::Dangerous,
        },
        Rule {
            when: |a| a.nox > 120.0,
            label: PollutionLevel::VeryBad,
        },
        Rule {
            when: |a| a.nox > 60.0,
            label: PollutionLevel::Bad,
        },
        Rule {
            when: |a| a.co2 > 2500.0,
            label: PollutionLevel::Poor,
        },
    ],
    otherwise: PollutionLevel::Good,
};

pub static NOISE: Ladder<NoiseLevel> = Ladder {
    rules: &[
        Rule {
            when: |a| a.noise > 85.0,
            label: NoiseLevel::VeryHigh,
        },
        Rule {
            when: |a| a.noise > 70.0,
            label: NoiseLevel::High,
        },
        Rule {
            when: |a| a.noise > 55.0,
            label: NoiseLevel::Moderate,
        },
    ],
    otherwise: NoiseLevel::Low,
};

/// All three labels for a group.
pub fn classify(averages: &ZoneAverages) -> (CongestionLevel, PollutionLevel, NoiseLevel) {
    (
        CONGESTION.classify(averages),
        POLLUTION.classify(averages),
        NOISE.classify(averages),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn averages(speed: f64, co2: f64, noise: f64, nox: f64, pmx: f64) -> ZoneAverages {
        ZoneAverages {
            speed,
            co2,
            noise,
            co: 0.0,
            nox,
            pmx,
        }
    }

    #[test]
    fn test_congestion_boundaries() {
        let level = |speed| CONGESTION.classify(&averages(speed, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(level(0.0), CongestionLevel::VeryDense);
        assert_eq!(level(14.99), CongestionLevel::VeryDense);
        assert_eq!(level(15.0), CongestionLevel::Dense);
        assert_eq!(level(29.99), CongestionLevel::Dense);
        assert_eq!(level(30.0), CongestionLevel::Moderate);
        assert_eq!(level(50.0), CongestionLevel::Fluid);
        assert_eq!(level(100.0), CongestionLevel::Fluid);
    }

    #[test]
    fn test_pmx_dominates_co2() {
        let level = POLLUTION.classify(&averages(0.0, 3000.0, 0.0, 10.0, 60.0));
        assert_eq!(level, PollutionLevel::Toxic);
    }

    #[test]
    fn test_pollution_ladder_order() {
        let level = |co2, nox, pmx| POLLUTION.classify(&averages(0.0, co2, 0.0, nox, pmx));
        assert_eq!(level(0.0, 0.0, 50.01), PollutionLevel::Toxic);
        assert_eq!(level(0.0, 500.0, 50.0), PollutionLevel::Dangerous);
        assert_eq!(level(9000.0, 121.0, 25.0), PollutionLevel::VeryBad);
        assert_eq!(level(9000.0, 120.0, 0.0), PollutionLevel::Bad);
        assert_eq!(level(2500.01, 60.0, 0.0), PollutionLevel::Poor);
        assert_eq!(level(2500.0, 60.0, 25.0), PollutionLevel::Good);
    }

    #[test]
    fn test_noise_boundaries() {
        let level = |noise| NOISE.classify(&averages(0.0, 0.0, noise, 0.0, 0.0));
        assert_eq!(level(90.0), NoiseLevel::VeryHigh);
        assert_eq!(level(85.0), NoiseLevel::High);
        assert_eq!(level(70.0), NoiseLevel::Moderate);
        assert_eq!(level(55.0), NoiseLevel::Low);
        assert_eq!(level(0.0), NoiseLevel::Low);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn congestion_never_improves_as_speed_drops(a in 0.0f64..200.0, b in 0.0f64..200.0) {
                let (slow, fast) = if a <= b { (a, b) } else { (b, a) };
                let slow_level = CONGESTION.classify(&averages(slow, 0.0, 0.0, 0.0, 0.0));
                let fast_level = CONGESTION.classify(&averages(fast, 0.0, 0.0, 0.0, 0.0));
                // Variants are declared from worst to best.
                prop_assert!(slow_level <= fast_level);
            }

            #[test]
            fn high_pmx_overrides_everything(
                co2 in 0.0f64..10000.0,
                nox in 0.0f64..500.0,
                pmx in 50.001f64..1000.0,
            ) {
                prop_assert_eq!(
                    POLLUTION.classify(&averages(0.0, co2, 0.0, nox, pmx)),
                    PollutionLevel::Toxic
                );
            }

            #[test]
            fn classification_is_deterministic(
                speed in 0.0f64..100.0,
                co2 in 0.0f64..10000.0,
                noise in 0.0f64..140.0,
            ) {
                let avg = averages(speed, co2, noise, 0.0, 0.0);
                prop_assert_eq!(classify(&avg), classify(&avg));
            }
        }
    }
}
