//! Record validation: raw JSON lines in, keyed wire lines out.
//!
//! One input line yields zero or one output line. Rejected lines are
//! counted in [`StageStats`] and otherwise ignored.

use citypulse_telemetry_model::record::{
    EmissionPayload, GpsPayload, PointOfInterestRecord, Pollutants, RawEmissionReading,
    RawGpsPing, RawPointOfInterest, RawRecord, SamplePayload, ValidatedRecord, VehicleSample,
};

use crate::noise::{ambient_range, AmbientNoiseSource};
use crate::stage_stats::{DropReason, StageStats};

/// Accepted coordinate range, both axes, inclusive.
pub const COORD_RANGE: (f64, f64) = (-1000.0, 20000.0);
/// Maximum plausible GPS speed (km/h).
pub const MAX_SPEED_KMH: f64 = 200.0;
/// Maximum plausible CO2 reading.
pub const MAX_CO2: f64 = 10000.0;
/// Maximum plausible noise reading (dB).
pub const MAX_NOISE_DB: f64 = 140.0;
/// Shortest accepted place name, in characters.
pub const MIN_POI_NAME_LEN: usize = 2;

fn coord_in_range(value: f64) -> bool {
    COORD_RANGE.0 <= value && value <= COORD_RANGE.1
}

/// Validate one raw record.
pub fn validate_record(
    record: RawRecord,
    noise: &mut impl AmbientNoiseSource,
) -> Result<ValidatedRecord, DropReason> {
    match record {
        RawRecord::PointOfInterest(poi) => validate_poi(poi, noise),
        RawRecord::GpsPing(gps) => validate_gps(gps),
        RawRecord::EmissionReading(emission) => validate_emission(emission),
    }
}

fn validate_poi(
    poi: RawPointOfInterest,
    noise: &mut impl AmbientNoiseSource,
) -> Result<ValidatedRecord, DropReason> {
    let name = poi.nom.replace(['\t', '\n', '\r'], " ");
    if name.chars().count() < MIN_POI_NAME_LEN {
        return Err(DropReason::OutOfRange);
    }
    if !(coord_in_range(poi.x) && coord_in_range(poi.y)) {
        return Err(DropReason::OutOfRange);
    }

    let ambient_noise_db = noise.sample(ambient_range(&poi.category));
    Ok(ValidatedRecord::PointOfInterest(PointOfInterestRecord {
        name,
        category: poi.category.replace(['\t', '\n', '\r'], " "),
        x: poi.x,
        y: poi.y,
        ambient_noise_db,
    }))
}

fn validate_gps(gps: RawGpsPing) -> Result<ValidatedRecord, DropReason> {
    if !gps.vehicule_id.is_wire_safe() {
        return Err(DropReason::Malformed);
    }
    let RawGpsPing {
        vehicule_id,
        timestamp,
        position,
        speed,
    } = gps;

    let speed_ok = (0.0..=MAX_SPEED_KMH).contains(&speed);
    if !(speed_ok && coord_in_range(position.x) && coord_in_range(position.y)) {
        return Err(DropReason::OutOfRange);
    }

    Ok(ValidatedRecord::Vehicle(VehicleSample {
        vehicle_id: vehicule_id,
        timestamp,
        payload: SamplePayload::Gps(GpsPayload {
            x: position.x,
            y: position.y,
            speed,
        }),
    }))
}

fn validate_emission(emission: RawEmissionReading) -> Result<ValidatedRecord, DropReason> {
    if !emission.vehicule_id.is_wire_safe() {
        return Err(DropReason::Malformed);
    }
    let e = emission.emissions;
    let in_range =
        (0.0..=MAX_CO2).contains(&e.co2) && (0.0..=MAX_NOISE_DB).contains(&e.noise) && e.fuel >= 0.0;
    if !in_range {
        return Err(DropReason::OutOfRange);
    }

    let pollutants = (e.co.is_some() || e.nox.is_some() || e.pmx.is_some()).then(|| Pollutants {
        co: e.co.unwrap_or(0.0),
        nox: e.nox.unwrap_or(0.0),
        pmx: e.pmx.unwrap_or(0.0),
    });

    Ok(ValidatedRecord::Vehicle(VehicleSample {
        vehicle_id: emission.vehicule_id,
        timestamp: emission.timestamp,
        payload: SamplePayload::Emission(EmissionPayload {
            co2: e.co2,
            noise: e.noise,
            fuel: e.fuel,
            pollutants,
        }),
    }))
}

/// Lazy validator over raw input lines.
pub struct RecordValidator<I, N> {
    lines: I,
    noise: N,
    stats: StageStats,
}

impl<I, N> RecordValidator<I, N>
where
    I: Iterator<Item = String>,
    N: AmbientNoiseSource,
{
    pub fn new(lines: I, noise: N) -> Self {
        Self {
            lines,
            noise,
            stats: StageStats::default(),
        }
    }

    pub fn stats(&self) -> &StageStats {
        &self.stats
    }

    fn process(&mut self, line: &str) -> Result<String, DropReason> {
        let record = RawRecord::from_json_line(line).map_err(|e| match e {
            citypulse_telemetry_model::wire::RecordError::Unrecognized => DropReason::Unrecognized,
            _ => DropReason::Malformed,
        })?;
        let validated = validate_record(record, &mut self.noise)?;
        if matches!(validated, ValidatedRecord::PointOfInterest(_)) {
            self.stats.passthrough += 1;
        }
        Ok(validated.to_line())
    }
}

impl<I, N> Iterator for RecordValidator<I, N>
where
    I: Iterator<Item = String>,
    N: AmbientNoiseSource,
{
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(line) = self.lines.next() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.stats.records_in += 1;
            match self.process(line) {
                Ok(output) => {
                    self.stats.records_out += 1;
                    return Some(output);
                }
                Err(reason) => self.stats.record_drop(reason),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::FixedNoise;

    fn run(lines: &[&str]) -> (Vec<String>, StageStats) {
        let input = lines.iter().map(|l| l.to_string()).collect::<Vec<_>>();
        let mut validator = RecordValidator::new(input.into_iter(), FixedNoise(65.0));
        let out: Vec<String> = validator.by_ref().collect();
        (out, validator.stats().clone())
    }

    #[test]
    fn test_gps_speed_limit() {
        let (out, stats) = run(&[
            r#"{"vehicule_id":"V1","timestamp":100,"position":{"x":8000,"y":6500},"speed":250}"#,
            r#"{"vehicule_id":"V2","timestamp":100,"position":{"x":8000,"y":6500},"speed":199.9}"#,
        ]);
        assert_eq!(out, vec!["V2_100\tGPS|8000,6500".to_string()]);
        assert_eq!(stats.out_of_range, 1);
        assert_eq!(stats.records_in, 2);
        assert_eq!(stats.records_out, 1);
    }

    #[test]
    fn test_gps_boundaries_inclusive() {
        let (out, _) = run(&[
            r#"{"vehicule_id":"A","timestamp":1,"position":{"x":-1000,"y":20000},"speed":0}"#,
            r#"{"vehicule_id":"B","timestamp":1,"position":{"x":-1000.5,"y":0},"speed":10}"#,
            r#"{"vehicule_id":"C","timestamp":1,"position":{"x":0,"y":0},"speed":200}"#,
            r#"{"vehicule_id":"D","timestamp":1,"position":{"x":0,"y":0},"speed":-1}"#,
        ]);
        assert_eq!(out, vec!["A_1\tGPS|-1000,20000", "C_1\tGPS|0,0"]);
    }

    #[test]
    fn test_emission_checks() {
        let (out, stats) = run(&[
            r#"{"vehicule_id":"V1","timestamp":5,"emissions":{"co2":500,"noise":60,"fuel":2.5}}"#,
            r#"{"vehicule_id":"V2","timestamp":5,"emissions":{"co2":10001,"noise":60,"fuel":1}}"#,
            r#"{"vehicule_id":"V3","timestamp":5,"emissions":{"co2":10,"noise":141,"fuel":1}}"#,
            r#"{"vehicule_id":"V4","timestamp":5,"emissions":{"co2":10,"noise":60,"fuel":-0.1}}"#,
            r#"{"vehicule_id":"V5","timestamp":5,"emissions":{"co2":10,"noise":60,"fuel":0,"nox":0.4}}"#,
        ]);
        assert_eq!(
            out,
            vec!["V1_5\tEMI|500,60,2.5", "V5_5\tEMI|10,60,0,0,0.4,0"]
        );
        assert_eq!(stats.out_of_range, 3);
    }

    #[test]
    fn test_points_of_interest() {
        let (out, stats) = run(&[
            r#"{"nom":"Le\tZinc","type":"Bar","x":8000,"y":6500,"osm_id":1}"#,
            r#"{"nom":"X","type":"bar","x":8000,"y":6500,"osm_id":2}"#,
            r#"{"nom":"Lycée Lyautey","type":"school","x":30000,"y":6500,"osm_id":3}"#,
            r#"{"nom":"Parc","type":"park","x":100,"y":100,"osm_id":4}"#,
        ]);
        assert_eq!(
            out,
            vec![
                "LIEU\tLe Zinc\tBar\t8000\t6500\t65.00",
                "LIEU\tParc\tpark\t100\t100\t60.00",
            ]
        );
        assert_eq!(stats.out_of_range, 2);
        assert_eq!(stats.passthrough, 2);
    }

    #[test]
    fn test_malformed_and_unrecognized_lines_are_dropped() {
        let (out, stats) = run(&[
            "",
            "not json at all",
            r#"{"timestamp":1,"speed":3}"#,
            r#"{"vehicule_id":"V1","timestamp":"x","position":{"x":1,"y":1}}"#,
            r#"{"vehicule_id":"a\tb","timestamp":1,"position":{"x":1,"y":1}}"#,
            "   ",
        ]);
        assert!(out.is_empty());
        assert_eq!(stats.records_in, 4);
        assert_eq!(stats.malformed, 3);
        assert_eq!(stats.unrecognized, 1);
    }

    #[test]
    fn test_drops_between_accepted_lines_keep_the_stream_going() {
        let (out, stats) = run(&[
            r#"{"vehicule_id":"V1","timestamp":1,"position":{"x":1,"y":1},"speed":10}"#,
            r#"{"vehicule_id":"bus|7","timestamp":1,"position":{"x":1,"y":1},"speed":10}"#,
            "{broken",
            r#"{"vehicule_id":"V2","timestamp":1,"emissions":{"co2":1,"noise":1,"fuel":1,"pmx":1e307}}"#,
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], "V1_1\tGPS|1,1");
        assert!(out[1].starts_with("V2_1\tEMI|1,1,1,0,0,"));
        assert_eq!(stats.records_in, 4);
        assert_eq!(stats.records_out, 2);
        assert_eq!(stats.malformed, 2);
    }

    #[test]
    fn test_seeded_runs_reproduce_poi_noise() {
        use crate::noise::RngNoise;

        let lines = vec![
            r#"{"nom":"Cafe A","type":"cafe","x":1,"y":1,"osm_id":1}"#.to_string(),
            r#"{"nom":"Cafe B","type":"cafe","x":2,"y":2,"osm_id":2}"#.to_string(),
        ];
        let first: Vec<String> =
            RecordValidator::new(lines.clone().into_iter(), RngNoise::seeded(9)).collect();
        let second: Vec<String> =
            RecordValidator::new(lines.into_iter(), RngNoise::seeded(9)).collect();
        assert_eq!(first, second);
    }
}
