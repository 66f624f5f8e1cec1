//! Telemetry record types, from raw JSON to fused per-vehicle samples.
//!
//! Raw input mixes three kinds of objects in one stream. The kind is not
//! tagged explicitly; it is inferred from which fields are present:
//!
//! | fields                                      | kind             |
//! |---------------------------------------------|------------------|
//! | `osm_id`                                    | point of interest|
//! | `position` + `vehicule_id`                  | GPS ping         |
//! | `emissions` + `vehicule_id`, no `position`  | emission reading |

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::wire::{
    parse_f64, parse_i64, RecordError, EMISSION_TAG, FIELD_SEPARATOR, GPS_TAG, POI_SENTINEL,
};
use crate::zone::ZoneTimestampKey;

/// Simulation timestamp (seconds since simulation start).
pub type Timestamp = i64;

/// Vehicle identifier. Accepts JSON strings and numbers, carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VehicleId(String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id can be written into a stage line unchanged: no tabs,
    /// line breaks or field separators.
    pub fn is_wire_safe(&self) -> bool {
        !self.0.is_empty() && !self.0.contains(['\t', '\n', '\r', FIELD_SEPARATOR])
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for VehicleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Self(text),
            Repr::Number(number) => Self(number.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// One raw telemetry object, discriminated by field presence.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    PointOfInterest(RawPointOfInterest),
    GpsPing(RawGpsPing),
    EmissionReading(RawEmissionReading),
}

/// A static place exported from OpenStreetMap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPointOfInterest {
    #[serde(default = "default_poi_name")]
    pub nom: String,

    #[serde(rename = "type", default = "default_poi_category")]
    pub category: String,

    #[serde(default)]
    pub x: f64,

    #[serde(default)]
    pub y: f64,

    pub osm_id: serde_json::Value,
}

/// A vehicle position sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGpsPing {
    pub vehicule_id: VehicleId,
    pub timestamp: Timestamp,
    pub position: RawPosition,

    /// Instantaneous speed reported by the simulator (km/h).
    #[serde(default)]
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPosition {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub angle: Option<f64>,
}

/// A vehicle emission/noise sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEmissionReading {
    pub vehicule_id: VehicleId,
    pub timestamp: Timestamp,
    pub emissions: RawEmissions,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawEmissions {
    #[serde(default)]
    pub co2: f64,
    #[serde(default)]
    pub noise: f64,
    #[serde(default)]
    pub fuel: f64,
    #[serde(default)]
    pub co: Option<f64>,
    #[serde(default)]
    pub nox: Option<f64>,
    #[serde(default)]
    pub pmx: Option<f64>,
}

fn default_poi_name() -> String {
    "Lieu Inconnu".to_string()
}

fn default_poi_category() -> String {
    "autre".to_string()
}

#[derive(Clone, Copy)]
enum RawKind {
    PointOfInterest,
    GpsPing,
    EmissionReading,
}

impl RawRecord {
    /// Parse one raw JSON line.
    pub fn from_json_line(line: &str) -> Result<Self, RecordError> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        Self::from_value(value)
    }

    /// Discriminate and deserialize an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RecordError> {
        let kind = {
            let serde_json::Value::Object(map) = &value else {
                return Err(RecordError::NotAnObject);
            };
            let has_vehicle = map.contains_key("vehicule_id");
            if map.contains_key("osm_id") {
                RawKind::PointOfInterest
            } else if map.contains_key("position") && has_vehicle {
                RawKind::GpsPing
            } else if map.contains_key("emissions") && has_vehicle {
                RawKind::EmissionReading
            } else {
                return Err(RecordError::Unrecognized);
            }
        };

        Ok(match kind {
            RawKind::PointOfInterest => Self::PointOfInterest(serde_json::from_value(value)?),
            RawKind::GpsPing => Self::GpsPing(serde_json::from_value(value)?),
            RawKind::EmissionReading => Self::EmissionReading(serde_json::from_value(value)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Validated records
// ---------------------------------------------------------------------------

/// A record that passed validation, ready to be written as a keyed line.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedRecord {
    PointOfInterest(PointOfInterestRecord),
    Vehicle(VehicleSample),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterestRecord {
    pub name: String,
    pub category: String,
    pub x: f64,
    pub y: f64,
    /// Sampled ambient noise level (dB).
    pub ambient_noise_db: f64,
}

/// One side of a vehicle/timestamp join.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSample {
    pub vehicle_id: VehicleId,
    pub timestamp: Timestamp,
    pub payload: SamplePayload,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplePayload {
    Gps(GpsPayload),
    Emission(EmissionPayload),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPayload {
    pub x: f64,
    pub y: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionPayload {
    pub co2: f64,
    pub noise: f64,
    pub fuel: f64,
    /// Present when the source reported any of co/nox/pmx.
    pub pollutants: Option<Pollutants>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pollutants {
    pub co: f64,
    pub nox: f64,
    pub pmx: f64,
}

impl VehicleSample {
    /// Join key shared by the GPS and emission sides: `{vehicle}_{timestamp}`.
    pub fn join_key(&self) -> String {
        format!("{}_{}", self.vehicle_id, self.timestamp)
    }
}

impl SamplePayload {
    /// Tagged wire value, e.g. `GPS|8000,6500`.
    pub fn tagged(&self) -> String {
        match self {
            Self::Gps(gps) => format!("{GPS_TAG}{FIELD_SEPARATOR}{}", gps.fields()),
            Self::Emission(emission) => {
                format!("{EMISSION_TAG}{FIELD_SEPARATOR}{}", emission.fields())
            }
        }
    }
}

impl GpsPayload {
    /// `x,y`. Speed stays out of the wire format; zone speed is derived
    /// from fuel downstream.
    pub fn fields(&self) -> String {
        format!("{},{}", self.x, self.y)
    }
}

impl EmissionPayload {
    /// `co2,noise,fuel[,co,nox,pmx]`.
    pub fn fields(&self) -> String {
        match self.pollutants {
            Some(p) => format!(
                "{},{},{},{},{},{}",
                self.co2, self.noise, self.fuel, p.co, p.nox, p.pmx
            ),
            None => format!("{},{},{}", self.co2, self.noise, self.fuel),
        }
    }

    /// Parse `co2,noise,fuel[,co,nox,pmx]`.
    pub fn parse_fields(raw: &str) -> Result<Self, RecordError> {
        let parts: Vec<&str> = raw.split(',').collect();
        let pollutants = match parts.len() {
            3 => None,
            6 => Some(Pollutants {
                co: parse_f64("co", parts[3])?,
                nox: parse_f64("nox", parts[4])?,
                pmx: parse_f64("pmx", parts[5])?,
            }),
            found => {
                return Err(RecordError::FieldCount {
                    expected: "3 or 6 emission".to_string(),
                    found,
                })
            }
        };
        Ok(Self {
            co2: parse_f64("co2", parts[0])?,
            noise: parse_f64("noise", parts[1])?,
            fuel: parse_f64("fuel", parts[2])?,
            pollutants,
        })
    }
}

impl ValidatedRecord {
    /// Validator output line.
    pub fn to_line(&self) -> String {
        match self {
            Self::PointOfInterest(poi) => format!(
                "{POI_SENTINEL}\t{}\t{}\t{}\t{}\t{:.2}",
                poi.name, poi.category, poi.x, poi.y, poi.ambient_noise_db
            ),
            Self::Vehicle(sample) => format!("{}\t{}", sample.join_key(), sample.payload.tagged()),
        }
    }
}

// ---------------------------------------------------------------------------
// Fused records
// ---------------------------------------------------------------------------

/// A GPS sample joined with the emission sample of the same vehicle and
/// timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedRecord {
    pub vehicle_id: VehicleId,
    pub timestamp: Timestamp,
    pub x: f64,
    pub y: f64,
    pub emission: EmissionPayload,
}

/// Build a fusion output line from the raw payload texts of both sides.
pub fn fused_line(vehicle_id: &str, timestamp: &str, gps_fields: &str, emi_fields: &str) -> String {
    format!("{vehicle_id}\t{timestamp}\t{gps_fields}\t{emi_fields}")
}

impl FusedRecord {
    /// Parse `vehicle<TAB>timestamp<TAB>x,y<TAB>co2,noise,fuel[,co,nox,pmx]`.
    pub fn parse_line(line: &str) -> Result<Self, RecordError> {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() != 4 {
            return Err(RecordError::FieldCount {
                expected: "4 tab-separated".to_string(),
                found: parts.len(),
            });
        }

        let (x, y) = parts[2].split_once(',').ok_or(RecordError::FieldCount {
            expected: "2 position".to_string(),
            found: 1,
        })?;

        Ok(Self {
            vehicle_id: VehicleId::new(parts[0]),
            timestamp: parse_i64("timestamp", parts[1])?,
            x: parse_f64("x", x)?,
            y: parse_f64("y", y)?,
            emission: EmissionPayload::parse_fields(parts[3])?,
        })
    }

    pub fn to_line(&self) -> String {
        fused_line(
            self.vehicle_id.as_str(),
            &self.timestamp.to_string(),
            &format!("{},{}", self.x, self.y),
            &self.emission.fields(),
        )
    }
}

// ---------------------------------------------------------------------------
// Zone samples
// ---------------------------------------------------------------------------

/// One fused record re-keyed by zone: the unit the zone reducer sums.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSample {
    pub key: ZoneTimestampKey,
    pub speed: f64,
    pub co2: f64,
    pub noise: f64,
    pub co: f64,
    pub nox: f64,
    pub pmx: f64,
    /// Contribution to the vehicle count; 1 per fused record.
    pub count: u64,
}

impl ZoneSample {
    /// `zone|ts<TAB>speed|co2|noise|co|nox|pmx|count`, metrics with two decimals.
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{:.2}|{:.2}|{:.2}|{:.2}|{:.2}|{:.2}|{}",
            self.key, self.speed, self.co2, self.noise, self.co, self.nox, self.pmx, self.count
        )
    }

    /// Parse a zone mapper output line. Requires exactly seven value fields.
    pub fn parse_line(line: &str) -> Result<Self, RecordError> {
        let (key, value) = crate::wire::split_key_value(line)?;
        let key = ZoneTimestampKey::parse(key)?;
        let fields: Vec<&str> = value.split(FIELD_SEPARATOR).collect();
        if fields.len() != 7 {
            return Err(RecordError::FieldCount {
                expected: "7 pipe-separated".to_string(),
                found: fields.len(),
            });
        }
        let count = fields[6]
            .trim()
            .parse::<u64>()
            .map_err(|_| RecordError::InvalidNumber {
                field: "count",
                value: fields[6].to_string(),
            })?;

        Ok(Self {
            key,
            speed: parse_f64("speed", fields[0])?,
            co2: parse_f64("co2", fields[1])?,
            noise: parse_f64("noise", fields[2])?,
            co: parse_f64("co", fields[3])?,
            nox: parse_f64("nox", fields[4])?,
            pmx: parse_f64("pmx", fields[5])?,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminates_point_of_interest() {
        let raw = r#"{"nom":"Café Maure","type":"cafe","x":8000.5,"y":6400,"osm_id":123}"#;
        let RawRecord::PointOfInterest(poi) = RawRecord::from_json_line(raw).unwrap() else {
            panic!("expected a point of interest");
        };
        assert_eq!(poi.nom, "Café Maure");
        assert_eq!(poi.category, "cafe");
        assert!((poi.y - 6400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_point_of_interest_defaults() {
        let RawRecord::PointOfInterest(poi) = RawRecord::from_json_line(r#"{"osm_id":1}"#).unwrap()
        else {
            panic!("expected a point of interest");
        };
        assert_eq!(poi.nom, "Lieu Inconnu");
        assert_eq!(poi.category, "autre");
        assert_eq!(poi.x, 0.0);
    }

    #[test]
    fn test_gps_wins_over_emissions_when_position_present() {
        let raw = r#"{"vehicule_id":"veh_7","timestamp":100,"position":{"x":1.5,"y":2,"angle":90},"speed":42,"emissions":{"co2":1}}"#;
        let RawRecord::GpsPing(gps) = RawRecord::from_json_line(raw).unwrap() else {
            panic!("expected a GPS ping");
        };
        assert_eq!(gps.vehicule_id.as_str(), "veh_7");
        assert_eq!(gps.timestamp, 100);
        assert!((gps.speed - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_emission_reading_with_numeric_vehicle_id() {
        let raw = r#"{"vehicule_id":17,"timestamp":5,"emissions":{"co2":900.5,"noise":65,"fuel":3.2,"pmx":0.1}}"#;
        let RawRecord::EmissionReading(emi) = RawRecord::from_json_line(raw).unwrap() else {
            panic!("expected an emission reading");
        };
        assert_eq!(emi.vehicule_id.as_str(), "17");
        assert_eq!(emi.emissions.pmx, Some(0.1));
        assert_eq!(emi.emissions.co, None);
    }

    #[test]
    fn test_unrecognized_and_invalid_inputs() {
        assert!(matches!(
            RawRecord::from_json_line(r#"{"timestamp":1}"#),
            Err(RecordError::Unrecognized)
        ));
        assert!(matches!(
            RawRecord::from_json_line("[1,2]"),
            Err(RecordError::NotAnObject)
        ));
        assert!(matches!(
            RawRecord::from_json_line("{not json"),
            Err(RecordError::Json(_))
        ));
        // Right shape, wrong field type.
        assert!(RawRecord::from_json_line(
            r#"{"vehicule_id":"a","timestamp":"late","position":{}}"#
        )
        .is_err());
    }

    #[test]
    fn test_validated_lines() {
        let gps = ValidatedRecord::Vehicle(VehicleSample {
            vehicle_id: VehicleId::new("V1"),
            timestamp: 100,
            payload: SamplePayload::Gps(GpsPayload {
                x: 8000.0,
                y: 6500.5,
                speed: 30.0,
            }),
        });
        assert_eq!(gps.to_line(), "V1_100\tGPS|8000,6500.5");

        let emi = ValidatedRecord::Vehicle(VehicleSample {
            vehicle_id: VehicleId::new("V1"),
            timestamp: 100,
            payload: SamplePayload::Emission(EmissionPayload {
                co2: 500.0,
                noise: 60.0,
                fuel: 2.5,
                pollutants: None,
            }),
        });
        assert_eq!(emi.to_line(), "V1_100\tEMI|500,60,2.5");

        let poi = ValidatedRecord::PointOfInterest(PointOfInterestRecord {
            name: "Twin Center".to_string(),
            category: "mall".to_string(),
            x: 8100.0,
            y: 6300.0,
            ambient_noise_db: 47.456,
        });
        assert_eq!(poi.to_line(), "LIEU\tTwin Center\tmall\t8100\t6300\t47.46");
    }

    #[test]
    fn test_emission_fields_three_or_six() {
        let short = EmissionPayload::parse_fields("500,60,2.5").unwrap();
        assert!(short.pollutants.is_none());

        let long = EmissionPayload::parse_fields("500,60,2.5,1,2,3").unwrap();
        assert_eq!(
            long.pollutants,
            Some(Pollutants {
                co: 1.0,
                nox: 2.0,
                pmx: 3.0
            })
        );
        assert_eq!(long.fields(), "500,60,2.5,1,2,3");

        assert!(EmissionPayload::parse_fields("500,60").is_err());
        assert!(EmissionPayload::parse_fields("500,60,2.5,1").is_err());
    }

    #[test]
    fn test_fused_record_parse() {
        let fused = FusedRecord::parse_line("V1\t100\t8000,6500\t500,60,2.5").unwrap();
        assert_eq!(fused.vehicle_id.as_str(), "V1");
        assert_eq!(fused.timestamp, 100);
        assert!((fused.x - 8000.0).abs() < f64::EPSILON);
        assert_eq!(fused.to_line(), "V1\t100\t8000,6500\t500,60,2.5");

        assert!(FusedRecord::parse_line("V1\t100\t8000,6500").is_err());
        assert!(FusedRecord::parse_line("V1\tnoon\t8000,6500\t500,60,2.5").is_err());
        assert!(FusedRecord::parse_line("V1\t100\t8000\t500,60,2.5").is_err());
    }

    #[test]
    fn test_zone_sample_line_format() {
        let sample = ZoneSample {
            key: ZoneTimestampKey::new("Maarif", 100),
            speed: 0.25,
            co2: 500.0,
            noise: 60.0,
            co: 0.0,
            nox: 0.0,
            pmx: 0.0,
            count: 1,
        };
        let line = sample.to_line();
        assert_eq!(line, "Maarif|100\t0.25|500.00|60.00|0.00|0.00|0.00|1");
        assert_eq!(ZoneSample::parse_line(&line).unwrap(), sample);
    }

    #[test]
    fn test_zone_sample_rejects_wrong_field_count() {
        assert!(ZoneSample::parse_line("Maarif|100\t1|2|3|1").is_err());
        assert!(ZoneSample::parse_line("Maarif|100\t1|2|3|4|5|6|1|9").is_err());
        assert!(ZoneSample::parse_line("Maarif|100\t1|2|3|4|5|6|x").is_err());
        assert!(ZoneSample::parse_line("Maarif100\t1|2|3|4|5|6|1").is_err());
    }

    #[test]
    fn test_vehicle_id_wire_safety() {
        assert!(VehicleId::new("bus_12").is_wire_safe());
        assert!(!VehicleId::new("bad\tid").is_wire_safe());
        assert!(!VehicleId::new("").is_wire_safe());
        assert!(!VehicleId::new("bus|12").is_wire_safe());
    }
}
