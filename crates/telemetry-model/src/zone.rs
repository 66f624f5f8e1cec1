//! Static zone geometry and zone/timestamp keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wire::{parse_i64, RecordError, FIELD_SEPARATOR};

/// Zone assigned to points that fall outside every configured bound.
pub const DEFAULT_FALLBACK_ZONE: &str = "Autre";

/// An axis-aligned rectangle with a zone name. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneBound {
    pub name: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ZoneBound {
    pub fn new(name: impl Into<String>, x: (f64, f64), y: (f64, f64)) -> Self {
        Self {
            name: name.into(),
            x_min: x.0,
            x_max: x.1,
            y_min: y.0,
            y_max: y.1,
        }
    }

    /// Whether the point lies inside the rectangle, edges included.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x_min <= x && x <= self.x_max && self.y_min <= y && y <= self.y_max
    }
}

/// Ordered list of zone bounds plus a fallback name.
///
/// Bounds may overlap; lookup order decides. Anfa and Maarif share the
/// `x = 7500` edge in the default table, and Maarif wins there.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneTable {
    bounds: Vec<ZoneBound>,
    fallback: String,
}

impl ZoneTable {
    pub fn new(bounds: Vec<ZoneBound>, fallback: impl Into<String>) -> Self {
        Self {
            bounds,
            fallback: fallback.into(),
        }
    }

    /// The Casablanca districts in simulation coordinates.
    pub fn casablanca() -> Self {
        Self::new(
            vec![
                ZoneBound::new("Maarif", (7500.0, 8500.0), (6000.0, 7000.0)),
                ZoneBound::new("Anfa", (6500.0, 7500.0), (6500.0, 7500.0)),
                ZoneBound::new("Ain Diab", (5500.0, 6500.0), (6000.0, 7000.0)),
                ZoneBound::new("Bourgogne", (8500.0, 9500.0), (6000.0, 7000.0)),
                ZoneBound::new("Hay Hassani", (7000.0, 8000.0), (5000.0, 6000.0)),
            ],
            DEFAULT_FALLBACK_ZONE,
        )
    }

    /// Name of the first zone containing the point, or the fallback.
    pub fn locate(&self, x: f64, y: f64) -> &str {
        self.bounds
            .iter()
            .find(|bound| bound.contains(x, y))
            .map_or(self.fallback.as_str(), |bound| bound.name.as_str())
    }

    pub fn bounds(&self) -> &[ZoneBound] {
        &self.bounds
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

impl Default for ZoneTable {
    fn default() -> Self {
        Self::casablanca()
    }
}

/// Grouping key of the zone reduction stage, `zone|timestamp` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneTimestampKey {
    pub zone: String,
    pub timestamp: i64,
}

impl ZoneTimestampKey {
    pub fn new(zone: impl Into<String>, timestamp: i64) -> Self {
        Self {
            zone: zone.into(),
            timestamp,
        }
    }

    /// Parse `zone|timestamp`. The split is on the last separator so zone
    /// names stay free-form.
    pub fn parse(raw: &str) -> Result<Self, RecordError> {
        let (zone, timestamp) = raw
            .rsplit_once(FIELD_SEPARATOR)
            .ok_or_else(|| RecordError::MalformedKey(raw.to_string()))?;
        if zone.is_empty() {
            return Err(RecordError::MalformedKey(raw.to_string()));
        }
        Ok(Self {
            zone: zone.to_string(),
            timestamp: parse_i64("timestamp", timestamp)?,
        })
    }
}

impl fmt::Display for ZoneTimestampKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.zone, FIELD_SEPARATOR, self.timestamp)
    }
}
