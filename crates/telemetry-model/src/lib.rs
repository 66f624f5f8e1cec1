//! CityPulse Telemetry Model
//!
//! Defines the data contracts that flow between pipeline stages:
//! - **Records:** raw telemetry, validated samples, fused GPS+emission records
//! - **Zones:** the ordered bounding-box table and zone/timestamp keys
//! - **Stats:** per-zone, per-timestamp aggregate results and their labels
//! - **Wire:** the tab/pipe separated line formats exchanged between stages
//!
//! Coordinates are planar simulation coordinates (metres), not lat/lon.

pub mod record;
pub mod stats;
pub mod wire;
pub mod zone;

pub use record::*;
pub use stats::*;
pub use wire::*;
pub use zone::*;
