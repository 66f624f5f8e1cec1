//! CityPulse Processing Core
//!
//! The four streaming stages of the telemetry pipeline:
//! - **Validation:** raw JSON records to keyed wire lines, bad records dropped
//! - **Fusion:** inner join of GPS and emission samples per vehicle and instant
//! - **Zone mapping:** fused records re-keyed by `zone|timestamp`
//! - **Zone reduction:** per-group averages with congestion, pollution and noise labels
//!
//! Every stage is a lazy iterator adapter with its own [`StageStats`].
//! Fusion and reduction require input sorted by key; [`pipeline`] provides
//! the sort and partitioning for local runs.

pub mod classify;
pub mod fusion;
pub mod grouping;
pub mod noise;
pub mod normalize;
pub mod pipeline;
pub mod stage_stats;
pub mod validator;
pub mod zone_mapper;
pub mod zone_reducer;

pub use fusion::StreamFusion;
pub use pipeline::{Pipeline, PipelineOutput, PipelineReport};
pub use stage_stats::{DropReason, StageStats};
pub use validator::RecordValidator;
pub use zone_mapper::ZoneMapper;
pub use zone_reducer::ZoneReducer;
