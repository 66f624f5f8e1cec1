//! CityPulse Results Store
//!
//! In-memory access to zone reducer output: time-ordered queries, a
//! dashboard summary, threshold alerts, and batched analytics export.

pub mod alerts;
pub mod export;
pub mod store;
pub mod summary;

pub use alerts::{Alert, AlertKind, Severity};
pub use export::{AnalyticsRow, ExportReport, ZoneIdMap};
pub use store::ResultsStore;
pub use summary::DashboardSummary;
