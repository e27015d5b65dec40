//! The edit execution engine: impact analysis, safety validation, the
//! mutation pipeline, and edit telemetry.

pub mod impact;
pub mod pipeline;
pub mod telemetry;
pub mod validate;


pub use impact::{ImpactReport, RiskLevel};
pub use pipeline::{EditPipeline, EditResult, Replacement, WriteResult};
pub use telemetry::{Telemetry, TelemetrySummary};
pub use validate::MatchConfidence;
