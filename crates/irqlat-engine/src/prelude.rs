//! Prelude module for running a measurement.

pub use crate::config::EngineConfig;
pub use crate::engine::{LatencyEngine, Measurement};
pub use crate::error::{EngineError, EngineResult};
pub use crate::histogram::LatencyHistogram;
pub use crate::report::MeasurementReport;
pub use crate::stop::StopToken;
