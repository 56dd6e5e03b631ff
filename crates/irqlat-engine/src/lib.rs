//! # irqlat-engine
//!
//! The latency measurement engine of irqlat.
//!
//! The engine owns the generator for one run: it brings the device up, starts
//! periodic interrupt generation, and for every generator interrupt computes the
//! time between the latched generation tick and the moment software serviced
//! it. Samples land in a one-microsecond [`LatencyHistogram`]; anything at or
//! beyond [`LAT_MAX_US`] is counted as a missed deadline.
//!
//! The run ends when the [`StopToken`] is raised or the configured sample
//! budget is spent. Either way the generator is stopped and every handle is
//! released in reverse order of acquisition.
//!
//! # Example
//!
//! ```rust
//! use irqlat_engine::{EngineConfig, LatencyEngine, LatencyHistogram, StopToken};
//! use irqlat_hw::{ScriptedEvent, ScriptedPlatform};
//!
//! # fn main() -> Result<(), irqlat_engine::EngineError> {
//! let platform = ScriptedPlatform::new().with_events([
//!     ScriptedEvent::Sample { start: 0, now: 50_000 },
//!     ScriptedEvent::Timeout,
//! ]);
//! let config = EngineConfig::builder().irq_count_limit(2).build()?;
//!
//! let mut engine = LatencyEngine::new(platform, config, StopToken::new())?;
//! let measurement = engine.run(LatencyHistogram::new())?;
//!
//! assert_eq!(measurement.statistics.irq_count, 2);
//! assert_eq!(measurement.histogram.count(500), 1);
//! # Ok(())
//! # }
//! ```

#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod config;
pub mod engine;
pub mod error;
pub mod histogram;
pub mod latency;
pub mod report;
pub mod stats;
pub mod stop;

pub mod prelude;

pub use config::{EngineConfig, EngineConfigBuilder, WAIT_TIMEOUT};
pub use engine::{EngineState, LatencyEngine, Measurement};
pub use error::{ConfigError, EngineError, EngineResult, ErrorCategory};
pub use histogram::{LatencyHistogram, SampleClass};
pub use latency::{COUNTER_MODULUS, LAT_MAX_US, latency_us, raw_delta, ticks_to_us};
pub use report::{BucketCount, MeasurementReport};
pub use stats::RunStatistics;
pub use stop::StopToken;
