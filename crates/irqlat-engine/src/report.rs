//! Report model and rendering.
//!
//! The text form is the tool's traditional output:
//!
//! ```text
//! # irq_count : 5
//! # irq_missed: 0
//! 12 3
//! 13 2
//! ```
//!
//! followed by one `bucket count` line per non-empty bucket in ascending
//! order. The JSON form carries the same data plus the run parameters.

use crate::engine::Measurement;
use crate::stats::RunStatistics;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// One non-empty histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    /// Latency in whole microseconds.
    pub latency_us: usize,
    /// Samples in this bucket.
    pub count: u64,
}

/// Serializable summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementReport {
    /// Requested interrupt frequency in Hz.
    pub irq_frequency_hz: u32,
    /// Generator clock in Hz.
    pub fclk_hz: u32,
    /// Programmed divider.
    pub divider: u32,
    /// Run counters.
    #[serde(flatten)]
    pub statistics: RunStatistics,
    /// Non-empty buckets, ascending.
    pub histogram: Vec<BucketCount>,
}

impl MeasurementReport {
    /// Build the report of a finished run.
    #[must_use]
    pub fn from_measurement(measurement: &Measurement) -> Self {
        Self {
            irq_frequency_hz: measurement.irq_frequency_hz,
            fclk_hz: measurement.fclk_hz,
            divider: measurement.divider,
            statistics: measurement.statistics,
            histogram: measurement
                .histogram
                .iter_nonempty()
                .map(|(latency_us, count)| BucketCount { latency_us, count })
                .collect(),
        }
    }

    /// Write the text report.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn write_text<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "# irq_count : {}", self.statistics.irq_count)?;
        writeln!(out, "# irq_missed: {}", self.statistics.irq_missed)?;
        for bucket in &self.histogram {
            writeln!(out, "{} {}", bucket.latency_us, bucket.count)?;
        }
        Ok(())
    }

    /// Write the report as pretty JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Propagates serialization and write failures.
    pub fn write_json<W: Write>(&self, mut out: W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut out, self)?;
        writeln!(out)
    }

    /// Render the text report into a string.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        if self.write_text(&mut buf).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl From<&Measurement> for MeasurementReport {
    fn from(measurement: &Measurement) -> Self {
        Self::from_measurement(measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::LatencyHistogram;
    use insta::assert_snapshot;

    fn sample_measurement() -> Measurement {
        let mut histogram = LatencyHistogram::new();
        for us in [13, 12, 12, 13, 12, 250] {
            histogram.record(us);
        }
        Measurement {
            statistics: RunStatistics {
                irq_count: 9,
                irq_missed: 1,
                irq_sampled: 7,
                irq_generated: None,
            },
            histogram,
            fclk_hz: 100_000_000,
            divider: 100_000,
            irq_frequency_hz: 1000,
        }
    }

    #[test]
    fn test_text_report() {
        let report = MeasurementReport::from(&sample_measurement());
        assert_snapshot!(report.to_text().trim_end(), @r"
        # irq_count : 9
        # irq_missed: 1
        12 3
        13 2
        250 1
        ");
    }

    #[test]
    fn test_empty_text_report() {
        let mut measurement = sample_measurement();
        measurement.histogram = LatencyHistogram::new();
        measurement.statistics = RunStatistics::default();
        let report = MeasurementReport::from(&measurement);
        assert_eq!(report.to_text(), "# irq_count : 0\n# irq_missed: 0\n");
    }

    #[test]
    fn test_json_report() -> io::Result<()> {
        let mut measurement = sample_measurement();
        measurement.statistics.irq_generated = Some(8);
        let report = MeasurementReport::from(&measurement);

        let mut buf = Vec::new();
        report.write_json(&mut buf)?;
        let text = String::from_utf8_lossy(&buf);
        assert_snapshot!(text.trim_end(), @r#"
        {
          "irq_frequency_hz": 1000,
          "fclk_hz": 100000000,
          "divider": 100000,
          "irq_count": 9,
          "irq_missed": 1,
          "irq_sampled": 7,
          "irq_generated": 8,
          "histogram": [
            {
              "latency_us": 12,
              "count": 3
            },
            {
              "latency_us": 13,
              "count": 2
            },
            {
              "latency_us": 250,
              "count": 1
            }
          ]
        }
        "#);

        let back: MeasurementReport = serde_json::from_slice(&buf)?;
        assert_eq!(back, report);
        Ok(())
    }
}
