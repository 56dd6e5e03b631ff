//! Run configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interrupt wait timeout. Bounds how long a raised stop signal can go
/// unnoticed.
pub const WAIT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default interrupt frequency in Hz.
pub const DEFAULT_IRQ_FREQUENCY_HZ: u32 = 1000;

/// Parameters of one measurement run. Immutable once the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Requested interrupt frequency in Hz.
    pub irq_frequency_hz: u32,

    /// Number of wakeups after which the run drains. `0` runs until stopped.
    pub irq_count_limit: u64,

    /// Read the generator's count register before stopping it.
    pub cross_check: bool,

    /// Timeout of each interrupt wait.
    #[serde(with = "duration_ms")]
    pub wait_timeout: Duration,
}

impl EngineConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero frequency or a zero wait timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.irq_frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        if self.wait_timeout.is_zero() {
            return Err(ConfigError::ZeroWaitTimeout);
        }
        Ok(())
    }

    /// Check whether the run has a sample budget.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.irq_count_limit > 0
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            irq_frequency_hz: DEFAULT_IRQ_FREQUENCY_HZ,
            irq_count_limit: 0,
            cross_check: false,
            wait_timeout: WAIT_TIMEOUT,
        }
    }
}

/// Builder for `EngineConfig`.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the interrupt frequency in Hz.
    #[must_use]
    pub fn irq_frequency_hz(mut self, hz: u32) -> Self {
        self.config.irq_frequency_hz = hz;
        self
    }

    /// Set the wakeup budget; `0` means unbounded.
    #[must_use]
    pub fn irq_count_limit(mut self, limit: u64) -> Self {
        self.config.irq_count_limit = limit;
        self
    }

    /// Enable or disable the hardware count cross-check.
    #[must_use]
    pub fn cross_check(mut self, enabled: bool) -> Self {
        self.config.cross_check = enabled;
        self
    }

    /// Set the per-wait timeout.
    #[must_use]
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_timeout = timeout;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
