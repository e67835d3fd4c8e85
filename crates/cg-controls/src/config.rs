//! Serializable loop configuration.
//!
//! Configuration is plain data; [`LoopConfig::validate`] checks it before a
//! controller is built from it.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};
use crate::sampled::{DEFAULT_PERIOD_S, SampleConfig};

/// PID gains, with optional feedforward on the reference.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kff: Option<f64>,
}

impl PidGains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            kff: None,
        }
    }

    pub fn with_feedforward(mut self, kff: f64) -> Self {
        self.kff = Some(kff);
        self
    }
}

/// Span of the measured quantity, optionally cyclic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputRange {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub continuous: bool,
}

/// Settling bounds. A missing `delta` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    pub error: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
}

impl ToleranceConfig {
    pub fn delta_or_inf(&self) -> f64 {
        self.delta.unwrap_or(f64::INFINITY)
    }
}

fn default_period_s() -> f64 {
    DEFAULT_PERIOD_S
}

fn default_output_range() -> (f64, f64) {
    (-1.0, 1.0)
}

/// Everything needed to build one closed loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub gains: PidGains,
    #[serde(default = "default_period_s")]
    pub period_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub izone: Option<f64>,
    #[serde(default = "default_output_range")]
    pub output_range: (f64, f64),
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_range: Option<InputRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<ToleranceConfig>,
}

impl LoopConfig {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            period_s: DEFAULT_PERIOD_S,
            izone: None,
            output_range: default_output_range(),
            input_range: None,
            tolerance: None,
        }
    }

    pub fn sample_config(&self) -> ControlResult<SampleConfig> {
        SampleConfig::new(self.period_s)
    }

    /// Reject values that would make the loop meaningless.
    pub fn validate(&self) -> ControlResult<()> {
        let gains = [
            ("kp", self.gains.kp),
            ("ki", self.gains.ki),
            ("kd", self.gains.kd),
            ("kff", self.gains.kff.unwrap_or(0.0)),
        ];
        for (name, value) in gains {
            if !value.is_finite() {
                return Err(ControlError::Config {
                    what: format!("gain {name} must be finite, got {value}"),
                });
            }
        }

        self.sample_config()?;

        if let Some(izone) = self.izone {
            if izone.is_nan() || izone < 0.0 {
                return Err(ControlError::Config {
                    what: format!("izone must be non-negative, got {izone}"),
                });
            }
        }

        let (min_u, max_u) = self.output_range;
        if min_u.is_nan() || max_u.is_nan() || min_u > max_u {
            return Err(ControlError::Config {
                what: format!("output range [{min_u}, {max_u}] is empty"),
            });
        }

        if let Some(range) = self.input_range {
            if range.min.is_nan() || range.max.is_nan() || range.min >= range.max {
                return Err(ControlError::Config {
                    what: format!("input range [{}, {}] is empty", range.min, range.max),
                });
            }
        }

        if let Some(tol) = self.tolerance {
            let positive = |v: f64| v > 0.0;
            if !positive(tol.error) || !positive(tol.delta_or_inf()) {
                return Err(ControlError::Config {
                    what: "tolerances must be positive".to_string(),
                });
            }
        }

        Ok(())
    }
}
