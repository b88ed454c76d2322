// Configuration sections
use chrono::Duration;
use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Root configuration for every pipeline component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditCareConfig {
    pub normalizer: NormalizerSettings,
    pub bulk_load: BulkLoadSettings,
    pub rules: RuleSettings,
    pub balancer: BalancerSettings,
    pub approval: ApprovalSettings,
    pub logging: LoggerConfig,
}

impl AuditCareConfig {
    /// Check every section; called by the loader before handing out a config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.normalizer.validate()?;
        self.bulk_load.validate()?;
        self.rules.validate()?;
        self.balancer.validate()?;
        self.approval.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSettings {
    /// Service records written per store round-trip
    pub chunk_size: usize,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self { chunk_size: 500 }
    }
}

impl NormalizerSettings {
    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "normalizer.chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkLoadSettings {
    pub delimiter: String,
    pub encoding: TextEncoding,
}

impl Default for BulkLoadSettings {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            encoding: TextEncoding::Utf8,
        }
    }
}

impl BulkLoadSettings {
    /// The single delimiter character
    pub fn delimiter_char(&self) -> char {
        self.delimiter.chars().next().unwrap_or(',')
    }

    fn validate(&self) -> Result<()> {
        if self.delimiter.chars().count() != 1 {
            return Err(ConfigError::ValidationError(format!(
                "bulk_load.delimiter must be a single character, got '{}'",
                self.delimiter
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    /// Share of the billed amount suggested for a sex/setting restriction mismatch
    pub restriction_deduction_ratio: f64,
    /// Share of the billed amount suggested when a mandatory diagnosis is absent
    pub missing_diagnosis_ratio: f64,
    /// Billed amount from which any finding is escalated to critical priority
    pub high_value_threshold: u64,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            restriction_deduction_ratio: 0.5,
            missing_diagnosis_ratio: 0.0,
            high_value_threshold: 5_000_000,
        }
    }
}

impl RuleSettings {
    fn validate(&self) -> Result<()> {
        // Only catalog-validation findings may suggest the full billed amount
        for (name, ratio) in [
            ("rules.restriction_deduction_ratio", self.restriction_deduction_ratio),
            ("rules.missing_diagnosis_ratio", self.missing_diagnosis_ratio),
        ] {
            if !(0.0..1.0).contains(&ratio) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be in [0, 1), got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

/// Weights of the assignment fit score; they must sum to one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerWeights {
    pub load: f64,
    pub specialization: f64,
    pub performance: f64,
    pub priority: f64,
}

impl Default for BalancerWeights {
    fn default() -> Self {
        Self {
            load: 0.4,
            specialization: 0.3,
            performance: 0.2,
            priority: 0.1,
        }
    }
}

impl BalancerWeights {
    pub fn sum(&self) -> f64 {
        self.load + self.specialization + self.performance + self.priority
    }

    /// # Errors
    ///
    /// Fails when a weight is negative or not finite, or the sum is not one.
    pub fn validate(&self) -> Result<()> {
        let weights = [self.load, self.specialization, self.performance, self.priority];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "balancer weights must be non-negative: {self:?}"
            )));
        }
        if (self.sum() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::ValidationError(format!(
                "balancer weights must sum to 1, got {}",
                self.sum()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerSettings {
    pub weights: BalancerWeights,
    /// Ceiling applied to roster members that declare none
    pub default_daily_capacity: u32,
}

impl Default for BalancerSettings {
    fn default() -> Self {
        Self {
            weights: BalancerWeights::default(),
            default_daily_capacity: 40,
        }
    }
}

impl BalancerSettings {
    fn validate(&self) -> Result<()> {
        self.weights.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalSettings {
    pub deadline_hours: i64,
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self { deadline_hours: 24 }
    }
}

impl ApprovalSettings {
    pub fn deadline(&self) -> Duration {
        Duration::hours(self.deadline_hours)
    }

    fn validate(&self) -> Result<()> {
        if self.deadline_hours <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "approval.deadline_hours must be positive, got {}",
                self.deadline_hours
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AuditCareConfig::default().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let weights = BalancerWeights {
            load: 0.5,
            specialization: 0.5,
            performance: 0.5,
            priority: 0.0,
        };
        assert!(matches!(weights.validate(), Err(ConfigError::ValidationError(_))));

        let negative = BalancerWeights {
            load: 1.2,
            specialization: -0.2,
            performance: 0.0,
            priority: 0.0,
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_full_ratio_reserved_for_catalog_findings() {
        let mut config = AuditCareConfig::default();
        config.rules.restriction_deduction_ratio = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config = AuditCareConfig::default();
        config.normalizer.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_delimiter_must_be_one_char() {
        let mut config = AuditCareConfig::default();
        config.bulk_load.delimiter = "||".to_string();
        assert!(config.validate().is_err());

        config.bulk_load.delimiter = "|".to_string();
        assert_eq!(config.bulk_load.delimiter_char(), '|');
    }
}
