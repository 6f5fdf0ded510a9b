//! Configuration-level validation, run once after layering completes.

use super::model::ThresholdsConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("thresholds.sample_rate must be in [0, 1], got {0}")]
    SampleRateOutOfRange(f64),
    #[error("thresholds.a_min_bytes must be > 0")]
    ZeroAMinBytes,
    #[error("llm.max_batch_size must be > 0")]
    ZeroMaxBatchSize,
    #[error("llm.concurrency must be > 0")]
    ZeroConcurrency,
}

pub fn validate_thresholds(thresholds: &ThresholdsConfig) -> Result<(), ConfigValidationError> {
    if !(0.0..=1.0).contains(&thresholds.sample_rate) {
        return Err(ConfigValidationError::SampleRateOutOfRange(thresholds.sample_rate));
    }
    if thresholds.a_min_bytes == 0 {
        return Err(ConfigValidationError::ZeroAMinBytes);
    }
    Ok(())
}

pub fn validate_llm(llm: &super::model::LlmConfig) -> Result<(), ConfigValidationError> {
    if llm.max_batch_size == 0 {
        return Err(ConfigValidationError::ZeroMaxBatchSize);
    }
    if llm.concurrency == 0 {
        return Err(ConfigValidationError::ZeroConcurrency);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{LlmConfig, ThresholdsConfig};

    #[test]
    fn rejects_out_of_range_sample_rate() {
        let thresholds = ThresholdsConfig {
            sample_rate: 1.5,
            ..ThresholdsConfig::default()
        };
        assert_eq!(
            validate_thresholds(&thresholds),
            Err(ConfigValidationError::SampleRateOutOfRange(1.5))
        );
    }

    #[test]
    fn accepts_default_thresholds() {
        assert!(validate_thresholds(&ThresholdsConfig::default()).is_ok());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let llm = LlmConfig {
            concurrency: 0,
            ..LlmConfig::default()
        };
        assert_eq!(validate_llm(&llm), Err(ConfigValidationError::ZeroConcurrency));
    }
}
