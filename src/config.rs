//! Engine and converter settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Parse(String),
    #[error("Failed to serialize to TOML: {0}")]
    Serialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// ISO-4217 code stamped on currency results.
    pub currency: String,

    /// Decimal places used when rendering values.
    pub precision: u32,

    /// Vacancy applied by the stream converter when the model supplies none (percent).
    pub default_vacancy_rate_percent: f64,

    /// Group name for line items without a category.
    pub default_category: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            precision: 2,
            default_vacancy_rate_percent: 5.0,
            default_category: "Miscellaneous".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Invalid(format!(
                "currency must be a three-letter ISO code, got '{}'",
                self.currency
            )));
        }
        if self.precision > 10 {
            return Err(ConfigError::Invalid("precision cannot exceed 10".to_string()));
        }
        let v = self.default_vacancy_rate_percent;
        if !v.is_finite() || !(0.0..=100.0).contains(&v) {
            return Err(ConfigError::Invalid(format!(
                "defaultVacancyRatePercent must be within [0, 100], got {}",
                v
            )));
        }
        if self.default_category.trim().is_empty() {
            return Err(ConfigError::Invalid("defaultCategory cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Parses and validates a TOML document. Missing keys take their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml("currency = \"EUR\"\nprecision = 0\n").unwrap();
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.precision, 0);
        assert_eq!(config.default_vacancy_rate_percent, 5.0);
        assert_eq!(config.default_category, "Miscellaneous");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig { default_vacancy_rate_percent: 7.5, ..Default::default() };
        let text = config.to_toml().unwrap();
        assert!(text.contains("defaultVacancyRatePercent"));
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(EngineConfig::from_toml("currency = \"usd\""), Err(ConfigError::Invalid(_))));
        assert!(matches!(
            EngineConfig::from_toml("defaultVacancyRatePercent = 140.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(EngineConfig::from_toml("precision = \"two\""), Err(ConfigError::Parse(_))));
    }
}
