use crate::core::currency::{Currency, CurrencyRegistry};
use crate::core::money::RoundingPolicy;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine configuration.
///
/// ```
/// use settlement_engine::config::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{
///     "rounding": "HALF_EVEN",
///     "currencies": [
///         { "code": "USD", "decimal_places": 2, "is_base": true },
///         { "code": "JPY", "decimal_places": 0 }
///     ]
/// }"#).unwrap();
/// let registry = config.validate().unwrap();
/// assert_eq!(registry.base().unwrap().code.as_str(), "USD");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rounding used both for stage apportionment and currency conversion.
    #[serde(default)]
    pub rounding: RoundingPolicy,
    pub currencies: Vec<Currency>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rounding: RoundingPolicy::default(),
            currencies: vec![
                Currency::new("USD", 2).base(),
                Currency::new("EUR", 2),
                Currency::new("CNY", 2),
            ],
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Check the currency list and build the registry from it.
    pub fn validate(&self) -> Result<CurrencyRegistry> {
        CurrencyRegistry::from_currencies(self.currencies.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_config_is_valid() {
        let registry = EngineConfig::default().validate().unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.base().unwrap().code.as_str(), "USD");
    }

    #[test]
    fn test_rounding_defaults_to_half_up() {
        let config = EngineConfig::from_json_str(
            r#"{"currencies": [{"code": "EUR", "decimal_places": 2, "is_base": true}]}"#,
        )
        .unwrap();
        assert_eq!(config.rounding, RoundingPolicy::HalfUp);
    }

    #[test]
    fn test_missing_base_rejected() {
        let config = EngineConfig::from_json_str(
            r#"{"currencies": [{"code": "EUR", "decimal_places": 2}]}"#,
        )
        .unwrap();
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
