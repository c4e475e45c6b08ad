use std::fmt;

use super::value::{ConfigValue, SettingValue};
use super::{ConfigError, ConfigValidationDetail, GeneratorConfig};

/// Every key the generator reads.
pub const KNOWN_KEYS: &[&str] = &[
    "generator.return_tiebreak",
    "generator.covariance",
    "generator.generated_annotation",
    "generator.indent",
    "generator.max_rounds",
    "logging.filter",
];

/// Which candidate's parameter names and `throws` clause are kept when
/// several are equally valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnTiebreak {
    /// Fewest checked exceptions, then first in breadth-first order.
    #[default]
    Narrowest,
    /// First in breadth-first order.
    FirstDeclared,
}

/// How return types of unrelated sibling declarations must relate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CovarianceMode {
    /// Siblings must agree exactly; narrowing only happens through overriding.
    #[default]
    OverrideOnly,
    /// A sibling whose return type is a subtype of all others satisfies them.
    Java,
}

impl fmt::Display for ReturnTiebreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReturnTiebreak::Narrowest => "narrowest",
            ReturnTiebreak::FirstDeclared => "first-declared",
        })
    }
}

impl fmt::Display for CovarianceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CovarianceMode::OverrideOnly => "override-only",
            CovarianceMode::Java => "java",
        })
    }
}

impl SettingValue for ReturnTiebreak {
    fn from_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match String::from_value(value, key)?.to_lowercase().replace('_', "-").as_str() {
            "narrowest" => Ok(ReturnTiebreak::Narrowest),
            "first-declared" => Ok(ReturnTiebreak::FirstDeclared),
            _ => Err(ConfigError::TypeMismatch {
                key: key.to_string(),
                expected: "one of `narrowest`, `first-declared`",
            }),
        }
    }
}

impl SettingValue for CovarianceMode {
    fn from_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match String::from_value(value, key)?.to_lowercase().replace('_', "-").as_str() {
            "override-only" => Ok(CovarianceMode::OverrideOnly),
            "java" => Ok(CovarianceMode::Java),
            _ => Err(ConfigError::TypeMismatch {
                key: key.to_string(),
                expected: "one of `override-only`, `java`",
            }),
        }
    }
}

/// Typed view of the generator's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub return_tiebreak: ReturnTiebreak,
    pub covariance: CovarianceMode,
    pub generated_annotation: bool,
    pub indent: usize,
    pub max_rounds: usize,
    pub log_filter: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            return_tiebreak: ReturnTiebreak::default(),
            covariance: CovarianceMode::default(),
            generated_annotation: true,
            indent: 2,
            max_rounds: 16,
            log_filter: "info".to_string(),
        }
    }
}

impl GeneratorSettings {
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Self {
            return_tiebreak: config.get_or("generator.return_tiebreak", defaults.return_tiebreak)?,
            covariance: config.get_or("generator.covariance", defaults.covariance)?,
            generated_annotation: config
                .get_or("generator.generated_annotation", defaults.generated_annotation)?,
            indent: config.get_or("generator.indent", defaults.indent)?,
            max_rounds: config.get_or("generator.max_rounds", defaults.max_rounds)?,
            log_filter: config.get_or("logging.filter", defaults.log_filter)?,
        };

        let mut details = Vec::new();
        if !(1..=8).contains(&settings.indent) {
            details.push(ConfigValidationDetail {
                key: "generator.indent".into(),
                message: format!("must be between 1 and 8, got {}", settings.indent),
            });
        }
        if settings.max_rounds == 0 {
            details.push(ConfigValidationDetail {
                key: "generator.max_rounds".into(),
                message: "must be at least 1".into(),
            });
        }
        if !details.is_empty() {
            return Err(ConfigError::Validation(details));
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_an_empty_config() {
        let settings = GeneratorConfig::empty().settings().unwrap();
        assert_eq!(settings, GeneratorSettings::default());
        assert_eq!(settings.covariance, CovarianceMode::OverrideOnly);
        assert_eq!(settings.return_tiebreak, ReturnTiebreak::Narrowest);
    }

    #[test]
    fn enum_settings_accept_either_separator() {
        let config = GeneratorConfig::from_yaml_str(
            "generator:\n  return_tiebreak: first_declared\n  covariance: java\n",
            "test",
        )
        .unwrap();
        let settings = config.settings().unwrap();
        assert_eq!(settings.return_tiebreak, ReturnTiebreak::FirstDeclared);
        assert_eq!(settings.covariance, CovarianceMode::Java);
    }

    #[test]
    fn out_of_range_values_are_all_reported() {
        let config =
            GeneratorConfig::from_yaml_str("generator:\n  indent: 12\n  max_rounds: 0\n", "test").unwrap();
        match config.settings().unwrap_err() {
            ConfigError::Validation(details) => {
                let keys: Vec<_> = details.iter().map(|d| d.key.as_str()).collect();
                assert_eq!(keys, ["generator.indent", "generator.max_rounds"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_enum_value_is_a_mismatch() {
        let config = GeneratorConfig::from_yaml_str("generator:\n  covariance: loose\n", "test").unwrap();
        assert!(matches!(
            config.settings().unwrap_err(),
            ConfigError::TypeMismatch { ref key, .. } if key == "generator.covariance"
        ));
    }
}
