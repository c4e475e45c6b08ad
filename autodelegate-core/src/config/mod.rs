mod loader;
pub mod settings;
pub mod value;

use std::fmt;
use std::path::Path;

use loader::Values;

pub use settings::{CovarianceMode, GeneratorSettings, ReturnTiebreak};
pub use value::{ConfigValue, SettingValue};

/// Environment variable selecting the active profile.
pub const PROFILE_ENV: &str = "AUTODELEGATE_PROFILE";

/// Prefix of environment variables overlaid onto the file configuration.
pub const ENV_PREFIX: &str = "AUTODELEGATE_";

/// A setting that parsed but is out of range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationDetail {
    pub key: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ConfigError {
    /// A setting holds a value of the wrong shape.
    TypeMismatch { key: String, expected: &'static str },
    /// A configuration file could not be read or is not YAML.
    Load(String),
    /// Every out-of-range setting, reported together.
    Validation(Vec<ConfigValidationDetail>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "cannot load configuration: {msg}"),
            ConfigError::Validation(details) => {
                let plural = if details.len() == 1 { "" } else { "s" };
                write!(f, "{} invalid setting{plural}:", details.len())?;
                for detail in details {
                    write!(f, "\n  {} {}", detail.key, detail.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Generator configuration loaded from YAML files and environment variables.
///
/// Resolution order (lowest to highest priority):
/// 1. `autodelegate.yaml` (base)
/// 2. `autodelegate-{profile}.yaml` (profile override)
/// 3. Environment variables (`AUTODELEGATE_GENERATOR_INDENT` overrides
///    `generator.indent`)
///
/// Profile is determined by: `AUTODELEGATE_PROFILE` env var > argument >
/// default `"dev"`.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    values: Values,
    profile: String,
}

impl GeneratorConfig {
    /// Load from the current working directory, overlaying the process
    /// environment.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile, std::env::vars())
    }

    /// Load `autodelegate.yaml` and `autodelegate-{profile}.yaml` from `dir`,
    /// then overlay `env`.
    pub fn load_from(
        dir: &Path,
        profile: &str,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        let env: Vec<(String, String)> = env.into_iter().collect();
        let active_profile = env
            .iter()
            .find(|(key, _)| key == PROFILE_ENV)
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| profile.to_string());

        let mut values = Values::new();
        loader::merge_file(&dir.join("autodelegate.yaml"), &mut values)?;
        loader::merge_file(&dir.join(format!("autodelegate-{active_profile}.yaml")), &mut values)?;

        for (env_key, env_val) in env {
            let Some(rest) = env_key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if env_key == PROFILE_ENV || rest.is_empty() {
                continue;
            }
            let key = loader::env_key_to_config_key(rest, settings::KNOWN_KEYS);
            values.insert(key, ConfigValue::Text(env_val));
        }

        tracing::debug!(profile = %active_profile, keys = values.len(), "configuration loaded");
        Ok(Self {
            values,
            profile: active_profile,
        })
    }

    /// A single in-memory document, with no environment overlay.
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = Values::new();
        loader::merge_str(yaml, &mut values)?;
        Ok(Self {
            values,
            profile: profile.to_string(),
        })
    }

    pub fn empty() -> Self {
        Self {
            values: Values::new(),
            profile: "test".to_string(),
        }
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// The setting at `key`, or `default` when the key is absent. A present
    /// but malformed value is still an error.
    pub fn get_or<V: SettingValue>(&self, key: &str, default: V) -> Result<V, ConfigError> {
        match self.values.get(key) {
            Some(value) => V::from_value(value, key),
            None => Ok(default),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Build and validate the typed settings.
    pub fn settings(&self) -> Result<GeneratorSettings, ConfigError> {
        GeneratorSettings::from_config(self)
    }
}
