use super::ConfigError;

/// A configuration leaf as read from a file or the environment.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Text(String),
    Number(i64),
    Flag(bool),
    /// Present, but of a shape no setting accepts (floats, nulls, lists).
    Unsupported(&'static str),
}

impl ConfigValue {
    pub(crate) fn from_yaml(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value;
        match value {
            Value::String(text) => ConfigValue::Text(text.clone()),
            Value::Bool(flag) => ConfigValue::Flag(*flag),
            Value::Number(n) => n
                .as_i64()
                .map(ConfigValue::Number)
                .unwrap_or(ConfigValue::Unsupported("a fractional number")),
            Value::Null => ConfigValue::Unsupported("null"),
            Value::Sequence(_) => ConfigValue::Unsupported("a list"),
            Value::Mapping(_) => ConfigValue::Unsupported("a mapping"),
            Value::Tagged(_) => ConfigValue::Unsupported("a tagged value"),
        }
    }

    /// The value as text; environment overrides always arrive this way.
    fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(text) => Some(text.trim()),
            _ => None,
        }
    }
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

/// A type a generator setting can be read as.
pub trait SettingValue: Sized {
    fn from_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError>;
}

impl SettingValue for String {
    fn from_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Text(text) => Ok(text.clone()),
            ConfigValue::Number(n) => Ok(n.to_string()),
            ConfigValue::Flag(flag) => Ok(flag.to_string()),
            ConfigValue::Unsupported(_) => Err(mismatch(key, "string")),
        }
    }
}

impl SettingValue for bool {
    fn from_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        if let ConfigValue::Flag(flag) = value {
            return Ok(*flag);
        }
        match value.as_text().map(str::to_ascii_lowercase).as_deref() {
            Some("true" | "yes" | "on" | "1") => Ok(true),
            Some("false" | "no" | "off" | "0") => Ok(false),
            _ => Err(mismatch(key, "bool")),
        }
    }
}

impl SettingValue for usize {
    fn from_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        let parsed = match value {
            ConfigValue::Number(n) => usize::try_from(*n).ok(),
            other => other.as_text().and_then(|text| text.parse().ok()),
        };
        parsed.ok_or_else(|| mismatch(key, "usize"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_text_converts() {
        let raw = ConfigValue::Text(" 4".into());
        assert_eq!(usize::from_value(&raw, "generator.indent").unwrap(), 4);
        let flag = ConfigValue::Text("No".into());
        assert!(!bool::from_value(&flag, "generator.generated_annotation").unwrap());
    }

    #[test]
    fn negative_numbers_are_not_counts() {
        let err = usize::from_value(&ConfigValue::Number(-1), "generator.max_rounds").unwrap_err();
        assert_eq!(
            err.to_string(),
            "config type mismatch for 'generator.max_rounds': expected usize"
        );
    }

    #[test]
    fn lists_are_rejected() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("[a, b]").unwrap();
        let value = ConfigValue::from_yaml(&yaml);
        assert_eq!(value, ConfigValue::Unsupported("a list"));
        assert!(String::from_value(&value, "logging.filter").is_err());
    }
}
