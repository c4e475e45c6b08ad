use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

pub(crate) type Values = HashMap<String, ConfigValue>;

/// Merge the YAML file at `path` into `values`. A missing file is skipped.
pub(crate) fn merge_file(path: &Path, values: &mut Values) -> Result<(), ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(ConfigError::Load(format!("{}: {err}", path.display()))),
    };
    merge_str(&content, values).map_err(|err| match err {
        ConfigError::Load(msg) => ConfigError::Load(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    tracing::debug!(path = %path.display(), "config file merged");
    Ok(())
}

/// Merge a YAML document into `values`, later keys replacing earlier ones.
pub(crate) fn merge_str(content: &str, values: &mut Values) -> Result<(), ConfigError> {
    let document: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    let mut path = Vec::new();
    collect_leaves(&document, &mut path, values);
    Ok(())
}

/// Record every leaf under its dotted path (`generator.indent`).
fn collect_leaves<'a>(node: &'a serde_yaml::Value, path: &mut Vec<&'a str>, values: &mut Values) {
    match node {
        serde_yaml::Value::Mapping(map) => {
            for (key, child) in map {
                // Non-string keys cannot name a setting.
                let Some(segment) = key.as_str() else { continue };
                path.push(segment);
                collect_leaves(child, path, values);
                path.pop();
            }
        }
        leaf if !path.is_empty() => {
            values.insert(path.join("."), ConfigValue::from_yaml(leaf));
        }
        _ => {}
    }
}

/// Map `AUTODELEGATE_GENERATOR_RETURN_TIEBREAK` onto `generator.return_tiebreak`.
///
/// Known keys are matched first so that underscores inside a key segment
/// survive; anything else splits on every underscore.
pub(crate) fn env_key_to_config_key(rest: &str, known: &[&str]) -> String {
    let lowered = rest.to_lowercase();
    known
        .iter()
        .find(|key| key.replace('.', "_") == lowered)
        .map(|key| key.to_string())
        .unwrap_or_else(|| lowered.replace('_', "."))
}
