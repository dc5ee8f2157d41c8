//! Layered YAML configuration loading.
//!
//! A service's configuration is the deep merge of several YAML files, read
//! in order. Later files override earlier ones key by key; missing files are
//! skipped. The file list comes from `APP_CONFIG_FILES` (comma separated) or
//! falls back to a set of conventional locations.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::{Error, Result};

/// Environment variable listing config files, comma separated.
pub const CONFIG_FILES_ENV: &str = "APP_CONFIG_FILES";

/// Files tried when [`CONFIG_FILES_ENV`] is unset. The working directory may
/// be the service's `src` directory or the project root.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "./src/nmtkit-config-default.yaml",
    "./nmtkit-config-default.yaml",
    "./conf/nmtkit-config.yaml",
    "./nmtkit-config.yaml",
    "../nmtkit-config.yaml",
];

/// Load one YAML file.
///
/// A file that does not exist, or holds an empty document, yields an empty mapping.
pub fn load_yaml(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Mapping(Mapping::new()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    let value: Value = serde_yaml::from_str(&content)?;

    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Recursively merge `overlay` into a copy of `base`.
///
/// Mappings merge key by key; any other overlay value replaces the base value.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let next = match merged.get(key) {
                    Some(existing @ Value::Mapping(_)) if value.is_mapping() => {
                        deep_merge(existing, value)
                    }
                    _ => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Mapping(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Load and merge the given files in order.
pub fn load_config<P: AsRef<Path>>(files: &[P]) -> Result<Value> {
    let mut config = Value::Mapping(Mapping::new());

    for file in files {
        let path = file.as_ref();
        log::debug!("Looking for config file: {} ...", path.display());
        if path.exists() {
            log::info!("Loading config file: {}", path.display());
        }
        config = deep_merge(&config, &load_yaml(path)?);
    }

    Ok(config)
}

/// Resolve the config file list from a raw `APP_CONFIG_FILES` value.
pub fn config_files_from(env_value: Option<&str>) -> Vec<PathBuf> {
    match env_value {
        Some(files) if !files.trim().is_empty() => files
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(PathBuf::from)
            .collect(),
        _ => DEFAULT_CONFIG_FILES.iter().map(PathBuf::from).collect(),
    }
}

/// The config file list for this process.
pub fn get_config_files() -> Vec<PathBuf> {
    let env_value = std::env::var(CONFIG_FILES_ENV).ok();
    config_files_from(env_value.as_deref())
}

/// Load, merge and deserialize configuration files into a settings type.
pub fn load_settings<T, P>(files: &[P]) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let merged = load_config(files)?;
    serde_yaml::from_value(merged)
        .map_err(|e| Error::config(format!("Invalid configuration: {e}")))
}
