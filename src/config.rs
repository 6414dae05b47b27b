use serde::{Deserialize, Serialize};
use std::{
  env,
  fs,
  path::{Path, PathBuf},
};
use tracing::warn;

use crate::error::EngineResult;
use crate::presets::PresetCatalog;

pub const CONFIG_FILE_NAME: &str = "engine.json";
pub const PRESETS_PATH_VAR: &str = "TOURNAMENT_PRESETS_PATH";
pub const LOG_DIR_VAR: &str = "TOURNAMENT_LOG_DIR";
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
  /// JSON array of extra presets, merged over the built-ins.
  pub presets_path: Option<PathBuf>,
  pub log_dir: PathBuf,
  pub log_filter: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    EngineConfig {
      presets_path: None,
      log_dir: PathBuf::from("logs"),
      log_filter: "info".to_string(),
    }
  }
}

pub fn resolve_path(base: &Path, raw: &str) -> PathBuf {
  let path = PathBuf::from(raw.trim());
  if path.is_absolute() {
    path
  } else {
    base.join(path)
  }
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

/// Overrides from `lookup` (normally the process environment).
pub fn apply_overrides(mut config: EngineConfig, lookup: impl Fn(&str) -> Option<String>) -> EngineConfig {
  if let Some(value) = lookup(PRESETS_PATH_VAR) {
    config.presets_path = Some(PathBuf::from(value));
  }
  if let Some(value) = lookup(LOG_DIR_VAR) {
    config.log_dir = PathBuf::from(value);
  }
  if let Some(value) = lookup(LOG_FILTER_VAR) {
    config.log_filter = value;
  }
  config
}

pub fn apply_env_defaults(config: EngineConfig) -> EngineConfig {
  apply_overrides(config, env_default)
}

/// Reads `path` (or `engine.json` in the working directory) if it exists,
/// then applies environment overrides.
pub fn load_config(path: Option<&Path>) -> EngineResult<EngineConfig> {
  let path = match path {
    Some(path) => path.to_path_buf(),
    None => env::current_dir()?.join(CONFIG_FILE_NAME),
  };
  if !path.is_file() {
    return Ok(apply_env_defaults(EngineConfig::default()));
  }
  let data = fs::read_to_string(&path)?;
  let mut config = serde_json::from_str::<EngineConfig>(&data)?;
  if let (Some(presets), Some(base)) = (config.presets_path.take(), path.parent()) {
    config.presets_path = Some(resolve_path(base, &presets.to_string_lossy()));
  }
  Ok(apply_env_defaults(config))
}

/// Built-in presets plus the configured preset file, if any.
pub fn load_preset_catalog(config: &EngineConfig) -> EngineResult<PresetCatalog> {
  let mut catalog = PresetCatalog::builtin();
  let Some(path) = config.presets_path.as_deref() else {
    return Ok(catalog);
  };
  if !path.is_file() {
    warn!("preset file {} not found; using built-in presets", path.display());
    return Ok(catalog);
  }
  catalog.merge(PresetCatalog::read_file(path)?)?;
  Ok(catalog)
}

/// Loads `KEY=value` lines from `dir/.env` without overriding variables
/// that are already set.
pub fn load_env_file(dir: &Path) {
  let env_path = dir.join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(e) => {
      warn!("read {}: {e}", env_path.display());
      return;
    }
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn test_parse_env_line() {
    assert_eq!(
      parse_env_line("export TOURNAMENT_LOG_DIR=\"/tmp/logs\""),
      Some(("TOURNAMENT_LOG_DIR".to_string(), "/tmp/logs".to_string()))
    );
    assert_eq!(
      parse_env_line("RUST_LOG=debug # verbose"),
      Some(("RUST_LOG".to_string(), "debug".to_string()))
    );
    assert_eq!(parse_env_line("# comment"), None);
    assert_eq!(parse_env_line("=value"), None);
    assert_eq!(parse_env_line("no equals"), None);
  }

  #[test]
  fn test_overrides() {
    let vars: HashMap<&str, &str> = [(PRESETS_PATH_VAR, "presets.json"), (LOG_FILTER_VAR, "debug")]
      .into_iter()
      .collect();
    let config = apply_overrides(EngineConfig::default(), |key| vars.get(key).map(|v| v.to_string()));
    assert_eq!(config.presets_path, Some(PathBuf::from("presets.json")));
    assert_eq!(config.log_filter, "debug");
    assert_eq!(config.log_dir, PathBuf::from("logs"));
  }

  #[test]
  fn test_load_config_resolves_presets_next_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, r#"{ "presetsPath": "my_presets.json", "logDir": "out" }"#).unwrap();
    let config = load_config(Some(&path)).unwrap();
    if env_default(PRESETS_PATH_VAR).is_none() {
      assert_eq!(config.presets_path, Some(dir.path().join("my_presets.json")));
    }
    if env_default(LOG_FILTER_VAR).is_none() {
      assert_eq!(config.log_filter, "info");
    }
  }

  #[test]
  fn test_preset_file_merges_over_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let presets_path = dir.path().join("presets.json");
    let custom = r#"[{
      "name": "duo6",
      "kind": "tournament",
      "minPlayers": 5,
      "maxPlayers": 6,
      "rounds": [
        { "name": "Heats", "numStages": 2, "winners": 1,
          "winnersDestination": { "roundIndex": 1, "handicap": "winnersDest" } },
        { "name": "Final", "numStages": 1 }
      ]
    }]"#;
    fs::write(&presets_path, custom).unwrap();
    let config = EngineConfig {
      presets_path: Some(presets_path),
      ..EngineConfig::default()
    };
    let catalog = load_preset_catalog(&config).unwrap();
    assert!(catalog.get("duo6").is_some());
    assert!(catalog.get("single16").is_some());
  }

  #[test]
  fn test_missing_preset_file_falls_back() {
    let config = EngineConfig {
      presets_path: Some(PathBuf::from("/definitely/not/here.json")),
      ..EngineConfig::default()
    };
    let catalog = load_preset_catalog(&config).unwrap();
    assert_eq!(catalog.iter().count(), 3);
  }
}
