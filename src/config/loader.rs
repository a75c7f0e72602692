use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::models::Config;
use super::Env;

pub const CONFIG_FILENAME: &str = ".connector-lens.yaml";

/// Global (`$HOME`) + project YAML, merged at the raw value level, then
/// decoded. Unreadable or invalid implicit files fall back to defaults.
pub fn load_merged(env: &dyn Env, project_dir: Option<&Path>) -> Config {
    match merged_value(env, project_dir) {
        Some(merged) => serde_json::from_value(merged).unwrap_or_else(|e| {
            warn!(error = %e, "invalid configuration, using defaults");
            Config::default()
        }),
        None => Config::default(),
    }
}

/// Like `load_merged`, with an explicit file layered on top. Problems with
/// the explicit file are errors.
pub fn load_with_override(env: &dyn Env, project_dir: Option<&Path>, explicit: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(explicit)
        .with_context(|| format!("failed to read config file: {}", explicit.display()))?;
    let over: serde_json::Value = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid YAML in {}", explicit.display()))?;

    let merged = match merged_value(env, project_dir) {
        Some(base) => deep_merge(base, over),
        None => over,
    };
    serde_json::from_value(merged)
        .with_context(|| format!("invalid configuration in {}", explicit.display()))
}

fn merged_value(env: &dyn Env, project_dir: Option<&Path>) -> Option<serde_json::Value> {
    let global = load_raw_yaml_global(env);
    let project = project_dir.and_then(|dir| load_raw_yaml(&dir.join(CONFIG_FILENAME)));

    match (global, project) {
        (Some(g), Some(p)) => Some(deep_merge(g, p)),
        (Some(g), None) => Some(g),
        (None, Some(p)) => Some(p),
        (None, None) => None,
    }
}

fn load_raw_yaml_global(env: &dyn Env) -> Option<serde_json::Value> {
    load_raw_yaml(&global_config_path(env)?)
}

/// Raw value, not the struct: keys absent from a file stay absent so the
/// merge keeps the base value.
fn load_raw_yaml(path: &Path) -> Option<serde_json::Value> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&content) {
        Ok(value) => {
            debug!(path = %path.display(), "loaded config layer");
            Some(value)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Deep merge: only values present in `over` replace `base`.
pub fn deep_merge(base: serde_json::Value, over: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match (base, over) {
        (Value::Object(mut b), Value::Object(o)) => {
            for (key, over_val) in o {
                let base_val = b.remove(&key).unwrap_or(Value::Null);
                b.insert(key, deep_merge(base_val, over_val));
            }
            Value::Object(b)
        }
        (base, Value::Null) => base,
        (_, over) => over,
    }
}

pub fn global_config_path(env: &dyn Env) -> Option<PathBuf> {
    let home = env.var("HOME").ok()?;
    Some(Path::new(&home).join(CONFIG_FILENAME))
}
