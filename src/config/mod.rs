mod schema;

pub use schema::{Config, Gate, Rule, Settings, DEFAULT_UTC_OFFSET};

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "MERGEGATE_CONFIG";

/// resolve the config path: explicit override, then env var, then default
pub fn get_config_path_with_override(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .join(".mergegate")
        .join("config.json"))
}

/// load the config; a missing file yields the default without writing it
pub fn load_with_override(override_path: Option<&Path>) -> Result<Config> {
    let path = get_config_path_with_override(override_path)?;

    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// parse config text; comments and trailing commas are accepted
pub fn parse(content: &str) -> Result<Config> {
    json5::from_str(content).map_err(|e| anyhow!("invalid JSON: {}", e))
}

/// Verify configuration file and return a list of errors
pub fn verify(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config = parse(&content)?;
    Ok(verify_config(&config))
}

/// check every rule and setting of an already parsed config
pub fn verify_config(config: &Config) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (i, rule) in config.rules.iter().enumerate() {
        let prefix = format!("rules[{}] ({})", i, rule.name);

        if rule.name.trim().is_empty() {
            errors.push(format!("rules[{}]: rule name is empty", i));
        } else if !seen.insert(rule.name.as_str()) {
            errors.push(format!("{}: duplicate rule name", prefix));
        }

        if let Err(e) = rule.build() {
            let mut message = format!("{}: {}", prefix, e);
            if let Some(s) = e.suggestions().first() {
                message.push_str(&format!(" (did you mean `{}`?)", s));
            }
            errors.push(message);
        }
    }

    if config.settings.offset().is_none() {
        errors.push(format!(
            "settings.utc_offset: invalid offset '{}': use UTC or ±HH:MM",
            config.settings.utc_offset
        ));
    }

    errors
}

/// generates a config with example rules
pub fn default_with_examples() -> Config {
    Config {
        rules: vec![
            Rule {
                name: "default".to_string(),
                gate: Gate::Merge,
                conditions: vec![
                    json!("base=main"),
                    json!("-draft"),
                    json!("#approved-reviews-by>=1"),
                    json!("check-success=ci"),
                ],
                unmatched_conditions_return_failure: None,
            },
            Rule {
                name: "queue".to_string(),
                gate: Gate::Queue,
                conditions: vec![
                    json!("check-success=ci"),
                    json!({"or": ["label=urgent", "schedule=MON-FRI 09:00-17:00"]}),
                ],
                unmatched_conditions_return_failure: None,
            },
        ],
        settings: Settings::default(),
    }
}
