// Configuration source loading.
//
// Priority order:
// 1. Environment variables (BIKEMART_* prefix)
// 2. Config file path from BIKEMART_CONFIG
// 3. Inline config content from BIKEMART_CONFIG_CONTENT
// 4. Default config files (./bikemart.toml, ./config.toml)
// 5. Built-in defaults
//
// Validation is left to the caller so CLI flags can be applied first.

use crate::env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};
use crate::BikemartConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_FILES: [&str; 2] = ["./bikemart.toml", "./config.toml"];

pub(crate) fn load_config<E: EnvSource>(env: &E) -> Result<BikemartConfig> {
    let mut config = load_from_file(env)?.unwrap_or_default();
    apply_env_overrides(&mut config, env)?;
    Ok(config)
}

fn load_from_file<E: EnvSource>(env: &E) -> Result<Option<BikemartConfig>> {
    if let Some(path) = env.get("CONFIG") {
        return read_file(Path::new(&path)).map(Some);
    }

    if let Some(content) = env.get("CONFIG_CONTENT") {
        let config = BikemartConfig::from_toml(&content)
            .context("Failed to parse inline config from BIKEMART_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_FILES {
        let path = Path::new(path);
        if path.exists() {
            return read_file(path).map(Some);
        }
    }

    Ok(None)
}

/// Start from the file at `path`, then apply environment overrides.
/// Returns error if the file doesn't exist or can't be parsed.
pub(crate) fn load_from_file_path<E: EnvSource>(path: &Path, env: &E) -> Result<BikemartConfig> {
    let mut config = read_file(path)?;
    apply_env_overrides(&mut config, env)?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<BikemartConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    BikemartConfig::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Process environment.
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}
