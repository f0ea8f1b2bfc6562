use crate::{BikemartConfig, LogFormat};
use anyhow::{anyhow, Result};
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "BIKEMART_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    /// Get a variable by its key without the `BIKEMART_` prefix.
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut BikemartConfig, env: &E) -> Result<()> {
    // Input
    if let Some(dir) = get_env_path(env, "BASE_DIR") {
        config.input.base_dir = dir;
    }
    if let Some(path) = get_env_path(env, "STATION_MASTER") {
        config.input.station_master = path;
    }

    // Output
    if let Some(dir) = get_env_path(env, "OUTPUT_DIR") {
        config.output.dir = dir;
    }
    if let Some(val) = get_env_usize(env, "ROW_GROUP_SIZE")? {
        config.output.row_group_size = val;
    }

    // Years
    if let Some(val) = get_env_i32(env, "YEAR_START")? {
        config.years.start = val;
    }
    if let Some(val) = get_env_i32(env, "YEAR_END")? {
        config.years.end = val;
    }

    // Batch and parallelism
    if let Some(val) = get_env_usize(env, "BATCH_ROWS")? {
        config.batch.rows = val;
    }
    if let Some(val) = get_env_usize(env, "WORKERS")? {
        config.parallel.workers = val;
    }

    // Logging
    if let Some(level) = env.get("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.logging.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

fn get_env_path<E: EnvSource>(env: &E, key: &str) -> Option<PathBuf> {
    env.get(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .trim()
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_i32<E: EnvSource>(env: &E, key: &str) -> Result<Option<i32>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .trim()
                .parse::<i32>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
