// Configuration validation
//
// Validates that values are sensible before a run starts

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &BikemartConfig) -> Result<()> {
    validate_input_config(&config.input)?;
    validate_output_config(&config.output)?;
    validate_years(&config.years)?;
    validate_batch_config(&config.batch)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_input_config(config: &InputConfig) -> Result<()> {
    if config.base_dir.as_os_str().is_empty() {
        bail!("input.base_dir must not be empty");
    }
    if config.station_master.as_os_str().is_empty() {
        bail!("input.station_master must not be empty");
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<()> {
    if config.dir.as_os_str().is_empty() {
        bail!("output.dir must not be empty");
    }
    if config.row_group_size == 0 {
        bail!("output.row_group_size must be greater than 0");
    }
    Ok(())
}

fn validate_years(years: &YearRange) -> Result<()> {
    if years.start > years.end {
        bail!(
            "years.start ({}) must not be after years.end ({})",
            years.start,
            years.end
        );
    }
    Ok(())
}

fn validate_batch_config(config: &BatchConfig) -> Result<()> {
    if config.rows == 0 {
        bail!("batch.rows must be greater than 0");
    }

    if config.rows > 10_000_000 {
        warn!(
            rows = config.rows,
            "batch.rows is very large; may cause memory issues"
        );
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if config.level.trim().is_empty() {
        bail!("logging.level must not be empty");
    }
    Ok(())
}
