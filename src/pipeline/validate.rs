// src/pipeline/validate.rs

use crate::error::Result;
use crate::models::{Config, Credentials};
use crate::utils::report;

/// Validate configuration, including every selector the run will compile.
///
/// Missing credentials are reported but do not fail validation; `finalize`
/// and `status` work without them.
pub fn run_validate(config: &Config) -> Result<()> {
    report::header("Validating configuration");

    if let Err(e) = config.validate() {
        log::error!("Validation failed: {}", e);
        return Err(e);
    }
    report::outcome("Configuration", true);

    report::summary(
        "Settings",
        &[
            ("WebDriver", config.surface.webdriver_url.clone()),
            ("Target", config.site.target_url.clone()),
            ("Step", format!("{}px", config.scroll.step)),
            ("Batch size", config.scroll.batch_size.to_string()),
            ("Stall limit", config.scroll.max_stall_attempts.to_string()),
            ("Data directory", config.paths.data_dir.display().to_string()),
        ],
    );

    match Credentials::from_env() {
        Ok(_) => log::info!("Credentials found in the environment"),
        Err(e) => log::warn!("{}; `run` will fail until they are set", e),
    }
    Ok(())
}
