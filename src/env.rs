use std::path::Path;

use tracing::{info, warn};

const COMMON_ENV: &str = "config/common.env";
const SECRETS_ENV: &str = ".secrets.env";

fn is_production() -> bool {
    matches!(
        dotenvy::var("ROCKET_PROFILE").as_deref(),
        Ok("production") | Ok("release")
    )
}

/// Loads `config/common.env`, the profile file, then `.secrets.env`.
/// Later files override earlier ones; missing files are skipped.
pub fn load_environment() -> Result<(), dotenvy::Error> {
    let profile_env = if is_production() {
        "config/prod.env"
    } else {
        "config/dev.env"
    };

    for env_file in [COMMON_ENV, profile_env, SECRETS_ENV] {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), dotenvy::Error> {
    if !Path::new(path).exists() {
        warn!("Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
