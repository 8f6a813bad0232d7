use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::RequesterConfig;

/// Prefix of environment variables overriding file values
/// (`DOWNSTREAM__DEFAULT_TIMEOUT=10s`, `DOWNSTREAM__POOL__EXPIRY=1h`).
pub const ENV_PREFIX: &str = "DOWNSTREAM";

/// Load requester configuration from a file (YAML, JSON, TOML or INI by
/// extension) with environment overrides layered on top.
pub async fn load_config(config_path: &str) -> Result<RequesterConfig> {
    load_config_sync(config_path)
}

pub fn load_config_sync(config_path: &str) -> Result<RequesterConfig> {
    let config_path = Path::new(config_path);
    let path_str = config_path
        .to_str()
        .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?;

    let settings = Config::builder()
        .add_source(File::new(path_str, file_format(config_path)))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    settings
        .try_deserialize::<RequesterConfig>()
        .with_context(|| format!("Failed to deserialize config from {}", config_path.display()))
}

fn file_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        Some("ini") => FileFormat::Ini,
        // YAML is the default for unknown extensions
        _ => FileFormat::Yaml,
    }
}
