//! Configuration loading from files and environment variables.

use std::path::Path;

use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};

use crate::error::{ServiceError, ServiceResult};

use super::ServiceConfig;

const ENV_PREFIX: &str = "DOCENT";

/// Load configuration from `config.*` in the working directory and env vars
pub fn load_config() -> ServiceResult<ServiceConfig> {
    build(Config::builder().add_source(File::with_name("config").required(false)))
}

/// Load configuration from an explicit file, still honoring env overrides
pub fn load_config_from(path: &Path) -> ServiceResult<ServiceConfig> {
    build(Config::builder().add_source(File::from(path)))
}

fn build(builder: ConfigBuilder<DefaultState>) -> ServiceResult<ServiceConfig> {
    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to deserialize config: {}", e),
        })
}
