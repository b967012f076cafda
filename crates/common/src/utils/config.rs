use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Separator between the prefix, sections and keys of environment overrides,
/// e.g. `TAP__FAUCET__COOLDOWN_SECS`.
pub const ENV_SEPARATOR: &str = "__";

/// Loads configuration from a file into a struct.
/// Supports TOML, YAML, JSON, etc. based on file extension.
pub fn load_config<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    load_layered_config(path, None)
}

/// Loads configuration from a file, then applies environment overrides whose
/// names start with `env_prefix` followed by [`ENV_SEPARATOR`].
pub fn load_layered_config<T: DeserializeOwned, P: AsRef<Path>>(
    path: P,
    env_prefix: Option<&str>,
) -> Result<T> {
    let path_str = path.as_ref().to_str().context("Invalid config path")?;

    let mut builder = Config::builder().add_source(File::with_name(path_str));
    if let Some(prefix) = env_prefix {
        builder = builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );
    }

    let settings = builder.build().context("Failed to build configuration")?;

    settings.try_deserialize::<T>().context("Failed to deserialize configuration")
}
