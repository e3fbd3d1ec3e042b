use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment prefix for config overrides, e.g. `KEYSPACE__EVENT_LOOP__SELECT_TIMEOUT_MS=500`.
pub const ENV_PREFIX: &str = "KEYSPACE";

/// Loads a config file and deserializes it into `T`.
///
/// Values from the environment (prefixed with [`ENV_PREFIX`], `__` separated) take
/// precedence over the file.
pub fn load_cfg<T: for<'a> Deserialize<'a>>(path: impl AsRef<str>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let cfg = Config::builder()
        .add_source(File::from(PathBuf::from(path)))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("failed to read config from {path}"))?;

    cfg.try_deserialize()
        .with_context(|| format!("failed to deserialize config from {path}"))
}
