use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use storesweep_env::GasStorageConfig;
use storesweep_sweep::config::SweepConfig;

use crate::util::read_json_file;

/// Contents of the `--config` file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) sweep: SweepConfig,
    pub(crate) environment: GasStorageConfig,
}

impl AppConfig {
    /// Reads the config file, or returns the defaults when no path is given.
    ///
    /// The environment section is validated here; the sweep section is
    /// validated by the sweep itself, after command-line overrides.
    pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config: Self = match path {
            Some(path) => read_json_file("config", path)?,
            None => Self::default(),
        };
        config
            .environment
            .validate()
            .context("Invalid environment configuration")?;
        Ok(config)
    }
}
