use std::path::PathBuf;

use clap::Parser;
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::{Deserialize, Serialize};
use settings_loader::{Environment, LoadingOptions, SettingsError, SettingsLoader};
use validator::Validate;

use crate::error::ConfigurationError;
use crate::model::ResourceKeys;
use crate::topology::StaticTopology;

mod collector_settings;
mod probe_settings;
mod registry_settings;

pub use collector_settings::*;
pub use probe_settings::*;
pub use registry_settings::*;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub collector: CollectorSettings,
    #[serde(default)]
    pub resource: ResourceKeys,
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub topology: StaticTopology,
    #[serde(default)]
    pub probe: ProbeSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.collector.validate()?;
        self.probe.validate()?;
        Ok(())
    }
}

impl SettingsLoader for Settings {
    type Options = CliOptions;
}

#[derive(Parser, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[clap(author, version, about)]
pub struct CliOptions {
    /// override environment-based configuration file to load.
    /// Default behavior is to load configuration based on `APP_ENVIRONMENT` envvar.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// specify path to secrets configuration file
    #[clap(short, long)]
    pub secrets: Option<PathBuf>,

    #[clap(short, long)]
    pub environment: Option<Environment>,

    /// Override default location from which to load configuration files. Default directory is
    /// ./resources.
    #[clap(short, long)]
    pub resources: Option<PathBuf>,

    /// Override the collector's URI scheme, e.g. `https`.
    #[clap(long)]
    pub collector_scheme: Option<String>,
}

impl LoadingOptions for CliOptions {
    type Error = SettingsError;

    fn config_path(&self) -> Option<PathBuf> {
        self.config.clone()
    }

    fn resources_path(&self) -> Option<PathBuf> {
        self.resources.clone()
    }

    fn secrets_path(&self) -> Option<PathBuf> {
        self.secrets.clone()
    }

    fn load_overrides(&self, config: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>, Self::Error> {
        let config = match self.collector_scheme.as_deref() {
            None => config,
            Some(scheme) => config.set_override("collector.scheme", scheme)?,
        };

        Ok(config)
    }

    fn environment_override(&self) -> Option<Environment> {
        self.environment
    }
}
