//! Configuration loading
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file: the explicit path, else `CORO_CONFIG_PATH`, else
//!    `coro.toml` in the working directory if it exists
//! 3. `CORO__*` environment variables, `__` between path segments
//!    (`CORO__ENGINE__STEP_BUDGET=5000`)
//! 4. Explicit overrides passed to the builder
//!
//! A `.env` file is loaded into the process environment first.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const ENV_PREFIX: &str = "CORO";
const CONFIG_PATH_VAR: &str = "CORO_CONFIG_PATH";
const DEFAULT_CONFIG_NAME: &str = "coro";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// Limits and checks applied by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interpreter steps a body may take in one engine call before
    /// `StepBudgetExceeded` is raised inside it
    pub step_budget: u64,

    /// Maximum number of links in a delegation chain
    pub max_delegation_depth: usize,

    /// Run the validator on `create` and `register`
    pub validate: bool,
}

impl EngineConfig {
    /// Reject limits that would make every body fail
    pub fn check(&self) -> Result<()> {
        if self.step_budget == 0 {
            bail!("engine.step_budget must be greater than 0");
        }
        if self.max_delegation_depth == 0 {
            bail!("engine.max_delegation_depth must be greater than 0");
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_budget: 1_000_000,
            max_delegation_depth: 10_000,
            validate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive: trace, debug, info, warn, error, or a full
    /// `EnvFilter` string
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default sources with no overrides
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    log_level: Option<String>,
}

impl ConfigBuilder {
    /// Config file to read; it must exist when given
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Override `logging.level`
    pub fn log_level(mut self, level: Option<String>) -> Self {
        self.log_level = level;
        self
    }

    pub fn build(self) -> Result<Config> {
        dotenvy::dotenv().ok();

        let explicit = self
            .config_path
            .or_else(|| std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from));

        let file = match &explicit {
            Some(path) => ::config::File::from(path.as_path()).required(true),
            None => ::config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let loaded = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("logging.level", self.log_level)
            .context("Invalid log level override")?
            .build()
            .with_context(|| match &explicit {
                Some(path) => format!("Failed to load config from {}", path.display()),
                None => "Failed to load configuration".to_string(),
            })?;

        let config: Config = loaded
            .try_deserialize()
            .context("Invalid configuration values")?;
        config.engine.check()?;
        Ok(config)
    }
}
