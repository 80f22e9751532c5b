//! Configuration management
//!
//! Settings come from an optional `tally.toml`; command-line flags win over it.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tally_testing::TestRunnerConfig;

/// File looked up in the test root when `--config` is not given
pub const CONFIG_FILE_NAME: &str = "tally.toml";

/// Report rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `{unit,P,F,E,...,total,P,F,E}`
    #[default]
    Record,
    /// Pretty-printed JSON with one entry per test
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Print per-test detail before the record
    #[serde(default)]
    pub verbose: bool,

    /// Report format
    #[serde(default)]
    pub format: OutputFormat,

    /// Per-test time bound in seconds; 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Only run test functions whose name contains this
    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            format: OutputFormat::default(),
            timeout_secs: default_timeout_secs(),
            filter: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from `config_path`, or from `<root>/tally.toml` if present
    ///
    /// An explicitly named file must exist.
    pub fn load(config_path: Option<&Path>, root: &Path) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path.to_owned(),
            None => {
                let path = Self::default_config_path(root);
                if !path.is_file() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    fn default_config_path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn runner_config(&self) -> TestRunnerConfig {
        TestRunnerConfig {
            timeout: self.timeout(),
            verbose: self.verbose,
            filter: self.filter.clone(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    tally_testing::DEFAULT_TIMEOUT.as_secs()
}
