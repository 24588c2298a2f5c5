use crate::commandline::CliArgs;
use anyhow::{Context, Result};
use iolink_master_lib::sync_client::{GatewayConfig, DEFAULT_CID, DEFAULT_HOST, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Settings read from the YAML configuration file.
///
/// ```yaml
/// host: 192.168.1.101
/// timeout: 2s
/// cid: 1
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_cid")]
    pub cid: u32,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_cid() -> u32 {
    DEFAULT_CID
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            timeout: default_timeout(),
            cid: default_cid(),
        }
    }
}

impl Config {
    pub const DEFAULT_CONFIG_FILE: &'static str = "iolmaster.yml";

    /// Loads the given file, or the default file if it exists, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(Self::DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(Self::DEFAULT_CONFIG_FILE))
            }
            None => {
                log::debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        log::debug!("Loading config file from {path:?}");
        let file =
            File::open(path).with_context(|| format!("Cannot open config file {path:?}"))?;
        serde_yaml::from_reader(file).with_context(|| format!("Invalid config file {path:?}"))
    }

    /// Command line options take precedence over the file.
    pub fn apply_overrides(mut self, args: &CliArgs) -> Self {
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(timeout) = args.timeout {
            self.timeout = timeout;
        }
        if let Some(cid) = args.cid {
            self.cid = cid;
        }
        self
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            host: self.host.clone(),
            timeout: self.timeout,
            cid: self.cid,
        }
    }
}
