//! Configuration and CLI argument parsing for hostpush
//!
//! A configuration file is a YAML document with a `global` settings block,
//! a `hosts` list, and a `commands` list. Several files may be given on the
//! command line; each is processed independently and sequentially.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::command::Command;
use crate::error::{PushError, Result};
use crate::ssh::host::Host;

/// Default SSH port used when a host declares none
pub const DEFAULT_PORT: &str = "22";

/// hostpush CLI arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "hostpush")]
#[command(version)]
#[command(about = "Run a configured command sequence against a list of SSH hosts")]
pub struct Args {
    /// Configuration files to process, in order
    #[arg(long = "configs", num_args = 1.., required = true, env = "HOSTPUSH_CONFIGS")]
    pub configs: Vec<PathBuf>,

    /// Log filter directive (e.g. "info", "hostpush=debug")
    #[arg(long, default_value = "info", env = "HOSTPUSH_LOG")]
    pub log_level: String,
}

/// Global settings block: defaults shared by every host plus the
/// concurrency flag for the dispatcher.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalConfig {
    /// Run all hosts concurrently instead of one at a time
    #[serde(default, rename = "async")]
    pub concurrent: bool,

    /// Default username, used when a host declares none
    #[serde(default)]
    pub username: String,

    /// Default password, used when a host declares no username
    #[serde(default)]
    pub password: String,

    /// Default variables, overridden by host-level entries on collision
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// A single host entry in the configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostConfig {
    /// Hostname or IP address
    #[serde(default)]
    pub address: String,

    /// SSH port; empty means 22
    #[serde(default)]
    pub port: String,

    /// Username; empty means the global credentials apply
    #[serde(default)]
    pub username: String,

    /// Password for password authentication
    #[serde(default)]
    pub password: String,

    /// Certificate path. Accepted by the schema but reserved; password
    /// authentication is the only method used.
    #[serde(default)]
    pub cert_path: String,

    /// Host-specific variables; win over global entries on key collision
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl HostConfig {
    /// Network address as `address:port`, the port defaulting to 22
    pub fn addr(&self) -> String {
        let port = if self.port.is_empty() {
            DEFAULT_PORT
        } else {
            &self.port
        };
        format!("{}:{}", self.address, port)
    }

    /// Effective username: the host's own, or the global default when the
    /// host declares none.
    pub fn username<'a>(&'a self, global: &'a GlobalConfig) -> &'a str {
        if self.username.is_empty() {
            &global.username
        } else {
            &self.username
        }
    }

    /// Effective password. An empty *username* is what selects the global
    /// credentials, for the password as well as the username: a host that
    /// declares a password but no username still authenticates with the
    /// global password.
    pub fn password<'a>(&'a self, global: &'a GlobalConfig) -> &'a str {
        if self.username.is_empty() {
            &global.password
        } else {
            &self.password
        }
    }

    /// Merged variable mapping: global entries plus the host's own, the
    /// host winning on collision. This is the only variable source the
    /// template engine sees for this host.
    pub fn variables(&self, global: &GlobalConfig) -> HashMap<String, String> {
        let mut merged = global.variables.clone();
        merged.extend(self.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Resolve this entry against the global defaults into a [`Host`]
    pub fn resolve(&self, global: &GlobalConfig) -> Host {
        Host {
            addr: self.addr(),
            username: self.username(global).to_string(),
            password: self.password(global).to_string(),
            variables: self.variables(global),
        }
    }
}

/// One configuration unit: global settings, host list, command list.
/// Processed to completion before the next Config begins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,

    #[serde(default)]
    pub hosts: Vec<HostConfig>,

    #[serde(default)]
    pub commands: Vec<Command>,
}

impl Config {
    /// Load a single configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            PushError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| PushError::config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Parse a configuration document from YAML text
    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Load every configuration file, in order, failing on the first bad one
    pub async fn load_all(paths: &[PathBuf]) -> Result<Vec<Self>> {
        let mut configs = Vec::with_capacity(paths.len());
        for path in paths {
            configs.push(Self::load(path).await?);
        }
        Ok(configs)
    }
}
