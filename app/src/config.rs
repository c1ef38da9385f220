//! Service configuration: TOML loading, defaults and path expansion.

use anyhow::Context;
use figment::providers::{Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "~/.lncm/invoicer.conf";
const DEPRECATED_CONFIG_FILE: &str = "~/.invoicer/invoicer.conf";

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub port: u16,
    pub static_dir: String,
    pub log_file: String,
    /// Which Lightning implementation to talk to. Only "lnd" is wired up.
    pub ln_client: String,
    /// Disables the bitcoind backend entirely; every payment becomes
    /// Lightning-only.
    pub off_chain_only: bool,
    pub bitcoind: BitcoindConfig,
    pub lnd: LndConfig,
    /// Basic-auth credentials for the history endpoint. The endpoint is not
    /// served at all while this is empty.
    pub users: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: String::new(),
            log_file: String::new(),
            ln_client: "lnd".to_owned(),
            off_chain_only: false,
            bitcoind: BitcoindConfig::default(),
            lnd: LndConfig::default(),
            users: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BitcoindConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

impl Default for BitcoindConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8332,
            user: "invoicer".to_owned(),
            pass: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LndConfig {
    pub host: String,
    pub port: u16,
    pub tls: String,
    pub macaroon: MacaroonConfig,
    /// Consecutive failed liveness probes after which the process exits.
    /// Zero disables the kill path.
    pub kill_count: u32,
}

impl Default for LndConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 10009,
            tls: "~/.lncm/tls.cert".to_owned(),
            macaroon: MacaroonConfig::default(),
            kill_count: 4,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MacaroonConfig {
    pub invoice: String,
    pub readonly: String,
}

impl Default for MacaroonConfig {
    fn default() -> Self {
        Self {
            invoice: "~/.lncm/invoice.macaroon".to_owned(),
            readonly: "~/.lncm/readonly.macaroon".to_owned(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let mut file = expand_path(path);
        if !file.exists() && path == DEFAULT_CONFIG_FILE {
            let deprecated = expand_path(DEPRECATED_CONFIG_FILE);
            if deprecated.exists() {
                log::warn!(
                    "loading config from deprecated location {}; move it to {}",
                    DEPRECATED_CONFIG_FILE,
                    DEFAULT_CONFIG_FILE
                );
                file = deprecated;
            }
        }
        anyhow::ensure!(file.exists(), "unable to load {}: no such file", file.display());
        extract(Figment::from(Toml::file(&file)))
            .with_context(|| format!("unable to process {}", file.display()))
    }
}

fn extract(figment: Figment) -> Result<Config, figment::Error> {
    figment.extract()
}

/// Expands a leading `~` to the current user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}
