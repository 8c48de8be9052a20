use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::paths;
use crate::providers::DEFAULT_TIMEOUT;
use crate::warn;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to read config \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config \"{}\": {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Deserialize, Serialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RequestedProviderEnabled {
    /// Enable the provider if it looks usable (a key is present, or the
    /// server answers).
    #[default]
    Auto,
    Yes,
    No,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Ollama {
    #[serde(default)]
    pub enabled: RequestedProviderEnabled,
    pub api_base: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct OpenAI {
    #[serde(default)]
    pub enabled: RequestedProviderEnabled,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Anthropic {
    #[serde(default)]
    pub enabled: RequestedProviderEnabled,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
}

/// A service which implements the OpenAI models route under its own name.
#[derive(Deserialize, Serialize, Debug)]
pub(crate) struct OpenAICompatible {
    pub name: String,
    pub api_base: String,
    pub api_key: Option<String>,
    /// The environment variable holding the API key, used when `api_key` is unset.
    pub api_key_env: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Providers {
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub ollama: Ollama,
    #[serde(default)]
    pub openai: OpenAI,
    #[serde(default)]
    pub anthropic: Anthropic,
    #[serde(default)]
    pub openai_compatible: Vec<OpenAICompatible>,
}

impl Providers {
    pub(crate) fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize, Serialize, Debug)]
pub(crate) struct Cache {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub dir: Option<PathBuf>,
}

impl Default for Cache {
    fn default() -> Self {
        Cache {
            enabled: true,
            dir: None,
        }
    }
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Config {
    #[serde(default)]
    pub cache: Cache,
    #[serde(default)]
    pub providers: Providers,
    /// Models a service can serve but does not report through its listing API.
    #[serde(default)]
    pub added_models: BTreeMap<String, Vec<String>>,
}

fn get_config_path() -> Option<PathBuf> {
    if let Some(config_dir) = paths::config_dir() {
        let path = config_dir.join("config.toml");

        if path.exists() {
            return Some(path);
        }
    }

    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home).join(".xavail.toml");

        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/xavail.toml");

    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

fn warn_on_extra_fields_helper<'a>(
    path: &mut Vec<&'a String>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
    extra: &mut Vec<String>,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        if let Some(config_value) = config.get(user_key) {
            if let (toml::Value::Table(user_value), toml::Value::Table(config_value)) =
                (user_value, config_value)
            {
                warn_on_extra_fields_helper(path, user_value, config_value, extra)
            }
        } else {
            let path: Vec<&str> = path.iter().map(|&s| s.as_str()).collect();

            extra.push(path.join("."));
        }

        path.pop();
    }
}

/// Returns the dotted paths of keys in `raw_config` which do not correspond to
/// any setting.
fn extra_fields(config: &Config, raw_config: &str) -> Vec<String> {
    let user_config: toml::Table = match toml::from_str(raw_config) {
        Ok(table) => table,
        Err(_) => return Vec::new(),
    };

    let config: toml::Table = match toml::to_string(config).map(|s| toml::from_str(&s)) {
        Ok(Ok(table)) => table,
        _ => return Vec::new(),
    };

    let mut path = Vec::new();
    let mut extra = Vec::new();

    warn_on_extra_fields_helper(&mut path, &user_config, &config, &mut extra);

    extra
}

pub(crate) fn parse_config(raw_config: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(raw_config)
}

pub(crate) fn read_config(config: Option<PathBuf>) -> Result<Config, Error> {
    let config_path = config.or_else(get_config_path);

    let path = match config_path {
        Some(path) => path,
        None => return Ok(Config::default()),
    };

    log::debug!("reading config from {}", path.display());

    let raw_config = std::fs::read_to_string(&path).map_err(|source| Error::Read {
        path: path.clone(),
        source,
    })?;

    let config = parse_config(&raw_config).map_err(|source| Error::Parse {
        path: path.clone(),
        source,
    })?;

    for key in extra_fields(&config, &raw_config) {
        warn!("config contains extraneous key \"{}\", ignoring", key);
    }

    Ok(config)
}
