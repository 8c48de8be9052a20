use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use crate::availability::ModelAvailabilityCache;
use crate::cache::JsonFileStore;
use crate::config::Config;
use crate::registry::populate::populated_registry;
use crate::{die, paths, RequestedColorMode};

pub(crate) mod cache;
pub(crate) mod list;

#[derive(Clone, Copy, strum_macros::Display)]
pub(crate) enum ColorMode {
    On,
    Off,
}

impl ColorMode {
    /// Returns whether ANSI color should be used for diagnostics.
    /// If the user has specified a preference, this is honored. This preference
    /// can be specified through the command line or the "NO_COLOR" environment
    /// variable. If the user hasn't stated a preference, color is enabled if
    /// diagnostics go to a terminal.
    pub(crate) fn resolve_auto(cm: RequestedColorMode) -> ColorMode {
        match cm {
            RequestedColorMode::Auto => {
                let disable_color =
                    std::env::var_os("NO_COLOR").is_some() || !io::stderr().is_terminal();

                if disable_color {
                    ColorMode::Off
                } else {
                    ColorMode::On
                }
            }
            RequestedColorMode::On => ColorMode::On,
            RequestedColorMode::Off => ColorMode::Off,
        }
    }
}

fn cache_dir(config: &Config) -> PathBuf {
    match config.cache.dir.clone().or_else(paths::model_cache_dir) {
        Some(dir) => dir,
        None => die!("failed to determine a cache directory, set \"cache.dir\" in the config"),
    }
}

/// Opens the on-disk snapshot store named by the configuration.
pub(crate) fn open_store(config: &Config) -> JsonFileStore {
    match JsonFileStore::new(cache_dir(config)) {
        Ok(store) => store,
        Err(err) => die!("{}", err),
    }
}

/// Builds the availability cache from the configured providers.
pub(crate) async fn availability_cache(config: &Config, use_cache: bool) -> ModelAvailabilityCache {
    let registry = match populated_registry(config).await {
        Ok(registry) => registry,
        Err(err) => die!("{}", err),
    };

    ModelAvailabilityCache::new(
        registry,
        config.added_models.clone(),
        Arc::new(open_store(config)),
        use_cache && config.cache.enabled,
    )
}
