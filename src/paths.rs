//! Platform locations for configuration and cached data.

use std::path::PathBuf;

/// Project directories from the standard platform locations.
fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("io", "xavail", "xavail")
}

/// Config directory (~/.config/xavail/ on Linux).
pub(crate) fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().to_path_buf())
}

/// Directory holding the model availability cache
/// (~/.cache/xavail/model_availability/ on Linux).
pub(crate) fn model_cache_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.cache_dir().join("model_availability"))
}
