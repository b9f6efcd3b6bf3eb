//! User-scoped locations: the global manifest and the registry cache.
//!
//! `$XDG_CONFIG_HOME/positive-vibes/` (fallback `~/.config/positive-vibes/`)
//! holds the global `vibes.yaml`; `$XDG_CACHE_HOME/positive-vibes/cache/`
//! (fallback `~/.cache/positive-vibes/cache/`) holds one git working tree per
//! registry.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::error::{Error, Result};

pub const APP_DIR: &str = "positive-vibes";
pub const GLOBAL_MANIFEST_FILE: &str = "vibes.yaml";

static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);
static CACHE_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

fn read_override(slot: &Mutex<Option<PathBuf>>) -> Option<PathBuf> {
    slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

fn write_override(slot: &Mutex<Option<PathBuf>>, value: Option<PathBuf>) {
    *slot.lock().unwrap_or_else(|e| e.into_inner()) = value;
}

/// Override the user config directory (e.g. from `--config-dir`).
pub fn set_config_dir(dir: PathBuf) {
    write_override(&CONFIG_DIR_OVERRIDE, Some(dir));
}

pub fn clear_config_dir() {
    write_override(&CONFIG_DIR_OVERRIDE, None);
}

/// Override the registry cache directory (e.g. from `--cache-dir`).
pub fn set_cache_dir(dir: PathBuf) {
    write_override(&CACHE_DIR_OVERRIDE, Some(dir));
}

pub fn clear_cache_dir() {
    write_override(&CACHE_DIR_OVERRIDE, None);
}

fn non_empty(var: &str) -> Option<OsString> {
    std::env::var_os(var).filter(|v| !v.is_empty())
}

/// XDG lookup with `$HOME` fallback. `home_suffix` is the directory under
/// `$HOME` used when the XDG variable is unset (e.g. `.config`).
fn resolve_base(
    xdg: Option<OsString>,
    home: Option<OsString>,
    home_suffix: &str,
) -> Option<PathBuf> {
    if let Some(xdg) = xdg {
        return Some(PathBuf::from(xdg));
    }
    home.map(|h| Path::new(&h).join(home_suffix))
}

/// Returns the user config directory (`~/.config/positive-vibes/`).
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = read_override(&CONFIG_DIR_OVERRIDE) {
        return Ok(dir);
    }
    resolve_base(non_empty("XDG_CONFIG_HOME"), non_empty("HOME"), ".config")
        .or_else(|| directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()))
        .map(|base| base.join(APP_DIR))
        .ok_or_else(|| Error::not_found("config directory", "$XDG_CONFIG_HOME or $HOME"))
}

/// Path of the global manifest, whether or not it exists.
pub fn global_manifest_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(GLOBAL_MANIFEST_FILE))
}

/// Returns the registry cache root (`~/.cache/positive-vibes/cache/`).
pub fn cache_dir() -> Result<PathBuf> {
    if let Some(dir) = read_override(&CACHE_DIR_OVERRIDE) {
        return Ok(dir);
    }
    resolve_base(non_empty("XDG_CACHE_HOME"), non_empty("HOME"), ".cache")
        .or_else(|| directories::BaseDirs::new().map(|d| d.cache_dir().to_path_buf()))
        .map(|base| base.join(APP_DIR).join("cache"))
        .ok_or_else(|| Error::not_found("cache directory", "$XDG_CACHE_HOME or $HOME"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let base = resolve_base(
            Some("/xdg/config".into()),
            Some("/home/me".into()),
            ".config",
        );
        assert_eq!(base, Some(PathBuf::from("/xdg/config")));
    }

    #[test]
    fn home_fallback_appends_suffix() {
        let base = resolve_base(None, Some("/home/me".into()), ".cache");
        assert_eq!(base, Some(PathBuf::from("/home/me/.cache")));
    }

    #[test]
    fn nothing_set_yields_none() {
        assert_eq!(resolve_base(None, None, ".config"), None);
    }

    #[test]
    fn overrides_take_precedence() {
        set_config_dir(PathBuf::from("/tmp/vibes-config"));
        assert_eq!(config_dir().unwrap(), PathBuf::from("/tmp/vibes-config"));
        assert_eq!(
            global_manifest_path().unwrap(),
            PathBuf::from("/tmp/vibes-config/vibes.yaml")
        );
        clear_config_dir();

        set_cache_dir(PathBuf::from("/tmp/vibes-cache"));
        assert_eq!(cache_dir().unwrap(), PathBuf::from("/tmp/vibes-cache"));
        clear_cache_dir();
    }
}
