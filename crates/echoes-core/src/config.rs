//! Configuration
//!
//! Environment-driven settings with CLI overrides layered on top by the
//! binary. Unparseable environment values are ignored with a warning.

use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::{CatalogError, QuestionCatalog};
use crate::selection::SelectionConfig;
use crate::sync::DEFAULT_DEBOUNCE;

pub const ENV_DATA_DIR: &str = "ECHOES_DATA_DIR";
pub const ENV_CATALOG: &str = "ECHOES_CATALOG";
pub const ENV_USER: &str = "ECHOES_USER";
pub const ENV_SKIP_PRIORITY: &str = "ECHOES_SKIP_PRIORITY";
pub const ENV_RECENT_WINDOW_DAYS: &str = "ECHOES_RECENT_WINDOW_DAYS";
pub const ENV_SYNC_DEBOUNCE_MS: &str = "ECHOES_SYNC_DEBOUNCE_MS";

/// Database file name inside the data directory
pub const DB_FILE_NAME: &str = "echoes.db";

#[derive(Debug, Clone)]
pub struct EchoesConfig {
    /// `None` means the platform data directory
    pub data_dir: Option<PathBuf>,
    /// `None` means the built-in catalog
    pub catalog_path: Option<PathBuf>,
    pub user: Option<String>,
    pub selection: SelectionConfig,
    pub sync_debounce: Duration,
}

impl Default for EchoesConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            catalog_path: None,
            user: None,
            selection: SelectionConfig::default(),
            sync_debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl EchoesConfig {
    /// Defaults overlaid with `ECHOES_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env` with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup(ENV_CATALOG).filter(|v| !v.is_empty()) {
            config.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(user) = lookup(ENV_USER).filter(|v| !v.trim().is_empty()) {
            config.user = Some(user);
        }
        if let Some(p) = parse_var::<f64>(&lookup, ENV_SKIP_PRIORITY) {
            config.selection.skip_priority_probability = p;
        }
        if let Some(days) = parse_var::<i64>(&lookup, ENV_RECENT_WINDOW_DAYS) {
            config.selection.recent_window_days = days;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_SYNC_DEBOUNCE_MS) {
            config.sync_debounce = Duration::from_millis(ms);
        }

        config.selection = config.selection.normalized();
        config
    }

    /// Database path, `None` to let storage pick the platform default
    pub fn db_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join(DB_FILE_NAME))
    }

    /// Load the configured catalog, or the built-in one
    pub fn load_catalog(&self) -> Result<QuestionCatalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => QuestionCatalog::from_path(path),
            None => QuestionCatalog::builtin(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}
