//! Config Store - persisted configurations in a directory
//!
//! Configurations live as `<asset_class>_config.json` files. The store loads
//! them all and matches input documents to an asset class by file name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{config_file_name, Configuration};
use crate::logs::log_warning;
use crate::error::{ConfigError, ConfigResult};

/// Directory where configurations are stored (relative to current dir)
pub const DEFAULT_CONFIG_DIR: &str = "configs";

const CONFIG_SUFFIX: &str = "_config.json";

/// Registry of the configurations found in one directory
pub struct ConfigStore {
    /// Directory where configurations are stored
    config_dir: PathBuf,
    /// Loaded configurations (asset_class -> config)
    configs: BTreeMap<String, Configuration>,
}

impl ConfigStore {
    /// Open the default directory
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_CONFIG_DIR)
    }

    /// Open a custom directory, loading every valid configuration in it.
    ///
    /// Invalid files are reported as warnings and left out.
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut store = Self {
            config_dir: PathBuf::from(dir.as_ref()),
            configs: BTreeMap::new(),
        };
        store.load_all();
        store
    }

    pub fn dir(&self) -> &Path {
        &self.config_dir
    }

    fn load_all(&mut self) {
        if !self.config_dir.exists() {
            return;
        }

        let entries = match fs::read_dir(&self.config_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(CONFIG_SUFFIX))
            })
            .collect();
        paths.sort();

        for path in paths {
            match Configuration::from_file(&path) {
                Ok(config) => {
                    self.configs.insert(config.asset_class.clone(), config);
                }
                Err(e) => log_warning(format!("Ignoring {}: {}", path.display(), e)),
            }
        }
    }

    /// All loaded configurations, ordered by asset class
    pub fn list(&self) -> Vec<&Configuration> {
        self.configs.values().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Get a configuration by asset class
    pub fn get(&self, asset_class: &str) -> Option<&Configuration> {
        self.configs.get(asset_class)
    }

    /// Get a configuration by asset class or fail with [`ConfigError::NotFound`]
    pub fn require(&self, asset_class: &str) -> ConfigResult<&Configuration> {
        self.get(asset_class)
            .ok_or_else(|| ConfigError::NotFound(asset_class.to_string()))
    }

    /// Find the configuration whose asset class occurs in an input file stem.
    ///
    /// When several match, the longest asset class wins so that `equity_swap`
    /// is preferred over `equity`.
    pub fn find_for_file(&self, input: &Path) -> Option<&Configuration> {
        let stem = input.file_stem()?.to_str()?;
        self.configs
            .values()
            .filter(|c| stem.contains(c.asset_class.as_str()))
            .max_by_key(|c| c.asset_class.len())
    }

    /// Save a configuration to the store directory
    pub fn save(&mut self, config: Configuration) -> ConfigResult<PathBuf> {
        fs::create_dir_all(&self.config_dir)?;
        let path = self.config_dir.join(config_file_name(&config.asset_class));
        config.save(&path)?;
        self.configs.insert(config.asset_class.clone(), config);
        Ok(path)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
