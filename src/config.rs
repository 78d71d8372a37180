//! Configuration management for expmvc
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (expmvc.toml)
//! - Environment variables (EXPMVC__*)
//!
//! ## Example config file (expmvc.toml):
//! ```toml
//! [dependencies]
//! package_manager = "npm"
//! dev_only = ["nodemon"]
//! auto_install = true
//!
//! [watch]
//! debounce_ms = 1000
//! cooldown_ms = 2000
//! extensions = ["js", "ejs"]
//!
//! [scaffold]
//! parent_fields = ["name:string", "email:string"]
//! child_fields = ["title:string", "content:string"]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for the scaffolding tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExpmvcConfig {
    /// Dependency scanning and installation
    #[serde(default)]
    pub dependencies: DependencyConfig,

    /// File watcher settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Entity bootstrap settings for scaffold-relationship
    #[serde(default)]
    pub scaffold: ScaffoldConfig,
}

/// Dependency scanning and installation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Package manager executable
    #[serde(default = "default_package_manager")]
    pub package_manager: String,

    /// Packages that are always installed as development dependencies
    #[serde(default = "default_dev_only")]
    pub dev_only: Vec<String>,

    /// File extensions scanned for require/import statements
    #[serde(default = "default_scan_extensions")]
    pub scan_extensions: Vec<String>,

    /// Directory names never descended into while scanning
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    /// Run a dependency check before generation commands
    #[serde(default = "default_true")]
    pub auto_install: bool,
}

/// Watch loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet interval before a changed file is processed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Minimum time after processing before the same file is reprocessed
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Extensions of files that trigger processing
    #[serde(default = "default_watch_extensions")]
    pub extensions: Vec<String>,

    /// Extra gitignore-style patterns, on top of the built-in ones
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// Baseline fields used when scaffold mode has to create an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaffoldConfig {
    /// Fields for a bootstrapped parent entity (`name:kind`)
    #[serde(default = "default_parent_fields")]
    pub parent_fields: Vec<String>,

    /// Fields for a bootstrapped child entity (`name:kind`)
    #[serde(default = "default_child_fields")]
    pub child_fields: Vec<String>,
}

// Default value functions
fn default_package_manager() -> String {
    "npm".to_string()
}

fn default_dev_only() -> Vec<String> {
    vec!["nodemon".to_string()]
}

fn default_scan_extensions() -> Vec<String> {
    vec!["js".to_string(), "mjs".to_string(), "cjs".to_string()]
}

fn default_excluded_dirs() -> Vec<String> {
    vec!["node_modules".to_string(), ".git".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_watch_extensions() -> Vec<String> {
    vec!["js".to_string(), "ejs".to_string()]
}

fn default_parent_fields() -> Vec<String> {
    vec!["name:string".to_string(), "email:string".to_string()]
}

fn default_child_fields() -> Vec<String> {
    vec!["title:string".to_string(), "content:string".to_string()]
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            package_manager: default_package_manager(),
            dev_only: default_dev_only(),
            scan_extensions: default_scan_extensions(),
            excluded_dirs: default_excluded_dirs(),
            auto_install: true,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            cooldown_ms: default_cooldown_ms(),
            extensions: default_watch_extensions(),
            ignore: Vec::new(),
        }
    }
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            parent_fields: default_parent_fields(),
            child_fields: default_child_fields(),
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl ExpmvcConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, optionally layering a specific file on top
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["expmvc.toml", ".expmvc.toml", "config/expmvc.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "expmvc", "expmvc") {
            let xdg_config = config_dir.config_dir().join("expmvc.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // EXPMVC__WATCH__DEBOUNCE_MS=500
        builder = builder.add_source(
            Environment::with_prefix("EXPMVC")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
