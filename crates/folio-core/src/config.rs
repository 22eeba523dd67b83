//! Reader configuration
//!
//! Built in three layers, later ones winning: built-in defaults, then
//! `~/.config/folio/config.toml`, then `FOLIO_*` variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::engine::Theme;
use crate::models::CatalogEntry;
use crate::rules::{RuleSet, RuleSpec};
use crate::storage::Tier;

// Shared by every override variable
const ENV_PREFIX: &str = "FOLIO";

/// Settings for the core and the terminal reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (saved positions, logs)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Delay between content-ready and scroll restoration, in milliseconds
    #[serde(default = "default_restore_grace_ms")]
    pub restore_grace_ms: u64,

    /// Lines per screen in the terminal reader
    #[serde(default = "default_page_lines")]
    pub page_lines: u32,

    /// Durability tier used when a document is opened
    #[serde(default)]
    pub tier: Tier,

    /// Log file path (defaults to {data_dir}/debug.log)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Presentation settings passed to the rendering engine
    #[serde(default)]
    pub theme: Theme,

    /// Readable documents
    #[serde(default = "default_documents")]
    pub documents: Vec<CatalogEntry>,

    /// Word substitutions, applied in order
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            restore_grace_ms: default_restore_grace_ms(),
            page_lines: default_page_lines(),
            tier: Tier::default(),
            log_file: None,
            theme: Theme::default(),
            documents: default_documents(),
            rules: default_rules(),
        }
    }
}

impl Config {
    /// Load from the default file, then apply `FOLIO_DATA_DIR`,
    /// `FOLIO_RESTORE_GRACE_MS`, `FOLIO_TIER` and `FOLIO_LOG_FILE`
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(cli_path: Option<&PathBuf>) -> Result<Self> {
        match cli_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load from `path`, falling back to defaults when it is missing
    ///
    /// `FOLIO_*` overrides apply either way.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Parse settings from TOML text (no env overrides)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        // FOLIO_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // FOLIO_RESTORE_GRACE_MS (ignored unless it parses)
        if let Ok(val) = std::env::var(format!("{}_RESTORE_GRACE_MS", ENV_PREFIX)) {
            if let Ok(ms) = val.trim().parse() {
                self.restore_grace_ms = ms;
            }
        }

        // FOLIO_TIER
        if let Ok(val) = std::env::var(format!("{}_TIER", ENV_PREFIX)) {
            if let Ok(tier) = val.parse() {
                self.tier = tier;
            }
        }

        // FOLIO_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Create `data_dir` if needed
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// `FOLIO_CONFIG`, or `config.toml` in the platform config dir
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio")
            .join("config.toml")
    }

    /// Durable position store
    pub fn positions_path(&self) -> PathBuf {
        self.data_dir.join("positions.json")
    }

    /// `log_file`, or `debug.log` in the data directory
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }

    pub fn restore_grace(&self) -> Duration {
        Duration::from_millis(self.restore_grace_ms)
    }

    /// Compile the configured substitution rules
    pub fn rule_set(&self) -> Result<RuleSet> {
        RuleSet::from_specs(&self.rules).context("Invalid substitution rules in configuration")
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.documents.clone())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folio")
}

fn default_restore_grace_ms() -> u64 {
    200
}

fn default_page_lines() -> u32 {
    20
}

fn default_documents() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry::new("y0v0", "Year 0 Volume 0", "/COTE-Y0V0.epub"),
        CatalogEntry::new("y3v3", "Year 3 Volume 3", "/COTE-Y3V3.epub"),
    ]
}

fn default_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::new("Saya", "Aku"),
        RuleSpec::new("saya", "aku"),
        RuleSpec::new("Anda", "Kamu"),
        RuleSpec::new("anda", "kamu"),
    ]
}
