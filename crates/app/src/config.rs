use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tally_core::{Money, RuleTable, DEFAULT_RULES_TOML};
use tally_import::StatementProfile;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub statement: StatementProfile,
    pub report: ReportSection,
    /// Category name → keywords. The bundled table is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    /// Unknown transactions at or below this amount are summed but not listed.
    pub threshold: Money,
    pub symbol: String,
    pub precision: u32,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            threshold: Money::from_cents(250_000),
            symbol: "₽".to_string(),
            precision: 0,
        }
    }
}

impl Config {
    /// Command-line flags win over the file.
    pub fn apply_overrides(&mut self, currency: Option<String>, threshold: Option<Money>) {
        if let Some(currency) = currency {
            self.statement.currency = currency;
        }
        if let Some(threshold) = threshold {
            self.report.threshold = threshold;
        }
    }

    pub fn rules(&self) -> Result<RuleTable> {
        let rules = match &self.categories {
            Some(categories) => RuleTable::from_map(categories.clone()),
            None => RuleTable::default_rules(),
        };
        rules.context("invalid category rules")
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "tally", "Tally")
        .context("could not determine the configuration directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// An explicit path must exist; the default location may be missing, in
/// which case built-in defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = default_config_path()?;
            if !p.exists() {
                tracing::debug!(path = %p.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            p
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(cfg)
}

/// Default config followed by the bundled `[categories]` table, so the
/// keyword lists are ready to edit.
pub fn default_config_toml() -> Result<String> {
    let body = toml::to_string_pretty(&Config::default()).context("serialize config")?;
    Ok(format!("{body}\n{DEFAULT_RULES_TOML}"))
}

pub fn init_config(explicit: Option<&Path>) -> Result<PathBuf> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if path.exists() {
        bail!("config already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&path, default_config_toml()?).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
