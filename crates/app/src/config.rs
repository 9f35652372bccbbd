use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tally_import::{StatementLayout, DEFAULT_THRESHOLD};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub threshold: f64,
    pub excluded_markers: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            excluded_markers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Falls back to the per-user data directory when unset.
    pub database: Option<PathBuf>,
    pub categories: PathBuf,
    pub statements: PathBuf,
    pub matching: MatchingConfig,
    pub layout: StatementLayout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            categories: PathBuf::from("categories.json"),
            statements: PathBuf::from("statements"),
            matching: MatchingConfig::default(),
            layout: StatementLayout::default(),
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid configuration")?;
        if !(0.0..=1.0).contains(&config.matching.threshold) {
            anyhow::bail!(
                "matching.threshold must be between 0 and 1, got {}",
                config.matching.threshold
            );
        }
        Ok(config)
    }

    /// A missing file is not an error; every setting has a default.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        let project_dirs = directories::ProjectDirs::from("com", "tally", "Tally")
            .context("Failed to get app directory")?;
        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        Ok(data_dir.join("finances.db"))
    }
}
